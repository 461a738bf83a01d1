//! Seed mixer: HMAC-SHA512 commitment folded into a 32-bit seed that drives
//! a fast deterministic stream used only for shuffling.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha512};

pub type HmacSha512 = Hmac<Sha512>;

/// Substituted when the digest folds to zero
pub const ZERO_SEED_REPLACEMENT: u32 = 0x9e37_79b9;

const MIX_INCREMENT: u32 = 0x6d2b_79f5;
const RESOLUTION: u32 = 1_000_000;

/// Number of leading hex digits of the digest folded into the seed
const FOLD_HEX_DIGITS: usize = 32;

/// Message authenticated by the commitment MAC
pub fn commitment_message(client_seed: &str, nonce: u64) -> String {
    format!("{}:{}", client_seed, nonce)
}

/// Hex HMAC-SHA512 of `"{client_seed}:{nonce}"` keyed by the server seed
pub fn commitment_hex(server_seed: &str, client_seed: &str, nonce: u64) -> String {
    // HMAC accepts keys of any length
    let mut mac = HmacSha512::new_from_slice(server_seed.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(commitment_message(client_seed, nonce).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// XOR-fold consecutive 8-hex-digit words of the digest prefix into a seed.
///
/// Words that fail to parse count as zero and a short trailing word is
/// right-padded with `0`, so any string input yields a seed.
pub fn fold_seed(hex_digest: &str) -> u32 {
    let prefix: Vec<char> = hex_digest.chars().take(FOLD_HEX_DIGITS).collect();

    let seed = prefix.chunks(8).fold(0u32, |acc, chunk| {
        let mut word: String = chunk.iter().collect();
        while word.len() < 8 {
            word.push('0');
        }
        acc ^ u32::from_str_radix(&word, 16).unwrap_or(0)
    });

    if seed == 0 {
        ZERO_SEED_REPLACEMENT
    } else {
        seed
    }
}

/// Hex SHA-256 of the server seed, published as a commitment value
pub fn server_seed_hash(server_seed: &str) -> String {
    hex::encode(Sha256::digest(server_seed.as_bytes()))
}

/// Deterministic 32-bit mixing generator with six decimal digits of output
#[derive(Debug, Clone)]
pub struct SeededStream {
    state: u32,
}

impl SeededStream {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Stream for a `(server_seed, client_seed, nonce)` triple
    pub fn from_seeds(server_seed: &str, client_seed: &str, nonce: u64) -> Self {
        Self::new(fold_seed(&commitment_hex(server_seed, client_seed, nonce)))
    }

    /// Advance the state and return the raw 32-bit output
    pub fn next_u32(&mut self) -> u32 {
        let s = self.state;
        let mixed = (s ^ (s >> 15)).wrapping_mul(1 | s);
        self.state = mixed.wrapping_add(MIX_INCREMENT);
        self.state
    }

    /// Next value in `[0, 1)` with a resolution of one millionth
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u32() % RESOLUTION) as f64 / RESOLUTION as f64
    }
}
