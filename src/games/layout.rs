//! Bomb layout generation.

use super::rng::SeededStream;

/// Identifies the seed-to-layout pipeline in disclosures
pub const LAYOUT_ALGORITHM: &str = "hmac-sha512/xor-fold32/mix32/fisher-yates:v1";

/// Deterministic bomb positions for a seed triple.
///
/// Shuffles `[0, total_cells)` with Fisher-Yates driven by the seeded stream,
/// keeps the first `bomb_count` cells and returns them in ascending order.
/// Callers validate `bomb_count <= total_cells`; larger counts are clamped.
pub fn generate_bomb_positions(
    server_seed: &str,
    client_seed: &str,
    nonce: u64,
    total_cells: u32,
    bomb_count: u32,
) -> Vec<u32> {
    let mut stream = SeededStream::from_seeds(server_seed, client_seed, nonce);
    let mut cells: Vec<u32> = (0..total_cells).collect();

    for i in (1..cells.len()).rev() {
        let j = (stream.next_f64() * (i + 1) as f64).floor() as usize;
        cells.swap(i, j);
    }

    cells.truncate(bomb_count.min(total_cells) as usize);
    cells.sort_unstable();
    cells
}
