//! Offline game verifier
//!
//! Recomputes a bomb layout from disclosed seeds without contacting the
//! server, prints the payout table and optionally replays a reveal sequence.

use clap::Parser;
use mines::entropy;
use mines::games::{
    generate_bomb_positions, payout::compute_multiplier_with_edge, rng, LAYOUT_ALGORITHM,
};

#[derive(Parser, Debug)]
#[command(name = "verify_game")]
#[command(about = "Recompute a Mines layout from its disclosed seeds", long_about = None)]
struct Args {
    /// Disclosed server seed
    #[arg(long)]
    server_seed: String,

    /// Player client seed
    #[arg(long)]
    client_seed: String,

    /// Game nonce
    #[arg(long)]
    nonce: u64,

    /// Grid side length
    #[arg(long)]
    size: u32,

    /// Number of bombs
    #[arg(long)]
    bombs: u32,

    /// Comma-separated cells to replay in order
    #[arg(long, value_delimiter = ',')]
    opened: Vec<u32>,

    /// Expected server seed hash to check against
    #[arg(long)]
    seed_hash: Option<String>,

    /// Payout factor
    #[arg(long, default_value = "0.98")]
    house_edge: f64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let total_cells = args
        .size
        .checked_mul(args.size)
        .filter(|&t| t > 0)
        .ok_or("size must be positive")?;
    if args.bombs == 0 || args.bombs >= total_cells {
        return Err(format!("bombs must be in [1, {}]", total_cells - 1).into());
    }

    let bombs = generate_bomb_positions(
        &args.server_seed,
        &args.client_seed,
        args.nonce,
        total_cells,
        args.bombs,
    );

    println!("Algorithm:        {}", LAYOUT_ALGORITHM);
    println!("Commitment HMAC:  {}", rng::commitment_hex(&args.server_seed, &args.client_seed, args.nonce));
    let hash = rng::server_seed_hash(&args.server_seed);
    println!("Server seed hash: {}", hash);
    println!(
        "Seed origin:      {}",
        if entropy::is_fallback(&args.server_seed) {
            "fallback (local clock, not publicly verifiable)"
        } else {
            "public"
        }
    );
    if let Some(expected) = &args.seed_hash {
        let matches = expected.eq_ignore_ascii_case(&hash);
        println!("Hash check:       {}", if matches { "OK" } else { "MISMATCH" });
        if !matches {
            return Err("server seed does not match the published hash".into());
        }
    }
    println!("Bomb positions:   {:?}", bombs);
    println!();

    for row in 0..args.size {
        let line: Vec<&str> = (0..args.size)
            .map(|col| {
                let cell = row * args.size + col;
                if bombs.binary_search(&cell).is_ok() {
                    "*"
                } else {
                    "."
                }
            })
            .collect();
        println!("  {}", line.join(" "));
    }
    println!();

    println!("Multiplier table:");
    for k in 0..=(total_cells - args.bombs) {
        println!(
            "  {:>3} opened  x{}",
            k,
            compute_multiplier_with_edge(total_cells, args.bombs, k, args.house_edge)
        );
    }

    if args.opened.is_empty() {
        return Ok(());
    }

    println!();
    println!("Replay:");
    let mut opened: Vec<u32> = Vec::new();
    for &cell in &args.opened {
        if cell >= total_cells {
            println!("  cell {:>3}  invalid index", cell);
            break;
        }
        if opened.contains(&cell) {
            println!("  cell {:>3}  already opened", cell);
            continue;
        }
        opened.push(cell);

        if bombs.binary_search(&cell).is_ok() {
            println!("  cell {:>3}  BOMB, game lost", cell);
            break;
        }
        println!(
            "  cell {:>3}  safe  x{}",
            cell,
            compute_multiplier_with_edge(total_cells, args.bombs, opened.len() as u32, args.house_edge)
        );
    }

    Ok(())
}
