pub mod engine;
pub mod layout;
pub mod payout;
pub mod rng;
pub mod types;

pub use engine::{CashoutOutcome, EngineSettings, MinesEngine, RevealOutcome, StartOutcome, StartRequest};
pub use layout::{generate_bomb_positions, LAYOUT_ALGORITHM};
pub use payout::compute_multiplier;
pub use types::*;
