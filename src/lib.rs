//! Mines - Provably Fair Grid Game Engine
//!
//! Commit-then-reveal bomb layouts derived from a public server seed, a
//! player-chosen client seed and a per-game nonce. Any finished game can be
//! recomputed by a third party from its disclosure record.

pub mod api;
pub mod config;
pub mod entropy;
pub mod errors;
pub mod factory;
pub mod game_store;
pub mod games;
pub mod metrics;
pub mod storage;

pub use config::MinesConfig;
pub use errors::{GameError, MinesError, MinesResult};
pub use factory::EngineFactory;
pub use games::MinesEngine;
