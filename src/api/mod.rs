//! Game API Service
//!
//! HTTP surface over the engine: start, reveal, cashout, history and
//! verification, plus health and Prometheus endpoints.

pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;

pub use server::ApiServer;
