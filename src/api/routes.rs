//! Route Definitions
//!
//! Maps URLs to handlers with type-safe routing.

use super::handlers::*;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Build the API router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        // Game lifecycle
        .route("/api/start", post(start_handler))
        .route("/api/reveal", post(reveal_handler))
        .route("/api/cashout", post(cashout_handler))
        // Read-only views
        .route("/api/history", get(history_handler))
        .route("/api/verify/:game_id", get(verify_handler))
        .with_state(state)
}
