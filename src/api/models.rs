//! API Request and Response Models

use serde::{Deserialize, Serialize};

use crate::games::CashoutOutcome;

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// POST /api/start
///
/// Missing numeric fields and an absent client seed deserialize to empty
/// values so the engine reports them as invalid parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartGameRequest {
    #[serde(default)]
    pub size: i64,
    #[serde(default, alias = "bombCount")]
    pub bombs: i64,
    #[serde(default)]
    pub client_seed: String,
    #[serde(default)]
    pub bet: Option<f64>,
}

/// POST /api/reveal
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealRequest {
    pub game_id: String,
    pub index: i64,
}

/// POST /api/cashout
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashoutRequest {
    pub game_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CashoutResponse {
    pub success: bool,
    #[serde(flatten)]
    pub outcome: CashoutOutcome,
}

/// GET /api/history?limit={n}
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}
