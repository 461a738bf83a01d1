//! Request Handlers
//!
//! Thin adapters from HTTP to [`MinesEngine`] operations.

use super::{errors::ApiError, middleware::RequestId, models::*};
use crate::{
    games::{GameDisclosure, GameSummary, MinesEngine, RevealOutcome, StartOutcome, StartRequest},
    metrics::EngineMetrics,
};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::header,
    response::{IntoResponse, Response},
    Extension, Json,
};
use std::sync::Arc;
use uuid::Uuid;

/// Shared application state
pub struct AppState {
    pub engine: Arc<MinesEngine>,
    pub metrics: Option<Arc<EngineMetrics>>,
    pub version: String,
}

/// Ids that are not UUIDs can never name a stored game
fn parse_game_id(request_id: &RequestId, raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| ApiError::not_found(request_id.0.clone(), format!("Game {} not found", raw)))
}

fn json_body<T>(request_id: &RequestId, payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| ApiError::bad_request(request_id.0.clone(), e.body_text()))
}

/// GET /health
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: state.version.clone(),
    })
}

/// POST /api/start
pub async fn start_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<StartGameRequest>, JsonRejection>,
) -> Result<Json<StartOutcome>, ApiError> {
    let body = json_body(&request_id, payload)?;

    let outcome = state
        .engine
        .start(StartRequest {
            size: body.size,
            bomb_count: body.bombs,
            client_seed: body.client_seed,
            bet: body.bet,
        })
        .await
        .map_err(|e| ApiError::from_mines(request_id.0.clone(), e))?;

    Ok(Json(outcome))
}

/// POST /api/reveal
pub async fn reveal_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RevealRequest>, JsonRejection>,
) -> Result<Json<RevealOutcome>, ApiError> {
    let body = json_body(&request_id, payload)?;
    let game_id = parse_game_id(&request_id, &body.game_id)?;

    let outcome = state
        .engine
        .reveal(game_id, body.index)
        .await
        .map_err(|e| ApiError::from_mines(request_id.0.clone(), e))?;

    Ok(Json(outcome))
}

/// POST /api/cashout
pub async fn cashout_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CashoutRequest>, JsonRejection>,
) -> Result<Json<CashoutResponse>, ApiError> {
    let body = json_body(&request_id, payload)?;
    let game_id = parse_game_id(&request_id, &body.game_id)?;

    let outcome = state
        .engine
        .cashout(game_id)
        .await
        .map_err(|e| ApiError::from_mines(request_id.0.clone(), e))?;

    Ok(Json(CashoutResponse {
        success: true,
        outcome,
    }))
}

/// GET /api/history?limit={n}
pub async fn history_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<Vec<GameSummary>>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::bad_request(request_id.0.clone(), e.body_text()))?;

    let games = state
        .engine
        .history(query.limit)
        .await
        .map_err(|e| ApiError::from_mines(request_id.0.clone(), e))?;

    Ok(Json(games))
}

/// GET /api/verify/{game_id}
pub async fn verify_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<String>,
) -> Result<Json<GameDisclosure>, ApiError> {
    let game_id = parse_game_id(&request_id, &game_id)?;

    let disclosure = state
        .engine
        .verify(game_id)
        .await
        .map_err(|e| ApiError::from_mines(request_id.0.clone(), e))?;

    Ok(Json(disclosure))
}

/// GET /metrics
pub async fn metrics_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let metrics = state
        .metrics
        .as_ref()
        .ok_or_else(|| ApiError::not_found(request_id.0.clone(), "Metrics are disabled".to_string()))?;

    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        metrics.to_prometheus_format(),
    )
        .into_response())
}
