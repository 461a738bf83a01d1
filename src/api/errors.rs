//! API Error Handling
//!
//! Structured error responses with proper HTTP status codes and request tracking.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::error;

use crate::errors::{GameError, MinesError};

/// Top-level API error response with request tracking
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub request_id: String,
    pub error: ErrorBody,
}

/// Error body with structured information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Error code (NOT_FOUND, ALREADY_OPENED, INTERNAL_ERROR, etc.)
    pub code: String,
    /// Human-readable error message
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// API error types with request tracking
#[derive(Debug)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub request_id: String,
}

#[derive(Debug)]
pub enum ApiErrorKind {
    NotFound(String),
    BadRequest(String),
    /// Engine rejected the operation
    Game(GameError),
    InternalError(String),
}

impl ApiError {
    pub fn not_found(request_id: String, message: String) -> Self {
        Self {
            kind: ApiErrorKind::NotFound(message),
            request_id,
        }
    }

    pub fn bad_request(request_id: String, message: String) -> Self {
        Self {
            kind: ApiErrorKind::BadRequest(message),
            request_id,
        }
    }

    pub fn internal_error(request_id: String, message: String) -> Self {
        Self {
            kind: ApiErrorKind::InternalError(message),
            request_id,
        }
    }

    /// Map an engine error. Storage and configuration failures become 500s
    /// and their details stay in the logs.
    pub fn from_mines(request_id: String, err: MinesError) -> Self {
        match err {
            MinesError::Game(game) => Self {
                kind: ApiErrorKind::Game(game),
                request_id,
            },
            other => {
                error!(request_id = %request_id, "Request failed: {}", other);
                Self::internal_error(request_id, "Internal server error".to_string())
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        match &self.kind {
            ApiErrorKind::NotFound(_) | ApiErrorKind::Game(GameError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiErrorKind::BadRequest(_) | ApiErrorKind::Game(_) => StatusCode::BAD_REQUEST,
            ApiErrorKind::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match &self.kind {
            ApiErrorKind::NotFound(_) => "NOT_FOUND",
            ApiErrorKind::BadRequest(_) => "BAD_REQUEST",
            ApiErrorKind::Game(game) => game.code(),
            ApiErrorKind::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    fn message(&self) -> String {
        match &self.kind {
            ApiErrorKind::NotFound(msg)
            | ApiErrorKind::BadRequest(msg)
            | ApiErrorKind::InternalError(msg) => msg.clone(),
            ApiErrorKind::Game(game) => game.to_string(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match &self.kind {
            ApiErrorKind::Game(GameError::InvalidIndex { index, total_cells }) => {
                Some(serde_json::json!({ "index": index, "totalCells": total_cells }))
            }
            ApiErrorKind::Game(GameError::AlreadyOpened(index)) => {
                Some(serde_json::json!({ "index": index }))
            }
            _ => None,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.request_id, self.code(), self.message())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            request_id: self.request_id.clone(),
            error: ErrorBody {
                code: self.code().to_string(),
                message: self.message(),
                details: self.details(),
            },
        });

        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StorageError;
    use uuid::Uuid;

    #[test]
    fn test_game_error_mapping() {
        let id = Uuid::new_v4();
        let cases = [
            (GameError::InvalidParameters("x".into()), StatusCode::BAD_REQUEST, "INVALID_PARAMETERS"),
            (GameError::NotFound(id), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (GameError::AlreadyFinished(id), StatusCode::BAD_REQUEST, "ALREADY_FINISHED"),
            (
                GameError::InvalidIndex { index: 99, total_cells: 25 },
                StatusCode::BAD_REQUEST,
                "INVALID_INDEX",
            ),
            (GameError::AlreadyOpened(3), StatusCode::BAD_REQUEST, "ALREADY_OPENED"),
        ];

        for (game, status, code) in cases {
            let err = ApiError::from_mines("req".to_string(), game.into());
            assert_eq!(err.status(), status);
            assert_eq!(err.code(), code);
        }
    }

    #[test]
    fn test_storage_error_is_internal() {
        let err = ApiError::from_mines(
            "req".to_string(),
            StorageError::WriteFailed("disk full".to_string()).into(),
        );

        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.to_string().contains("disk full"));
    }
}
