//! Error types for the Mines engine
//!
//! Engine errors are synchronous and never retried internally. Storage errors
//! are fatal to the request that hit them.

use thiserror::Error;
use uuid::Uuid;

/// Root error type for all Mines operations
#[derive(Debug, Error)]
pub enum MinesError {
    /// Rejected game operation (caller error)
    #[error("Game error: {0}")]
    Game(#[from] GameError),

    /// Persistence layer errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
}

/// Game operation errors. None of these mutate state.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GameError {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Game {0} not found")]
    NotFound(Uuid),

    #[error("Game {0} already finished")]
    AlreadyFinished(Uuid),

    #[error("Invalid index {index} (grid has {total_cells} cells)")]
    InvalidIndex { index: i64, total_cells: u32 },

    #[error("Cell {0} already opened")]
    AlreadyOpened(u32),
}

/// Storage system errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database open failed: {0}")]
    DatabaseOpenFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Corrupted data: {0}")]
    CorruptedData(String),
}

/// Configuration and validation errors
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Missing required field: {0}")]
    MissingRequired(String),

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),
}

impl GameError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            GameError::InvalidParameters(_) => "INVALID_PARAMETERS",
            GameError::NotFound(_) => "NOT_FOUND",
            GameError::AlreadyFinished(_) => "ALREADY_FINISHED",
            GameError::InvalidIndex { .. } => "INVALID_INDEX",
            GameError::AlreadyOpened(_) => "ALREADY_OPENED",
        }
    }
}

// External error conversions
impl From<rocksdb::Error> for MinesError {
    fn from(e: rocksdb::Error) -> Self {
        MinesError::Storage(StorageError::WriteFailed(e.to_string()))
    }
}

impl From<std::io::Error> for MinesError {
    fn from(e: std::io::Error) -> Self {
        MinesError::Storage(StorageError::ReadFailed(e.to_string()))
    }
}

impl From<serde_json::Error> for MinesError {
    fn from(e: serde_json::Error) -> Self {
        MinesError::Storage(StorageError::CorruptedData(e.to_string()))
    }
}

// Convenience type alias for Results
pub type MinesResult<T> = Result<T, MinesError>;
