//! Ledger error types.

use thiserror::Error;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Row not found.
    #[error("Message log not found: {0}")]
    NotFound(String),

    /// The write conflicts with the row's current state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A stored row could not be decoded.
    #[error("Corrupt row: {0}")]
    Corrupt(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl LedgerError {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }
}
