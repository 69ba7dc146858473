//! Dispatch error types.

use reportcast_channels::ChannelError;
use reportcast_core::Channel;
use reportcast_ledger::LedgerError;
use thiserror::Error;

/// Errors surfaced by the dispatch orchestrator and delivery tracker.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The report (or ledger row) does not exist. Nothing was attempted.
    #[error("{0}")]
    NotFound(String),

    /// No provider is registered for the channel. Nothing was attempted.
    #[error("Channel {0} is not configured")]
    UnconfiguredChannel(Channel),

    /// The attempt failed unexpectedly after starting. The failure row
    /// `log_id` was written before this error was raised.
    #[error("Unexpected failure during dispatch (logged as {log_id}): {message}")]
    Unexpected { log_id: String, message: String },

    /// Ledger failure.
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Report store failure.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Provider failure outside of a send.
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),
}

/// Errors from activity sources and report stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Errors from the content formatter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// Neither the report nor the caller supplied an academy name.
    #[error("학원 정보가 없습니다: academy display name is missing")]
    MissingAcademy,

    /// The report link could not be built from the base URL.
    #[error("Invalid report base URL: {0}")]
    InvalidLink(String),
}

/// Errors from report aggregation.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// The student does not exist or has been deleted.
    #[error("Student not found: {0}")]
    NotFound(String),

    /// The student lookup itself failed.
    #[error("Student lookup failed: {0}")]
    Source(#[from] StoreError),
}
