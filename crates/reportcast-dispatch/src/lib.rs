//! # reportcast-dispatch
//!
//! The report notification pipeline:
//!
//! - [`aggregator`]: builds a [`Report`](reportcast_core::Report) from a
//!   student's activity records
//! - [`formatter`]: turns a report into channel-ready content
//! - [`orchestrator`]: sends one notification and writes its ledger row
//! - [`classifier`]: maps raw failure text to an operator-facing category
//! - [`tracker`]: applies provider delivery confirmations to ledger rows
//! - [`store`]: ports for activity data and report persistence

pub mod aggregator;
pub mod classifier;
pub mod error;
pub mod formatter;
pub mod orchestrator;
pub mod store;
pub mod tracker;

pub use aggregator::{GenerateRequest, ReportAggregator};
pub use classifier::{
    classify, ClassifierError, ErrorClassification, ErrorClassifier, ErrorKind, Rule, RuleSet,
};
pub use error::{AggregateError, DispatchError, FormatError, StoreError};
pub use formatter::{format_report, report_link, FormatContext};
pub use orchestrator::{DispatchOrchestrator, SendReportRequest};
pub use store::{
    ActivitySnapshot, ActivitySource, FileReportStore, MemoryReportStore, ReportStore,
    SnapshotActivitySource,
};
pub use tracker::{DeliveryTracker, RefreshOutcome};

/// Result type for dispatch operations.
pub type Result<T> = std::result::Result<T, DispatchError>;
