//! Delivery ledger for ReportCast.
//!
//! Every dispatch that reaches a provider leaves exactly one row here. Rows
//! are never deleted; the only mutation is a later delivery confirmation on
//! a `sent` row.

pub mod error;
pub mod store;
pub mod sqlite;

pub use error::LedgerError;
pub use sqlite::SqliteLedger;
pub use store::{Ledger, LedgerQuery, MemoryLedger};

use reportcast_core::config::{Config, LedgerBackend};
use std::sync::Arc;
use tracing::info;

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Open the ledger selected by configuration.
pub async fn open(config: &Config) -> Result<Arc<dyn Ledger>> {
    match config.ledger.backend {
        LedgerBackend::Memory => {
            info!("Using in-memory delivery ledger");
            Ok(Arc::new(MemoryLedger::new()))
        }
        LedgerBackend::Sqlite => {
            let path = config
                .ledger_path()
                .map_err(|e| LedgerError::Config(e.to_string()))?;
            info!("Using SQLite delivery ledger at {}", path.display());
            Ok(Arc::new(SqliteLedger::open(&path).await?))
        }
    }
}
