//! Ledger trait and the in-memory implementation.

use crate::{LedgerError, Result};
use async_trait::async_trait;
use chrono::Utc;
use reportcast_core::{Channel, DeliveryUpdate, MessageLog, MessageStatus};
use tokio::sync::RwLock;
use tracing::debug;

/// Filter for listing ledger rows.
#[derive(Debug, Clone)]
pub struct LedgerQuery {
    pub tenant_id: Option<String>,
    pub channel: Option<Channel>,
    pub status: Option<MessageStatus>,
    pub limit: usize,
}

impl Default for LedgerQuery {
    fn default() -> Self {
        Self {
            tenant_id: None,
            channel: None,
            status: None,
            limit: 50,
        }
    }
}

impl LedgerQuery {
    /// Whether a row passes the filter (limit aside).
    pub fn matches(&self, log: &MessageLog) -> bool {
        self.tenant_id.as_deref().map_or(true, |t| log.tenant_id == t)
            && self.channel.map_or(true, |c| log.channel == c)
            && self.status.map_or(true, |s| log.status == s)
    }
}

/// Append-only store of delivery attempts.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Persist a new row. Appending an id twice is a conflict.
    async fn append(&self, log: MessageLog) -> Result<()>;

    /// Get a row by ledger id.
    async fn get(&self, id: &str) -> Result<Option<MessageLog>>;

    /// Find the row carrying a provider message id.
    async fn find_by_message_id(&self, message_id: &str) -> Result<Option<MessageLog>>;

    /// Rows matching the query, newest first.
    async fn list(&self, query: &LedgerQuery) -> Result<Vec<MessageLog>>;

    /// Apply a delivery confirmation to a `sent` row and return the result.
    /// Terminal rows are never changed.
    async fn record_delivery(&self, id: &str, update: DeliveryUpdate) -> Result<MessageLog>;
}

/// In-memory ledger.
pub struct MemoryLedger {
    rows: RwLock<Vec<MessageLog>>,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLedger {
    /// Create an empty in-memory ledger.
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
        }
    }

    /// Number of rows.
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    /// Every row in append order.
    pub async fn all(&self) -> Vec<MessageLog> {
        self.rows.read().await.clone()
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn append(&self, log: MessageLog) -> Result<()> {
        let mut rows = self.rows.write().await;
        if rows.iter().any(|r| r.id == log.id) {
            return Err(LedgerError::Conflict(format!("duplicate id {}", log.id)));
        }
        debug!("Ledger append {} ({})", log.id, log.status);
        rows.push(log);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<MessageLog>> {
        let rows = self.rows.read().await;
        Ok(rows.iter().find(|r| r.id == id).cloned())
    }

    async fn find_by_message_id(&self, message_id: &str) -> Result<Option<MessageLog>> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .rev()
            .find(|r| r.message_id.as_deref() == Some(message_id))
            .cloned())
    }

    async fn list(&self, query: &LedgerQuery) -> Result<Vec<MessageLog>> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .rev()
            .filter(|r| query.matches(r))
            .take(query.limit)
            .cloned()
            .collect())
    }

    async fn record_delivery(&self, id: &str, update: DeliveryUpdate) -> Result<MessageLog> {
        let mut rows = self.rows.write().await;
        let row = rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| LedgerError::not_found(id))?;

        row.apply(update, Utc::now())
            .map_err(|e| LedgerError::Conflict(e.to_string()))?;
        debug!("Ledger {} is now {}", row.id, row.status);
        Ok(row.clone())
    }
}
