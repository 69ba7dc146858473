//! Delivery status tracking.
//!
//! Applies out-of-band delivery confirmations to `sent` ledger rows, either
//! by polling the row's provider or from a pushed update keyed by the
//! provider message id. Terminal rows are never changed.

use crate::error::DispatchError;
use crate::Result;
use chrono::Utc;
use reportcast_channels::{ChannelError, DeliveryState, ProviderRegistry};
use reportcast_core::{DeliveryUpdate, MessageLog, MessageStatus};
use reportcast_ledger::{Ledger, LedgerError, LedgerQuery};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of refreshing one row.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// The row moved to `delivered` or `failed`.
    Updated(MessageLog),
    /// The provider has no final answer yet; the row is unchanged.
    Pending(MessageLog),
    /// The row was already terminal.
    AlreadyFinal(MessageLog),
    /// The provider cannot report delivery status; the row is unchanged.
    Unsupported(MessageLog),
}

impl RefreshOutcome {
    pub fn log(&self) -> &MessageLog {
        match self {
            RefreshOutcome::Updated(log)
            | RefreshOutcome::Pending(log)
            | RefreshOutcome::AlreadyFinal(log)
            | RefreshOutcome::Unsupported(log) => log,
        }
    }
}

/// Reconciles ledger rows with provider delivery reports.
pub struct DeliveryTracker {
    registry: ProviderRegistry,
    ledger: Arc<dyn Ledger>,
}

impl DeliveryTracker {
    pub fn new(registry: ProviderRegistry, ledger: Arc<dyn Ledger>) -> Self {
        Self { registry, ledger }
    }

    /// Poll the provider for one ledger row and apply the answer.
    pub async fn refresh(&self, log_id: &str) -> Result<RefreshOutcome> {
        let log = self
            .ledger
            .get(log_id)
            .await?
            .ok_or_else(|| DispatchError::NotFound(format!("Message log not found: {}", log_id)))?;

        if log.status.is_terminal() {
            return Ok(RefreshOutcome::AlreadyFinal(log));
        }
        let Some(message_id) = log.message_id.clone() else {
            debug!("Ledger row {} has no provider message id", log.id);
            return Ok(RefreshOutcome::Pending(log));
        };

        let provider = self
            .registry
            .get(log.channel)
            .map_err(|_| DispatchError::UnconfiguredChannel(log.channel))?;

        let report = match provider.get_delivery_status(&message_id).await {
            Ok(report) => report,
            Err(ChannelError::Unsupported { .. }) => {
                debug!("{} cannot report delivery status", provider.name());
                return Ok(RefreshOutcome::Unsupported(log));
            }
            Err(e) => return Err(e.into()),
        };

        let update = match report.status {
            DeliveryState::Pending => return Ok(RefreshOutcome::Pending(log)),
            DeliveryState::Delivered => DeliveryUpdate::Delivered {
                at: report.delivered_at.unwrap_or_else(Utc::now),
            },
            DeliveryState::Failed => DeliveryUpdate::Failed {
                at: Utc::now(),
                reason: report
                    .failure_reason
                    .unwrap_or_else(|| "delivery failed".to_string()),
            },
        };

        self.apply(&log.id, update).await
    }

    /// Apply a pushed delivery update for a provider message id.
    pub async fn record_callback(
        &self,
        message_id: &str,
        update: DeliveryUpdate,
    ) -> Result<RefreshOutcome> {
        let log = self
            .ledger
            .find_by_message_id(message_id)
            .await?
            .ok_or_else(|| {
                DispatchError::NotFound(format!("No message log for message id {}", message_id))
            })?;

        if log.status.is_terminal() {
            return Ok(RefreshOutcome::AlreadyFinal(log));
        }
        self.apply(&log.id, update).await
    }

    /// Refresh every `sent` row matching the tenant filter. Rows that fail
    /// to refresh are logged and skipped.
    pub async fn refresh_pending(
        &self,
        tenant_id: Option<String>,
        limit: usize,
    ) -> Result<Vec<RefreshOutcome>> {
        let rows = self
            .ledger
            .list(&LedgerQuery {
                tenant_id,
                status: Some(MessageStatus::Sent),
                limit,
                ..Default::default()
            })
            .await?;

        let mut outcomes = Vec::with_capacity(rows.len());
        for row in rows {
            match self.refresh(&row.id).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => warn!("Failed to refresh {}: {}", row.id, e),
            }
        }
        Ok(outcomes)
    }

    async fn apply(&self, log_id: &str, update: DeliveryUpdate) -> Result<RefreshOutcome> {
        match self.ledger.record_delivery(log_id, update).await {
            Ok(updated) => {
                info!("Ledger row {} is now {}", updated.id, updated.status);
                Ok(RefreshOutcome::Updated(updated))
            }
            // Someone else finalised the row first.
            Err(LedgerError::Conflict(_)) => {
                let current = self
                    .ledger
                    .get(log_id)
                    .await?
                    .ok_or_else(|| DispatchError::NotFound(log_id.to_string()))?;
                Ok(RefreshOutcome::AlreadyFinal(current))
            }
            Err(e) => Err(e.into()),
        }
    }
}
