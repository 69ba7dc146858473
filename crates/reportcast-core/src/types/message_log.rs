//! Delivery ledger records.

use crate::types::{Channel, Correlation, MessageContent, Recipient};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Outcome state of a ledger row.
///
/// A dispatch writes either `Sent` or `Failed`. Later status callbacks may
/// move `Sent` to `Delivered` or `Failed`; both of those are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sent,
    Delivered,
    Failed,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Sent => "sent",
            MessageStatus::Delivered => "delivered",
            MessageStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, MessageStatus::Delivered | MessageStatus::Failed)
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sent" => Ok(MessageStatus::Sent),
            "delivered" => Ok(MessageStatus::Delivered),
            "failed" => Ok(MessageStatus::Failed),
            other => Err(crate::Error::Invalid(format!("unknown message status: {}", other))),
        }
    }
}

/// An out-of-band delivery confirmation applied to a `Sent` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryUpdate {
    Delivered { at: DateTime<Utc> },
    Failed { at: DateTime<Utc>, reason: String },
}

/// One delivery attempt, as written to the ledger.
///
/// Field names are the persisted contract read by support tooling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageLog {
    pub id: String,
    pub tenant_id: String,
    pub channel: Channel,
    pub provider: String,

    pub recipient_name: String,
    pub recipient_contact: String,

    pub message_subject: Option<String>,
    /// Exact text sent, kept so the row stays readable after the report is gone.
    pub message_body: String,

    pub status: MessageStatus,
    pub message_id: Option<String>,
    pub cost: Option<f64>,
    pub error_message: Option<String>,

    pub metadata: Correlation,

    pub sent_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The parts of a row known before the provider answers.
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    pub channel: Channel,
    pub provider: String,
    pub recipient: Recipient,
    pub subject: Option<String>,
    pub body: String,
    pub correlation: Correlation,
}

impl AttemptRecord {
    /// Describe an attempt that reached the formatting stage.
    pub fn new(
        channel: Channel,
        provider: impl Into<String>,
        recipient: Recipient,
        content: Option<&MessageContent>,
        correlation: Correlation,
    ) -> Self {
        Self {
            channel,
            provider: provider.into(),
            recipient,
            subject: content.and_then(|c| c.subject()).map(str::to_string),
            body: content.map(MessageContent::snapshot).unwrap_or_default(),
            correlation,
        }
    }

    /// Replace the recorded body with the text the transport actually sent.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Build a `sent` row.
    pub fn sent(self, message_id: String, cost: Option<f64>, now: DateTime<Utc>) -> MessageLog {
        let mut log = self.into_log(MessageStatus::Sent, now);
        log.message_id = Some(message_id);
        log.cost = cost;
        log.sent_at = Some(now);
        log
    }

    /// Build a `failed` row.
    pub fn failed(self, error: impl Into<String>, now: DateTime<Utc>) -> MessageLog {
        let mut log = self.into_log(MessageStatus::Failed, now);
        log.error_message = Some(error.into());
        log.failed_at = Some(now);
        log
    }

    fn into_log(self, status: MessageStatus, now: DateTime<Utc>) -> MessageLog {
        MessageLog {
            id: crate::id::log_id(),
            tenant_id: self.correlation.tenant_id.clone(),
            channel: self.channel,
            provider: self.provider,
            recipient_name: self.recipient.name,
            recipient_contact: self.recipient.contact,
            message_subject: self.subject,
            message_body: self.body,
            status,
            message_id: None,
            cost: None,
            error_message: None,
            metadata: self.correlation,
            sent_at: None,
            delivered_at: None,
            failed_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl MessageLog {
    /// Apply a delivery confirmation. Only `Sent` rows accept updates.
    pub fn apply(&mut self, update: DeliveryUpdate, now: DateTime<Utc>) -> crate::Result<()> {
        if self.status != MessageStatus::Sent {
            return Err(crate::Error::Invalid(format!(
                "message log {} is already {}",
                self.id, self.status
            )));
        }
        match update {
            DeliveryUpdate::Delivered { at } => {
                self.status = MessageStatus::Delivered;
                self.delivered_at = Some(at);
            }
            DeliveryUpdate::Failed { at, reason } => {
                self.status = MessageStatus::Failed;
                self.failed_at = Some(at);
                self.error_message = Some(reason);
            }
        }
        self.updated_at = now;
        Ok(())
    }
}
