//! Dispatch orchestration (`SendReport`).
//!
//! One dispatch attempt moves through
//! `Started -> Formatted -> Sent(success) | Sent(failure) -> Logged`.
//! A missing report or an unconfigured channel stops the attempt before
//! it starts and writes nothing. Past that point every path writes exactly
//! one ledger row, and only then returns or raises.

use crate::classifier::{ErrorClassification, ErrorClassifier};
use crate::error::DispatchError;
use crate::formatter::{format_report, FormatContext};
use crate::store::ReportStore;
use crate::Result;
use chrono::Utc;
use futures::FutureExt;
use reportcast_channels::{ProviderRegistry, SendRequest, SendResponse};
use reportcast_core::{AttemptRecord, Channel, Correlation, MessageLog, Recipient};
use reportcast_ledger::Ledger;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const MISSING_MESSAGE_ID: &str = "provider reported success without a message id";

/// A request to notify a guardian about a report.
#[derive(Debug, Clone)]
pub struct SendReportRequest {
    pub report_id: String,
    pub channel: Channel,
    pub recipient: Recipient,
    /// Actor who triggered the send.
    pub sender_id: String,
}

/// Sends report notifications and records every attempt.
pub struct DispatchOrchestrator {
    reports: Arc<dyn ReportStore>,
    registry: ProviderRegistry,
    ledger: Arc<dyn Ledger>,
    format: FormatContext,
    classifier: ErrorClassifier,
}

impl DispatchOrchestrator {
    pub fn new(
        reports: Arc<dyn ReportStore>,
        registry: ProviderRegistry,
        ledger: Arc<dyn Ledger>,
        format: FormatContext,
    ) -> Self {
        Self {
            reports,
            registry,
            ledger,
            format,
            classifier: ErrorClassifier::default(),
        }
    }

    /// Use a classifier with configured extra rules.
    pub fn with_classifier(mut self, classifier: ErrorClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Send one notification.
    ///
    /// Returns the provider's response, including ordinary send failures
    /// (`success = false`). An acceptance without a message id is returned
    /// as a failure, matching the row written for it. Errors:
    ///
    /// - [`DispatchError::NotFound`] / [`DispatchError::UnconfiguredChannel`]:
    ///   nothing was attempted and no row was written.
    /// - [`DispatchError::Unexpected`]: formatting or the provider failed in
    ///   an unexpected way; the failure row was written first.
    /// - [`DispatchError::Ledger`]: the row could not be written.
    pub async fn send_report(&self, request: SendReportRequest) -> Result<SendResponse> {
        let report = self
            .reports
            .get(&request.report_id)
            .await?
            .ok_or_else(|| {
                DispatchError::NotFound(format!("Report not found: {}", request.report_id))
            })?;

        let provider = self
            .registry
            .get(request.channel)
            .map_err(|_| DispatchError::UnconfiguredChannel(request.channel))?;

        let correlation = Correlation {
            tenant_id: report.tenant_id().to_string(),
            student_id: report.student_id().map(str::to_string),
            report_id: report.id().to_string(),
            sender_id: request.sender_id.clone(),
        };

        let content = match format_report(&report, request.channel, &self.format) {
            Ok(content) => content,
            Err(e) => {
                let message = e.to_string();
                warn!("Formatting report {} failed: {}", report.id(), message);
                let log = AttemptRecord::new(
                    request.channel,
                    provider.name(),
                    request.recipient,
                    None,
                    correlation,
                )
                .failed(message.clone(), Utc::now());
                return Err(self.unexpected(log, message).await);
            }
        };
        debug!("Formatted report {} for {}", report.id(), request.channel);

        let attempt = AttemptRecord::new(
            request.channel,
            provider.name(),
            request.recipient.clone(),
            Some(&content),
            correlation.clone(),
        );
        let send = provider.send(SendRequest {
            channel: request.channel,
            recipient: request.recipient,
            content,
            correlation,
        });

        let outcome = AssertUnwindSafe(send).catch_unwind().await;
        let now = Utc::now();

        match outcome {
            Ok(Ok(response)) => {
                let attempt = match response.rendered_body.as_deref() {
                    Some(body) => attempt.with_body(body),
                    None => attempt,
                };
                let (log, response) = match (response.message_id.clone(), response.success) {
                    (Some(message_id), true) => {
                        (attempt.sent(message_id, response.cost, now), response)
                    }
                    (None, true) => {
                        warn!("{} reported success without a message id", provider.name());
                        (
                            attempt.failed(MISSING_MESSAGE_ID, now),
                            SendResponse::failed(MISSING_MESSAGE_ID),
                        )
                    }
                    (_, false) => {
                        let reason = response.error.clone().unwrap_or_else(|| {
                            "provider reported failure without a reason".to_string()
                        });
                        (attempt.failed(reason, now), response)
                    }
                };
                self.append(log).await?;
                Ok(response)
            }
            Ok(Err(e)) => {
                let message = e.to_string();
                warn!("{} raised during send: {}", provider.name(), message);
                Err(self.unexpected(attempt.failed(message.clone(), now), message).await)
            }
            Err(panic) => {
                let message = format!("provider panicked: {}", panic_message(panic.as_ref()));
                error!("{} {}", provider.name(), message);
                Err(self.unexpected(attempt.failed(message.clone(), now), message).await)
            }
        }
    }

    /// Classification for a failed response; `None` on success.
    pub fn classify(&self, response: &SendResponse) -> Option<ErrorClassification> {
        if response.success {
            return None;
        }
        Some(
            self.classifier
                .classify(response.error.as_deref().unwrap_or_default()),
        )
    }

    /// Classification for an error raised by [`send_report`](Self::send_report).
    pub fn classify_error(&self, error: &DispatchError) -> ErrorClassification {
        self.classifier.classify(&error.to_string())
    }

    async fn append(&self, log: MessageLog) -> Result<()> {
        let (id, status) = (log.id.clone(), log.status);
        match self.ledger.append(log).await {
            Ok(()) => {
                info!("Recorded dispatch {} as {}", id, status);
                Ok(())
            }
            Err(e) => {
                error!("Failed to record dispatch {}: {}", id, e);
                Err(e.into())
            }
        }
    }

    /// Write the failure row, then build the error to raise.
    async fn unexpected(&self, log: MessageLog, message: String) -> DispatchError {
        let log_id = log.id.clone();
        match self.append(log).await {
            Ok(()) => DispatchError::Unexpected { log_id, message },
            Err(e) => e,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
