//! SMTP email provider.
//!
//! Sends HTML or plain-text mail over a STARTTLS relay. SMTP has no balance
//! or delivery-receipt API, so those operations are unsupported.

use crate::error::ChannelError;
use crate::traits::{Balance, DeliveryReport, Provider, SendRequest, SendResponse};
use crate::Result;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use reportcast_core::config::EmailConfig;
use reportcast_core::{Channel, MessageContent};
use std::time::Duration;
use tracing::{debug, info, warn};

const PROVIDER_NAME: &str = "smtp";

/// SMTP email provider.
pub struct SmtpEmailProvider {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    host: String,
}

impl std::fmt::Debug for SmtpEmailProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpEmailProvider")
            .field("host", &self.host)
            .field("from", &self.from.to_string())
            .finish()
    }
}

impl SmtpEmailProvider {
    /// Create a provider from configuration.
    pub fn new(config: &EmailConfig) -> Result<Self> {
        let address: Address = config.from_address.trim().parse().map_err(|e| {
            ChannelError::config(format!(
                "Invalid from address '{}': {}",
                config.from_address, e
            ))
        })?;
        let from = Mailbox::new(config.from_name.clone(), address);

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| ChannelError::config(format!("SMTP relay: {}", e)))?
            .port(config.smtp_port)
            .timeout(Some(Duration::from_secs(config.timeout_secs.max(1))));

        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.expose_secret().to_string(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            from,
            host: config.smtp_host.clone(),
        })
    }

    /// Build the outgoing message. An unusable recipient address is reported
    /// as the failure text.
    fn build_message(
        &self,
        request: &SendRequest,
        message_id: &str,
    ) -> std::result::Result<Message, String> {
        let to_address: Address = request
            .recipient
            .contact
            .trim()
            .parse()
            .map_err(|_| {
                format!(
                    "수신자 이메일 주소가 올바르지 않습니다: '{}'",
                    request.recipient.contact
                )
            })?;
        let to = Mailbox::new(
            Some(request.recipient.name.clone()).filter(|n| !n.trim().is_empty()),
            to_address,
        );

        let (content_type, subject, body) = match &request.content {
            MessageContent::Html { subject, body } => {
                (ContentType::TEXT_HTML, subject.as_str(), body.clone())
            }
            MessageContent::Text { subject, body } => (
                ContentType::TEXT_PLAIN,
                subject.as_deref().unwrap_or_default(),
                body.clone(),
            ),
            MessageContent::Template { .. } => {
                return Err("email cannot carry template content".to_string())
            }
        };

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .message_id(Some(message_id.to_string()))
            .header(content_type)
            .body(body)
            .map_err(|e| format!("failed to build email: {}", e))
    }

    fn next_message_id(&self) -> String {
        format!("<{}@{}>", uuid::Uuid::new_v4(), self.from.email.domain())
    }
}

#[async_trait]
impl Provider for SmtpEmailProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn send(&self, request: SendRequest) -> Result<SendResponse> {
        if request.channel != Channel::Email {
            return Err(ChannelError::InvalidRequest(format!(
                "SMTP cannot send on channel {}",
                request.channel
            )));
        }
        if matches!(request.content, MessageContent::Template { .. }) {
            return Err(ChannelError::InvalidRequest(
                "email requires text or HTML content".to_string(),
            ));
        }

        let message_id = self.next_message_id();
        let message = match self.build_message(&request, &message_id) {
            Ok(message) => message,
            Err(error) => return Ok(SendResponse::failed(error)),
        };

        debug!("Sending email {} via {}", message_id, self.host);
        match self.transport.send(message).await {
            Ok(_) => {
                info!("Email {} accepted by {}", message_id, self.host);
                Ok(SendResponse::sent(message_id, None))
            }
            Err(e) => {
                warn!("SMTP send failed: {}", e);
                let reason = if e.is_permanent() {
                    format!("SMTP rejected message: {}", e)
                } else {
                    format!("network error: SMTP send failed: {}", e)
                };
                Ok(SendResponse::failed(reason))
            }
        }
    }

    async fn check_balance(&self) -> Result<Balance> {
        Err(ChannelError::unsupported(PROVIDER_NAME, "balance"))
    }

    async fn get_delivery_status(&self, _message_id: &str) -> Result<DeliveryReport> {
        Err(ChannelError::unsupported(PROVIDER_NAME, "delivery status"))
    }
}
