//! SMS/LMS gateway provider (form-encoded HTTP API).
//!
//! One provider instance serves both the SMS and LMS channels. On the SMS
//! channel the message type is picked from the body's byte length; on the
//! LMS channel it is always the long type.

use crate::error::ChannelError;
use crate::traits::{
    code_str, describe_http_status, normalize_phone, parse_kst, Balance, DeliveryReport,
    Provider, SendRequest, SendResponse,
};
use crate::Result;
use async_trait::async_trait;
use reportcast_core::config::SmsConfig;
use reportcast_core::{Channel, SecretString};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

const PROVIDER_NAME: &str = "aligo";

/// Gateway message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Sms,
    Lms,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Sms => "SMS",
            MessageType::Lms => "LMS",
        }
    }
}

/// Byte length of a message as the gateway counts it: one byte per ASCII
/// character, two for everything else.
pub fn message_byte_len(text: &str) -> usize {
    text.chars().map(|c| if c.is_ascii() { 1 } else { 2 }).sum()
}

/// SMS/LMS gateway provider.
pub struct SmsGatewayProvider {
    /// HTTP client.
    client: Client,

    /// Gateway base URL.
    api_url: String,

    /// Account id.
    user_id: String,

    /// API key.
    api_key: SecretString,

    /// Origin number, digits only.
    sender: String,

    /// Send with `testmode_yn=Y`.
    test_mode: bool,

    /// Largest body still sent as SMS.
    short_max_bytes: usize,

    /// Per-message costs.
    sms_cost: Option<f64>,
    lms_cost: Option<f64>,

    /// Request timeout, for error messages.
    timeout: Duration,
}

impl std::fmt::Debug for SmsGatewayProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmsGatewayProvider")
            .field("api_url", &self.api_url)
            .field("user_id", &self.user_id)
            .field("sender", &self.sender)
            .field("test_mode", &self.test_mode)
            .finish()
    }
}

impl SmsGatewayProvider {
    /// Create a provider from configuration. Missing credentials are an error.
    pub fn new(config: &SmsConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(ChannelError::config("SMS gateway API key is required"));
        }
        if config.user_id.trim().is_empty() {
            return Err(ChannelError::config("SMS gateway user id is required"));
        }
        let sender = normalize_phone(&config.sender);
        if sender.is_empty() {
            return Err(ChannelError::config(format!(
                "SMS sender number '{}' has no digits",
                config.sender
            )));
        }

        let timeout = Duration::from_secs(config.timeout_secs.max(1));
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChannelError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            user_id: config.user_id.clone(),
            api_key: config.api_key.clone(),
            sender,
            test_mode: config.test_mode,
            short_max_bytes: config.short_max_bytes,
            sms_cost: config.sms_cost,
            lms_cost: config.lms_cost,
            timeout,
        })
    }

    /// Pick the gateway message type for a body sent over `channel`.
    pub fn message_type(&self, channel: Channel, body: &str) -> MessageType {
        if channel == Channel::Lms || message_byte_len(body) > self.short_max_bytes {
            MessageType::Lms
        } else {
            MessageType::Sms
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}/", self.api_url, path)
    }

    fn credentials(&self) -> Vec<(&'static str, String)> {
        vec![
            ("key", self.api_key.expose_secret().to_string()),
            ("user_id", self.user_id.clone()),
        ]
    }

    /// Post a form and decode the JSON answer. Transport faults come back as
    /// the operator-facing failure text.
    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        form: &[(&'static str, String)],
    ) -> std::result::Result<T, String> {
        let response = self
            .client
            .post(self.endpoint(path))
            .form(form)
            .send()
            .await
            .map_err(|e| self.describe_transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!("Gateway answered HTTP {}: {}", status, body);
            return Err(describe_http_status(status));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| format!("gateway returned an unreadable response: {}", e))
    }

    fn describe_transport_error(&self, e: &reqwest::Error) -> String {
        if e.is_timeout() {
            format!(
                "gateway request timed out after {}s",
                self.timeout.as_secs()
            )
        } else if e.is_connect() {
            format!("network error: could not connect to gateway: {}", e)
        } else {
            format!("network error: {}", e)
        }
    }
}

#[derive(Debug, Deserialize)]
struct GatewaySendResponse {
    result_code: serde_json::Value,
    #[serde(default)]
    message: String,
    #[serde(default)]
    msg_id: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct GatewayRemainResponse {
    result_code: serde_json::Value,
    #[serde(default)]
    message: String,
    #[serde(rename = "SMS_CNT", default)]
    sms_count: f64,
}

#[derive(Debug, Deserialize)]
struct GatewayListResponse {
    result_code: serde_json::Value,
    #[serde(default)]
    message: String,
    #[serde(default)]
    list: Vec<GatewayListRow>,
}

#[derive(Debug, Deserialize)]
struct GatewayListRow {
    sms_state: serde_json::Value,
    #[serde(default)]
    reg_date: Option<String>,
}

#[async_trait]
impl Provider for SmsGatewayProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn send(&self, request: SendRequest) -> Result<SendResponse> {
        if !matches!(request.channel, Channel::Sms | Channel::Lms) {
            return Err(ChannelError::InvalidRequest(format!(
                "SMS gateway cannot send on channel {}",
                request.channel
            )));
        }
        let body = request.content.body().ok_or_else(|| {
            ChannelError::InvalidRequest("SMS gateway requires a text body".to_string())
        })?;

        let receiver = normalize_phone(&request.recipient.contact);
        if receiver.is_empty() {
            return Ok(SendResponse::failed(format!(
                "수신자 연락처가 올바르지 않습니다: '{}'",
                request.recipient.contact
            )));
        }

        let msg_type = self.message_type(request.channel, body);
        debug!(
            "Sending {} ({} bytes) to {}",
            msg_type.as_str(),
            message_byte_len(body),
            receiver
        );

        let mut form = self.credentials();
        form.push(("sender", self.sender.clone()));
        form.push(("receiver", receiver));
        form.push(("msg", body.to_string()));
        form.push(("msg_type", msg_type.as_str().to_string()));
        if msg_type == MessageType::Lms {
            if let Some(title) = request.content.subject() {
                form.push(("title", title.to_string()));
            }
        }
        form.push(("testmode_yn", if self.test_mode { "Y" } else { "N" }.to_string()));

        let answer: GatewaySendResponse = match self.post("send", &form).await {
            Ok(answer) => answer,
            Err(error) => {
                warn!("SMS gateway send failed: {}", error);
                return Ok(SendResponse::failed(error));
            }
        };

        if code_str(&answer.result_code) != "1" {
            warn!(
                "SMS gateway rejected message (code {}): {}",
                code_str(&answer.result_code),
                answer.message
            );
            let reason = if answer.message.trim().is_empty() {
                format!("gateway rejected message (code {})", code_str(&answer.result_code))
            } else {
                answer.message
            };
            return Ok(SendResponse::failed(reason));
        }

        let message_id = answer.msg_id.as_ref().map(code_str).unwrap_or_default();
        if message_id.is_empty() {
            return Ok(SendResponse::failed("gateway accepted the message but returned no msg_id"));
        }

        let cost = match msg_type {
            MessageType::Sms => self.sms_cost,
            MessageType::Lms => self.lms_cost,
        };
        info!("SMS gateway accepted {} as {}", message_id, msg_type.as_str());
        Ok(SendResponse::sent(message_id, cost))
    }

    async fn check_balance(&self) -> Result<Balance> {
        let answer: GatewayRemainResponse = self
            .post("remain", &self.credentials())
            .await
            .map_err(|e| ChannelError::api(PROVIDER_NAME, e))?;

        if code_str(&answer.result_code) != "1" {
            return Err(ChannelError::api(PROVIDER_NAME, answer.message));
        }

        Ok(Balance {
            balance: answer.sms_count,
            currency: "SMS".to_string(),
        })
    }

    async fn get_delivery_status(&self, message_id: &str) -> Result<DeliveryReport> {
        let mut form = self.credentials();
        form.push(("mid", message_id.to_string()));

        let answer: GatewayListResponse = self
            .post("sms_list", &form)
            .await
            .map_err(|e| ChannelError::api(PROVIDER_NAME, e))?;

        if code_str(&answer.result_code) != "1" {
            return Err(ChannelError::api(PROVIDER_NAME, answer.message));
        }

        let Some(row) = answer.list.first() else {
            return Ok(DeliveryReport::pending());
        };

        Ok(match code_str(&row.sms_state).as_str() {
            "1" => DeliveryReport::delivered(row.reg_date.as_deref().and_then(parse_kst)),
            "2" => DeliveryReport::failed("gateway reported delivery failure"),
            _ => DeliveryReport::pending(),
        })
    }
}
