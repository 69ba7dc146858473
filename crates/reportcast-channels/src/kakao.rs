//! Kakao alimtalk provider.
//!
//! Alimtalk messages must match a template approved by Kakao in advance.
//! The configured template text is rendered with the content's variables
//! and sent together with the template code.

use crate::error::ChannelError;
use crate::traits::{
    code_str, describe_http_status, normalize_phone, parse_kst, Balance, DeliveryReport,
    Provider, SendRequest, SendResponse,
};
use crate::Result;
use async_trait::async_trait;
use reportcast_core::config::{KakaoConfig, KakaoTemplate};
use reportcast_core::{Channel, Recipient, SecretString};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

const PROVIDER_NAME: &str = "aligo-kakao";

/// Kakao alimtalk provider.
pub struct AlimtalkProvider {
    client: Client,
    api_url: String,
    user_id: String,
    api_key: SecretString,
    sender_key: String,
    sender: String,
    templates: HashMap<String, KakaoTemplate>,
    test_mode: bool,
    unit_cost: Option<f64>,
    timeout: Duration,
}

impl std::fmt::Debug for AlimtalkProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlimtalkProvider")
            .field("api_url", &self.api_url)
            .field("user_id", &self.user_id)
            .field("templates", &self.templates.keys().collect::<Vec<_>>())
            .field("test_mode", &self.test_mode)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct AlimtalkResponse {
    code: serde_json::Value,
    #[serde(default)]
    message: String,
    #[serde(default)]
    info: Option<AlimtalkInfo>,
    #[serde(default)]
    list: Vec<AlimtalkHistoryRow>,
}

#[derive(Debug, Deserialize)]
struct AlimtalkInfo {
    #[serde(default)]
    mid: Option<serde_json::Value>,
    #[serde(rename = "ALT", default)]
    alimtalk_count: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct AlimtalkHistoryRow {
    #[serde(default)]
    rslt: Option<serde_json::Value>,
    #[serde(default)]
    rslt_message: Option<String>,
    #[serde(default)]
    rsltdate: Option<String>,
}

impl AlimtalkProvider {
    /// Create a provider from configuration.
    pub fn new(config: &KakaoConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(ChannelError::config("Kakao API key is required"));
        }
        if config.sender_key.trim().is_empty() {
            return Err(ChannelError::config("Kakao sender key is required"));
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
            sender_key: config.sender_key.clone(),
            sender: normalize_phone(&config.sender),
            templates: config.templates.clone(),
            test_mode: config.test_mode,
            unit_cost: config.unit_cost,
            timeout,
        })
    }

    fn credentials(&self) -> Vec<(&'static str, String)> {
        vec![
            ("apikey", self.api_key.expose_secret().to_string()),
            ("userid", self.user_id.clone()),
            ("senderkey", self.sender_key.clone()),
        ]
    }

    async fn post(
        &self,
        path: &str,
        form: &[(&'static str, String)],
    ) -> std::result::Result<AlimtalkResponse, String> {
        let response = self
            .client
            .post(format!("{}/akv10/{}/", self.api_url, path))
            .form(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    format!("alimtalk request timed out after {}s", self.timeout.as_secs())
                } else {
                    format!("network error: {}", e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(describe_http_status(status));
        }

        response
            .json::<AlimtalkResponse>()
            .await
            .map_err(|e| format!("alimtalk returned an unreadable response: {}", e))
    }

    /// Send an already rendered template message.
    async fn send_rendered(
        &self,
        template: &KakaoTemplate,
        recipient: &Recipient,
        message: &str,
    ) -> SendResponse {
        let receiver = normalize_phone(&recipient.contact);
        if receiver.is_empty() {
            return SendResponse::failed(format!(
                "수신자 연락처가 올바르지 않습니다: '{}'",
                recipient.contact
            ));
        }

        debug!("Sending alimtalk {} to {}", template.code, receiver);

        let mut form = self.credentials();
        form.push(("tpl_code", template.code.clone()));
        form.push(("sender", self.sender.clone()));
        form.push(("receiver_1", receiver));
        form.push(("recvname_1", recipient.name.clone()));
        form.push(("subject_1", template.subject.clone()));
        form.push(("message_1", message.to_string()));
        form.push(("testMode", if self.test_mode { "Y" } else { "N" }.to_string()));

        let answer = match self.post("alimtalk/send", &form).await {
            Ok(answer) => answer,
            Err(error) => {
                warn!("Alimtalk send failed: {}", error);
                return SendResponse::failed(error);
            }
        };

        if code_str(&answer.code) != "0" {
            warn!("Alimtalk rejected message (code {}): {}", code_str(&answer.code), answer.message);
            return SendResponse::failed(answer.message);
        }

        let message_id = answer
            .info
            .and_then(|info| info.mid)
            .map(|mid| code_str(&mid))
            .unwrap_or_default();
        if message_id.is_empty() {
            return SendResponse::failed("alimtalk accepted the message but returned no mid");
        }

        info!("Alimtalk accepted {}", message_id);
        SendResponse::sent(message_id, self.unit_cost)
    }
}

#[async_trait]
impl Provider for AlimtalkProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn send(&self, request: SendRequest) -> Result<SendResponse> {
        if request.channel != Channel::Kakao {
            return Err(ChannelError::InvalidRequest(format!(
                "alimtalk cannot send on channel {}",
                request.channel
            )));
        }
        let variables = request.content.variables().ok_or_else(|| {
            ChannelError::InvalidRequest("alimtalk requires template content".to_string())
        })?;

        let template_id = variables.template_id();
        let Some(template) = self.templates.get(template_id) else {
            warn!("No approved alimtalk template configured for {}", template_id);
            return Ok(SendResponse::failed(format!(
                "알림톡 템플릿이 등록되지 않았습니다: {}",
                template_id
            )));
        };

        let message = variables.render(&template.text);
        let response = self.send_rendered(template, &request.recipient, &message).await;
        Ok(response.with_rendered_body(message))
    }

    async fn check_balance(&self) -> Result<Balance> {
        let answer = self
            .post("heartinfo", &self.credentials())
            .await
            .map_err(|e| ChannelError::api(PROVIDER_NAME, e))?;

        if code_str(&answer.code) != "0" {
            return Err(ChannelError::api(PROVIDER_NAME, answer.message));
        }

        let count = answer
            .info
            .and_then(|info| info.alimtalk_count)
            .ok_or_else(|| ChannelError::api(PROVIDER_NAME, "balance missing from response"))?;

        Ok(Balance {
            balance: count,
            currency: "ALT".to_string(),
        })
    }

    async fn get_delivery_status(&self, message_id: &str) -> Result<DeliveryReport> {
        let mut form = self.credentials();
        form.push(("mid", message_id.to_string()));

        let answer = self
            .post("history/detail", &form)
            .await
            .map_err(|e| ChannelError::api(PROVIDER_NAME, e))?;

        if code_str(&answer.code) != "0" {
            return Err(ChannelError::api(PROVIDER_NAME, answer.message));
        }

        let Some(row) = answer.list.first() else {
            return Ok(DeliveryReport::pending());
        };

        let result = row.rslt.as_ref().map(code_str).unwrap_or_default();
        Ok(match result.as_str() {
            "" => DeliveryReport::pending(),
            "0" => DeliveryReport::delivered(row.rsltdate.as_deref().and_then(parse_kst)),
            code => DeliveryReport::failed(
                row.rslt_message
                    .clone()
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| format!("alimtalk delivery failed (code {})", code)),
            ),
        })
    }
}
