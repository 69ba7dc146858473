//! The provider contract every transport implements.

use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reportcast_core::{Channel, Correlation, MessageContent, Recipient};
use serde::{Deserialize, Serialize};

/// A transport backend for one or more channels.
///
/// `send` reports ordinary delivery failures (rejected by the gateway,
/// timeout, network fault) as `Ok` with `success = false`. `Err` is reserved
/// for requests the provider could never serve, such as content of the wrong
/// kind.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Backend name recorded on the ledger.
    fn name(&self) -> &str;

    /// Send one message.
    async fn send(&self, request: SendRequest) -> Result<SendResponse>;

    /// Remaining sendable credit or quota.
    async fn check_balance(&self) -> Result<Balance>;

    /// Poll the transport for a delivery confirmation.
    async fn get_delivery_status(&self, message_id: &str) -> Result<DeliveryReport>;
}

/// A message to send.
#[derive(Debug, Clone)]
pub struct SendRequest {
    pub channel: Channel,
    pub recipient: Recipient,
    pub content: MessageContent,
    pub correlation: Correlation,
}

/// Outcome of a send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResponse {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Text the transport actually delivered when it differs from the
    /// formatted content, such as a server template filled with its variables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rendered_body: Option<String>,
}

impl SendResponse {
    /// The transport accepted the message.
    pub fn sent(message_id: impl Into<String>, cost: Option<f64>) -> Self {
        Self {
            success: true,
            message_id: Some(message_id.into()),
            cost,
            error: None,
            rendered_body: None,
        }
    }

    /// The send failed; `error` is shown to operators and classified.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message_id: None,
            cost: None,
            error: Some(error.into()),
            rendered_body: None,
        }
    }

    /// Record the text the transport rendered and sent.
    pub fn with_rendered_body(mut self, body: impl Into<String>) -> Self {
        self.rendered_body = Some(body.into());
        self
    }
}

/// Remaining credit reported by a transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub balance: f64,
    pub currency: String,
}

/// Delivery state reported by a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryState {
    Pending,
    Delivered,
    Failed,
}

/// Delivery confirmation for one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryReport {
    pub status: DeliveryState,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl DeliveryReport {
    pub fn pending() -> Self {
        Self {
            status: DeliveryState::Pending,
            delivered_at: None,
            failure_reason: None,
        }
    }

    pub fn delivered(at: Option<DateTime<Utc>>) -> Self {
        Self {
            status: DeliveryState::Delivered,
            delivered_at: at,
            failure_reason: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            status: DeliveryState::Failed,
            delivered_at: None,
            failure_reason: Some(reason.into()),
        }
    }
}

/// Extract a gateway code that may arrive as a JSON string or number.
pub(crate) fn code_str(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

/// Failure text for a non-2xx gateway answer.
///
/// Only 5xx is reported as a server error; rejected credentials and other
/// client errors get their own wording so they are not retried blindly.
pub(crate) fn describe_http_status(status: reqwest::StatusCode) -> String {
    let code = status.as_u16();
    if status.is_server_error() {
        format!("server error: HTTP {}", code)
    } else if matches!(
        status,
        reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN
    ) {
        format!("authentication failed: HTTP {}", code)
    } else if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        format!("rate limited: HTTP {}", code)
    } else {
        format!("request rejected: HTTP {}", code)
    }
}

/// Strip a phone number down to its digits.
pub fn normalize_phone(phone: &str) -> String {
    phone.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Parse a gateway timestamp (`YYYY-MM-DD HH:MM:SS`, Korea Standard Time).
pub(crate) fn parse_kst(raw: &str) -> Option<DateTime<Utc>> {
    let naive = chrono::NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%d %H:%M:%S").ok()?;
    let kst = chrono::FixedOffset::east_opt(9 * 3600)?;
    naive
        .and_local_timezone(kst)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_send_response_constructors() {
        let ok = SendResponse::sent("m-1", Some(8.4));
        assert!(ok.success);
        assert_eq!(ok.message_id.as_deref(), Some("m-1"));
        assert!(ok.error.is_none());

        let failed = SendResponse::failed("잔액이 부족합니다");
        assert!(!failed.success);
        assert!(failed.message_id.is_none());
        assert_eq!(failed.error.as_deref(), Some("잔액이 부족합니다"));
    }

    #[test]
    fn test_rendered_body_is_carried() {
        let ok = SendResponse::sent("m-1", None).with_rendered_body("김민준 학생 평균 90점");
        assert_eq!(ok.rendered_body.as_deref(), Some("김민준 학생 평균 90점"));
        assert!(SendResponse::failed("x").rendered_body.is_none());
    }

    #[test]
    fn test_describe_http_status() {
        use reqwest::StatusCode;
        assert_eq!(
            describe_http_status(StatusCode::BAD_GATEWAY),
            "server error: HTTP 502"
        );
        assert_eq!(
            describe_http_status(StatusCode::UNAUTHORIZED),
            "authentication failed: HTTP 401"
        );
        assert_eq!(
            describe_http_status(StatusCode::FORBIDDEN),
            "authentication failed: HTTP 403"
        );
        assert_eq!(
            describe_http_status(StatusCode::NOT_FOUND),
            "request rejected: HTTP 404"
        );
        assert_eq!(
            describe_http_status(StatusCode::TOO_MANY_REQUESTS),
            "rate limited: HTTP 429"
        );
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("010-1234-5678"), "01012345678");
        assert_eq!(normalize_phone("+82 (10) 1234 5678"), "821012345678");
        assert_eq!(normalize_phone("없음"), "");
    }

    #[test]
    fn test_code_str() {
        assert_eq!(code_str(&serde_json::json!(1)), "1");
        assert_eq!(code_str(&serde_json::json!(" 1 ")), "1");
        assert_eq!(code_str(&serde_json::json!(-101)), "-101");
        assert_eq!(code_str(&serde_json::Value::Null), "");
    }

    #[test]
    fn test_parse_kst() {
        let at = parse_kst("2026-10-18 09:30:00").unwrap();
        assert_eq!(at.hour(), 0);
        assert_eq!(at.minute(), 30);
        assert!(parse_kst("yesterday").is_none());
    }
}
