//! Configuration schema definitions.

use crate::secret::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Main ReportCast configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Report link and display settings.
    #[serde(default)]
    pub reports: ReportsConfig,

    /// Messaging transports.
    #[serde(default)]
    pub messaging: MessagingConfig,

    /// Delivery ledger storage.
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Report and activity storage.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Failure classification rules.
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

/// Report link and display settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportsConfig {
    /// Base URL the report viewer is served from.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Academy display name used when a report carries none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub academy_name: Option<String>,

    /// Shorter host serving the same report paths, used for SMS links so
    /// the notice can fit a short message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_base_url: Option<String>,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            academy_name: None,
            short_base_url: None,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

/// Messaging transports. A channel without a section is unconfigured.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessagingConfig {
    /// SMS/LMS gateway (serves both the SMS and LMS channels).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sms: Option<SmsConfig>,

    /// Kakao alimtalk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kakao: Option<KakaoConfig>,

    /// SMTP email.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<EmailConfig>,
}

/// SMS/LMS gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsConfig {
    /// Enable/disable.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Gateway base URL.
    #[serde(default = "default_sms_api_url")]
    pub api_url: String,

    /// Gateway account id.
    pub user_id: String,

    /// Gateway API key.
    #[serde(default)]
    pub api_key: SecretString,

    /// Registered origin number.
    pub sender: String,

    /// Send with `testmode_yn=Y`; the gateway accepts but does not deliver.
    #[serde(default = "default_true")]
    pub test_mode: bool,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Largest body, in bytes, still sent as a short message.
    #[serde(default = "default_short_max_bytes")]
    pub short_max_bytes: usize,

    /// Recorded cost per short message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sms_cost: Option<f64>,

    /// Recorded cost per long message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lms_cost: Option<f64>,
}

fn default_sms_api_url() -> String {
    "https://apis.aligo.in".to_string()
}

fn default_short_max_bytes() -> usize {
    90
}

/// Kakao alimtalk configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KakaoConfig {
    /// Enable/disable.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Alimtalk API base URL.
    #[serde(default = "default_kakao_api_url")]
    pub api_url: String,

    /// Account id.
    pub user_id: String,

    /// API key.
    #[serde(default)]
    pub api_key: SecretString,

    /// Kakao channel sender key.
    pub sender_key: String,

    /// Registered origin number.
    pub sender: String,

    /// Approved template texts keyed by template id, with `#{name}` placeholders.
    #[serde(default)]
    pub templates: HashMap<String, KakaoTemplate>,

    /// Send in test mode.
    #[serde(default = "default_true")]
    pub test_mode: bool,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Recorded cost per message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_cost: Option<f64>,
}

/// An approved alimtalk template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KakaoTemplate {
    /// Template code assigned by the transport.
    pub code: String,

    /// Message subject.
    #[serde(default)]
    pub subject: String,

    /// Template text.
    pub text: String,
}

fn default_kakao_api_url() -> String {
    "https://kakaoapi.aligo.in".to_string()
}

/// SMTP email configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// Enable/disable.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// SMTP relay host.
    pub smtp_host: String,

    /// SMTP port (STARTTLS).
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    /// SMTP username.
    #[serde(default)]
    pub username: String,

    /// SMTP password.
    #[serde(default)]
    pub password: SecretString,

    /// From address.
    pub from_address: String,

    /// From display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_name: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_smtp_port() -> u16 {
    587
}

fn default_timeout_secs() -> u64 {
    10
}

/// Ledger backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerBackend {
    Memory,
    #[default]
    Sqlite,
}

/// Delivery ledger configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Storage backend.
    #[serde(default)]
    pub backend: LedgerBackend,

    /// SQLite database path (defaults to ~/.reportcast/ledger.db).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Report and activity storage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory generated reports are written to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reports_dir: Option<PathBuf>,

    /// Activity snapshot file reports are aggregated from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_file: Option<PathBuf>,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

/// Log level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Failure classification configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Rules evaluated before the built-in table, in order.
    #[serde(default)]
    pub extra_rules: Vec<ClassifierRuleConfig>,
}

/// A configured classification rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierRuleConfig {
    /// Stable rule code.
    pub code: String,

    /// `structural`, `recoverable` or `temporary`.
    pub kind: String,

    /// Case-insensitive substrings; any one matches.
    pub patterns: Vec<String>,

    pub title: String,
    pub description: String,
    pub remedy: String,

    #[serde(default)]
    pub retryable: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub help_link: Option<String>,
}

fn default_true() -> bool {
    true
}
