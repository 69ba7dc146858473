//! Configuration loading and persistence.

use super::{Config, LedgerBackend};
use crate::env;
use crate::error::ConfigError;
use crate::paths;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

const KNOWN_RULE_KINDS: &[&str] = &["structural", "recoverable", "temporary"];

impl Config {
    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = paths::config_file()?;
        Self::load(&path)
    }

    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config = Self::parse(&content)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse configuration from a string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        json5::from_str(content).map_err(|e| ConfigError::Json5(e.to_string()))
    }

    /// Load from `path` (or the default path), falling back to defaults if no file exists.
    ///
    /// Environment credential overrides are applied either way.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => paths::config_file()?,
        };
        let mut config = match Self::load(&path) {
            Ok(config) => config,
            Err(ConfigError::NotFound(_)) => Self::default(),
            Err(e) => return Err(e),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Save configuration to the default path.
    pub fn save_default(&self) -> Result<(), ConfigError> {
        let path = paths::config_file()?;
        self.save(&path)
    }

    /// Save configuration to a file path.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_json5()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write atomically
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &content)?;
        fs::rename(&temp_path, path)?;

        Ok(())
    }

    /// Serialize to JSON5 string.
    pub fn to_json5(&self) -> Result<String, ConfigError> {
        // json5 has no serializer; JSON is valid JSON5
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Replace credentials with values from the environment, when set.
    pub fn apply_env_overrides(&mut self) {
        if let Some(sms) = self.messaging.sms.as_mut() {
            if let Some(key) = env::get_var(env::vars::REPORTCAST_SMS_API_KEY) {
                sms.api_key = key.into();
            }
            if env::get_bool(env::vars::REPORTCAST_TEST_MODE) {
                sms.test_mode = true;
            }
        }
        if let Some(kakao) = self.messaging.kakao.as_mut() {
            if let Some(key) = env::get_var(env::vars::REPORTCAST_KAKAO_API_KEY) {
                kakao.api_key = key.into();
            }
            if env::get_bool(env::vars::REPORTCAST_TEST_MODE) {
                kakao.test_mode = true;
            }
        }
        if let Some(email) = self.messaging.email.as_mut() {
            if let Some(password) = env::get_var(env::vars::REPORTCAST_SMTP_PASSWORD) {
                email.password = password.into();
            }
        }
    }

    /// Resolved SQLite ledger path.
    pub fn ledger_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.ledger.path {
            Some(p) => Ok(p.clone()),
            None => paths::ledger_db(),
        }
    }

    /// Resolved report directory.
    pub fn reports_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.storage.reports_dir {
            Some(p) => Ok(p.clone()),
            None => paths::reports_dir(),
        }
    }

    /// Resolved activity snapshot path.
    pub fn activity_file(&self) -> Result<PathBuf, ConfigError> {
        match &self.storage.activity_file {
            Some(p) => Ok(p.clone()),
            None => paths::activity_file(),
        }
    }

    /// Parsed report base URL.
    pub fn report_base_url(&self) -> Result<Url, ConfigError> {
        parse_http_url(&self.reports.base_url)
            .map_err(|e| ConfigError::Validation(format!("reports.base_url: {}", e)))
    }

    /// Parsed short link base, if configured.
    pub fn report_short_base_url(&self) -> Result<Option<Url>, ConfigError> {
        self.reports
            .short_base_url
            .as_deref()
            .map(|raw| {
                parse_http_url(raw)
                    .map_err(|e| ConfigError::Validation(format!("reports.short_base_url: {}", e)))
            })
            .transpose()
    }

    /// Validate the configuration, collecting all errors before returning.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        // 1. Report base URL
        if let Err(e) = parse_http_url(&self.reports.base_url) {
            errors.push(format!("reports.base_url: {}", e));
        }
        if let Some(Err(e)) = self.reports.short_base_url.as_deref().map(parse_http_url) {
            errors.push(format!("reports.short_base_url: {}", e));
        }

        // 2. SMS/LMS gateway
        if let Some(sms) = self.messaging.sms.as_ref().filter(|s| s.enabled) {
            if let Err(e) = parse_http_url(&sms.api_url) {
                errors.push(format!("messaging.sms.api_url: {}", e));
            }
            if sms.user_id.trim().is_empty() {
                errors.push("messaging.sms.user_id must not be empty".to_string());
            }
            if sms.api_key.is_empty() {
                errors.push("messaging.sms.api_key is not set".to_string());
            }
            if !sms.sender.chars().any(|c| c.is_ascii_digit()) {
                errors.push(format!(
                    "messaging.sms.sender '{}' contains no digits",
                    sms.sender
                ));
            }
            if sms.short_max_bytes == 0 {
                errors.push("messaging.sms.short_max_bytes must be greater than 0".to_string());
            }
            if sms.timeout_secs == 0 {
                errors.push("messaging.sms.timeout_secs must be greater than 0".to_string());
            }
        }

        // 3. Kakao alimtalk
        if let Some(kakao) = self.messaging.kakao.as_ref().filter(|k| k.enabled) {
            if let Err(e) = parse_http_url(&kakao.api_url) {
                errors.push(format!("messaging.kakao.api_url: {}", e));
            }
            if kakao.user_id.trim().is_empty() {
                errors.push("messaging.kakao.user_id must not be empty".to_string());
            }
            if kakao.api_key.is_empty() {
                errors.push("messaging.kakao.api_key is not set".to_string());
            }
            if kakao.sender_key.trim().is_empty() {
                errors.push("messaging.kakao.sender_key must not be empty".to_string());
            }
            if kakao.templates.is_empty() {
                errors.push("messaging.kakao.templates is empty".to_string());
            }
            for (id, template) in &kakao.templates {
                if template.code.trim().is_empty() || template.text.trim().is_empty() {
                    errors.push(format!(
                        "messaging.kakao.templates.{}: code and text are required",
                        id
                    ));
                }
            }
            if kakao.timeout_secs == 0 {
                errors.push("messaging.kakao.timeout_secs must be greater than 0".to_string());
            }
        }

        // 4. Email
        if let Some(email) = self.messaging.email.as_ref().filter(|e| e.enabled) {
            if email.smtp_host.trim().is_empty() {
                errors.push("messaging.email.smtp_host must not be empty".to_string());
            }
            if !email.from_address.contains('@') {
                errors.push(format!(
                    "messaging.email.from_address '{}' is not an email address",
                    email.from_address
                ));
            }
            if email.timeout_secs == 0 {
                errors.push("messaging.email.timeout_secs must be greater than 0".to_string());
            }
        }

        // 5. Ledger
        if self.ledger.backend == LedgerBackend::Sqlite {
            if let Some(path) = &self.ledger.path {
                if path.as_os_str().is_empty() {
                    errors.push("ledger.path must not be empty".to_string());
                }
            }
        }

        // 6. Classifier rules
        for (i, rule) in self.classifier.extra_rules.iter().enumerate() {
            if !KNOWN_RULE_KINDS.contains(&rule.kind.as_str()) {
                errors.push(format!(
                    "classifier.extra_rules[{}]: unknown kind '{}'",
                    i, rule.kind
                ));
            }
            if rule.patterns.iter().all(|p| p.trim().is_empty()) {
                errors.push(format!("classifier.extra_rules[{}]: no patterns", i));
            }
            if rule.title.trim().is_empty() {
                errors.push(format!("classifier.extra_rules[{}]: title is empty", i));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors.join("; ")))
        }
    }
}

fn parse_http_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| format!("invalid URL '{}': {}", raw, e))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("unsupported scheme '{}' in '{}'", other, raw)),
    }
}
