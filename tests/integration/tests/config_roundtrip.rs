//! Config save/load roundtrip integration tests.
//!
//! These tests verify that configuration can be serialized, written to disk,
//! and loaded back with identical field values.

use reportcast_core::config::{Config, LedgerBackend};
use reportcast_integration_tests::config;
use std::path::Path;
use tempfile::TempDir;

#[test]
fn test_config_save_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("reportcast.json5");

    let config = Config::default();
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded.reports.base_url, config.reports.base_url);
    assert_eq!(loaded.ledger.backend, LedgerBackend::Sqlite);
    assert!(loaded.messaging.sms.is_none());
}

#[test]
fn test_gateway_section_roundtrip_keeps_credentials() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("reportcast.json5");

    let original = config("https://gateway.example.com", dir.path());
    original.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    let sms = loaded.messaging.sms.as_ref().unwrap();
    assert_eq!(sms.api_url, "https://gateway.example.com");
    assert_eq!(sms.api_key.expose_secret(), "test-key");
    assert_eq!(sms.lms_cost, Some(50.0));
    assert_eq!(loaded.ledger.path, original.ledger.path);
    loaded.validate().unwrap();
}

#[test]
fn test_enabled_gateway_without_key_is_invalid() {
    let config = Config::parse(
        r#"{ messaging: { sms: { user_id: "academy", sender: "0212345678" } } }"#,
    )
    .unwrap();
    let err = config.validate().unwrap_err().to_string();
    assert!(err.contains("api_key"), "unexpected error: {}", err);
}

#[test]
fn test_config_load_nonexistent() {
    let result = Config::load(Path::new("/nonexistent/reportcast.json5"));
    assert!(result.is_err());
}

#[test]
fn test_config_parse_invalid() {
    let result = Config::parse("not valid json");
    assert!(result.is_err());
}
