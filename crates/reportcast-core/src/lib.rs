//! # reportcast-core
//!
//! Core types, configuration, and utilities for ReportCast.
//!
//! This crate provides shared functionality used across all ReportCast crates:
//!
//! - **Configuration**: Loading, validation, and management of config files
//! - **Types**: Reports, delivery ledger records, channels and message content
//! - **Utilities**: Path resolution, ID generation, and environment handling

pub mod config;
pub mod types;
pub mod error;
pub mod paths;
pub mod env;
pub mod id;
pub mod secret;

// Re-exports for convenience
pub use config::Config;
pub use error::{ConfigError, Error, Result};
pub use types::*;
pub use secret::SecretString;
