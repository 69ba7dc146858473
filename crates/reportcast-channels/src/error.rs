//! Channel error types.

use reportcast_core::Channel;
use thiserror::Error;

/// Errors raised by providers and the registry.
///
/// Ordinary send failures are not errors: they come back as a
/// [`SendResponse`](crate::SendResponse) with `success = false`.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No provider registered for the channel.
    #[error("No provider configured for channel {0}")]
    Unconfigured(Channel),

    /// A provider is already registered for the channel.
    #[error("Channel already registered: {0}")]
    AlreadyRegistered(Channel),

    /// Provider configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The request does not fit the provider (wrong content kind).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The provider does not support the operation.
    #[error("{provider} does not support {operation}")]
    Unsupported {
        provider: String,
        operation: &'static str,
    },

    /// The transport answered with an error.
    #[error("Provider error ({provider}): {message}")]
    Api { provider: String, message: String },
}

impl ChannelError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a transport API error.
    pub fn api(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create an unsupported-operation error.
    pub fn unsupported(provider: impl Into<String>, operation: &'static str) -> Self {
        Self::Unsupported {
            provider: provider.into(),
            operation,
        }
    }
}
