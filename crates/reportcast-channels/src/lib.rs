//! Messaging channel providers for ReportCast.
//!
//! This crate provides the provider contract every transport implements,
//! the registry that maps a [`Channel`](reportcast_core::Channel) to its
//! provider, and the concrete gateway implementations.

pub mod error;
pub mod traits;
pub mod registry;
pub mod sms;
pub mod kakao;

#[cfg(feature = "email")]
pub mod email;

pub use error::ChannelError;
pub use traits::{Balance, DeliveryReport, DeliveryState, Provider, SendRequest, SendResponse};
pub use registry::{ProviderRegistry, ProviderRegistryBuilder};
pub use sms::SmsGatewayProvider;
pub use kakao::AlimtalkProvider;

#[cfg(feature = "email")]
pub use email::SmtpEmailProvider;

/// Result type for channel operations.
pub type Result<T> = std::result::Result<T, ChannelError>;
