//! Provider registry mapping each channel to its active provider.

use crate::error::ChannelError;
use crate::kakao::AlimtalkProvider;
use crate::sms::SmsGatewayProvider;
use crate::traits::Provider;
use crate::Result;
use reportcast_core::config::MessagingConfig;
use reportcast_core::Channel;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Read-only lookup from channel to provider.
///
/// Built once at startup; a channel has at most one active provider. One
/// provider may serve several channels (the SMS gateway serves SMS and LMS).
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<Channel, Arc<dyn Provider>>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for channel in self.channels() {
            if let Some(provider) = self.providers.get(&channel) {
                map.entry(&channel.as_str(), &provider.name());
            }
        }
        map.finish()
    }
}

impl ProviderRegistry {
    /// Start building a registry.
    pub fn builder() -> ProviderRegistryBuilder {
        ProviderRegistryBuilder::default()
    }

    /// Build the registry from messaging configuration. Disabled sections are
    /// skipped.
    pub fn from_config(config: &MessagingConfig) -> Result<Self> {
        let mut builder = Self::builder();

        if let Some(sms) = config.sms.as_ref().filter(|c| c.enabled) {
            let provider: Arc<dyn Provider> = Arc::new(SmsGatewayProvider::new(sms)?);
            builder = builder
                .register(Channel::Sms, provider.clone())?
                .register(Channel::Lms, provider)?;
        }

        if let Some(kakao) = config.kakao.as_ref().filter(|c| c.enabled) {
            builder = builder.register(Channel::Kakao, Arc::new(AlimtalkProvider::new(kakao)?))?;
        }

        if let Some(email) = config.email.as_ref().filter(|c| c.enabled) {
            #[cfg(feature = "email")]
            {
                builder = builder.register(
                    Channel::Email,
                    Arc::new(crate::email::SmtpEmailProvider::new(email)?),
                )?;
            }
            #[cfg(not(feature = "email"))]
            {
                let _ = email;
                warn!("Email is configured but this build has no email support");
            }
        }

        let registry = builder.build();
        if registry.providers.is_empty() {
            warn!("No messaging providers configured");
        }
        Ok(registry)
    }

    /// The active provider for a channel.
    pub fn get(&self, channel: Channel) -> Result<Arc<dyn Provider>> {
        self.providers
            .get(&channel)
            .cloned()
            .ok_or(ChannelError::Unconfigured(channel))
    }

    /// Whether a channel has a provider.
    pub fn is_configured(&self, channel: Channel) -> bool {
        self.providers.contains_key(&channel)
    }

    /// Configured channels in declaration order.
    pub fn channels(&self) -> Vec<Channel> {
        Channel::ALL
            .iter()
            .copied()
            .filter(|c| self.providers.contains_key(c))
            .collect()
    }
}

/// Builder for [`ProviderRegistry`].
#[derive(Default)]
pub struct ProviderRegistryBuilder {
    providers: HashMap<Channel, Arc<dyn Provider>>,
}

impl ProviderRegistryBuilder {
    /// Register a provider for a channel. Registering a channel twice fails.
    pub fn register(mut self, channel: Channel, provider: Arc<dyn Provider>) -> Result<Self> {
        if self.providers.contains_key(&channel) {
            return Err(ChannelError::AlreadyRegistered(channel));
        }
        debug!("Registering {} for channel {}", provider.name(), channel);
        self.providers.insert(channel, provider);
        Ok(self)
    }

    pub fn build(self) -> ProviderRegistry {
        info!("Provider registry ready with {} channel(s)", self.providers.len());
        ProviderRegistry {
            providers: self.providers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{Balance, DeliveryReport, SendRequest, SendResponse};
    use async_trait::async_trait;
    use reportcast_core::config::{KakaoConfig, SmsConfig};

    struct NamedProvider(&'static str);

    #[async_trait]
    impl Provider for NamedProvider {
        fn name(&self) -> &str {
            self.0
        }

        async fn send(&self, _request: SendRequest) -> Result<SendResponse> {
            Ok(SendResponse::sent("id", None))
        }

        async fn check_balance(&self) -> Result<Balance> {
            Err(ChannelError::unsupported(self.0, "balance"))
        }

        async fn get_delivery_status(&self, _message_id: &str) -> Result<DeliveryReport> {
            Ok(DeliveryReport::pending())
        }
    }

    fn sms_config() -> SmsConfig {
        SmsConfig {
            enabled: true,
            api_url: "http://localhost".to_string(),
            user_id: "acct".to_string(),
            api_key: "key".into(),
            sender: "0212345678".to_string(),
            test_mode: true,
            timeout_secs: 5,
            short_max_bytes: 90,
            sms_cost: None,
            lms_cost: None,
        }
    }

    #[test]
    fn test_get_unconfigured() {
        let registry = ProviderRegistry::builder()
            .register(Channel::Sms, Arc::new(NamedProvider("a")))
            .unwrap()
            .build();

        assert_eq!(registry.get(Channel::Sms).unwrap().name(), "a");
        assert!(matches!(
            registry.get(Channel::Email),
            Err(ChannelError::Unconfigured(Channel::Email))
        ));
        assert!(!registry.is_configured(Channel::Kakao));
    }

    #[test]
    fn test_duplicate_registration() {
        let result = ProviderRegistry::builder()
            .register(Channel::Kakao, Arc::new(NamedProvider("a")))
            .unwrap()
            .register(Channel::Kakao, Arc::new(NamedProvider("b")));

        assert!(matches!(
            result,
            Err(ChannelError::AlreadyRegistered(Channel::Kakao))
        ));
    }

    #[test]
    fn test_from_config_sms_serves_lms() {
        let config = MessagingConfig {
            sms: Some(sms_config()),
            ..Default::default()
        };
        let registry = ProviderRegistry::from_config(&config).unwrap();

        assert_eq!(registry.channels(), vec![Channel::Sms, Channel::Lms]);
        assert_eq!(registry.get(Channel::Lms).unwrap().name(), "aligo");
    }

    #[test]
    fn test_from_config_skips_disabled() {
        let mut sms = sms_config();
        sms.enabled = false;
        let kakao = KakaoConfig {
            enabled: false,
            api_url: "http://localhost".to_string(),
            user_id: "acct".to_string(),
            api_key: "key".into(),
            sender_key: "sk".to_string(),
            sender: "0212345678".to_string(),
            templates: Default::default(),
            test_mode: true,
            timeout_secs: 5,
            unit_cost: None,
        };
        let config = MessagingConfig {
            sms: Some(sms),
            kakao: Some(kakao),
            email: None,
        };
        let registry = ProviderRegistry::from_config(&config).unwrap();
        assert!(registry.channels().is_empty());
    }

    #[test]
    fn test_from_config_bad_credentials() {
        let mut sms = sms_config();
        sms.api_key = Default::default();
        let config = MessagingConfig {
            sms: Some(sms),
            ..Default::default()
        };
        assert!(ProviderRegistry::from_config(&config).is_err());
    }
}
