use crate::error::{NotifyError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub delivery: DeliveryConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeliveryConfig {
    /// Sender address used when a provider has no explicit from_address
    pub default_from: String,
    pub primary: Option<PrimaryProviderConfig>,
    pub secondary: Option<SecondaryRelayConfig>,
}

/// API-based transactional email provider
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PrimaryProviderConfig {
    pub api_url: String,
    pub api_token: String,
    pub from_address: Option<String>,
    pub timeout_secs: u64,
}

/// Direct SMTP relay used when the primary provider fails
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SecondaryRelayConfig {
    pub host: String,
    pub port: u16,
    /// Hostname announced in EHLO
    pub hello_name: Option<String>,
    pub from_address: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| NotifyError::Config(e.to_string()))?;

        let config: Config =
            toml::from_str(&content).map_err(|e| NotifyError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Startup validation: at least one delivery path must be configured.
    /// A missing primary degrades the orchestrator to secondary-only;
    /// neither configured is a hard error, surfaced here rather than per-send.
    pub fn validate(&self) -> Result<()> {
        if self.delivery.primary.is_none() && self.delivery.secondary.is_none() {
            return Err(NotifyError::Config(
                "no delivery provider configured: set [delivery.primary] or [delivery.secondary]"
                    .to_string(),
            ));
        }

        if self.delivery.default_from.is_empty() {
            return Err(NotifyError::Config(
                "delivery.default_from must be set".to_string(),
            ));
        }

        if let Some(primary) = &self.delivery.primary {
            if primary.api_token.is_empty() {
                return Err(NotifyError::Config(
                    "delivery.primary.api_token must not be empty".to_string(),
                ));
            }
        }

        Ok(())
    }

    pub fn default() -> Self {
        Self {
            delivery: DeliveryConfig {
                default_from: "noreply@localhost".to_string(),
                primary: None,
                secondary: Some(SecondaryRelayConfig {
                    host: "127.0.0.1".to_string(),
                    port: 25,
                    hello_name: None,
                    from_address: None,
                    timeout_secs: 15,
                }),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_no_provider_is_config_error() {
        let mut config = Config::default();
        config.delivery.primary = None;
        config.delivery.secondary = None;

        let err = config.validate().unwrap_err();
        assert!(matches!(err, NotifyError::Config(_)));
    }

    #[test]
    fn test_empty_api_token_rejected() {
        let mut config = Config::default();
        config.delivery.primary = Some(PrimaryProviderConfig {
            api_url: "https://api.postmarkapp.com/email".to_string(),
            api_token: "".to_string(),
            from_address: None,
            timeout_secs: 10,
        });

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_from_toml() {
        let toml_str = r#"
            [delivery]
            default_from = "bookings@example.com"

            [delivery.primary]
            api_url = "https://api.postmarkapp.com/email"
            api_token = "server-token"
            timeout_secs = 10

            [logging]
            level = "debug"
            format = "json"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.delivery.default_from, "bookings@example.com");
        assert!(config.delivery.secondary.is_none());
    }
}
