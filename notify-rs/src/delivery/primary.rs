//! Primary delivery path: API-based transactional email provider
//!
//! Speaks the Postmark-style single-send JSON API. Any non-2xx response,
//! timeout or transport error is reported to the orchestrator, which then
//! falls back to the secondary relay.

use crate::config::PrimaryProviderConfig;
use crate::delivery::types::{DeliverySender, OutgoingEmail};
use crate::error::{NotifyError, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Serialize)]
struct SendRequest<'a> {
    #[serde(rename = "From")]
    from: &'a str,
    #[serde(rename = "To")]
    to: &'a str,
    #[serde(rename = "Cc", skip_serializing_if = "String::is_empty")]
    cc: String,
    #[serde(rename = "Bcc", skip_serializing_if = "String::is_empty")]
    bcc: String,
    #[serde(rename = "Subject")]
    subject: &'a str,
    #[serde(rename = "HtmlBody")]
    html_body: &'a str,
    #[serde(rename = "TextBody", skip_serializing_if = "String::is_empty")]
    text_body: String,
}

pub struct HttpProviderClient {
    client: reqwest::Client,
    config: PrimaryProviderConfig,
    from_address: String,
}

impl HttpProviderClient {
    pub fn new(config: PrimaryProviderConfig, default_from: &str) -> Result<Self> {
        let from_address = config
            .from_address
            .clone()
            .unwrap_or_else(|| default_from.to_string());

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| NotifyError::Provider(e.to_string()))?;

        Ok(Self {
            client,
            config,
            from_address,
        })
    }
}

#[async_trait]
impl DeliverySender for HttpProviderClient {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        debug!("primary provider send to {}", email.to);

        let body = SendRequest {
            from: &self.from_address,
            to: &email.to,
            cc: email.cc.join(","),
            bcc: email.bcc.join(","),
            subject: &email.subject,
            html_body: &email.html_body,
            text_body: email.text_body.clone(),
        };

        let response = self
            .client
            .post(&self.config.api_url)
            .header("X-Postmark-Server-Token", &self.config.api_token)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NotifyError::Timeout(self.config.timeout_secs)
                } else {
                    NotifyError::Provider(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(NotifyError::Provider(format!(
                "provider returned {}: {}",
                status, detail
            )));
        }

        info!("primary provider accepted message for {}", email.to);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PrimaryProviderConfig {
        PrimaryProviderConfig {
            api_url: "https://api.postmarkapp.com/email".to_string(),
            api_token: "token".to_string(),
            from_address: None,
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_from_address_defaults() {
        let client = HttpProviderClient::new(config(), "fallback@example.com").unwrap();
        assert_eq!(client.from_address, "fallback@example.com");

        let mut cfg = config();
        cfg.from_address = Some("own@example.com".to_string());
        let client = HttpProviderClient::new(cfg, "fallback@example.com").unwrap();
        assert_eq!(client.from_address, "own@example.com");
    }

    #[test]
    fn test_request_serialization_skips_empty_lists() {
        let req = SendRequest {
            from: "a@b.com",
            to: "c@d.com",
            cc: String::new(),
            bcc: String::new(),
            subject: "Hi",
            html_body: "<p>Hi</p>",
            text_body: String::new(),
        };

        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("Cc").is_none());
        assert!(json.get("Bcc").is_none());
        assert!(json.get("TextBody").is_none());
        assert_eq!(json["To"], "c@d.com");
    }
}
