//! Delivery orchestration with provider failover
//!
//! Per-send state machine: try the primary provider, fall back to the
//! secondary relay on any primary failure, report the secondary's error when
//! both fail (primary failures are often transient or config-related, the
//! secondary's is the actionable one). Exactly one audit record per send.

use crate::config::DeliveryConfig;
use crate::delivery::audit::AuditSink;
use crate::delivery::primary::HttpProviderClient;
use crate::delivery::relay::SmtpRelayClient;
use crate::delivery::types::{
    DeliveryAttempt, DeliverySender, DeliveryStatus, OutgoingEmail, Provider, SendOutcome,
};
use crate::error::{NotifyError, Result};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

pub struct DeliveryOrchestrator {
    primary: Option<Arc<dyn DeliverySender>>,
    secondary: Option<Arc<dyn DeliverySender>>,
    audit: Arc<dyn AuditSink>,
}

impl DeliveryOrchestrator {
    /// Build real provider clients from config. Neither provider configured
    /// is a hard error, surfaced here at startup rather than per send.
    pub fn from_config(config: &DeliveryConfig, audit: Arc<dyn AuditSink>) -> Result<Self> {
        let primary: Option<Arc<dyn DeliverySender>> = match &config.primary {
            Some(primary_config) => Some(Arc::new(HttpProviderClient::new(
                primary_config.clone(),
                &config.default_from,
            )?)),
            None => None,
        };

        let secondary: Option<Arc<dyn DeliverySender>> = config.secondary.as_ref().map(|c| {
            Arc::new(SmtpRelayClient::new(c.clone(), &config.default_from))
                as Arc<dyn DeliverySender>
        });

        Self::new(primary, secondary, audit)
    }

    /// Assemble from already-built senders (tests inject fakes here)
    pub fn new(
        primary: Option<Arc<dyn DeliverySender>>,
        secondary: Option<Arc<dyn DeliverySender>>,
        audit: Arc<dyn AuditSink>,
    ) -> Result<Self> {
        if primary.is_none() && secondary.is_none() {
            return Err(NotifyError::Config(
                "no delivery provider configured".to_string(),
            ));
        }
        if primary.is_none() {
            warn!("primary provider not configured, running secondary-only");
        }
        Ok(Self {
            primary,
            secondary,
            audit,
        })
    }

    /// Send one message, recording exactly one DeliveryAttempt whatever
    /// happens. Audit write failures are logged and swallowed; they never
    /// change the outcome already determined.
    pub async fn send(
        &self,
        rule_id: &str,
        submission_id: &str,
        email: &OutgoingEmail,
    ) -> SendOutcome {
        let started = Instant::now();

        let outcome = self.try_providers(email).await;

        let attempt = DeliveryAttempt {
            id: Uuid::new_v4().to_string(),
            rule_id: rule_id.to_string(),
            submission_id: submission_id.to_string(),
            recipient: email.to.clone(),
            subject: email.subject.clone(),
            provider: outcome.provider,
            status: if outcome.success {
                DeliveryStatus::Sent
            } else {
                DeliveryStatus::Failed
            },
            error: outcome.error.clone(),
            duration_ms: started.elapsed().as_millis() as u64,
            created_at: Utc::now(),
        };

        if let Err(e) = self.audit.record(&attempt).await {
            error!("failed to record delivery attempt {}: {}", attempt.id, e);
        }

        outcome
    }

    async fn try_providers(&self, email: &OutgoingEmail) -> SendOutcome {
        // Precondition: a plausible destination, checked before any network
        if email.to.trim().is_empty() || !email.to.contains('@') {
            return SendOutcome {
                success: false,
                provider: Provider::None,
                error: Some(format!("invalid recipient address '{}'", email.to)),
            };
        }

        let primary_error = match &self.primary {
            Some(primary) => match primary.send(email).await {
                Ok(()) => {
                    info!("delivered to {} via primary provider", email.to);
                    return SendOutcome {
                        success: true,
                        provider: Provider::Primary,
                        error: None,
                    };
                }
                Err(e) => {
                    warn!("primary provider failed for {}: {}", email.to, e);
                    Some(e)
                }
            },
            None => None,
        };

        match &self.secondary {
            Some(secondary) => match secondary.send(email).await {
                Ok(()) => {
                    info!("delivered to {} via secondary relay", email.to);
                    SendOutcome {
                        success: true,
                        provider: Provider::Secondary,
                        error: None,
                    }
                }
                Err(e) => {
                    error!("secondary relay failed for {}: {}", email.to, e);
                    SendOutcome {
                        success: false,
                        provider: Provider::Secondary,
                        error: Some(e.to_string()),
                    }
                }
            },
            None => {
                let error = primary_error
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "no provider available".to_string());
                SendOutcome {
                    success: false,
                    provider: Provider::Primary,
                    error: Some(error),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::audit::MemoryAuditSink;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted sender: succeeds or fails, counting calls
    struct FakeSender {
        succeed: bool,
        calls: AtomicUsize,
    }

    impl FakeSender {
        fn new(succeed: bool) -> Arc<Self> {
            Arc::new(Self {
                succeed,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DeliverySender for FakeSender {
        async fn send(&self, _email: &OutgoingEmail) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.succeed {
                Ok(())
            } else {
                Err(NotifyError::Provider("simulated failure".to_string()))
            }
        }
    }

    fn email() -> OutgoingEmail {
        OutgoingEmail {
            to: "guest@example.org".to_string(),
            subject: "Hello".to_string(),
            html_body: "<p>Hello</p>".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_primary_success_skips_secondary() {
        let primary = FakeSender::new(true);
        let secondary = FakeSender::new(true);
        let audit = Arc::new(MemoryAuditSink::new());

        let orchestrator = DeliveryOrchestrator::new(
            Some(primary.clone()),
            Some(secondary.clone()),
            audit.clone(),
        )
        .unwrap();

        let outcome = orchestrator.send("rule-1", "sub-1", &email()).await;

        assert!(outcome.success);
        assert_eq!(outcome.provider, Provider::Primary);
        assert_eq!(primary.calls(), 1);
        assert_eq!(secondary.calls(), 0);

        let attempts = audit.attempts().await;
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].provider, Provider::Primary);
        assert_eq!(attempts[0].status, DeliveryStatus::Sent);
    }

    #[tokio::test]
    async fn test_fallback_to_secondary() {
        let primary = FakeSender::new(false);
        let secondary = FakeSender::new(true);
        let audit = Arc::new(MemoryAuditSink::new());

        let orchestrator = DeliveryOrchestrator::new(
            Some(primary.clone()),
            Some(secondary.clone()),
            audit.clone(),
        )
        .unwrap();

        let outcome = orchestrator.send("rule-1", "sub-1", &email()).await;

        assert!(outcome.success);
        assert_eq!(outcome.provider, Provider::Secondary);
        assert_eq!(primary.calls(), 1);
        assert_eq!(secondary.calls(), 1);

        let attempts = audit.attempts().await;
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].provider, Provider::Secondary);
    }

    #[tokio::test]
    async fn test_both_fail_reports_secondary_error() {
        let primary = FakeSender::new(false);
        let secondary = FakeSender::new(false);
        let audit = Arc::new(MemoryAuditSink::new());

        let orchestrator =
            DeliveryOrchestrator::new(Some(primary), Some(secondary), audit.clone()).unwrap();

        let outcome = orchestrator.send("rule-1", "sub-1", &email()).await;

        assert!(!outcome.success);
        assert_eq!(outcome.provider, Provider::Secondary);
        assert!(outcome.error.is_some());

        let attempts = audit.attempts().await;
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].status, DeliveryStatus::Failed);
    }

    #[tokio::test]
    async fn test_precondition_blocks_provider_contact() {
        let primary = FakeSender::new(true);
        let audit = Arc::new(MemoryAuditSink::new());

        let orchestrator =
            DeliveryOrchestrator::new(Some(primary.clone()), None, audit.clone()).unwrap();

        let mut bad = email();
        bad.to = "not-an-address".to_string();
        let outcome = orchestrator.send("rule-1", "sub-1", &bad).await;

        assert!(!outcome.success);
        assert_eq!(outcome.provider, Provider::None);
        assert_eq!(primary.calls(), 0);
        assert_eq!(audit.attempts().await.len(), 1);
    }

    #[tokio::test]
    async fn test_secondary_only_configuration() {
        let secondary = FakeSender::new(true);
        let audit = Arc::new(MemoryAuditSink::new());

        let orchestrator =
            DeliveryOrchestrator::new(None, Some(secondary.clone()), audit).unwrap();

        let outcome = orchestrator.send("rule-1", "sub-1", &email()).await;
        assert!(outcome.success);
        assert_eq!(outcome.provider, Provider::Secondary);
    }

    #[tokio::test]
    async fn test_no_providers_is_config_error() {
        let audit = Arc::new(MemoryAuditSink::new());
        let result = DeliveryOrchestrator::new(None, None, audit);
        assert!(matches!(result, Err(NotifyError::Config(_))));
    }
}
