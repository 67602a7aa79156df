//! Delivery data structures

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which delivery path handled (or last attempted) a send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Primary,
    Secondary,
    /// No provider was contacted (precondition or resolution failure)
    None,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Primary => f.write_str("primary"),
            Provider::Secondary => f.write_str("secondary"),
            Provider::None => f.write_str("none"),
        }
    }
}

/// Terminal status of a delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Failed,
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryStatus::Sent => f.write_str("sent"),
            DeliveryStatus::Failed => f.write_str("failed"),
        }
    }
}

/// A fully resolved, fully expanded message ready for a provider
#[derive(Debug, Clone, Default)]
pub struct OutgoingEmail {
    pub to: String,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

/// Append-only audit record, one per (rule, submission) send attempt
///
/// Never mutated after creation. Duplicate sends across retries are possible
/// and tolerated; suppressing them is the trigger boundary's concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryAttempt {
    pub id: String,
    pub rule_id: String,
    pub submission_id: String,
    pub recipient: String,
    pub subject: String,
    pub provider: Provider,
    pub status: DeliveryStatus,
    pub error: Option<String>,
    pub duration_ms: u64,
    pub created_at: DateTime<Utc>,
}

/// Result of one orchestrated send
#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub success: bool,
    pub provider: Provider,
    pub error: Option<String>,
}

/// A delivery path the orchestrator can try
#[async_trait]
pub trait DeliverySender: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<()>;
}
