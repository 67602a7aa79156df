//! Audit sink port and implementations
//!
//! Every completed send (success or failure) produces exactly one
//! `DeliveryAttempt` written through this port. A sink write failure is
//! logged by the orchestrator but never changes the send outcome.

use crate::delivery::types::{DeliveryAttempt, DeliveryStatus, Provider};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tracing::info;

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, attempt: &DeliveryAttempt) -> Result<()>;
}

/// Default zero-config sink: one structured log line per attempt
pub struct LogAuditSink;

#[async_trait]
impl AuditSink for LogAuditSink {
    async fn record(&self, attempt: &DeliveryAttempt) -> Result<()> {
        info!(
            "delivery attempt {}: rule={} submission={} to={} provider={} status={} duration={}ms error={:?}",
            attempt.id,
            attempt.rule_id,
            attempt.submission_id,
            attempt.recipient,
            attempt.provider,
            attempt.status,
            attempt.duration_ms,
            attempt.error
        );
        Ok(())
    }
}

/// In-memory sink for tests and dry runs
#[derive(Default)]
pub struct MemoryAuditSink {
    attempts: Mutex<Vec<DeliveryAttempt>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn attempts(&self) -> Vec<DeliveryAttempt> {
        self.attempts.lock().await.clone()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(&self, attempt: &DeliveryAttempt) -> Result<()> {
        self.attempts.lock().await.push(attempt.clone());
        Ok(())
    }
}

/// SQLite-backed sink consumed by operator-facing log viewers
pub struct SqliteAuditSink {
    db: SqlitePool,
}

impl SqliteAuditSink {
    pub async fn new(database_url: &str) -> Result<Self> {
        let db = SqlitePool::connect(database_url).await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS delivery_attempts (
                id TEXT PRIMARY KEY,
                rule_id TEXT NOT NULL,
                submission_id TEXT NOT NULL,
                recipient TEXT NOT NULL,
                subject TEXT NOT NULL,
                provider TEXT NOT NULL,
                status TEXT NOT NULL,
                error TEXT,
                duration_ms INTEGER NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&db)
        .await?;

        Ok(Self { db })
    }

    /// Attempts recorded for one submission, oldest first
    pub async fn list_for_submission(&self, submission_id: &str) -> Result<Vec<DeliveryAttempt>> {
        let rows = sqlx::query_as::<
            _,
            (
                String,
                String,
                String,
                String,
                String,
                String,
                String,
                Option<String>,
                i64,
                String,
            ),
        >(
            r#"
            SELECT id, rule_id, submission_id, recipient, subject,
                   provider, status, error, duration_ms, created_at
            FROM delivery_attempts
            WHERE submission_id = ?
            ORDER BY created_at ASC
            "#,
        )
        .bind(submission_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(
                |(id, rule_id, submission_id, recipient, subject, provider, status, error, duration_ms, created_at)| {
                    Ok(DeliveryAttempt {
                        id,
                        rule_id,
                        submission_id,
                        recipient,
                        subject,
                        provider: match provider.as_str() {
                            "primary" => Provider::Primary,
                            "secondary" => Provider::Secondary,
                            _ => Provider::None,
                        },
                        status: match status.as_str() {
                            "sent" => DeliveryStatus::Sent,
                            _ => DeliveryStatus::Failed,
                        },
                        error,
                        duration_ms: duration_ms.max(0) as u64,
                        created_at: DateTime::parse_from_rfc3339(&created_at)
                            .map_err(|e| crate::error::NotifyError::Storage(e.to_string()))?
                            .with_timezone(&Utc),
                    })
                },
            )
            .collect()
    }
}

#[async_trait]
impl AuditSink for SqliteAuditSink {
    async fn record(&self, attempt: &DeliveryAttempt) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO delivery_attempts (
                id, rule_id, submission_id, recipient, subject,
                provider, status, error, duration_ms, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&attempt.id)
        .bind(&attempt.rule_id)
        .bind(&attempt.submission_id)
        .bind(&attempt.recipient)
        .bind(&attempt.subject)
        .bind(attempt.provider.to_string())
        .bind(attempt.status.to_string())
        .bind(&attempt.error)
        .bind(attempt.duration_ms as i64)
        .bind(attempt.created_at.to_rfc3339())
        .execute(&self.db)
        .await?;

        Ok(())
    }
}
