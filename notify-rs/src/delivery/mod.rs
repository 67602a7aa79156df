//! Delivery orchestration
//!
//! Two delivery paths: an API-based transactional provider (primary) and a
//! direct SMTP relay (secondary). The orchestrator tries them in order with
//! bounded timeouts and records one audit entry per send.

pub mod audit;
pub mod orchestrator;
pub mod primary;
pub mod relay;
pub mod types;

pub use audit::{AuditSink, LogAuditSink, MemoryAuditSink, SqliteAuditSink};
pub use orchestrator::DeliveryOrchestrator;
pub use primary::HttpProviderClient;
pub use relay::SmtpRelayClient;
pub use types::{
    DeliveryAttempt, DeliverySender, DeliveryStatus, OutgoingEmail, Provider, SendOutcome,
};
