//! notify-rs: form-submission notification pipeline
//!
//! Turns arbitrary, user-authored form submissions into rule-driven email
//! notifications.
//!
//! # Pipeline
//!
//! 1. **Mapping**: normalize the opaque payload into a canonical
//!    contact/booking record (email, name, phone, date, ...)
//! 2. **Rules**: evaluate each active rule's condition set with full
//!    per-condition diagnostics
//! 3. **Recipient**: resolve the destination address through the
//!    custom/field/submitter fallback chain
//! 4. **Templates**: expand `{{var}}`, `{{nested.path}}` and
//!    `{{#if cond}}...{{/if}}` against a layered context
//! 5. **Delivery**: send through the primary transactional provider with
//!    automatic failover to the SMTP relay, one audit record per attempt
//!
//! Forms are authored by end users: field identifiers are opaque, nothing is
//! schema-fixed, and every lookup in this crate is total. Rule processing is
//! isolated per rule; partial failure is normal, not exceptional.
//!
//! # Example
//!
//! ```no_run
//! use notify_rs::config::Config;
//! use notify_rs::delivery::{DeliveryOrchestrator, LogAuditSink};
//! use notify_rs::pipeline::{MemoryStore, SubmissionProcessor};
//! use notify_rs::submission::SubmissionPayload;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let audit = Arc::new(LogAuditSink);
//!     let orchestrator =
//!         Arc::new(DeliveryOrchestrator::from_config(&config.delivery, audit.clone())?);
//!
//!     let store = Arc::new(MemoryStore::new());
//!     let processor = SubmissionProcessor::new(store.clone(), store, orchestrator, audit);
//!
//!     let payload: SubmissionPayload =
//!         serde_json::from_str(r#"{"email": "jane@example.com"}"#)?;
//!     let summary = processor.process("form-1", "sub-1", &payload).await?;
//!     println!("{:?}", summary);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod delivery;
pub mod error;
pub mod mapping;
pub mod pipeline;
pub mod recipient;
pub mod rules;
pub mod submission;
pub mod templates;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use error::{NotifyError, Result};
