//! Submission processing pipeline
//!
//! One submission event triggers one evaluation pass over every active rule
//! of its form: map the payload, evaluate conditions, resolve the recipient,
//! expand the template, deliver. Rules are isolated from each other; a
//! failure in one never aborts its siblings.

pub mod processor;
pub mod store;

pub use processor::{SubmissionProcessor, SubmissionSummary};
pub use store::{FormStore, MemoryStore, RuleStore, RuleWithTemplate};
