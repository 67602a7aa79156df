//! Submission payload and form schema model
//!
//! Form fields are authored by end users, so payload keys are opaque
//! identifiers and values arrive in whatever shape the form renderer
//! produced. Everything here is total: lookups return options, never panic.

pub mod types;

pub use types::{FieldValue, FormFieldDescriptor, FormSchema, SubmissionPayload};
