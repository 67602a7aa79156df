//! Field mapping engine
//!
//! Normalizes an arbitrary submission payload plus form-field metadata into a
//! canonical contact/booking record. Strategies run in fixed priority order
//! (explicit mapping, field type, label keywords, id keywords, value shape);
//! a payload-only heuristics pass backstops forms with no usable metadata.

pub mod engine;
pub mod heuristics;
pub mod types;

pub use engine::MappingEngine;
pub use types::{CanonicalRecord, CanonicalTarget, MappingOptions};
