//! Notification rules and condition evaluation
//!
//! Rules are user-authored configuration pairing a condition set, a template
//! and a recipient strategy. Conditions reference form fields through a
//! fallback identifier chain because fields can be recreated with new ids
//! after a rule was written.

pub mod evaluator;
pub mod types;

pub use evaluator::{ConditionDetail, ConditionEvaluator, ConditionOutcome};
pub use types::{Condition, ConditionOperator, EmailRule, RecipientType};
