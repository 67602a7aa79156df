//! Rule and condition data structures

use serde::{Deserialize, Serialize};
use std::fmt;

/// Comparison operator of a single condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    GreaterThan,
    LessThan,
    IsEmpty,
    IsNotEmpty,
}

impl fmt::Display for ConditionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConditionOperator::Equals => "equals",
            ConditionOperator::NotEquals => "notEquals",
            ConditionOperator::Contains => "contains",
            ConditionOperator::NotContains => "notContains",
            ConditionOperator::GreaterThan => "greaterThan",
            ConditionOperator::LessThan => "lessThan",
            ConditionOperator::IsEmpty => "isEmpty",
            ConditionOperator::IsNotEmpty => "isNotEmpty",
        };
        f.write_str(s)
    }
}

/// A leaf predicate against one form field
///
/// `field_stable_id` and `field_label` are redundant lookups kept alongside
/// the primary id so the condition keeps matching after the form field is
/// recreated under a new id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(default)]
    pub id: String,
    pub field: String,
    pub operator: ConditionOperator,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub field_stable_id: Option<String>,
    #[serde(default)]
    pub field_label: Option<String>,
}

/// How a rule picks its destination address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipientType {
    /// The submitter's own address from the mapped payload
    Submitter,
    /// A fixed address stored on the rule
    Custom,
    /// An address read from a payload field
    Field,
}

impl Default for RecipientType {
    fn default() -> Self {
        Self::Submitter
    }
}

/// User-authored notification rule, owned by a form
///
/// Conditions are conjunctive; authors encode alternatives as separate
/// rules. Many rules per form, evaluated independently and in no guaranteed
/// order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailRule {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_true")]
    pub active: bool,
    pub form_id: String,
    pub template_id: String,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub recipient_type: RecipientType,
    #[serde(default)]
    pub recipient_email: Option<String>,
    #[serde(default)]
    pub recipient_field: Option<String>,
    /// Free-text comma-separated lists, parsed at resolution time
    #[serde(default)]
    pub cc_emails: Option<String>,
    #[serde(default)]
    pub bcc_emails: Option<String>,
}

fn default_true() -> bool {
    true
}
