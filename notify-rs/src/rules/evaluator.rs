//! Condition evaluation
//!
//! Every condition is evaluated and reported even after an early failure, so
//! the detail list is complete for diagnostics. Nothing here returns an
//! error: an unresolvable field or an incomparable operand scores the
//! condition non-matching with a reason.

use crate::rules::{Condition, ConditionOperator};
use crate::submission::{FieldValue, FormSchema, SubmissionPayload};
use chrono::NaiveDate;
use tracing::debug;

/// Per-condition diagnostic entry
#[derive(Debug, Clone)]
pub struct ConditionDetail {
    pub field: String,
    pub operator: ConditionOperator,
    pub expected: String,
    pub result: bool,
    pub reason: Option<String>,
}

/// Outcome of evaluating a rule's condition set
#[derive(Debug, Clone)]
pub struct ConditionOutcome {
    pub matches: bool,
    pub details: Vec<ConditionDetail>,
}

pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// Evaluate a condition set against a payload
    ///
    /// An empty set matches unconditionally ("always send" rules). The
    /// schema is optional; without it the field lookup chain is limited to
    /// payload keys.
    pub fn evaluate(
        conditions: &[Condition],
        payload: &SubmissionPayload,
        schema: Option<&FormSchema>,
    ) -> ConditionOutcome {
        if conditions.is_empty() {
            return ConditionOutcome {
                matches: true,
                details: vec![],
            };
        }

        let mut matches = true;
        let mut details = Vec::with_capacity(conditions.len());

        for condition in conditions {
            let detail = Self::evaluate_one(condition, payload, schema);
            if !detail.result {
                matches = false;
            }
            debug!(
                "condition {} {} '{}': {}",
                detail.field, detail.operator, detail.expected, detail.result
            );
            details.push(detail);
        }

        ConditionOutcome { matches, details }
    }

    fn evaluate_one(
        condition: &Condition,
        payload: &SubmissionPayload,
        schema: Option<&FormSchema>,
    ) -> ConditionDetail {
        let value = Self::lookup_field(condition, payload, schema);

        let (result, reason) = match value {
            Some(value) => Self::apply_operator(condition.operator, value, &condition.value),
            // Unresolvable fields never match, whatever the operator. A rule
            // probing emptiness of a field the submission never contained
            // must not fire; isEmpty means "present but blank".
            None => (false, Some("field not found in payload".to_string())),
        };

        ConditionDetail {
            field: condition.field.clone(),
            operator: condition.operator,
            expected: condition.value.clone(),
            result,
            reason,
        }
    }

    /// Fallback lookup chain: primary id, stable id, label. Stable id and
    /// label are tried both as raw payload keys and through the schema,
    /// since either side may have been regenerated.
    fn lookup_field<'a>(
        condition: &Condition,
        payload: &'a SubmissionPayload,
        schema: Option<&FormSchema>,
    ) -> Option<&'a FieldValue> {
        if let Some(value) = payload.get(&condition.field) {
            return Some(value);
        }

        if let Some(stable_id) = condition.field_stable_id.as_deref() {
            if let Some(value) = payload.get(stable_id) {
                return Some(value);
            }
            if let Some(field) = schema.and_then(|s| s.field_by_stable_id(stable_id)) {
                if let Some(value) = payload.get(&field.id) {
                    return Some(value);
                }
            }
        }

        if let Some(label) = condition.field_label.as_deref() {
            if let Some(value) = payload.get(label) {
                return Some(value);
            }
            if let Some(field) = schema.and_then(|s| s.field_by_label(label)) {
                if let Some(value) = payload.get(&field.id) {
                    return Some(value);
                }
            }
        }

        None
    }

    fn apply_operator(
        operator: ConditionOperator,
        value: &FieldValue,
        expected: &str,
    ) -> (bool, Option<String>) {
        let actual = value.as_text();
        let actual_cmp = actual.trim().to_lowercase();
        let expected_cmp = expected.trim().to_lowercase();

        match operator {
            ConditionOperator::Equals => (actual_cmp == expected_cmp, None),
            ConditionOperator::NotEquals => (actual_cmp != expected_cmp, None),
            ConditionOperator::Contains => (actual_cmp.contains(&expected_cmp), None),
            ConditionOperator::NotContains => (!actual_cmp.contains(&expected_cmp), None),
            ConditionOperator::IsEmpty => (value.is_empty_like(), None),
            ConditionOperator::IsNotEmpty => (!value.is_empty_like(), None),
            ConditionOperator::GreaterThan => Self::compare_ordered(&actual, expected, |o| o > 0),
            ConditionOperator::LessThan => Self::compare_ordered(&actual, expected, |o| o < 0),
        }
    }

    /// Ordered comparison: numeric first, then ISO dates. Incomparable
    /// operands score non-matching with a reason, never an error.
    fn compare_ordered(
        actual: &str,
        expected: &str,
        check: impl Fn(i32) -> bool,
    ) -> (bool, Option<String>) {
        if let (Ok(a), Ok(b)) = (actual.trim().parse::<f64>(), expected.trim().parse::<f64>()) {
            let ordering = if a > b {
                1
            } else if a < b {
                -1
            } else {
                0
            };
            return (check(ordering), None);
        }

        if let (Some(a), Some(b)) = (Self::parse_date(actual), Self::parse_date(expected)) {
            let ordering = if a > b {
                1
            } else if a < b {
                -1
            } else {
                0
            };
            return (check(ordering), None);
        }

        (
            false,
            Some(format!(
                "cannot compare '{}' with '{}' as number or date",
                actual.trim(),
                expected.trim()
            )),
        )
    }

    fn parse_date(text: &str) -> Option<NaiveDate> {
        let trimmed = text.trim();
        NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .or_else(|_| NaiveDate::parse_from_str(trimmed, "%d/%m/%Y"))
            .or_else(|_| NaiveDate::parse_from_str(trimmed, "%m/%d/%Y"))
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn condition(field: &str, operator: ConditionOperator, value: &str) -> Condition {
        Condition {
            id: String::new(),
            field: field.to_string(),
            operator,
            value: value.to_string(),
            field_stable_id: None,
            field_label: None,
        }
    }

    fn payload(entries: &[(&str, &str)]) -> SubmissionPayload {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), FieldValue::Text(v.to_string())))
            .collect()
    }

    #[test]
    fn test_empty_condition_set_always_matches() {
        let outcome = ConditionEvaluator::evaluate(&[], &payload(&[]), None);
        assert!(outcome.matches);
        assert!(outcome.details.is_empty());
    }

    #[test]
    fn test_equals_operator() {
        let conditions = vec![condition("status", ConditionOperator::Equals, "urgent")];

        let outcome =
            ConditionEvaluator::evaluate(&conditions, &payload(&[("status", "urgent")]), None);
        assert!(outcome.matches);

        let outcome =
            ConditionEvaluator::evaluate(&conditions, &payload(&[("status", "normal")]), None);
        assert!(!outcome.matches);
    }

    #[test]
    fn test_no_short_circuit_reports_every_condition() {
        let conditions = vec![
            condition("a", ConditionOperator::Equals, "nope"),
            condition("b", ConditionOperator::Equals, "yes"),
        ];
        let outcome =
            ConditionEvaluator::evaluate(&conditions, &payload(&[("a", "x"), ("b", "yes")]), None);

        assert!(!outcome.matches);
        assert_eq!(outcome.details.len(), 2);
        assert!(!outcome.details[0].result);
        assert!(outcome.details[1].result);
    }

    #[test]
    fn test_missing_field_is_non_match_with_reason() {
        let conditions = vec![condition("gone", ConditionOperator::Equals, "x")];
        let outcome = ConditionEvaluator::evaluate(&conditions, &payload(&[]), None);

        assert!(!outcome.matches);
        assert!(outcome.details[0].reason.is_some());
    }

    #[test]
    fn test_is_empty_on_unresolvable_field_is_non_match() {
        let conditions = vec![condition("gone", ConditionOperator::IsEmpty, "")];
        let outcome = ConditionEvaluator::evaluate(&conditions, &payload(&[]), None);

        assert!(!outcome.matches);
        assert!(outcome.details[0].reason.is_some());
    }

    #[test]
    fn test_is_empty_on_blank_present_field_matches() {
        let conditions = vec![condition("notes", ConditionOperator::IsEmpty, "")];
        let outcome =
            ConditionEvaluator::evaluate(&conditions, &payload(&[("notes", "  ")]), None);
        assert!(outcome.matches);
    }

    #[test]
    fn test_numeric_comparison() {
        let conditions = vec![condition("guests", ConditionOperator::GreaterThan, "10")];

        let outcome =
            ConditionEvaluator::evaluate(&conditions, &payload(&[("guests", "12")]), None);
        assert!(outcome.matches);

        let outcome = ConditionEvaluator::evaluate(&conditions, &payload(&[("guests", "9")]), None);
        assert!(!outcome.matches);
    }

    #[test]
    fn test_date_comparison() {
        let conditions = vec![condition(
            "event_date",
            ConditionOperator::LessThan,
            "2025-06-01",
        )];
        let outcome = ConditionEvaluator::evaluate(
            &conditions,
            &payload(&[("event_date", "2025-03-10")]),
            None,
        );
        assert!(outcome.matches);
    }

    #[test]
    fn test_incomparable_operands_score_non_match() {
        let conditions = vec![condition("guests", ConditionOperator::GreaterThan, "many")];
        let outcome =
            ConditionEvaluator::evaluate(&conditions, &payload(&[("guests", "a few")]), None);

        assert!(!outcome.matches);
        let reason = outcome.details[0].reason.as_deref().unwrap();
        assert!(reason.contains("cannot compare"));
    }

    #[test]
    fn test_stable_id_fallback_through_schema() {
        use crate::submission::{FormFieldDescriptor, FormSchema};

        // The rule still references the old field id; the schema maps the
        // stable id to the regenerated one
        let schema = FormSchema {
            id: "form-1".to_string(),
            name: String::new(),
            fields: vec![FormFieldDescriptor {
                id: "fld_new".to_string(),
                label: "Status".to_string(),
                field_type: "text".to_string(),
                stable_id: Some("status_stable".to_string()),
                explicit_mapping: None,
                options: vec![],
            }],
        };

        let mut cond = condition("fld_old", ConditionOperator::Equals, "urgent");
        cond.field_stable_id = Some("status_stable".to_string());

        let outcome = ConditionEvaluator::evaluate(
            &[cond],
            &payload(&[("fld_new", "urgent")]),
            Some(&schema),
        );
        assert!(outcome.matches);
    }

    #[test]
    fn test_label_fallback() {
        let mut cond = condition("fld_old", ConditionOperator::Equals, "yes");
        cond.field_label = Some("Subscribe".to_string());

        let outcome =
            ConditionEvaluator::evaluate(&[cond], &payload(&[("Subscribe", "yes")]), None);
        assert!(outcome.matches);
    }
}
