//! Schema-driven mapping engine

use crate::mapping::heuristics::{
    apply_payload_heuristics, looks_like_email, looks_like_phone,
};
use crate::mapping::{CanonicalRecord, CanonicalTarget, MappingOptions};
use crate::submission::{FormFieldDescriptor, FormSchema, SubmissionPayload};
use tracing::debug;

/// Maps a submission payload into a canonical record
///
/// Pure over its inputs: the same `(schema, payload)` always produces the
/// same record. Strategy priority per field, first success wins:
///
/// 1. explicit mapping declared on the descriptor
/// 2. field type (`email`, `tel`, `date`, ...)
/// 3. label keywords
/// 4. id keywords
/// 5. value shape, only for slots no field-based strategy claimed
///
/// A payload-only heuristics pass runs afterwards when email, name or phone
/// are still missing.
pub struct MappingEngine;

impl MappingEngine {
    pub fn map(
        schema: Option<&FormSchema>,
        payload: &SubmissionPayload,
        options: &MappingOptions,
    ) -> CanonicalRecord {
        let mut record = CanonicalRecord::default();
        // Field ids claimed by a field-based strategy, so the value-shape
        // strategy and the extras pass skip them
        let mut claimed: Vec<&str> = Vec::new();

        if let Some(schema) = schema {
            // Field-based strategies, in form-field declaration order
            for field in &schema.fields {
                let Some(value) = payload.get(&field.id) else {
                    continue;
                };
                if value.is_empty_like() {
                    continue;
                }
                let text = value.as_text();

                if let Some((target, strategy)) = Self::field_strategy(field) {
                    if record.set_if_empty(target, text) {
                        claimed.push(field.id.as_str());
                        if options.trace {
                            debug!(
                                "mapped field {} ({}) -> {} via {}",
                                field.id,
                                field.label,
                                target.as_str(),
                                strategy
                            );
                        }
                    } else {
                        // Slot already taken by an earlier field; the value
                        // still should not fall through to shape matching
                        claimed.push(field.id.as_str());
                    }
                }
            }

            // Value-shape strategy for unclaimed fields, only filling slots
            // nothing field-based matched
            for field in &schema.fields {
                if claimed.contains(&field.id.as_str()) {
                    continue;
                }
                let Some(value) = payload.get(&field.id) else {
                    continue;
                };
                if value.is_empty_like() {
                    continue;
                }
                let text = value.as_text();

                let target = if record.email.is_none() && looks_like_email(&text) {
                    Some(CanonicalTarget::Email)
                } else if record.phone.is_none() && looks_like_phone(&text) {
                    Some(CanonicalTarget::Phone)
                } else {
                    None
                };

                if let Some(target) = target {
                    if record.set_if_empty(target, text) {
                        claimed.push(field.id.as_str());
                        if options.trace {
                            debug!(
                                "mapped field {} -> {} via value shape",
                                field.id,
                                target.as_str()
                            );
                        }
                    }
                }
            }

            // Everything unclaimed lands in the extension map
            for field in &schema.fields {
                if claimed.contains(&field.id.as_str()) {
                    continue;
                }
                let Some(value) = payload.get(&field.id) else {
                    continue;
                };
                if value.is_empty_like() {
                    continue;
                }
                let text = value.as_text();
                record.push_extra(field.id.clone(), text.clone());
                if !field.label.is_empty() {
                    record.push_extra(field.label.clone(), text);
                }
            }
        }

        // Last-resort pass over raw payload values
        if record.email.is_none() || record.name.is_none() || record.phone.is_none() {
            apply_payload_heuristics(&mut record, payload, options.trace);
        }

        if record.datetime.is_none() {
            if let (Some(date), Some(time)) = (&record.date, &record.time) {
                record.datetime = Some(format!("{} {}", date, time));
            }
        }

        record
    }

    /// Field-based strategies 1-4, highest trust first
    fn field_strategy(field: &FormFieldDescriptor) -> Option<(CanonicalTarget, &'static str)> {
        if let Some(target) = field.explicit_mapping {
            return Some((target, "explicit mapping"));
        }
        if let Some(target) = Self::type_strategy(&field.field_type) {
            return Some((target, "field type"));
        }
        if let Some(target) = Self::keyword_strategy(&field.label) {
            return Some((target, "label keywords"));
        }
        if let Some(target) = Self::keyword_strategy(&field.id) {
            return Some((target, "id keywords"));
        }
        None
    }

    fn type_strategy(field_type: &str) -> Option<CanonicalTarget> {
        match field_type.to_lowercase().as_str() {
            "email" => Some(CanonicalTarget::Email),
            "tel" | "phone" => Some(CanonicalTarget::Phone),
            "date" => Some(CanonicalTarget::Date),
            "time" => Some(CanonicalTarget::Time),
            "datetime" | "datetime-local" => Some(CanonicalTarget::Datetime),
            "name" => Some(CanonicalTarget::Name),
            "address" | "location" => Some(CanonicalTarget::Location),
            _ => None,
        }
    }

    /// Case-insensitive keyword match on a label or id string
    fn keyword_strategy(text: &str) -> Option<CanonicalTarget> {
        if text.is_empty() {
            return None;
        }
        let lower = text.to_lowercase();

        if lower.contains("email") || lower.contains("e-mail") {
            return Some(CanonicalTarget::Email);
        }
        if lower.contains("phone") || lower.contains("mobile") || lower.contains("telephone") {
            return Some(CanonicalTarget::Phone);
        }
        if lower.contains("first") && lower.contains("name") {
            return Some(CanonicalTarget::FirstName);
        }
        if (lower.contains("last") || lower.contains("surname")) && lower.contains("name") {
            return Some(CanonicalTarget::LastName);
        }
        if lower.contains("name") && !lower.contains("user") && !lower.contains("file") {
            return Some(CanonicalTarget::Name);
        }
        if lower.contains("datetime") {
            return Some(CanonicalTarget::Datetime);
        }
        if lower.contains("date") {
            return Some(CanonicalTarget::Date);
        }
        if lower.contains("time") {
            return Some(CanonicalTarget::Time);
        }
        if lower.contains("location") || lower.contains("address") || lower.contains("venue") {
            return Some(CanonicalTarget::Location);
        }
        None
    }
}
