//! Recipient resolution
//!
//! Resolution order: custom address on the rule (when syntactically valid),
//! then a payload field named by the rule, then the submitter's own address
//! from the mapped record. Never panics; no usable address anywhere in the
//! chain is reported as `None` and the rule's delivery is skipped.

use crate::mapping::CanonicalRecord;
use crate::rules::{EmailRule, RecipientType};
use crate::submission::SubmissionPayload;
use crate::templates::EmailTemplate;
use crate::utils::{is_valid_email, parse_address_list};
use tracing::debug;

/// Destination of one rule's notification
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRecipient {
    pub to: String,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    /// Where the address came from: "custom", "field:<id>", "submitter-default"
    pub source: String,
}

pub struct RecipientResolver;

impl RecipientResolver {
    pub fn resolve(
        rule: &EmailRule,
        template: &EmailTemplate,
        payload: &SubmissionPayload,
        record: &CanonicalRecord,
    ) -> Option<ResolvedRecipient> {
        let (to, source) = Self::resolve_to(rule, payload, record)?;

        // Template-level lists take precedence over rule-level ones
        let cc = template
            .cc_emails
            .as_deref()
            .or(rule.cc_emails.as_deref())
            .map(parse_address_list)
            .unwrap_or_default();
        let bcc = template
            .bcc_emails
            .as_deref()
            .or(rule.bcc_emails.as_deref())
            .map(parse_address_list)
            .unwrap_or_default();

        debug!("rule {} recipient {} via {}", rule.id, to, source);

        Some(ResolvedRecipient { to, cc, bcc, source })
    }

    fn resolve_to(
        rule: &EmailRule,
        payload: &SubmissionPayload,
        record: &CanonicalRecord,
    ) -> Option<(String, String)> {
        match rule.recipient_type {
            RecipientType::Custom => {
                // An invalid or missing custom address degrades to the
                // submitter fallback instead of failing the send
                if let Some(email) = rule.recipient_email.as_deref() {
                    if is_valid_email(email) {
                        return Some((email.to_string(), "custom".to_string()));
                    }
                    debug!(
                        "rule {} custom address '{}' invalid, falling back",
                        rule.id, email
                    );
                }
                Self::submitter_default(payload, record)
            }
            RecipientType::Field => {
                if let Some(field_id) = rule.recipient_field.as_deref() {
                    if let Some(value) = payload.get_text(field_id) {
                        if is_valid_email(value.trim()) {
                            return Some((
                                value.trim().to_string(),
                                format!("field:{}", field_id),
                            ));
                        }
                    }
                    debug!(
                        "rule {} recipient field '{}' empty or invalid, falling back",
                        rule.id, field_id
                    );
                }
                Self::submitter_default(payload, record)
            }
            RecipientType::Submitter => Self::submitter_default(payload, record),
        }
    }

    /// The submitter's address: the mapped canonical email, else a literal
    /// `email` payload key
    fn submitter_default(
        payload: &SubmissionPayload,
        record: &CanonicalRecord,
    ) -> Option<(String, String)> {
        let candidate = record
            .email
            .clone()
            .or_else(|| payload.get_text("email"))?;
        let candidate = candidate.trim().to_string();

        if is_valid_email(&candidate) {
            Some((candidate, "submitter-default".to_string()))
        } else {
            None
        }
    }
}
