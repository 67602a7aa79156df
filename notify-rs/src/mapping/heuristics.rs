//! Payload-only heuristics
//!
//! Last-resort contact identification for forms whose authors tagged nothing:
//! key-name keywords first, then value-shape matching. Only consulted for
//! slots the schema-driven pass left empty.

use crate::mapping::{CanonicalRecord, CanonicalTarget};
use crate::submission::{FieldValue, SubmissionPayload};
use regex::Regex;
use tracing::debug;

const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";
const NAME_PATTERN: &str =
    r"^(?:(?:Mr|Mrs|Ms|Dr|Prof)\.?\s+)?[A-Za-z][A-Za-z'-]*(?:\s[A-Za-z][A-Za-z'-]*)?$";

/// Does the value look like an email address
pub fn looks_like_email(value: &str) -> bool {
    if let Ok(re) = Regex::new(EMAIL_PATTERN) {
        re.is_match(value.trim())
    } else {
        false
    }
}

/// Does the value look like a phone number: 7-15 digits, separator-tolerant
pub fn looks_like_phone(value: &str) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return false;
    }
    let mut digits = 0usize;
    for c in trimmed.chars() {
        match c {
            '0'..='9' => digits += 1,
            '+' | '-' | '(' | ')' | '.' | ' ' => {}
            _ => return false,
        }
    }
    (7..=15).contains(&digits)
}

/// Does the value look like a person's name: alphabetic, optionally one
/// space, under 50 characters. Pure numbers and anything with an @ are
/// rejected; honorific prefixes (Mr/Mrs/Ms/Dr/Prof) are recognized.
pub fn looks_like_name(value: &str) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.len() >= 50 || trimmed.contains('@') {
        return false;
    }
    if trimmed.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    if let Ok(re) = Regex::new(NAME_PATTERN) {
        re.is_match(trimmed)
    } else {
        false
    }
}

/// Keyword classification of a raw key name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Email,
    FirstName,
    LastName,
    Name,
    Phone,
    Other,
}

/// Classify a payload key by substring keywords. First/last-name detection
/// outranks the bare "name" keyword so "first_name" never claims the full
/// name slot.
pub fn classify_key(key: &str) -> KeyKind {
    let lower = key.to_lowercase();
    if lower.contains("email") || lower.contains("e-mail") || lower.contains("mail") {
        return KeyKind::Email;
    }
    if lower.contains("phone") || lower.contains("mobile") || lower.contains("tel") {
        return KeyKind::Phone;
    }
    if lower.contains("name") {
        if lower.contains("first") || lower.contains("fname") || lower.starts_with("given") {
            return KeyKind::FirstName;
        }
        if lower.contains("last") || lower.contains("lname") || lower.contains("surname")
            || lower.contains("family")
        {
            return KeyKind::LastName;
        }
        // "username"/"filename" are not people
        if lower.contains("user") || lower.contains("file") || lower.contains("form") {
            return KeyKind::Other;
        }
        return KeyKind::Name;
    }
    if lower == "fname" || lower == "first" {
        return KeyKind::FirstName;
    }
    if lower == "lname" || lower == "last" || lower.contains("surname") {
        return KeyKind::LastName;
    }
    KeyKind::Other
}

/// Payload-only pass: fill email/name/phone slots the schema pass missed.
///
/// Runs key-keyword matching over every entry first, then value-shape
/// matching, both in payload insertion order. First/last names found here
/// are combined into `name` when `name` itself is still empty.
pub fn apply_payload_heuristics(
    record: &mut CanonicalRecord,
    payload: &SubmissionPayload,
    trace: bool,
) {
    // Key-name pass
    for (key, value) in payload.iter() {
        if value.is_empty_like() {
            continue;
        }
        let text = value.as_text();
        let target = match classify_key(key) {
            KeyKind::Email if looks_like_email(&text) => Some(CanonicalTarget::Email),
            KeyKind::Phone => Some(CanonicalTarget::Phone),
            KeyKind::FirstName => Some(CanonicalTarget::FirstName),
            KeyKind::LastName => Some(CanonicalTarget::LastName),
            KeyKind::Name => Some(CanonicalTarget::Name),
            _ => None,
        };
        if let Some(target) = target {
            if record.set_if_empty(target, text.clone()) && trace {
                debug!("heuristic key match: {} -> {}", key, target.as_str());
            }
        }
    }

    // Value-shape pass for whatever is still missing
    for (key, value) in payload.iter() {
        if value.is_empty_like() {
            continue;
        }
        if let FieldValue::List(_) = value {
            continue;
        }
        let text = value.as_text();

        if record.email.is_none() && looks_like_email(&text) {
            if record.set_if_empty(CanonicalTarget::Email, text.clone()) && trace {
                debug!("heuristic value shape: {} -> email", key);
            }
            continue;
        }
        if record.phone.is_none() && looks_like_phone(&text) {
            if record.set_if_empty(CanonicalTarget::Phone, text.clone()) && trace {
                debug!("heuristic value shape: {} -> phone", key);
            }
            continue;
        }
        if record.name.is_none()
            && record.first_name.is_none()
            && looks_like_name(&text)
            && classify_key(key) == KeyKind::Other
        {
            if record.set_if_empty(CanonicalTarget::Name, text.clone()) && trace {
                debug!("heuristic value shape: {} -> name", key);
            }
        }
    }

    // Combine first + last into the full name slot
    if record.name.is_none() {
        if let (Some(first), Some(last)) = (&record.first_name, &record.last_name) {
            record.name = Some(format!("{} {}", first, last));
        } else if let Some(first) = &record.first_name {
            record.name = Some(first.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_shapes() {
        assert!(looks_like_email("jane@example.com"));
        assert!(looks_like_email("  user.name@mail.co.uk "));
        assert!(!looks_like_email("not-an-email"));
        assert!(!looks_like_email("a@b"));
        assert!(!looks_like_email("two words@example.com"));
    }

    #[test]
    fn test_phone_shapes() {
        assert!(looks_like_phone("5551234567"));
        assert!(looks_like_phone("+1 (555) 123-4567"));
        assert!(looks_like_phone("555.123.4567"));
        assert!(!looks_like_phone("123456"));
        assert!(!looks_like_phone("12345678901234567890"));
        assert!(!looks_like_phone("call me"));
    }

    #[test]
    fn test_name_shapes() {
        assert!(looks_like_name("Jane Doe"));
        assert!(looks_like_name("Jane"));
        assert!(looks_like_name("Dr. Jane"));
        assert!(looks_like_name("O'Brien"));
        assert!(!looks_like_name("12345"));
        assert!(!looks_like_name("jane@example.com"));
        assert!(!looks_like_name("Jane Anne Doe Smith Extra"));
    }

    #[test]
    fn test_key_classification() {
        assert_eq!(classify_key("customerEmail"), KeyKind::Email);
        assert_eq!(classify_key("first_name"), KeyKind::FirstName);
        assert_eq!(classify_key("Last Name"), KeyKind::LastName);
        assert_eq!(classify_key("full_name"), KeyKind::Name);
        assert_eq!(classify_key("username"), KeyKind::Other);
        assert_eq!(classify_key("telephone"), KeyKind::Phone);
        assert_eq!(classify_key("x1"), KeyKind::Other);
    }

    #[test]
    fn test_fallback_with_no_metadata_at_all() {
        let mut payload = SubmissionPayload::new();
        payload.insert("x1", FieldValue::Text("jane@example.com".to_string()));
        payload.insert("x2", FieldValue::Text("Jane Doe".to_string()));

        let mut record = CanonicalRecord::default();
        apply_payload_heuristics(&mut record, &payload, false);

        assert_eq!(record.email.as_deref(), Some("jane@example.com"));
        assert_eq!(record.name.as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn test_first_last_combined_into_name() {
        let mut payload = SubmissionPayload::new();
        payload.insert("first_name", FieldValue::Text("Jane".to_string()));
        payload.insert("last_name", FieldValue::Text("Doe".to_string()));

        let mut record = CanonicalRecord::default();
        apply_payload_heuristics(&mut record, &payload, false);

        assert_eq!(record.first_name.as_deref(), Some("Jane"));
        assert_eq!(record.last_name.as_deref(), Some("Doe"));
        assert_eq!(record.name.as_deref(), Some("Jane Doe"));
    }
}
