//! Template data structures

use serde::{Deserialize, Serialize};

/// User-authored email template, referenced by rules by id
///
/// Template-level CC/BCC take precedence over rule-level lists at
/// resolution time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailTemplate {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub subject: String,
    pub html_content: String,
    #[serde(default)]
    pub text_content: Option<String>,
    /// Free-text comma-separated list
    #[serde(default)]
    pub cc_emails: Option<String>,
    #[serde(default)]
    pub bcc_emails: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_deserializes_from_stored_json() {
        let json = r#"{
            "id": "tpl-1",
            "name": "Booking confirmation",
            "subject": "Your booking on {{date}}",
            "htmlContent": "<p>Hi {{firstName}}</p>",
            "ccEmails": "office@example.com"
        }"#;

        let template: EmailTemplate = serde_json::from_str(json).unwrap();
        assert_eq!(template.subject, "Your booking on {{date}}");
        assert!(template.text_content.is_none());
        assert_eq!(template.cc_emails.as_deref(), Some("office@example.com"));
    }
}
