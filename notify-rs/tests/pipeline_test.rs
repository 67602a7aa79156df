//! Integration tests for the full submission pipeline

use async_trait::async_trait;
use notify_rs::delivery::{
    DeliveryOrchestrator, DeliverySender, DeliveryStatus, MemoryAuditSink, OutgoingEmail,
    Provider,
};
use notify_rs::error::{NotifyError, Result};
use notify_rs::pipeline::{MemoryStore, SubmissionProcessor, SubmissionSummary};
use notify_rs::submission::SubmissionPayload;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Sender that records every message it accepts
#[derive(Default)]
struct RecordingSender {
    sent: Mutex<Vec<OutgoingEmail>>,
    fail: bool,
}

impl RecordingSender {
    fn succeeding() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(vec![]),
            fail: true,
        })
    }

    async fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl DeliverySender for RecordingSender {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        if self.fail {
            return Err(NotifyError::Provider("simulated outage".to_string()));
        }
        self.sent.lock().await.push(email.clone());
        Ok(())
    }
}

struct Harness {
    processor: SubmissionProcessor,
    primary: Arc<RecordingSender>,
    audit: Arc<MemoryAuditSink>,
}

fn harness(forms_json: &str, rules_json: &str) -> Harness {
    let mut store = MemoryStore::new();
    if !forms_json.is_empty() {
        store.load_forms(forms_json).unwrap();
    }
    store.load_rules(rules_json).unwrap();
    let store = Arc::new(store);

    let primary = RecordingSender::succeeding();
    let audit = Arc::new(MemoryAuditSink::new());
    let orchestrator = Arc::new(
        DeliveryOrchestrator::new(Some(primary.clone()), None, audit.clone()).unwrap(),
    );

    Harness {
        processor: SubmissionProcessor::new(store.clone(), store, orchestrator, audit.clone()),
        primary,
        audit,
    }
}

fn payload(json: &str) -> SubmissionPayload {
    serde_json::from_str(json).unwrap()
}

const CONTACT_FORM: &str = r#"[{
    "id": "form-1",
    "name": "Contact",
    "fields": [
        {"id": "fld_email", "label": "Your Email", "type": "email"},
        {"id": "fld_name", "label": "Full Name", "type": "text"},
        {"id": "fld_status", "label": "Status", "type": "text"}
    ]
}]"#;

#[tokio::test]
async fn test_always_send_rule_delivers_to_submitter() {
    let rules = r#"[{
        "rule": {
            "id": "r1", "formId": "form-1", "templateId": "t1",
            "recipientType": "submitter"
        },
        "template": {
            "id": "t1",
            "subject": "Thanks {{name}}",
            "htmlContent": "<p>We got your message, {{name}}.</p>"
        }
    }]"#;

    let h = harness(CONTACT_FORM, rules);
    let summary = h
        .processor
        .process(
            "form-1",
            "sub-1",
            &payload(r#"{"fld_email": "jane@example.com", "fld_name": "Jane Doe"}"#),
        )
        .await
        .unwrap();

    assert_eq!(
        summary,
        SubmissionSummary {
            matching_rule_count: 1,
            sent_count: 1,
            failed_count: 0
        }
    );

    let sent = h.primary.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "jane@example.com");
    assert_eq!(sent[0].subject, "Thanks Jane Doe");
}

#[tokio::test]
async fn test_condition_gates_rule() {
    let rules = r#"[{
        "rule": {
            "id": "r1", "formId": "form-1", "templateId": "t1",
            "recipientType": "custom", "recipientEmail": "ops@example.com",
            "conditions": [
                {"field": "fld_status", "operator": "equals", "value": "urgent"}
            ]
        },
        "template": {"id": "t1", "subject": "Urgent!", "htmlContent": "<p>Go</p>"}
    }]"#;

    let h = harness(CONTACT_FORM, rules);

    let summary = h
        .processor
        .process(
            "form-1",
            "sub-1",
            &payload(r#"{"fld_email": "a@b.com", "fld_status": "normal"}"#),
        )
        .await
        .unwrap();
    assert_eq!(summary.matching_rule_count, 0);
    assert!(h.primary.sent().await.is_empty());

    let summary = h
        .processor
        .process(
            "form-1",
            "sub-2",
            &payload(r#"{"fld_email": "a@b.com", "fld_status": "urgent"}"#),
        )
        .await
        .unwrap();
    assert_eq!(summary.sent_count, 1);
    assert_eq!(h.primary.sent().await[0].to, "ops@example.com");
}

#[tokio::test]
async fn test_recipient_field_falls_back_to_submitter() {
    let rules = r#"[{
        "rule": {
            "id": "r1", "formId": "form-1", "templateId": "t1",
            "recipientType": "field", "recipientField": "contactEmail"
        },
        "template": {"id": "t1", "subject": "Hi", "htmlContent": "<p>Hi</p>"}
    }]"#;

    let h = harness("", rules);
    let summary = h
        .processor
        .process("form-1", "sub-1", &payload(r#"{"email": "a@b.com"}"#))
        .await
        .unwrap();

    assert_eq!(summary.sent_count, 1);
    assert_eq!(h.primary.sent().await[0].to, "a@b.com");
}

#[tokio::test]
async fn test_rule_isolation_missing_template() {
    // One rule's template is missing; its sibling must still send
    let rules = r#"[
        {
            "rule": {"id": "broken", "formId": "form-1", "templateId": "gone",
                     "recipientType": "submitter"}
        },
        {
            "rule": {"id": "healthy", "formId": "form-1", "templateId": "t1",
                     "recipientType": "submitter"},
            "template": {"id": "t1", "subject": "Hi", "htmlContent": "<p>Hi</p>"}
        }
    ]"#;

    let h = harness(CONTACT_FORM, rules);
    let summary = h
        .processor
        .process(
            "form-1",
            "sub-1",
            &payload(r#"{"fld_email": "jane@example.com"}"#),
        )
        .await
        .unwrap();

    assert_eq!(summary.matching_rule_count, 2);
    assert_eq!(summary.sent_count, 1);
    assert_eq!(summary.failed_count, 1);

    // Both outcomes audited: one failed skip, one delivered
    let attempts = h.audit.attempts().await;
    assert_eq!(attempts.len(), 2);
    assert!(attempts
        .iter()
        .any(|a| a.rule_id == "broken" && a.status == DeliveryStatus::Failed));
    assert!(attempts
        .iter()
        .any(|a| a.rule_id == "healthy" && a.status == DeliveryStatus::Sent));
}

#[tokio::test]
async fn test_unresolvable_recipient_is_failed_not_fatal() {
    let rules = r#"[{
        "rule": {"id": "r1", "formId": "form-1", "templateId": "t1",
                 "recipientType": "submitter"},
        "template": {"id": "t1", "subject": "Hi", "htmlContent": "<p>Hi</p>"}
    }]"#;

    let h = harness("", rules);
    // No email anywhere in the payload
    let summary = h
        .processor
        .process("form-1", "sub-1", &payload(r#"{"x": "hello"}"#))
        .await
        .unwrap();

    assert_eq!(summary.matching_rule_count, 1);
    assert_eq!(summary.failed_count, 1);
    assert!(h.primary.sent().await.is_empty());

    let attempts = h.audit.attempts().await;
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].provider, Provider::None);
}

#[tokio::test]
async fn test_schemaless_form_still_identifies_contact() {
    // The form schema was never stored; heuristics carry the mapping
    let rules = r#"[{
        "rule": {"id": "r1", "formId": "form-9", "templateId": "t1",
                 "recipientType": "submitter"},
        "template": {"id": "t1", "subject": "Hello {{name}}",
                     "htmlContent": "<p>Hello {{name}}</p>"}
    }]"#;

    let h = harness("", rules);
    let summary = h
        .processor
        .process(
            "form-9",
            "sub-1",
            &payload(r#"{"x1": "jane@example.com", "x2": "Jane Doe"}"#),
        )
        .await
        .unwrap();

    assert_eq!(summary.sent_count, 1);
    let sent = h.primary.sent().await;
    assert_eq!(sent[0].to, "jane@example.com");
    assert_eq!(sent[0].subject, "Hello Jane Doe");
}

#[tokio::test]
async fn test_delivery_failure_counts_but_does_not_abort() {
    let rules = r#"[
        {
            "rule": {"id": "r1", "formId": "form-1", "templateId": "t1",
                     "recipientType": "submitter"},
            "template": {"id": "t1", "subject": "A", "htmlContent": "<p>A</p>"}
        },
        {
            "rule": {"id": "r2", "formId": "form-1", "templateId": "t2",
                     "recipientType": "submitter"},
            "template": {"id": "t2", "subject": "B", "htmlContent": "<p>B</p>"}
        }
    ]"#;

    // Every provider down: both rules fail independently
    let mut store = MemoryStore::new();
    store.load_rules(rules).unwrap();
    let store = Arc::new(store);

    let primary = RecordingSender::failing();
    let audit = Arc::new(MemoryAuditSink::new());
    let orchestrator =
        Arc::new(DeliveryOrchestrator::new(Some(primary), None, audit.clone()).unwrap());
    let processor = SubmissionProcessor::new(store.clone(), store, orchestrator, audit.clone());

    let summary = processor
        .process("form-1", "sub-1", &payload(r#"{"email": "a@b.com"}"#))
        .await
        .unwrap();

    assert_eq!(summary.matching_rule_count, 2);
    assert_eq!(summary.sent_count, 0);
    assert_eq!(summary.failed_count, 2);
    assert_eq!(audit.attempts().await.len(), 2);
}

#[tokio::test]
async fn test_lead_id_and_boundary_vars_expand() {
    let rules = r#"[{
        "rule": {"id": "r1", "formId": "form-1", "templateId": "t1",
                 "recipientType": "submitter"},
        "template": {"id": "t1", "subject": "Lead {{leadId}}",
                     "htmlContent": "<p><a href=\"{{bookingLink}}\">Book</a></p>"}
    }]"#;

    let mut store = MemoryStore::new();
    store.load_rules(rules).unwrap();
    let store = Arc::new(store);

    let primary = RecordingSender::succeeding();
    let audit = Arc::new(MemoryAuditSink::new());
    let orchestrator = Arc::new(
        DeliveryOrchestrator::new(Some(primary.clone()), None, audit).unwrap(),
    );
    let processor = SubmissionProcessor::new(store.clone(), store, orchestrator, Arc::new(MemoryAuditSink::new()))
        .with_template_vars(vec![(
            "bookingLink".to_string(),
            "https://example.com/b/123".to_string(),
        )]);

    processor
        .process("form-1", "sub-77", &payload(r#"{"email": "a@b.com"}"#))
        .await
        .unwrap();

    let sent = primary.sent().await;
    assert_eq!(sent[0].subject, "Lead sub-77");
    assert!(sent[0].html_body.contains("https://example.com/b/123"));
}

#[tokio::test]
async fn test_template_cc_applied_to_outgoing_email() {
    let rules = r#"[{
        "rule": {"id": "r1", "formId": "form-1", "templateId": "t1",
                 "recipientType": "submitter", "ccEmails": "rule-cc@example.com"},
        "template": {"id": "t1", "subject": "Hi", "htmlContent": "<p>Hi</p>",
                     "ccEmails": "office@example.com, bad-entry"}
    }]"#;

    let h = harness("", rules);
    h.processor
        .process("form-1", "sub-1", &payload(r#"{"email": "a@b.com"}"#))
        .await
        .unwrap();

    let sent = h.primary.sent().await;
    assert_eq!(sent[0].cc, vec!["office@example.com".to_string()]);
}
