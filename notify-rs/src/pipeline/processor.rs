//! Per-submission processing

use crate::delivery::{
    AuditSink, DeliveryAttempt, DeliveryOrchestrator, DeliveryStatus, OutgoingEmail, Provider,
};
use crate::error::Result;
use crate::mapping::{MappingEngine, MappingOptions};
use crate::pipeline::store::{FormStore, RuleStore, RuleWithTemplate};
use crate::recipient::RecipientResolver;
use crate::rules::ConditionEvaluator;
use crate::submission::SubmissionPayload;
use crate::templates::{TemplateContext, TemplateRenderer};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Per-submission result returned to the triggering boundary
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SubmissionSummary {
    pub matching_rule_count: usize,
    pub sent_count: usize,
    pub failed_count: usize,
}

pub struct SubmissionProcessor {
    forms: Arc<dyn FormStore>,
    rules: Arc<dyn RuleStore>,
    orchestrator: Arc<DeliveryOrchestrator>,
    audit: Arc<dyn AuditSink>,
    mapping_options: MappingOptions,
    /// Extra flat template variables supplied by the trigger boundary
    /// (booking links, campaign tags, ...), added to every render context
    template_vars: Vec<(String, String)>,
}

impl SubmissionProcessor {
    pub fn new(
        forms: Arc<dyn FormStore>,
        rules: Arc<dyn RuleStore>,
        orchestrator: Arc<DeliveryOrchestrator>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            forms,
            rules,
            orchestrator,
            audit,
            mapping_options: MappingOptions::default(),
            template_vars: Vec::new(),
        }
    }

    pub fn with_mapping_options(mut self, options: MappingOptions) -> Self {
        self.mapping_options = options;
        self
    }

    pub fn with_template_vars(mut self, vars: Vec<(String, String)>) -> Self {
        self.template_vars = vars;
        self
    }

    /// Process one submission: evaluate every active rule of its form and
    /// deliver for the ones that match. Failures inside one rule never abort
    /// the siblings; the summary counts both outcomes.
    pub async fn process(
        &self,
        form_id: &str,
        submission_id: &str,
        payload: &SubmissionPayload,
    ) -> Result<SubmissionSummary> {
        let schema = self.forms.get_form(form_id).await?;
        let rules = self.rules.get_active_rules(form_id).await?;

        info!(
            "processing submission {} for form {}: {} active rules",
            submission_id,
            form_id,
            rules.len()
        );

        // Mapping context is shared, read-only, computed once per submission
        let record = MappingEngine::map(schema.as_ref(), payload, &self.mapping_options);

        let mut summary = SubmissionSummary::default();

        for entry in &rules {
            let outcome =
                ConditionEvaluator::evaluate(&entry.rule.conditions, payload, schema.as_ref());
            if !outcome.matches {
                debug!(
                    "rule {} did not match ({} conditions evaluated)",
                    entry.rule.id,
                    outcome.details.len()
                );
                continue;
            }
            summary.matching_rule_count += 1;

            if self.process_rule(entry, submission_id, payload, &record).await {
                summary.sent_count += 1;
            } else {
                summary.failed_count += 1;
            }
        }

        info!(
            "submission {} done: {} matched, {} sent, {} failed",
            submission_id,
            summary.matching_rule_count,
            summary.sent_count,
            summary.failed_count
        );

        Ok(summary)
    }

    /// Resolve, expand and deliver for one matched rule. Returns whether the
    /// notification went out.
    async fn process_rule(
        &self,
        entry: &RuleWithTemplate,
        submission_id: &str,
        payload: &SubmissionPayload,
        record: &crate::mapping::CanonicalRecord,
    ) -> bool {
        let rule = &entry.rule;

        let Some(template) = entry.template.as_ref() else {
            warn!("rule {} references missing template {}", rule.id, rule.template_id);
            self.record_skip(
                rule,
                submission_id,
                "",
                format!("template {} not found", rule.template_id),
            )
            .await;
            return false;
        };

        let Some(recipient) = RecipientResolver::resolve(rule, template, payload, record) else {
            warn!("rule {} has no usable recipient address", rule.id);
            self.record_skip(
                rule,
                submission_id,
                "",
                "no usable recipient address".to_string(),
            )
            .await;
            return false;
        };

        let mut ctx = TemplateContext::for_submission(record, payload);
        ctx.insert_flat("leadId", submission_id);
        for (key, value) in &self.template_vars {
            ctx.insert_flat(key.clone(), value.clone());
        }
        let (subject, html, text) = TemplateRenderer::render(template, &ctx);

        let email = OutgoingEmail {
            to: recipient.to,
            cc: recipient.cc,
            bcc: recipient.bcc,
            subject,
            html_body: html,
            text_body: text,
        };

        let outcome = self.orchestrator.send(&rule.id, submission_id, &email).await;
        outcome.success
    }

    /// Audit a rule that never reached a provider (missing template,
    /// unresolvable recipient). Sink failures are logged and swallowed.
    async fn record_skip(
        &self,
        rule: &crate::rules::EmailRule,
        submission_id: &str,
        recipient: &str,
        error: String,
    ) {
        let attempt = DeliveryAttempt {
            id: Uuid::new_v4().to_string(),
            rule_id: rule.id.clone(),
            submission_id: submission_id.to_string(),
            recipient: recipient.to_string(),
            subject: String::new(),
            provider: Provider::None,
            status: DeliveryStatus::Failed,
            error: Some(error),
            duration_ms: 0,
            created_at: Utc::now(),
        };
        if let Err(e) = self.audit.record(&attempt).await {
            warn!("failed to record skipped delivery for rule {}: {}", rule.id, e);
        }
    }
}
