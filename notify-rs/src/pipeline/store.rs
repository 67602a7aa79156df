//! External-collaborator ports
//!
//! The persistence layer owns forms, rules and templates; this pipeline only
//! reads them through these traits. The in-memory implementation backs the
//! CLI (JSON fixtures) and the tests.

use crate::error::Result;
use crate::rules::EmailRule;
use crate::submission::FormSchema;
use crate::templates::EmailTemplate;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// An active rule with its template pre-joined
///
/// The template is optional because a rule can outlive its template; the
/// processor treats that as a per-rule failure, not a crash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleWithTemplate {
    pub rule: EmailRule,
    #[serde(default)]
    pub template: Option<EmailTemplate>,
}

#[async_trait]
pub trait FormStore: Send + Sync {
    async fn get_form(&self, form_id: &str) -> Result<Option<FormSchema>>;
}

#[async_trait]
pub trait RuleStore: Send + Sync {
    async fn get_active_rules(&self, form_id: &str) -> Result<Vec<RuleWithTemplate>>;
}

/// In-memory store, loaded from JSON fixtures
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    forms: Vec<FormSchema>,
    rules: Vec<RuleWithTemplate>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_form(&mut self, form: FormSchema) {
        self.forms.push(form);
    }

    pub fn add_rule(&mut self, rule: RuleWithTemplate) {
        self.rules.push(rule);
    }

    /// Load forms from a JSON array
    pub fn load_forms(&mut self, json: &str) -> Result<()> {
        let forms: Vec<FormSchema> = serde_json::from_str(json)?;
        self.forms.extend(forms);
        Ok(())
    }

    /// Load rules (with pre-joined templates) from a JSON array
    pub fn load_rules(&mut self, json: &str) -> Result<()> {
        let rules: Vec<RuleWithTemplate> = serde_json::from_str(json)?;
        self.rules.extend(rules);
        Ok(())
    }
}

#[async_trait]
impl FormStore for MemoryStore {
    async fn get_form(&self, form_id: &str) -> Result<Option<FormSchema>> {
        Ok(self.forms.iter().find(|f| f.id == form_id).cloned())
    }
}

#[async_trait]
impl RuleStore for MemoryStore {
    async fn get_active_rules(&self, form_id: &str) -> Result<Vec<RuleWithTemplate>> {
        Ok(self
            .rules
            .iter()
            .filter(|r| r.rule.active && r.rule.form_id == form_id)
            .cloned()
            .collect())
    }
}
