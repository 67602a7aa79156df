//! Template rendering with variable substitution
//!
//! Syntax: `{{name}}`, `{{nested.path}}` and `{{#if cond}}...{{/if}}`.
//! Identifiers are case-sensitive. Unmatched variables are left in the
//! output verbatim so authors can spot unresolved placeholders; a nested
//! path whose head resolves but whose tail is missing expands to an empty
//! string instead.

use crate::mapping::CanonicalRecord;
use crate::submission::SubmissionPayload;
use crate::templates::EmailTemplate;
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

/// Layered lookup context, checked in order until a layer owns the variable:
/// flat top-level variables, the raw payload (`formData`), then ancillary
/// object trees (`submission`, `booking`, `lead`).
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    flat: Vec<(String, String)>,
    form_data: SubmissionPayload,
    objects: Vec<(String, Value)>,
}

/// Result of resolving one identifier
enum Lookup {
    Found(String),
    /// Some layer owns the head segment but the tail is missing
    OwnedButMissing,
    Unknown,
}

impl TemplateContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Standard context for a submission: canonical variables, synthetic
    /// variables, the raw payload, and the payload again under
    /// `submission.data` for templates authored against that path.
    ///
    /// `leadId` and boundary-supplied variables like `bookingLink` are not
    /// known at this layer; the processor adds them through `insert_flat`.
    pub fn for_submission(record: &CanonicalRecord, payload: &SubmissionPayload) -> Self {
        let mut ctx = Self::new();
        for (k, v) in record.flat_vars() {
            ctx.insert_flat(k, v);
        }
        ctx.insert_flat(
            "timeStamp",
            Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        );
        ctx.insert_flat("trackingToken", Uuid::new_v4().simple().to_string());
        ctx.form_data = payload.clone();

        let data = serde_json::to_value(payload).unwrap_or(Value::Null);
        ctx.insert_object("submission", serde_json::json!({ "data": data }));
        ctx
    }

    pub fn insert_flat(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        if let Some(entry) = self.flat.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value.into();
        } else {
            self.flat.push((key, value.into()));
        }
    }

    /// Attach an ancillary object tree (booking, lead, ...) for nested paths
    pub fn insert_object(&mut self, name: impl Into<String>, value: Value) {
        self.objects.push((name.into(), value));
    }

    fn resolve(&self, identifier: &str) -> Lookup {
        // Tier 1: flat variables, exact key (dotted literals included)
        if let Some((_, v)) = self.flat.iter().find(|(k, _)| k == identifier) {
            return Lookup::Found(v.clone());
        }

        // Tier 2: raw payload, exact key
        if let Some(value) = self.form_data.get(identifier) {
            return Lookup::Found(value.as_text());
        }

        if let Some((head, rest)) = identifier.split_once('.') {
            // Explicit formData.<key> path
            if head == "formData" {
                return match self.form_data.get(rest) {
                    Some(value) => Lookup::Found(value.as_text()),
                    None => Lookup::OwnedButMissing,
                };
            }

            // Tier 3: walk an ancillary object tree
            if let Some((_, root)) = self.objects.iter().find(|(name, _)| name == head) {
                let mut current = root;
                for segment in rest.split('.') {
                    match current.get(segment) {
                        Some(next) => current = next,
                        None => return Lookup::OwnedButMissing,
                    }
                }
                return Lookup::Found(Self::value_to_text(current));
            }

            // Head is a flat scalar; there is nothing to descend into
            if self.flat.iter().any(|(k, _)| k == head) || self.form_data.get(head).is_some() {
                return Lookup::OwnedButMissing;
            }

            return Lookup::Unknown;
        }

        // Single-segment identifier naming a whole ancillary object
        if let Some((_, root)) = self.objects.iter().find(|(name, _)| name == identifier) {
            return Lookup::Found(Self::value_to_text(root));
        }

        Lookup::Unknown
    }

    fn truthy(&self, identifier: &str) -> bool {
        match self.resolve(identifier) {
            Lookup::Found(v) => {
                let t = v.trim();
                !t.is_empty() && t != "false" && t != "0"
            }
            _ => false,
        }
    }

    fn value_to_text(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null => String::new(),
            other => serde_json::to_string(other).unwrap_or_default(),
        }
    }
}

/// Renders templates by substituting variables against a layered context
pub struct TemplateRenderer;

impl TemplateRenderer {
    /// Render subject, HTML body and text body of a template
    pub fn render(template: &EmailTemplate, ctx: &TemplateContext) -> (String, String, String) {
        let subject = Self::expand(&template.subject, ctx);
        let html = Self::expand(&template.html_content, ctx);
        let text = template
            .text_content
            .as_deref()
            .map(|t| Self::expand(t, ctx))
            .unwrap_or_default();
        (subject, html, text)
    }

    /// Expand all template syntax in a string
    pub fn expand(template: &str, ctx: &TemplateContext) -> String {
        let without_conditionals = Self::expand_conditionals(template, ctx);
        Self::expand_variables(&without_conditionals, ctx)
    }

    /// Process `{{#if cond}}...{{/if}}` blocks. No `{{else}}`, no nesting:
    /// each opener pairs with the next closer.
    fn expand_conditionals(template: &str, ctx: &TemplateContext) -> String {
        let mut result = String::with_capacity(template.len());
        let mut remaining = template;

        while let Some(start) = remaining.find("{{#if ") {
            let after_open = &remaining[start + 6..];
            let Some(cond_end) = after_open.find("}}") else {
                break;
            };
            let condition = after_open[..cond_end].trim();
            let body_start = start + 6 + cond_end + 2;

            let Some(close_rel) = remaining[body_start..].find("{{/if}}") else {
                break;
            };
            let body = &remaining[body_start..body_start + close_rel];

            result.push_str(&remaining[..start]);
            if ctx.truthy(condition) {
                result.push_str(body);
            }
            remaining = &remaining[body_start + close_rel + 7..];
        }

        result.push_str(remaining);
        result
    }

    /// Substitute `{{identifier}}` occurrences
    fn expand_variables(template: &str, ctx: &TemplateContext) -> String {
        let mut result = String::with_capacity(template.len());
        let mut remaining = template;

        while let Some(start) = remaining.find("{{") {
            let after_open = &remaining[start + 2..];
            let Some(end) = after_open.find("}}") else {
                break;
            };
            let raw = &after_open[..end];
            let identifier = raw.trim();

            result.push_str(&remaining[..start]);

            // Stray conditional markers are not variables
            if identifier.starts_with('#') || identifier.starts_with('/') || identifier.is_empty()
            {
                result.push_str("{{");
                result.push_str(raw);
                result.push_str("}}");
            } else {
                match ctx.resolve(identifier) {
                    Lookup::Found(value) => result.push_str(&value),
                    Lookup::OwnedButMissing => {}
                    Lookup::Unknown => {
                        // Left verbatim so authors can spot the typo
                        result.push_str("{{");
                        result.push_str(raw);
                        result.push_str("}}");
                    }
                }
            }

            remaining = &after_open[end + 2..];
        }

        result.push_str(remaining);
        result
    }
}
