//! Canonical record types

use serde::{Deserialize, Serialize};

/// Canonical slot a form field can map to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalTarget {
    Email,
    Name,
    FirstName,
    LastName,
    Phone,
    Date,
    Time,
    Location,
    Datetime,
}

impl CanonicalTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalTarget::Email => "email",
            CanonicalTarget::Name => "name",
            CanonicalTarget::FirstName => "first_name",
            CanonicalTarget::LastName => "last_name",
            CanonicalTarget::Phone => "phone",
            CanonicalTarget::Date => "date",
            CanonicalTarget::Time => "time",
            CanonicalTarget::Location => "location",
            CanonicalTarget::Datetime => "datetime",
        }
    }
}

/// Fixed-shape output of mapping, every slot nullable
///
/// Recomputed on demand from a payload + schema, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub email: Option<String>,
    pub name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub location: Option<String>,
    pub datetime: Option<String>,
    /// Anything not covered by the canonical slots, keyed by field id/label
    #[serde(default)]
    pub extra: Vec<(String, String)>,
}

impl CanonicalRecord {
    pub fn get(&self, target: CanonicalTarget) -> Option<&str> {
        let slot = match target {
            CanonicalTarget::Email => &self.email,
            CanonicalTarget::Name => &self.name,
            CanonicalTarget::FirstName => &self.first_name,
            CanonicalTarget::LastName => &self.last_name,
            CanonicalTarget::Phone => &self.phone,
            CanonicalTarget::Date => &self.date,
            CanonicalTarget::Time => &self.time,
            CanonicalTarget::Location => &self.location,
            CanonicalTarget::Datetime => &self.datetime,
        };
        slot.as_deref()
    }

    /// Fill a slot only if still empty; returns whether the write happened.
    /// First writer wins, which pins the slot-conflict tie-break to
    /// form-field declaration order.
    pub fn set_if_empty(&mut self, target: CanonicalTarget, value: String) -> bool {
        if value.trim().is_empty() {
            return false;
        }
        let slot = match target {
            CanonicalTarget::Email => &mut self.email,
            CanonicalTarget::Name => &mut self.name,
            CanonicalTarget::FirstName => &mut self.first_name,
            CanonicalTarget::LastName => &mut self.last_name,
            CanonicalTarget::Phone => &mut self.phone,
            CanonicalTarget::Date => &mut self.date,
            CanonicalTarget::Time => &mut self.time,
            CanonicalTarget::Location => &mut self.location,
            CanonicalTarget::Datetime => &mut self.datetime,
        };
        if slot.is_none() {
            *slot = Some(value);
            true
        } else {
            false
        }
    }

    pub fn push_extra(&mut self, key: impl Into<String>, value: String) {
        let key = key.into();
        if !self.extra.iter().any(|(k, _)| *k == key) {
            self.extra.push((key, value));
        }
    }

    /// Flat key/value view for the template context. Canonical slots are
    /// exposed under both snake_case and camelCase since templates are
    /// authored against whichever naming the author happened to see.
    pub fn flat_vars(&self) -> Vec<(String, String)> {
        let mut vars = Vec::new();
        let slots: [(&str, &str, &Option<String>); 9] = [
            ("email", "email", &self.email),
            ("name", "name", &self.name),
            ("first_name", "firstName", &self.first_name),
            ("last_name", "lastName", &self.last_name),
            ("phone", "phone", &self.phone),
            ("date", "date", &self.date),
            ("time", "time", &self.time),
            ("location", "location", &self.location),
            ("datetime", "dateTime", &self.datetime),
        ];
        for (snake, camel, value) in slots {
            if let Some(v) = value {
                vars.push((snake.to_string(), v.clone()));
                if camel != snake {
                    vars.push((camel.to_string(), v.clone()));
                }
            }
        }
        for (k, v) in &self.extra {
            vars.push((k.clone(), v.clone()));
        }
        vars
    }
}

/// Mapping engine options
#[derive(Debug, Clone, Copy, Default)]
pub struct MappingOptions {
    /// Emit one debug line per mapping decision
    pub trace: bool,
}
