//! Submission and form schema data structures

use crate::mapping::CanonicalTarget;
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A single submitted value
///
/// Form values arrive as JSON scalars or arrays (multi-select fields).
/// Anything else is collapsed to `Null` rather than rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Bool(bool),
    List(Vec<FieldValue>),
    Null,
}

impl FieldValue {
    /// Render the value as a display string (lists are comma-joined)
    pub fn as_text(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            FieldValue::Bool(b) => b.to_string(),
            FieldValue::List(items) => items
                .iter()
                .map(|v| v.as_text())
                .collect::<Vec<_>>()
                .join(", "),
            FieldValue::Null => String::new(),
        }
    }

    /// True when the value carries no usable content
    pub fn is_empty_like(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::List(items) => items.is_empty(),
            _ => false,
        }
    }

    /// Template-conditional truthiness: non-empty, not "false", not zero
    pub fn is_truthy(&self) -> bool {
        match self {
            FieldValue::Null => false,
            FieldValue::Bool(b) => *b,
            FieldValue::Number(n) => *n != 0.0,
            FieldValue::Text(s) => {
                let t = s.trim();
                !t.is_empty() && t != "false" && t != "0"
            }
            FieldValue::List(items) => !items.is_empty(),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            FieldValue::Text(s) => serializer.serialize_str(s),
            FieldValue::Number(n) => serializer.serialize_f64(*n),
            FieldValue::Bool(b) => serializer.serialize_bool(*b),
            FieldValue::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            FieldValue::Null => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct ValueVisitor;

        impl<'de> Visitor<'de> for ValueVisitor {
            type Value = FieldValue;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a string, number, boolean, array or null")
            }

            fn visit_str<E>(self, v: &str) -> std::result::Result<FieldValue, E>
            where
                E: de::Error,
            {
                Ok(FieldValue::Text(v.to_string()))
            }

            fn visit_string<E>(self, v: String) -> std::result::Result<FieldValue, E>
            where
                E: de::Error,
            {
                Ok(FieldValue::Text(v))
            }

            fn visit_bool<E>(self, v: bool) -> std::result::Result<FieldValue, E>
            where
                E: de::Error,
            {
                Ok(FieldValue::Bool(v))
            }

            fn visit_i64<E>(self, v: i64) -> std::result::Result<FieldValue, E>
            where
                E: de::Error,
            {
                Ok(FieldValue::Number(v as f64))
            }

            fn visit_u64<E>(self, v: u64) -> std::result::Result<FieldValue, E>
            where
                E: de::Error,
            {
                Ok(FieldValue::Number(v as f64))
            }

            fn visit_f64<E>(self, v: f64) -> std::result::Result<FieldValue, E>
            where
                E: de::Error,
            {
                Ok(FieldValue::Number(v))
            }

            fn visit_none<E>(self) -> std::result::Result<FieldValue, E>
            where
                E: de::Error,
            {
                Ok(FieldValue::Null)
            }

            fn visit_unit<E>(self) -> std::result::Result<FieldValue, E>
            where
                E: de::Error,
            {
                Ok(FieldValue::Null)
            }

            fn visit_seq<A: SeqAccess<'de>>(
                self,
                mut seq: A,
            ) -> std::result::Result<FieldValue, A::Error> {
                let mut items = Vec::new();
                while let Some(item) = seq.next_element()? {
                    items.push(item);
                }
                Ok(FieldValue::List(items))
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut map: A,
            ) -> std::result::Result<FieldValue, A::Error> {
                // Nested objects are not part of the form value model
                while map
                    .next_entry::<String, de::IgnoredAny>()?
                    .is_some()
                {}
                Ok(FieldValue::Null)
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

/// A form submission: opaque field ids mapped to values
///
/// Insertion order is preserved so mapping and heuristics iterate
/// deterministically (first-encountered wins on slot conflicts).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmissionPayload {
    entries: Vec<(String, FieldValue)>,
}

impl SubmissionPayload {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Insert or replace a value, keeping the original position on replace
    pub fn insert(&mut self, key: impl Into<String>, value: FieldValue) {
        let key = key.into();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Non-empty display string for the key, if any
    pub fn get_text(&self, key: &str) -> Option<String> {
        self.get(key).map(|v| v.as_text()).filter(|s| !s.trim().is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, FieldValue)> for SubmissionPayload {
    fn from_iter<T: IntoIterator<Item = (String, FieldValue)>>(iter: T) -> Self {
        let mut payload = SubmissionPayload::new();
        for (k, v) in iter {
            payload.insert(k, v);
        }
        payload
    }
}

impl Serialize for SubmissionPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SubmissionPayload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct PayloadVisitor;

        impl<'de> Visitor<'de> for PayloadVisitor {
            type Value = SubmissionPayload;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of field ids to values")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut map: A,
            ) -> std::result::Result<SubmissionPayload, A::Error> {
                let mut payload = SubmissionPayload::new();
                while let Some((key, value)) = map.next_entry::<String, FieldValue>()? {
                    payload.insert(key, value);
                }
                Ok(payload)
            }
        }

        deserializer.deserialize_map(PayloadVisitor)
    }
}

/// One field of a user-authored form
///
/// `stable_id` survives form redefinition; `id` may be regenerated, which is
/// why rules and mapping look fields up through a fallback chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormFieldDescriptor {
    pub id: String,
    #[serde(default)]
    pub label: String,
    /// Author-chosen widget type ("email", "tel", "date", "text", ...)
    #[serde(rename = "type", default)]
    pub field_type: String,
    #[serde(default)]
    pub stable_id: Option<String>,
    /// Author-declared canonical target; highest-trust mapping strategy
    #[serde(default)]
    pub explicit_mapping: Option<CanonicalTarget>,
    #[serde(default)]
    pub options: Vec<String>,
}

/// A published form: ordered field descriptors
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSchema {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub fields: Vec<FormFieldDescriptor>,
}

impl FormSchema {
    pub fn field_by_id(&self, id: &str) -> Option<&FormFieldDescriptor> {
        self.fields.iter().find(|f| f.id == id)
    }

    pub fn field_by_stable_id(&self, stable_id: &str) -> Option<&FormFieldDescriptor> {
        self.fields
            .iter()
            .find(|f| f.stable_id.as_deref() == Some(stable_id))
    }

    pub fn field_by_label(&self, label: &str) -> Option<&FormFieldDescriptor> {
        self.fields
            .iter()
            .find(|f| f.label.eq_ignore_ascii_case(label))
    }
}
