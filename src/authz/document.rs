use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::errors::AppError;

/// A record as the policy sees it: a JSON object whose fields may or may not
/// be present.
///
/// Every accessor is null-safe. A field that is missing, null, or of the
/// wrong type reads as "not set" instead of failing, so a record written
/// before a field existed is evaluated as if the field were `false`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    fields: Map<String, Value>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Accepts only JSON objects.
    pub fn from_value(value: Value) -> Result<Self, AppError> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            _ => Err(AppError::invalid_argument("expected a JSON object")),
        }
    }

    pub fn from_record<T: Serialize>(record: &T) -> Result<Self, AppError> {
        let value = serde_json::to_value(record)
            .map_err(|e| AppError::internal(format!("failed to serialize record: {e}")))?;
        Self::from_value(value).map_err(|_| AppError::internal("record did not serialize to an object"))
    }

    /// Converts back into a typed record; shape errors are the caller's fault.
    pub fn into_record<T: DeserializeOwned>(self) -> Result<T, AppError> {
        serde_json::from_value(Value::Object(self.fields))
            .map_err(|e| AppError::invalid_argument(format!("invalid record: {e}")))
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn without(mut self, key: &str) -> Self {
        self.fields.remove(key);
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.fields.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Present and not null.
    pub fn has(&self, key: &str) -> bool {
        matches!(self.fields.get(key), Some(v) if !v.is_null())
    }

    /// True only when the field holds the boolean `true`.
    pub fn flag(&self, key: &str) -> bool {
        self.fields.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    /// Missing, null, or a boolean. Anything else is malformed.
    pub fn is_bool_or_absent(&self, key: &str) -> bool {
        match self.fields.get(key) {
            None | Some(Value::Null) | Some(Value::Bool(_)) => true,
            Some(_) => false,
        }
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Whether the field is a string equal to `expected`.
    pub fn str_eq(&self, key: &str, expected: &str) -> bool {
        self.str_field(key) == Some(expected)
    }

    pub fn uuid_field(&self, key: &str) -> Option<Uuid> {
        self.str_field(key).and_then(|s| Uuid::parse_str(s).ok())
    }

    pub fn datetime_field(&self, key: &str) -> Option<DateTime<Utc>> {
        self.str_field(key)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Applies a merge patch: every top-level key in `patch` replaces the
    /// current value.
    pub fn merged(&self, patch: &Document) -> Document {
        let mut fields = self.fields.clone();
        for (k, v) in &patch.fields {
            fields.insert(k.clone(), v.clone());
        }
        Document { fields }
    }

    /// Keys whose value differs between `self` (before) and `after`,
    /// including keys added or removed.
    pub fn changed_fields(&self, after: &Document) -> BTreeSet<String> {
        let keys: BTreeSet<&String> = self.fields.keys().chain(after.fields.keys()).collect();
        keys.into_iter()
            .filter(|k| normalized(self.fields.get(*k)) != normalized(after.fields.get(*k)))
            .cloned()
            .collect()
    }

    /// Whether `key` holds the same value in both documents. Absent and
    /// null compare equal.
    pub fn unchanged(&self, after: &Document, key: &str) -> bool {
        normalized(self.fields.get(key)) == normalized(after.fields.get(key))
    }
}

fn normalized(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        Document::from_value(value).unwrap()
    }

    #[test]
    fn missing_and_malformed_flags_read_false() {
        let d = doc(json!({"isAdmin": "true", "disabled": null}));
        assert!(!d.flag("isAdmin"));
        assert!(!d.flag("disabled"));
        assert!(!d.flag("neverWritten"));
        assert!(!d.is_bool_or_absent("isAdmin"));
        assert!(d.is_bool_or_absent("disabled"));
        assert!(d.is_bool_or_absent("neverWritten"));
    }

    #[test]
    fn changed_fields_sees_additions_and_removals() {
        let before = doc(json!({"a": 1, "b": 2, "c": null}));
        let after = doc(json!({"a": 1, "b": 3, "d": true}));
        let changed: Vec<String> = before.changed_fields(&after).into_iter().collect();
        assert_eq!(changed, vec!["b".to_string(), "d".to_string()]);
    }

    #[test]
    fn merge_overwrites_only_patched_keys() {
        let base = doc(json!({"displayName": "A", "isAdmin": false}));
        let merged = base.merged(&doc(json!({"displayName": "B"})));
        assert_eq!(merged.str_field("displayName"), Some("B"));
        assert_eq!(merged.get("isAdmin"), Some(&json!(false)));
    }

    #[test]
    fn non_objects_are_rejected() {
        assert!(matches!(Document::from_value(json!([1])), Err(AppError::InvalidArgument(_))));
    }

    #[test]
    fn datetimes_parse_with_offsets() {
        let d = doc(json!({"createdAt": "2025-01-02T03:04:05+02:00"}));
        assert_eq!(d.datetime_field("createdAt").unwrap().to_rfc3339(), "2025-01-02T01:04:05+00:00");
        assert_eq!(d.datetime_field("missing"), None);
    }
}
