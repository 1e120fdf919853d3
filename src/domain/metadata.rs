use indexmap::IndexMap;
use indexmap::map::Entry;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// A scalar value attached to a log message as a GELF additional field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Convert to the JSON value written on the wire.
    ///
    /// Values JSON cannot represent as numbers (NaN, infinities) are replaced
    /// by their string form instead of failing the whole message.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            FieldValue::Null => serde_json::Value::Null,
            FieldValue::Bool(b) => serde_json::Value::Bool(*b),
            FieldValue::Int(i) => serde_json::Value::from(*i),
            FieldValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or_else(|| serde_json::Value::String(f.to_string())),
            FieldValue::String(s) => serde_json::Value::String(s.clone()),
        }
    }

    /// Inverse of [`FieldValue::to_json`] for scalar JSON values.
    /// Arrays and objects collapse into their JSON text.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => FieldValue::Null,
            serde_json::Value::Bool(b) => FieldValue::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Int(i),
                None => FieldValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => FieldValue::String(s.clone()),
            other => FieldValue::String(other.to_string()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::Bool(b) => write!(f, "{b}"),
            FieldValue::Int(i) => write!(f, "{i}"),
            FieldValue::Float(x) => write!(f, "{x}"),
            FieldValue::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        FieldValue::Int(value as i64)
    }
}

impl From<u16> for FieldValue {
    fn from(value: u16) -> Self {
        FieldValue::Int(value as i64)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}

/// Ordered key/value envelope attached to a log message.
///
/// Keys are unique. Iteration follows insertion order so the envelope reads
/// the same way it was assembled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata {
    fields: IndexMap<String, FieldValue>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a field, returning the previous value.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<FieldValue>,
    ) -> Option<FieldValue> {
        self.fields.insert(key.into(), value.into())
    }

    /// Builder-style [`Metadata::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert only if the key is not present yet. Returns `true` when inserted.
    pub fn insert_absent(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> bool {
        match self.fields.entry(key.into()) {
            Entry::Occupied(entry) => {
                debug!("Metadata key '{}' already set, keeping earlier value", entry.key());
                false
            }
            Entry::Vacant(entry) => {
                entry.insert(value.into());
                true
            }
        }
    }

    /// Append every field of `other` whose key is not present yet.
    /// Earlier sources keep precedence over later ones.
    pub fn merge_absent(&mut self, other: Metadata) {
        for (key, value) in other.fields {
            self.insert_absent(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut metadata = Metadata::new();
        for (key, value) in iter {
            metadata.insert(key, value);
        }
        metadata
    }
}

impl IntoIterator for Metadata {
    type Item = (String, FieldValue);
    type IntoIter = indexmap::map::IntoIter<String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preserves_insertion_order() {
        let metadata = Metadata::new()
            .with("zeta", 1i64)
            .with("alpha", "a")
            .with("mid", true);

        let keys: Vec<&str> = metadata.keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_merge_absent_keeps_earlier_values() {
        let mut base = Metadata::new().with("file", "a.rs").with("line", 10u32);
        let later = Metadata::new().with("line", 99u32).with("request_method", "GET");

        base.merge_absent(later);

        assert_eq!(base.len(), 3);
        assert_eq!(base.get("line"), Some(&FieldValue::Int(10)));
        assert_eq!(base.get("request_method"), Some(&FieldValue::from("GET")));
        let keys: Vec<&str> = base.keys().collect();
        assert_eq!(keys, vec!["file", "line", "request_method"]);
    }

    #[test]
    fn test_non_finite_float_becomes_string() {
        assert_eq!(
            FieldValue::Float(f64::NAN).to_json(),
            serde_json::Value::String("NaN".to_string())
        );
        assert_eq!(
            FieldValue::Float(f64::INFINITY).to_json(),
            serde_json::Value::String("inf".to_string())
        );
        assert_eq!(FieldValue::Float(1.5).to_json(), serde_json::json!(1.5));
    }

    #[test]
    fn test_option_maps_to_null() {
        assert!(FieldValue::from(None::<String>).is_null());
        assert_eq!(FieldValue::from(Some(42u16)), FieldValue::Int(42));
    }

    #[test]
    fn test_nested_json_collapses_to_text() {
        let value = serde_json::json!({"a": [1, 2]});
        assert_eq!(
            FieldValue::from_json(&value),
            FieldValue::String("{\"a\":[1,2]}".to_string())
        );
    }
}
