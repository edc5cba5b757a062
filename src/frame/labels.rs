//! Label sets attached to fields

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// An order-insensitive set of string labels.
///
/// Backed by a sorted map so that the serialized form is canonical: two
/// label sets with the same pairs always produce the same JSON text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Labels(BTreeMap<String, String>);

impl Labels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a label, replacing any existing value for the name
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Canonical JSON object with sorted keys
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect(),
        )
    }

    /// Canonical JSON text with sorted keys
    pub fn to_json_string(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(&self.0)?)
    }

    /// Parse labels back from their JSON text
    pub fn from_json_str(text: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Labels {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Prometheus-style rendering: `{a="1", b="2"}`
impl fmt::Display for Labels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={:?}", k, v)?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_json_is_sorted() {
        let mut labels = Labels::new();
        labels.insert("zone", "b");
        labels.insert("app", "web");
        assert_eq!(labels.to_json_string().unwrap(), r#"{"app":"web","zone":"b"}"#);
        assert_eq!(labels.to_json().to_string(), r#"{"app":"web","zone":"b"}"#);
    }

    #[test]
    fn test_equality_ignores_insertion_order() {
        let a: Labels = [("x", "1"), ("y", "2")].into_iter().collect();
        let b: Labels = [("y", "2"), ("x", "1")].into_iter().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_display() {
        let labels: Labels = [("job", "api"), ("instance", "a")].into_iter().collect();
        assert_eq!(labels.to_string(), r#"{instance="a", job="api"}"#);
    }
}
