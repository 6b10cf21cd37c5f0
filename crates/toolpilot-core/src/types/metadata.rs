use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Free-form key/value annotations carried by messages and tool outputs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(flatten)]
    inner: BTreeMap<String, Value>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<K: Into<String>, V: Serialize>(&mut self, key: K, value: V) -> Option<Value> {
        serde_json::to_value(value)
            .ok()
            .and_then(|v| self.inner.insert(key.into(), v))
    }

    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.inner
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn get_raw(&self, key: &str) -> Option<&Value> {
        self.inner.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.inner.get(key).and_then(Value::as_str)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.inner.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.inner.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_get() {
        let mut meta = Metadata::new();
        meta.insert("exit_code", 2);
        meta.insert("status", "warning");

        assert_eq!(meta.get::<i32>("exit_code"), Some(2));
        assert_eq!(meta.get_str("status"), Some("warning"));
        assert_eq!(meta.get::<i32>("status"), None);
        assert_eq!(meta.len(), 2);
    }

    #[test]
    fn test_flattened_serialization() {
        let mut meta = Metadata::new();
        meta.insert("a", true);
        let json = serde_json::to_string(&meta).unwrap();
        assert_eq!(json, r#"{"a":true}"#);
    }
}
