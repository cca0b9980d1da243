//! Local node memory.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A node's private key/value store.
///
/// Values are JSON so algorithms can keep anything serializable here,
/// including [`NeighborLabel`](super::NeighborLabel)s and
/// [`AlarmHandle`](super::AlarmHandle)s. Keys iterate in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Memory(BTreeMap<String, Value>);

impl Memory {
    pub fn new() -> Self {
        Memory(BTreeMap::new())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Read a value back as a concrete type. `None` if the key is absent
    /// or holds something of another shape.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.0
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Insert a value, returning the previous one.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Serialize `value` and store it under `key`.
    pub fn store<T: Serialize>(
        &mut self,
        key: impl Into<String>,
        value: &T,
    ) -> serde_json::Result<()> {
        let value = serde_json::to_value(value)?;
        self.0.insert(key.into(), value);
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NeighborLabel;
    use serde_json::json;

    #[test]
    fn test_set_get_remove() {
        let mut m = Memory::new();
        assert!(m.set("count", 3).is_none());
        assert_eq!(m.set("count", 4), Some(json!(3)));
        assert_eq!(m.get("count"), Some(&json!(4)));
        assert_eq!(m.get_as::<u32>("count"), Some(4));
        assert_eq!(m.remove("count"), Some(json!(4)));
        assert!(m.is_empty());
    }

    #[test]
    fn test_store_typed_values() {
        let mut m = Memory::new();
        let children = vec![NeighborLabel::from_port(0), NeighborLabel::from_port(2)];
        m.store("children", &children).unwrap();
        let back: Vec<NeighborLabel> = m.get_as("children").unwrap();
        assert_eq!(back, children);
        // Wrong shape reads as absent.
        assert_eq!(m.get_as::<String>("children"), None);
    }

    #[test]
    fn test_sorted_iteration() {
        let mut m = Memory::new();
        m.set("b", 2);
        m.set("a", 1);
        let keys: Vec<_> = m.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }
}
