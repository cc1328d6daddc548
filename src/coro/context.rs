use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::core::errors::Result;

/// Mutable key/value store scoped to one coroutine.
///
/// Owned by the registry entry of its coroutine and discarded when that
/// coroutine terminates. Other coroutines reach it only through
/// [`CoroutineRegistry::context_for`](crate::CoroutineRegistry::context_for).
#[derive(Debug, Default)]
pub struct CoroutineContext {
    data: DashMap<String, Value>,
}

impl CoroutineContext {
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
        }
    }

    pub fn insert<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.data.insert(key.to_string(), value);
        Ok(())
    }

    pub fn insert_value(&self, key: &str, value: Value) {
        self.data.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.data.get(key).map(|value| value.clone())
    }

    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get(key)
            .and_then(|value| serde_json::from_value(value).ok())
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.data.remove(key).map(|(_, value)| value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insert_and_get() {
        let context = CoroutineContext::new();
        context.insert("count", &3).unwrap();
        context.insert_value("name", json!("worker"));

        assert_eq!(context.get("count"), Some(json!(3)));
        assert_eq!(context.get_as::<String>("name").as_deref(), Some("worker"));
        assert_eq!(context.len(), 2);
    }

    #[test]
    fn test_remove() {
        let context = CoroutineContext::new();
        context.insert("key", &"value").unwrap();
        assert_eq!(context.remove("key"), Some(json!("value")));
        assert!(context.is_empty());
        assert!(!context.contains_key("key"));
    }

    #[test]
    fn test_missing_key() {
        let context = CoroutineContext::new();
        assert_eq!(context.get("missing"), None);
        assert_eq!(context.get_as::<u64>("missing"), None);
    }
}
