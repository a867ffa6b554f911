//! In-memory store for tests and ephemeral runs.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use volition_core::error::StoreError;
use volition_core::store::{StateStore, validate_key};

/// A store that keeps documents and lists in process memory.
#[derive(Clone, Default)]
pub struct MemoryStore {
    documents: Arc<RwLock<HashMap<String, serde_json::Value>>>,
    lists: Arc<RwLock<HashMap<String, Vec<serde_json::Value>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError> {
        validate_key(key)?;
        Ok(self.documents.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: serde_json::Value) -> Result<(), StoreError> {
        validate_key(key)?;
        self.documents.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn append(&self, key: &str, value: serde_json::Value) -> Result<(), StoreError> {
        validate_key(key)?;
        self.lists
            .write()
            .await
            .entry(key.to_string())
            .or_default()
            .push(value);
        Ok(())
    }

    async fn list(&self, key: &str) -> Result<Vec<serde_json::Value>, StoreError> {
        validate_key(key)?;
        Ok(self.lists.read().await.get(key).cloned().unwrap_or_default())
    }

    async fn trim(&self, key: &str, keep: usize) -> Result<usize, StoreError> {
        validate_key(key)?;
        let mut lists = self.lists.write().await;
        let Some(list) = lists.get_mut(key) else {
            return Ok(0);
        };
        let excess = list.len().saturating_sub(keep);
        list.drain(..excess);
        Ok(excess)
    }

    async fn remove(&self, key: &str) -> Result<bool, StoreError> {
        validate_key(key)?;
        let doc = self.documents.write().await.remove(key).is_some();
        let list = self.lists.write().await.remove(key).is_some();
        Ok(doc || list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn put_get_roundtrip() {
        let store = MemoryStore::new();
        store.put("affect", json!({"curiosity": 0.9})).await.unwrap();
        let value = store.get("affect").await.unwrap().unwrap();
        assert_eq!(value["curiosity"], 0.9);
        assert!(store.get("bandit").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn tail_and_trim() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store.append("journal", json!(i)).await.unwrap();
        }
        let tail = store.tail("journal", 2).await.unwrap();
        assert_eq!(tail, vec![json!(3), json!(4)]);

        assert_eq!(store.trim("journal", 3).await.unwrap(), 2);
        assert_eq!(store.list("journal").await.unwrap(), vec![json!(2), json!(3), json!(4)]);
    }

    #[tokio::test]
    async fn rejects_invalid_keys() {
        let store = MemoryStore::new();
        assert!(store.put("../x", json!(1)).await.is_err());
    }
}
