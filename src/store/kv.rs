//! Key-value substrate the typed store persists through

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::Result;

/// Narrow get/set/remove capability over opaque byte values
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Visible to every later `get` once the returned future resolves
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()>;

    async fn remove(&self, key: &str) -> Result<()>;
}

/// In-process store; contents are lost when dropped
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.items.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.items.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.items.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);

        store.set("k", vec![1, 2, 3]).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(vec![1, 2, 3]));

        store.remove("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }
}
