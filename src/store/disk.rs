use std::path::Path;

use async_trait::async_trait;
use fjall::Keyspace;
use tokio::task;

use super::KeyValueStore;
use crate::Result;

const KEYSPACE: &str = "extension-storage";

/// On-disk store backed by a fjall keyspace
pub struct DiskStore {
    _db: fjall::Database,
    items: Keyspace,
}

fn get_from_store(items: Keyspace, key: Vec<u8>) -> Result<Option<Vec<u8>>> {
    Ok(items.get(key)?.map(|v| v.to_vec()))
}

impl DiskStore {
    /// Opens (or creates) the store under `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;
        let db = fjall::Database::builder(path).open()?;
        let items = db.keyspace(KEYSPACE, fjall::KeyspaceCreateOptions::default)?;
        tracing::debug!(path = %path.display(), "Opened disk store");
        Ok(Self { _db: db, items })
    }
}

#[async_trait]
impl KeyValueStore for DiskStore {
    #[tracing::instrument(name = "query_store", level = "debug", skip(self))]
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let items = self.items.clone();
        let key = key.as_bytes().to_vec();
        task::spawn_blocking(move || get_from_store(items, key)).await?
    }

    #[tracing::instrument(name = "put_store", level = "debug", skip(self, value), fields(bytes = value.len()))]
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let items = self.items.clone();
        let key = key.as_bytes().to_vec();
        task::spawn_blocking(move || items.insert(key, value)).await??;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let items = self.items.clone();
        let key = key.as_bytes().to_vec();
        task::spawn_blocking(move || items.remove(key)).await??;
        Ok(())
    }
}
