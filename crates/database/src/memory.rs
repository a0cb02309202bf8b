use crate::store::{StateStore, WriteBatch};
use crate::DbError;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// A process-local `StateStore`. A batch is applied under a single write
/// lock, so readers never observe half of a commit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of every key and value currently stored.
    pub async fn snapshot(&self) -> HashMap<String, Vec<u8>> {
        self.entries.read().await.clone()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, DbError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), DbError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), DbError> {
        let mut entries = self.entries.write().await;
        for (key, value) in batch.into_entries() {
            entries.insert(key, value);
        }
        Ok(())
    }
}
