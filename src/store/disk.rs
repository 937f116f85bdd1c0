use crate::core::cache::{CacheEntry, KeyValueCollection};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use fjall::{Keyspace, PartitionHandle, PersistMode};
use std::sync::Arc;
use tracing::debug;

/// Collection backed by a fjall partition. Values are stored as JSON-encoded
/// [`CacheEntry`] records.
pub struct DiskCollection {
    keyspace: Arc<Keyspace>,
    partition: PartitionHandle,
}

impl DiskCollection {
    pub fn new(keyspace: Arc<Keyspace>, partition: PartitionHandle) -> Self {
        Self {
            keyspace,
            partition,
        }
    }

    fn read(&self, key: &str) -> Result<Option<CacheEntry>> {
        match self.partition.get(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn write(&self, key: &str, value: String) -> Result<()> {
        let entry = CacheEntry {
            value,
            created_at: Utc::now(),
        };
        self.partition.insert(key, serde_json::to_vec(&entry)?)?;
        self.keyspace.persist(PersistMode::Buffer)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.partition.remove(key)?;
        self.keyspace.persist(PersistMode::Buffer)?;
        Ok(())
    }

    fn clear_all(&self) -> Result<()> {
        let mut keys = Vec::new();
        for item in self.partition.iter() {
            let (key, _) = item?;
            keys.push(key);
        }
        for key in keys {
            self.partition.remove(key)?;
        }
        self.keyspace.persist(PersistMode::Buffer)?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueCollection for DiskCollection {
    async fn get(&self, key: &str) -> Option<CacheEntry> {
        match self.read(key) {
            Ok(Some(entry)) => {
                debug!("Cache HIT for key: {}", key);
                Some(entry)
            }
            Ok(None) => {
                debug!("Cache MISS for key: {}", key);
                None
            }
            Err(e) => {
                debug!("DiskCollection get error for key {}: {}", key, e);
                None
            }
        }
    }

    async fn put(&self, key: &str, value: String) {
        match self.write(key, value) {
            Ok(()) => debug!("Cache PUT for key: {}", key),
            Err(e) => debug!("DiskCollection put error for key {}: {}", key, e),
        }
    }

    async fn remove(&self, key: &str) {
        match self.delete(key) {
            Ok(()) => debug!("Cache REMOVE for key: {}", key),
            Err(e) => debug!("DiskCollection remove error for key {}: {}", key, e),
        }
    }

    async fn clear(&self) {
        if let Err(e) = self.clear_all() {
            debug!("DiskCollection clear error: {}", e);
        }
    }
}
