//! Cache abstractions for raw provider responses.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub value: String,
    pub created_at: DateTime<Utc>,
}

/// A named bag of string values. Entries never expire on their own; callers
/// decide what an entry's age means.
///
/// Storage failures are not reported: a failed read is a miss and a failed
/// write is dropped.
#[async_trait]
pub trait KeyValueCollection: Send + Sync {
    async fn get(&self, key: &str) -> Option<CacheEntry>;
    async fn put(&self, key: &str, value: String);
    async fn remove(&self, key: &str);
    async fn clear(&self);
}

/// Hands out collections by name.
pub trait Store: Send + Sync {
    fn get_collection(&self, name: &str, persist: bool) -> Arc<dyn KeyValueCollection>;
}

/// How history responses are keyed in the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheMode {
    /// One entry per (symbol, currency, limit) query.
    #[default]
    Keyed,
    /// One global entry returned for every query, whatever was asked.
    SingleSlot,
}

const SINGLE_SLOT_KEY: &str = "history";

/// Stores the raw body of the last successful history response.
pub struct ResponseCache {
    collection: Arc<dyn KeyValueCollection>,
    mode: CacheMode,
}

impl ResponseCache {
    pub fn new(collection: Arc<dyn KeyValueCollection>, mode: CacheMode) -> Self {
        Self { collection, mode }
    }

    fn key(&self, symbol: &str, currency: &str, limit: u32) -> String {
        match self.mode {
            CacheMode::Keyed => format!(
                "history:{}:{}:{}",
                symbol.to_uppercase(),
                currency.to_uppercase(),
                limit
            ),
            CacheMode::SingleSlot => SINGLE_SLOT_KEY.to_string(),
        }
    }

    pub async fn load(&self, symbol: &str, currency: &str, limit: u32) -> Option<String> {
        let key = self.key(symbol, currency, limit);
        let entry = self.collection.get(&key).await?;
        debug!(key = %key, created_at = %entry.created_at, "Using cached history response");
        Some(entry.value)
    }

    pub async fn save(&self, symbol: &str, currency: &str, limit: u32, payload: &str) {
        let key = self.key(symbol, currency, limit);
        self.collection.put(&key, payload.to_string()).await;
    }

    /// Drops the entry that `load` would return for this query.
    pub async fn discard(&self, symbol: &str, currency: &str, limit: u32) {
        let key = self.key(symbol, currency, limit);
        self.collection.remove(&key).await;
    }

    pub async fn clear(&self) {
        self.collection.clear().await;
    }
}
