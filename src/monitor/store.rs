//! Key-value store clients used by the monitoring aggregator.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("key-value store unreachable: {0}")]
    Unreachable(String),

    #[error("store command failed: {0}")]
    Command(String),
}

/// One page of a cursor-based key scan. A returned cursor of 0 means the
/// scan is complete.
#[derive(Debug, Default)]
pub struct ScanPage {
    pub cursor: u64,
    pub keys: Vec<String>,
}

/// Client for the shared store the running modules publish their state into.
///
/// The key scan is chunked: callers start at cursor 0 and feed each returned
/// cursor back in until it comes back as 0. Implementations must terminate on
/// a finite store. Clients are shared across concurrent snapshot calls and
/// must be safe for that.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn scan_keys(&self, cursor: u64) -> Result<ScanPage, StoreError>;
    async fn get_value(&self, key: &str) -> Result<Option<String>, StoreError>;
}

/// Redis-backed store.
///
/// A multiplexed connection is obtained per call rather than held open, so a
/// broker outage at daemon startup only fails the requests that touch it.
pub struct RedisStore {
    client: redis::Client,
}

impl RedisStore {
    pub fn open(url: &str) -> Result<Self, StoreError> {
        let client =
            redis::Client::open(url).map_err(|e| StoreError::Unreachable(e.to_string()))?;
        Ok(Self { client })
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, StoreError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StoreError::Unreachable(e.to_string()))
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn scan_keys(&self, cursor: u64) -> Result<ScanPage, StoreError> {
        let mut conn = self.connection().await?;
        let (cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::Command(e.to_string()))?;
        Ok(ScanPage { cursor, keys })
    }

    async fn get_value(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection().await?;
        redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::Command(e.to_string()))
    }
}

/// In-memory store, selected with `redis_url = "memory"`. A stand-in for
/// development without a broker; module state written here is only visible
/// inside this process.
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
    batch: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_batch_size(10)
    }

    /// Batch size controls how many keys one scan page carries.
    pub fn with_batch_size(batch: usize) -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            batch: batch.max(1),
        }
    }

    pub fn set(&self, key: &str, value: &str) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key.to_string(), value.to_string());
        }
    }

    pub fn remove(&self, key: &str) {
        if let Ok(mut entries) = self.entries.write() {
            entries.remove(key);
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    // The cursor is a plain offset into the sorted key set.
    async fn scan_keys(&self, cursor: u64) -> Result<ScanPage, StoreError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StoreError::Command("lock poisoned".to_string()))?;
        let keys: Vec<String> = entries
            .keys()
            .skip(cursor as usize)
            .take(self.batch)
            .cloned()
            .collect();
        let consumed = cursor as usize + keys.len();
        let cursor = if consumed >= entries.len() {
            0
        } else {
            consumed as u64
        };
        Ok(ScanPage { cursor, keys })
    }

    async fn get_value(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StoreError::Command("lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }
}
