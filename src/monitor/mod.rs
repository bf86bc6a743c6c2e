//! The monitoring aggregator: a best-effort, sorted snapshot of every
//! key-value pair the running modules have published to the shared store.

pub mod store;

use std::collections::BTreeSet;
use std::sync::Arc;

use futures::future;
use serde::Serialize;
use thiserror::Error;

use store::{KeyValueStore, StoreError};

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("key enumeration failed: {0}")]
    Enumeration(#[source] StoreError),
}

/// One monitored key. `value` is `None` when the key vanished between the
/// scan and the fetch, or the fetch itself failed.
#[derive(Debug, Clone, Serialize)]
pub struct KeyValue {
    pub key: String,
    pub value: Option<String>,
}

/// Point-in-time view of the store, sorted by key.
///
/// Non-atomic by construction: keys may come and go while the scan runs, so
/// the snapshot is best-effort and built fresh on every request.
#[derive(Debug, Serialize)]
pub struct KeyValueSnapshot {
    pub pairs: Vec<KeyValue>,
}

impl KeyValueSnapshot {
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

pub struct MonitorAggregator {
    store: Arc<dyn KeyValueStore>,
}

impl MonitorAggregator {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Enumerate every key, fetch every value, return the sorted snapshot.
    ///
    /// Enumeration failure aborts the call; per-key fetch failures are
    /// absorbed as absent values.
    pub async fn snapshot(&self) -> Result<KeyValueSnapshot, SnapshotError> {
        let keys = self.collect_keys().await?;
        tracing::debug!("Monitoring snapshot over {} keys", keys.len());

        let fetches = keys.into_iter().map(|key| {
            let store = self.store.clone();
            async move {
                let value = match store.get_value(&key).await {
                    Ok(value) => value,
                    Err(e) => {
                        tracing::debug!("Fetch for '{}' failed, reporting absent: {}", key, e);
                        None
                    }
                };
                KeyValue { key, value }
            }
        });
        let mut pairs: Vec<KeyValue> = future::join_all(fetches).await;
        pairs.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(KeyValueSnapshot { pairs })
    }

    /// Chunked scan; duplicate keys across pages collapse in the set.
    async fn collect_keys(&self) -> Result<BTreeSet<String>, SnapshotError> {
        let mut keys = BTreeSet::new();
        let mut cursor = 0u64;
        loop {
            let page = self
                .store
                .scan_keys(cursor)
                .await
                .map_err(SnapshotError::Enumeration)?;
            keys.extend(page.keys);
            if page.cursor == 0 {
                break;
            }
            cursor = page.cursor;
        }
        Ok(keys)
    }
}
