//! Raw key-value persistence underneath the content store.
//!
//! The content store only ever needs string keys mapped to UTF-8 JSON text,
//! read and written whole. [`KeyValueBackend`] captures exactly that, so the
//! CRUD and notifier logic stay the same whether the bytes end up in an
//! in-process map, an LMDB environment or the browser's `localStorage`.

use std::collections::BTreeMap;
use std::sync::Mutex;

use log::{debug, warn};

use crate::store_error::StoreError;

/// Per-origin string key-value storage.
///
/// Implementations must make a completed `set` visible to every later `get`
/// on the same backend instance.
pub trait KeyValueBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Returns whether the key existed.
    fn remove(&self, key: &str) -> Result<bool, StoreError>;

    fn keys(&self) -> Result<Vec<String>, StoreError>;

    fn clear(&self) -> Result<usize, StoreError> {
        let keys = self.keys()?;
        let mut removed = 0;
        for key in &keys {
            if self.remove(key)? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// In-process backend with an optional byte quota.
///
/// The quota counts key and value bytes across all entries, the way browsers
/// account for `localStorage` usage.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<BTreeMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Bytes currently used by all keys and values.
    pub fn used_bytes(&self) -> usize {
        match self.entries.lock() {
            Ok(entries) => entries.iter().map(|(k, v)| k.len() + v.len()).sum(),
            Err(_) => 0,
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::StorageUnavailable("memory backend lock poisoned".to_string()))
    }
}

impl KeyValueBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.lock()?;

        if let Some(quota) = self.quota_bytes {
            let others: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let requested = key.len() + value.len();
            if others + requested > quota {
                warn!(
                    "Write to '{}' rejected: {} bytes requested, {} of {} in use",
                    key, requested, others, quota
                );
                return Err(StoreError::QuotaExceeded {
                    key: key.to_string(),
                    bytes: requested,
                });
            }
        }

        debug!("memory backend: set '{}' ({} bytes)", key, value.len());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.lock()?.remove(key).is_some())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.lock()?.keys().cloned().collect())
    }

    fn clear(&self) -> Result<usize, StoreError> {
        let mut entries = self.lock()?;
        let count = entries.len();
        entries.clear();
        Ok(count)
    }
}
