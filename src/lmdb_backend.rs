//! Durable backend on LMDB.
//!
//! One environment directory (`<name>.lmdb`) per origin, holding a single
//! named database whose entries are `key -> JSON text`. The environment's
//! map size doubles as the storage quota: a write that does not fit fails
//! with `MDB_MAP_FULL`, which surfaces as [`StoreError::QuotaExceeded`].

use std::path::{Path, PathBuf};

use lmdb::{Cursor, Database, DatabaseFlags, Environment, Transaction, WriteFlags};
use log::{info, warn};

use crate::kv_backend::KeyValueBackend;
use crate::store_error::StoreError;

const CONTENT_DB: &str = "content";

/// LMDB refuses map sizes below a handful of pages.
const MIN_MAP_SIZE: usize = 64 * 1024;

/// Write-path conversion: a `MapFull` names the key that did not fit.
fn write_error(err: lmdb::Error, key: &str) -> StoreError {
    StoreError::from(err).for_write(key, 0)
}

pub struct LmdbBackend {
    env: Environment,
    db: Database,
    path: PathBuf,
}

impl LmdbBackend {
    /// Opens (creating if needed) `<directory>/<name>.lmdb`.
    pub fn open(directory: &Path, name: &str, map_size: usize) -> Result<Self, StoreError> {
        if name.trim().is_empty() {
            return Err(StoreError::StorageUnavailable(
                "store name must not be empty".to_string(),
            ));
        }

        let path = directory.join(format!("{name}.lmdb"));
        if path.exists() {
            info!("Opening existing content store at {}", path.display());
        } else {
            info!("Creating content store at {}", path.display());
        }

        std::fs::create_dir_all(&path).map_err(|e| {
            warn!("Could not create {}: {e}", path.display());
            StoreError::StorageUnavailable(format!("cannot create {}: {e}", path.display()))
        })?;

        let env = Environment::new()
            .set_max_dbs(1)
            .set_map_size(map_size.max(MIN_MAP_SIZE))
            .open(&path)
            .map_err(|e| {
                warn!("Failed to open LMDB environment at {}: {e}", path.display());
                StoreError::StorageUnavailable(format!("LMDB open failed: {e}"))
            })?;

        let db = env.create_db(Some(CONTENT_DB), DatabaseFlags::empty())?;

        Ok(Self { env, db, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes buffers to disk. The environment itself closes on drop.
    pub fn sync(&self) -> Result<(), StoreError> {
        self.env.sync(true)?;
        Ok(())
    }
}

impl KeyValueBackend for LmdbBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let txn = self.env.begin_ro_txn()?;
        let value = match txn.get(self.db, &key) {
            Ok(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
            Err(lmdb::Error::NotFound) => None,
            Err(e) => return Err(e.into()),
        };
        txn.commit()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let bytes = value.len();
        let mut txn = self
            .env
            .begin_rw_txn()
            .map_err(|e| StoreError::from(e).for_write(key, bytes))?;

        if let Err(e) = txn.put(self.db, &key, &value, WriteFlags::empty()) {
            txn.abort();
            warn!("LMDB put for '{}' failed: {e}", key);
            return Err(StoreError::from(e).for_write(key, bytes));
        }

        txn.commit()
            .map_err(|e| StoreError::from(e).for_write(key, bytes))
    }

    fn remove(&self, key: &str) -> Result<bool, StoreError> {
        let mut txn = self.env.begin_rw_txn().map_err(|e| write_error(e, key))?;
        match txn.del(self.db, &key, None) {
            Ok(()) => {
                txn.commit().map_err(|e| write_error(e, key))?;
                Ok(true)
            }
            Err(lmdb::Error::NotFound) => {
                txn.abort();
                Ok(false)
            }
            Err(e) => {
                txn.abort();
                Err(write_error(e, key))
            }
        }
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        let txn = self.env.begin_ro_txn()?;
        let mut keys = Vec::new();
        {
            let mut cursor = txn.open_ro_cursor(self.db)?;
            for (key, _) in cursor.iter() {
                keys.push(String::from_utf8_lossy(key).into_owned());
            }
        }
        txn.commit()?;
        Ok(keys)
    }

    fn clear(&self) -> Result<usize, StoreError> {
        let count = self.keys()?.len();
        let mut txn = self
            .env
            .begin_rw_txn()
            .map_err(|e| write_error(e, CONTENT_DB))?;
        if let Err(e) = txn.clear_db(self.db) {
            txn.abort();
            return Err(write_error(e, CONTENT_DB));
        }
        txn.commit().map_err(|e| write_error(e, CONTENT_DB))?;
        info!("Cleared {} keys from {}", count, self.path.display());
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let backend = LmdbBackend::open(dir.path(), "reopen", 1 << 20).unwrap();
            backend.set("articles", r#"[{"id":"1"}]"#).unwrap();
            backend.sync().unwrap();
        }

        let backend = LmdbBackend::open(dir.path(), "reopen", 1 << 20).unwrap();
        assert_eq!(
            backend.get("articles").unwrap().as_deref(),
            Some(r#"[{"id":"1"}]"#)
        );
        assert!(backend.path().ends_with("reopen.lmdb"));
    }

    #[test]
    fn missing_key_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LmdbBackend::open(dir.path(), "remove", 1 << 20).unwrap();

        assert_eq!(backend.get("news").unwrap(), None);
        assert!(!backend.remove("news").unwrap());

        backend.set("news", "[]").unwrap();
        assert!(backend.remove("news").unwrap());
        assert_eq!(backend.get("news").unwrap(), None);
    }

    #[test]
    fn keys_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LmdbBackend::open(dir.path(), "clear", 1 << 20).unwrap();
        backend.set("gallery", "[]").unwrap();
        backend.set("adminToken", "authenticated").unwrap();

        let mut keys = backend.keys().unwrap();
        keys.sort();
        assert_eq!(keys, vec!["adminToken".to_string(), "gallery".to_string()]);

        assert_eq!(backend.clear().unwrap(), 2);
        assert!(backend.keys().unwrap().is_empty());
    }

    #[test]
    fn empty_name_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(LmdbBackend::open(dir.path(), "  ", 1 << 20).is_err());
    }

    #[test]
    fn oversized_write_reports_quota() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LmdbBackend::open(dir.path(), "quota", MIN_MAP_SIZE).unwrap();

        let payload = "x".repeat(4 * MIN_MAP_SIZE);
        let err = backend.set("gallery", &payload).unwrap_err();
        match err {
            StoreError::QuotaExceeded { key, bytes } => {
                assert_eq!(key, "gallery");
                assert_eq!(bytes, payload.len());
            }
            other => panic!("expected quota error, got {other:?}"),
        }
    }

    #[test]
    fn map_full_outside_put_still_names_the_key() {
        match write_error(lmdb::Error::MapFull, "news") {
            StoreError::QuotaExceeded { key, bytes } => {
                assert_eq!(key, "news");
                assert_eq!(bytes, 0);
            }
            other => panic!("expected quota error, got {other:?}"),
        }
        assert!(matches!(
            write_error(lmdb::Error::BadTxn, "news"),
            StoreError::Backend(_)
        ));
    }
}
