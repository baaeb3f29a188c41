//! Typed failures of the content store write path.
//!
//! Reads never surface these: a missing or unparseable collection degrades
//! to an empty one. Only conditions the admin has to see ("could not save,
//! storage is full") travel back to the caller as a [`StoreError`].

use std::fmt::{Display, Formatter};

use lmdb::Error as LmdbError;
use serde_json::Error as SerdeError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The serialized payload does not fit in the backend's quota.
    QuotaExceeded { key: String, bytes: usize },
    /// The backend cannot be reached at all (storage disabled, env closed).
    StorageUnavailable(String),
    /// Any other backend failure.
    Backend(String),
    Serialization(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::QuotaExceeded { key, bytes } => write!(
                f,
                "Could not save '{}': storage is full ({} bytes requested)",
                key, bytes
            ),
            StoreError::StorageUnavailable(msg) => write!(f, "Storage unavailable: {}", msg),
            StoreError::Backend(msg) => write!(f, "Storage error: {}", msg),
            StoreError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<SerdeError> for StoreError {
    fn from(err: SerdeError) -> Self {
        StoreError::Serialization(format!("JSON serialization error: {}", err))
    }
}

impl From<LmdbError> for StoreError {
    fn from(err: LmdbError) -> Self {
        match err {
            LmdbError::MapFull => StoreError::QuotaExceeded {
                key: String::new(),
                bytes: 0,
            },
            LmdbError::Corrupted | LmdbError::Panic | LmdbError::Invalid => {
                StoreError::StorageUnavailable(format!("LMDB environment unusable: {}", err))
            }
            _ => StoreError::Backend(format!("LMDB error: {}", err)),
        }
    }
}

impl StoreError {
    /// Attaches the key and payload size to a quota failure raised without them.
    pub fn for_write(self, key: &str, bytes: usize) -> Self {
        match self {
            StoreError::QuotaExceeded { .. } => StoreError::QuotaExceeded {
                key: key.to_string(),
                bytes,
            },
            other => other,
        }
    }

    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, StoreError::QuotaExceeded { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_full_becomes_quota_error_with_context() {
        let err = StoreError::from(LmdbError::MapFull).for_write("gallery", 4096);
        assert_eq!(
            err,
            StoreError::QuotaExceeded {
                key: "gallery".to_string(),
                bytes: 4096
            }
        );
        assert!(err.to_string().contains("storage is full"));
    }

    #[test]
    fn for_write_leaves_other_errors_alone() {
        let err = StoreError::Backend("boom".to_string()).for_write("news", 10);
        assert_eq!(err, StoreError::Backend("boom".to_string()));
        assert!(!err.is_quota_exceeded());
    }
}
