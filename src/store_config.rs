//! Store configuration, read from JSON.
//!
//! ```json
//! {
//!   "name": "stc-content",
//!   "directory": "/var/lib/stc",
//!   "quotaBytes": 5242880,
//!   "adminUsername": "admin",
//!   "adminPassword": "change-me"
//! }
//! ```
//!
//! Every field is optional. Without admin credentials nobody can log in.

use std::path::{Path, PathBuf};

use log::info;
use serde::Deserialize;

use crate::store_error::StoreError;

/// Browsers cap `localStorage` at roughly 5 MiB per origin.
pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;

pub const DEFAULT_STORE_NAME: &str = "stc-content";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreConfig {
    pub name: String,
    pub directory: PathBuf,
    pub quota_bytes: usize,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_STORE_NAME.to_string(),
            directory: PathBuf::from("."),
            quota_bytes: DEFAULT_QUOTA_BYTES,
            admin_username: None,
            admin_password: None,
        }
    }
}

impl StoreConfig {
    pub fn from_json_str(json: &str) -> Result<Self, StoreError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, StoreError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            StoreError::StorageUnavailable(format!("cannot read {}: {e}", path.display()))
        })?;
        let config = Self::from_json_str(&raw)?;
        info!("Loaded store configuration from {}", path.display());
        Ok(config)
    }

    /// Config for a named store in the working directory, as the FFI uses.
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn has_admin_credentials(&self) -> bool {
        matches!(
            (&self.admin_username, &self.admin_password),
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let config = StoreConfig::from_json_str("{}").unwrap();
        assert_eq!(config, StoreConfig::default());
        assert!(!config.has_admin_credentials());
    }

    #[test]
    fn camel_case_fields() {
        let config = StoreConfig::from_json_str(
            r#"{"name":"site","quotaBytes":1024,"adminUsername":"admin","adminPassword":"pw"}"#,
        )
        .unwrap();
        assert_eq!(config.name, "site");
        assert_eq!(config.quota_bytes, 1024);
        assert!(config.has_admin_credentials());
    }

    #[test]
    fn reads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, r#"{"directory":"/tmp/stc"}"#).unwrap();

        let config = StoreConfig::from_json_file(&path).unwrap();
        assert_eq!(config.directory, PathBuf::from("/tmp/stc"));
        assert!(StoreConfig::from_json_file(&dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn malformed_json_is_a_serialization_error() {
        let err = StoreConfig::from_json_str("not json{").unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}
