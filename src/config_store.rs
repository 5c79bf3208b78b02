//! `ConfigStore`: the persistence boundary for tuning state. Used to
//! persist the last-selected preset name and calibrated
//! `per_band_noise_floors`; the backend (filesystem, flash, remote KV) is
//! someone else's concern -- this module only defines the trait and a
//! simple JSON-file implementation for desktop/diagnostic use.

use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    Io { details: String },
    Serialization { details: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io { details } => write!(f, "config store I/O error: {details}"),
            StoreError::Serialization { details } => {
                write!(f, "config store serialization error: {details}")
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// Namespaced key/value persistence. `namespace` groups related keys (e.g.
/// `"audio"`); `key` identifies a single value within it (e.g.
/// `"last_preset"`, `"noise_floors"`).
pub trait ConfigStore {
    fn load(&self, namespace: &str, key: &str) -> Option<Vec<u8>>;
    fn store(&self, namespace: &str, key: &str, bytes: &[u8]) -> Result<(), StoreError>;

    /// Convenience wrapper: deserializes JSON-encoded bytes from `load`.
    fn load_json<T: DeserializeOwned>(&self, namespace: &str, key: &str) -> Option<T> {
        let bytes = self.load(namespace, key)?;
        serde_json::from_slice(&bytes).ok()
    }

    /// Convenience wrapper: JSON-encodes `value` before calling `store`.
    fn store_json<T: Serialize>(&self, namespace: &str, key: &str, value: &T) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(value).map_err(|e| StoreError::Serialization {
            details: e.to_string(),
        })?;
        self.store(namespace, key, &bytes)
    }
}

/// Desktop/diagnostic `ConfigStore` backed by one JSON file per
/// `namespace/key` pair under a root directory.
pub struct JsonFileConfigStore {
    root: PathBuf,
}

impl JsonFileConfigStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, namespace: &str, key: &str) -> PathBuf {
        self.root.join(namespace).join(format!("{key}.json"))
    }
}

impl ConfigStore for JsonFileConfigStore {
    fn load(&self, namespace: &str, key: &str) -> Option<Vec<u8>> {
        let path = self.path_for(namespace, key);
        fs::read(path).ok()
    }

    fn store(&self, namespace: &str, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.path_for(namespace, key);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| StoreError::Io {
                details: e.to_string(),
            })?;
        }
        fs::write(&path, bytes).map_err(|e| StoreError::Io {
            details: e.to_string(),
        })
    }
}

/// In-memory `ConfigStore`, used by tests that should not touch disk.
#[derive(Default)]
pub struct MemoryConfigStore {
    entries: std::sync::Mutex<std::collections::HashMap<(String, String), Vec<u8>>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn load(&self, namespace: &str, key: &str) -> Option<Vec<u8>> {
        self.entries
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), key.to_string()))
            .cloned()
    }

    fn store(&self, namespace: &str, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        self.entries
            .lock()
            .unwrap()
            .insert((namespace.to_string(), key.to_string()), bytes.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::pipeline::TuningPipeline;

    #[test]
    fn memory_store_round_trips_json() {
        let store = MemoryConfigStore::new();
        let tuning = TuningPipeline::default();
        store.store_json("audio", "tuning", &tuning).unwrap();
        let loaded: TuningPipeline = store.load_json("audio", "tuning").unwrap();
        assert_eq!(loaded, tuning);
    }

    #[test]
    fn missing_key_returns_none() {
        let store = MemoryConfigStore::new();
        assert!(store.load("audio", "missing").is_none());
    }

    #[test]
    fn json_file_store_round_trips_through_disk() {
        let dir = std::env::temp_dir().join(format!("lumacore-config-store-test-{}", std::process::id()));
        let store = JsonFileConfigStore::new(&dir);
        store.store("audio", "last_preset", b"\"SensoryBridge\"").unwrap();
        let loaded: String = store.load_json("audio", "last_preset").unwrap();
        assert_eq!(loaded, "SensoryBridge");
        let _ = fs::remove_dir_all(&dir);
    }
}
