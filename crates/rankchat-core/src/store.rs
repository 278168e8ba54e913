//! Key-value persistence for app state.
//!
//! Pinned-message ids and usage statistics live in a small JSON store keyed
//! under fixed, distinct storage keys. The store is a capability interface so
//! core logic and tests never depend on a specific backend: the app uses the
//! file-backed store, tests use the in-memory one.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::paths;

/// Storage key for the pinned-message id list.
pub const PINS_KEY: &str = "rankchat.pins";

/// Storage key for accumulated usage statistics.
pub const STATS_KEY: &str = "rankchat.stats";

/// Minimal get/set capability over JSON values.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&mut self, key: &str, value: Value) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;

    /// Reads and deserializes a value, treating missing or stale-shaped
    /// entries as absent.
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T>
    where
        Self: Sized,
    {
        self.get(key)
            .and_then(|value| serde_json::from_value(value).ok())
    }

    /// Serializes and stores a value.
    fn set_json<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()>
    where
        Self: Sized,
    {
        let value = serde_json::to_value(value).context("Failed to serialize store value")?;
        self.set(key, value)
    }
}

/// File-backed store persisting to a single JSON document.
///
/// The whole document is rewritten atomically (temp file + rename) on every
/// mutation; entries are held in memory between writes.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, Value>,
}

impl FileStore {
    /// Opens the store at the default state path.
    pub fn open_default() -> Result<Self> {
        Self::open(&paths::state_path())
    }

    /// Opens a store at a specific path, loading existing entries.
    ///
    /// A missing or unparseable file starts empty rather than failing; state
    /// here is never worth refusing to launch over.
    pub fn open(path: &Path) -> Result<Self> {
        let entries = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read state from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(&self.entries)
            .context("Failed to serialize state")?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json)
            .with_context(|| format!("Failed to write state to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &self.path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                self.path.display()
            )
        })?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        self.persist()
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        if self.entries.remove(key).is_some() {
            self.persist()?;
        }
        Ok(())
    }
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Loads the pinned-message id list.
pub fn load_pins<S: KeyValueStore>(store: &S) -> Vec<String> {
    store.get_json(PINS_KEY).unwrap_or_default()
}

/// Toggles a message id in the pin list. Returns whether it is now pinned.
pub fn toggle_pin<S: KeyValueStore>(store: &mut S, message_id: &str) -> Result<bool> {
    let mut pins = load_pins(store);
    let pinned = if let Some(pos) = pins.iter().position(|id| id == message_id) {
        pins.remove(pos);
        false
    } else {
        pins.push(message_id.to_string());
        true
    };
    store.set_json(PINS_KEY, &pins)?;
    Ok(pinned)
}

/// Drops pins whose message ids are no longer present (e.g., after new chat).
pub fn retain_pins<S: KeyValueStore>(store: &mut S, live_ids: &[String]) -> Result<()> {
    let mut pins = load_pins(store);
    pins.retain(|id| live_ids.contains(id));
    store.set_json(PINS_KEY, &pins)
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let mut store = MemoryStore::new();
        store.set_json("k", &vec!["a", "b"]).unwrap();
        let back: Vec<String> = store.get_json("k").unwrap();
        assert_eq!(back, vec!["a", "b"]);
        store.remove("k").unwrap();
        assert!(store.get("k").is_none());
    }

    #[test]
    fn test_file_store_persists_across_opens() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        {
            let mut store = FileStore::open(&path).unwrap();
            store
                .set("greeting", Value::String("hi".into()))
                .unwrap();
        }

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("greeting"), Some(Value::String("hi".into())));
    }

    #[test]
    fn test_file_store_corrupt_file_starts_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = FileStore::open(&path).unwrap();
        assert!(store.get("anything").is_none());
    }

    #[test]
    fn test_toggle_pin_flips_membership() {
        let mut store = MemoryStore::new();

        assert!(toggle_pin(&mut store, "msg-1").unwrap());
        assert!(toggle_pin(&mut store, "msg-2").unwrap());
        assert_eq!(load_pins(&store), vec!["msg-1", "msg-2"]);

        assert!(!toggle_pin(&mut store, "msg-1").unwrap());
        assert_eq!(load_pins(&store), vec!["msg-2"]);
    }

    #[test]
    fn test_retain_pins_drops_dead_ids() {
        let mut store = MemoryStore::new();
        toggle_pin(&mut store, "msg-1").unwrap();
        toggle_pin(&mut store, "msg-2").unwrap();

        retain_pins(&mut store, &["msg-2".to_string()]).unwrap();
        assert_eq!(load_pins(&store), vec!["msg-2"]);

        retain_pins(&mut store, &[]).unwrap();
        assert!(load_pins(&store).is_empty());
    }

    #[test]
    fn test_load_pins_empty_store() {
        let store = MemoryStore::new();
        assert!(load_pins(&store).is_empty());
    }
}
