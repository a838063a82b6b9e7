//! Local snapshot of the visible columns and the saved column groups.
//!
//! Storage is a flat string-keyed map of JSON strings, like a browser's
//! local storage. Two entries are used: `cols` holds the visible tickers as
//! a JSON array and `saved` holds a JSON object of group name -> array.
//! Anything missing or unreadable falls back to defaults.

use crate::error::Result;
use indexmap::IndexMap;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

pub const COLUMNS_KEY: &str = "cols";
pub const GROUPS_KEY: &str = "saved";
pub const DEFAULT_COLUMNS: [&str; 5] = ["META", "AMZN", "AAPL", "MSFT", "GOOG"];

/// Named column sets, in the order they were first saved.
pub type Groups = IndexMap<String, Vec<String>>;

/// String key-value storage.
pub trait Storage: Send + Sync {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
}

/// Storage kept in a single JSON file.
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl AsRef<Path>) -> Self {
        FileStorage {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> BTreeMap<String, String> {
        let Ok(text) = fs::read_to_string(&self.path) else {
            return BTreeMap::new();
        };
        serde_json::from_str(&text).unwrap_or_else(|e| {
            warn!("Ignoring unreadable state file {}: {}", self.path.display(), e);
            BTreeMap::new()
        })
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.read_all().remove(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.read_all();
        entries.insert(key.to_string(), value.to_string());

        // Replace atomically.
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_string_pretty(&entries)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Storage that lives only as long as the process.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// What is restored at startup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub columns: Vec<String>,
    pub groups: Groups,
}

impl Default for Snapshot {
    fn default() -> Self {
        Snapshot {
            columns: default_columns(),
            groups: Groups::new(),
        }
    }
}

pub fn default_columns() -> Vec<String> {
    DEFAULT_COLUMNS.iter().map(|t| t.to_string()).collect()
}

/// Reads both entries, falling back per entry when missing or corrupt.
pub fn load_snapshot(storage: &dyn Storage) -> Snapshot {
    let columns = read_entry::<Vec<String>>(storage, COLUMNS_KEY).unwrap_or_else(default_columns);
    let groups = read_entry::<Groups>(storage, GROUPS_KEY).unwrap_or_default();
    Snapshot { columns, groups }
}

fn read_entry<T: for<'de> Deserialize<'de>>(storage: &dyn Storage, key: &str) -> Option<T> {
    let text = storage.get_item(key)?;
    match serde_json::from_str(&text) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Discarding corrupt '{}' entry: {}", key, e);
            None
        }
    }
}

pub fn save_columns(storage: &dyn Storage, columns: &[String]) -> Result<()> {
    storage.set_item(COLUMNS_KEY, &serde_json::to_string(columns)?)
}

pub fn save_groups(storage: &dyn Storage, groups: &Groups) -> Result<()> {
    storage.set_item(GROUPS_KEY, &serde_json::to_string(groups)?)
}
