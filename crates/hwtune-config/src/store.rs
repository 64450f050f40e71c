//! Durable preference store
//!
//! Maps a control node path to the last value the user committed for it.
//! Entries are only ever created or replaced, never deleted.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{OnceLock, RwLock};

use crate::ConfigError;

/// Key to last-committed-value mapping
pub trait PreferenceStore: Send + Sync {
    /// Stored value for `key`, or `default` if it was never committed
    fn get(&self, key: &str, default: i64) -> i64;

    /// Commit a value. Either the write reaches durable storage or the
    /// previous value stays in place.
    fn put(&self, key: &str, value: i64) -> Result<(), ConfigError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    values: BTreeMap<String, i64>,
}

/// Preference store backed by a TOML file
///
/// The file is read on first access. Every `put` rewrites it through a
/// temporary file in the same directory followed by a rename.
#[derive(Debug)]
pub struct TomlStore {
    path: PathBuf,
    values: OnceLock<RwLock<BTreeMap<String, i64>>>,
}

impl TomlStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            values: OnceLock::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of every committed entry
    pub fn entries(&self) -> BTreeMap<String, i64> {
        self.cache()
            .read()
            .map(|values| values.clone())
            .unwrap_or_default()
    }

    fn cache(&self) -> &RwLock<BTreeMap<String, i64>> {
        self.values.get_or_init(|| RwLock::new(self.read_file()))
    }

    fn read_file(&self) -> BTreeMap<String, i64> {
        if !self.path.exists() {
            tracing::debug!("No preference file at {}", self.path.display());
            return BTreeMap::new();
        }

        let parsed = std::fs::read_to_string(&self.path)
            .map_err(ConfigError::from)
            .and_then(|contents| toml::from_str::<StoreFile>(&contents).map_err(ConfigError::from));

        match parsed {
            Ok(file) => {
                tracing::debug!(
                    "Loaded {} preferences from {}",
                    file.values.len(),
                    self.path.display()
                );
                file.values
            }
            Err(e) => {
                tracing::warn!(
                    "Ignoring unreadable preference file {}: {}",
                    self.path.display(),
                    e
                );
                BTreeMap::new()
            }
        }
    }

    fn write_file(&self, values: &BTreeMap<String, i64>) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(&StoreFile {
            values: values.clone(),
        })?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let mut temp = tempfile::NamedTempFile::new_in(&dir)?;
        temp.write_all(contents.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| ConfigError::Persist {
            path: self.path.clone(),
            source: e.error,
        })?;

        Ok(())
    }
}

impl PreferenceStore for TomlStore {
    fn get(&self, key: &str, default: i64) -> i64 {
        self.cache()
            .read()
            .ok()
            .and_then(|values| values.get(key).copied())
            .unwrap_or(default)
    }

    fn put(&self, key: &str, value: i64) -> Result<(), ConfigError> {
        let mut values = self
            .cache()
            .write()
            .map_err(|_| ConfigError::Invalid("preference cache poisoned".into()))?;

        let mut next = values.clone();
        next.insert(key.to_string(), value);
        self.write_file(&next)?;
        *values = next;

        tracing::debug!("Committed {} = {}", key, value);
        Ok(())
    }
}

/// Volatile store, for tests and previews that must not touch disk
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, i64>>,
    fail_puts: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder helper to seed a committed value
    pub fn with_value(self, key: &str, value: i64) -> Self {
        if let Ok(mut values) = self.values.write() {
            values.insert(key.to_string(), value);
        }
        self
    }

    /// Make following puts fail, leaving stored values untouched
    pub fn set_fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    /// Raw lookup without a default
    pub fn value(&self, key: &str) -> Option<i64> {
        self.values
            .read()
            .ok()
            .and_then(|values| values.get(key).copied())
    }

    pub fn len(&self) -> usize {
        self.values.read().map(|values| values.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str, default: i64) -> i64 {
        self.value(key).unwrap_or(default)
    }

    fn put(&self, key: &str, value: i64) -> Result<(), ConfigError> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(ConfigError::Io(std::io::Error::from(
                std::io::ErrorKind::PermissionDenied,
            )));
        }

        let mut values = self
            .values
            .write()
            .map_err(|_| ConfigError::Invalid("preference cache poisoned".into()))?;
        values.insert(key.to_string(), value);
        Ok(())
    }
}
