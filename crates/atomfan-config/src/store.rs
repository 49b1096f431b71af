// ── Durable credential stores ──
//
// `FileStore` keeps every key in one JSON object on disk. `KeyringStore`
// maps each key to its own entry under the `atomfan` keyring service.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use atomfan_core::{KeyValueStore, StoreError};

/// Keyring service name every entry is filed under.
pub const KEYRING_SERVICE: &str = "atomfan";

// ── FileStore ───────────────────────────────────────────────────────

/// JSON-file backed store. Writes go through an owner-only temp file
/// that is renamed into place.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&raw).map_err(|e| {
            StoreError::Corrupt(format!("{}: {e}", self.path.display()))
        })
    }

    /// Replace the file in one step: write a sibling temp file (created
    /// owner-only), then rename it over the target.
    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;
        let body = serde_json::to_string_pretty(entries)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(body.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        debug!(path = %self.path.display(), keys = entries.len(), "credentials written");
        Ok(())
    }

    fn remove_file(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock()?;
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock()?;
        let mut entries = match self.read_all() {
            Ok(entries) => entries,
            Err(StoreError::Corrupt(reason)) => {
                warn!(%reason, "overwriting unreadable credentials file");
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };
        entries.insert(key.to_owned(), value.to_owned());
        self.write_all(&entries)
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock()?;
        let mut entries = match self.read_all() {
            Ok(entries) => entries,
            // Nothing can be read back out of it; drop the file so the
            // store starts clean.
            Err(StoreError::Corrupt(reason)) => {
                warn!(%reason, "removing unreadable credentials file");
                return self.remove_file();
            }
            Err(e) => return Err(e),
        };
        if entries.remove(key).is_none() {
            return Ok(());
        }
        if entries.is_empty() {
            return self.remove_file();
        }
        self.write_all(&entries)
    }
}

// ── KeyringStore ────────────────────────────────────────────────────

/// System keyring backed store.
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self::with_service(KEYRING_SERVICE)
    }

    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry, StoreError> {
        keyring::Entry::new(&self.service, key).map_err(keyring_err)
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

fn keyring_err(e: keyring::Error) -> StoreError {
    StoreError::Backend(format!("keyring: {e}"))
}

impl KeyValueStore for KeyringStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(keyring_err(e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entry(key)?.set_password(value).map_err(keyring_err)
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(keyring_err(e)),
        }
    }
}
