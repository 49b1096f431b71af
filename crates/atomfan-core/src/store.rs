// ── Credential persistence ──
//
// The session layer persists three string values: `api_key`,
// `refresh_token` and `access_token`. Storage sits behind the small
// `KeyValueStore` interface so the session can be driven against an
// in-memory map in tests and against a file or the system keyring in
// the binary.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::debug;

pub const API_KEY: &str = "api_key";
pub const REFRESH_TOKEN: &str = "refresh_token";
pub const ACCESS_TOKEN: &str = "access_token";

/// Every key the credential store owns.
pub const CREDENTIAL_KEYS: [&str; 3] = [API_KEY, REFRESH_TOKEN, ACCESS_TOKEN];

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored credentials are unreadable: {0}")]
    Corrupt(String),

    #[error("{0}")]
    Backend(String),
}

impl<T> From<PoisonError<T>> for StoreError {
    fn from(_: PoisonError<T>) -> Self {
        Self::Backend("credential store lock poisoned".into())
    }
}

/// String-valued key/value persistence.
///
/// Methods take `&self`; implementations provide their own interior
/// mutability so one store can be shared behind an `Arc`.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    /// Remove `key`. Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> Result<(), StoreError>;
}

// ── MemoryStore ──────────────────────────────────────────────────

/// Process-local store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held.
    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.lock()?.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock()?.remove(key);
        Ok(())
    }
}

// ── Credentials ──────────────────────────────────────────────────

/// The credential triple. `api_key` and `refresh_token` are supplied by
/// the user; `access_token` only ever comes from a successful exchange.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub api_key: SecretString,
    pub refresh_token: SecretString,
    pub access_token: Option<SecretString>,
}

/// Typed view over a [`KeyValueStore`] holding the credential keys.
#[derive(Clone)]
pub struct CredentialStore {
    backend: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Load persisted credentials.
    ///
    /// Returns `None` unless both the API key and refresh token are
    /// present and non-empty. An empty access token counts as absent.
    pub fn load(&self) -> Result<Option<Credentials>, StoreError> {
        let api_key = self.read(API_KEY)?;
        let refresh_token = self.read(REFRESH_TOKEN)?;

        let (Some(api_key), Some(refresh_token)) = (api_key, refresh_token) else {
            return Ok(None);
        };

        Ok(Some(Credentials {
            api_key: SecretString::from(api_key),
            refresh_token: SecretString::from(refresh_token),
            access_token: self.read(ACCESS_TOKEN)?.map(SecretString::from),
        }))
    }

    /// Persist the full triple after a successful exchange.
    pub fn save_login(&self, credentials: &Credentials) -> Result<(), StoreError> {
        self.backend
            .set(API_KEY, credentials.api_key.expose_secret())?;
        self.backend
            .set(REFRESH_TOKEN, credentials.refresh_token.expose_secret())?;
        match credentials.access_token {
            Some(ref token) => self.save_access_token(token),
            None => self.backend.delete(ACCESS_TOKEN),
        }
    }

    /// Replace only the access token (401 recovery).
    pub fn save_access_token(&self, token: &SecretString) -> Result<(), StoreError> {
        debug!("persisting access token");
        self.backend.set(ACCESS_TOKEN, token.expose_secret())
    }

    /// Delete every credential key. All deletes are attempted; the first
    /// failure is reported.
    pub fn clear(&self) -> Result<(), StoreError> {
        let mut first_err = None;
        for key in CREDENTIAL_KEYS {
            if let Err(e) = self.backend.delete(key) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.backend.get(key)?.filter(|v| !v.is_empty()))
    }
}
