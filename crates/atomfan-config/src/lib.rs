//! Configuration for the atomfan CLI.
//!
//! TOML config file plus `ATOMBERG_*` environment overrides, translation
//! to `atomfan_core::SessionConfig`, and the durable credential stores
//! (JSON file, system keyring) behind `atomfan_core::KeyValueStore`.

pub mod store;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use atomfan_core::{DEFAULT_BASE_URL, KeyValueStore, SessionConfig, TlsVerification};

pub use store::{FileStore, KeyringStore};

/// Prefix for environment overrides (`ATOMBERG_API_URL`, ...).
pub const ENV_PREFIX: &str = "ATOMBERG_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Where credentials are persisted between runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackend {
    /// JSON file in the platform data directory.
    #[default]
    File,
    /// System keyring (Keychain, Secret Service, Credential Manager).
    Keyring,
}

impl CredentialBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Keyring => "keyring",
        }
    }
}

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// API root.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Skip TLS verification.
    #[serde(default)]
    pub insecure: bool,

    /// Extra CA certificate to trust.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    #[serde(default)]
    pub credential_store: CredentialBackend,

    /// Override for the credentials file (file backend only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            timeout: default_timeout(),
            insecure: false,
            ca_cert: None,
            credential_store: CredentialBackend::default(),
            credentials_path: None,
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_BASE_URL.into()
}
fn default_timeout() -> u64 {
    30
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "atomfan", "atomfan")
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default location of the credentials file.
pub fn default_credentials_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback(".local/share").join("credentials.json"),
        |dirs| dirs.data_dir().join("credentials.json"),
    )
}

fn dirs_fallback(base: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(base);
    p.push("atomfan");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load config layering defaults, the TOML file at `path` (if present)
/// and `ATOMBERG_*` environment variables.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load only what the config file says, ignoring the environment. Used
/// when the file is about to be rewritten.
pub fn load_file_config(path: &Path) -> Result<Config, ConfigError> {
    let config: Config = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

impl Config {
    /// Build the core session configuration.
    pub fn to_session_config(&self) -> Result<SessionConfig, ConfigError> {
        let base_url: url::Url = self.api_url.parse().map_err(|e| ConfigError::Validation {
            field: "api_url".into(),
            reason: format!("{e}: {}", self.api_url),
        })?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ConfigError::Validation {
                field: "api_url".into(),
                reason: format!("expected an http(s) URL, got '{}'", self.api_url),
            });
        }

        let tls = if self.insecure {
            TlsVerification::DangerAcceptInvalid
        } else if let Some(ref ca_path) = self.ca_cert {
            TlsVerification::CustomCa(ca_path.clone())
        } else {
            TlsVerification::SystemDefaults
        };

        let mut session = SessionConfig::new(base_url);
        session.tls = tls;
        session.timeout = Duration::from_secs(self.timeout);
        Ok(session)
    }

    /// Credentials file in effect for the file backend.
    pub fn credentials_file(&self) -> PathBuf {
        self.credentials_path
            .clone()
            .unwrap_or_else(default_credentials_path)
    }

    /// Open the configured credential backend.
    pub fn open_store(&self) -> Arc<dyn KeyValueStore> {
        match self.credential_store {
            CredentialBackend::File => Arc::new(FileStore::new(self.credentials_file())),
            CredentialBackend::Keyring => Arc::new(KeyringStore::new()),
        }
    }
}
