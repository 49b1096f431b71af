//! CLI configuration: thin wrapper around `atomfan_config`.
//!
//! Re-exports the shared types and applies `GlobalOpts` flag overrides
//! (--api-url, --timeout, --insecure, --store) on top of file + env.

use atomfan_core::Session;

use crate::cli::{GlobalOpts, StoreKind};
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use atomfan_config::{
    Config, CredentialBackend, config_path, load_config, load_file_config, save_config,
};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Load config from file + env, then layer CLI flags on top.
pub fn resolve(global: &GlobalOpts) -> Result<Config, CliError> {
    let mut cfg = load_config()?;
    apply_overrides(&mut cfg, global);
    Ok(cfg)
}

fn apply_overrides(cfg: &mut Config, global: &GlobalOpts) {
    if let Some(ref url) = global.api_url {
        cfg.api_url.clone_from(url);
    }
    if let Some(timeout) = global.timeout {
        cfg.timeout = timeout;
    }
    if global.insecure {
        cfg.insecure = true;
    }
    if let Some(store) = global.store {
        cfg.credential_store = match store {
            StoreKind::File => CredentialBackend::File,
            StoreKind::Keyring => CredentialBackend::Keyring,
        };
    }
}

/// Build a logged-out session from resolved config. Call `restore` or
/// `resume` on it to pick up saved credentials.
pub fn open_session(global: &GlobalOpts) -> Result<Session, CliError> {
    let cfg = resolve(global)?;
    let session_config = cfg.to_session_config()?;
    tracing::debug!(
        api_url = %session_config.base_url,
        store = cfg.credential_store.as_str(),
        "opening session"
    );
    Ok(Session::from_config(&session_config, cfg.open_store())?)
}
