//! Config subcommand handlers.

use std::collections::BTreeMap;
use std::path::PathBuf;

use dialoguer::{Input, Select};
use serde::Serialize;

use atomfan_core::KeyValueStore;
use atomfan_core::store::CREDENTIAL_KEYS;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, CredentialBackend};
use crate::error::CliError;
use crate::output;

use super::util::{self, prompt_err};

const SETTABLE_KEYS: &str =
    "api_url, timeout, insecure, ca_cert, credential_store, credentials_path";

// ── Show ────────────────────────────────────────────────────────────

/// What `config show` prints: the resolved config plus whether each
/// credential is present. Secret values are never included.
#[derive(Serialize)]
struct ConfigView<'a> {
    config_path: PathBuf,
    #[serde(flatten)]
    config: &'a Config,
    #[serde(skip_serializing_if = "Option::is_none")]
    resolved_credentials_path: Option<PathBuf>,
    credentials: BTreeMap<&'static str, &'static str>,
}

fn credential_presence(store: &dyn KeyValueStore) -> BTreeMap<&'static str, &'static str> {
    CREDENTIAL_KEYS
        .iter()
        .map(|&key| {
            let state = match store.get(key) {
                Ok(Some(ref v)) if !v.is_empty() => "****",
                Ok(_) => "(not set)",
                Err(_) => "(unavailable)",
            };
            (key, state)
        })
        .collect()
}

/// Format config for display, masking credentials.
fn format_config_redacted(view: &ConfigView<'_>) -> String {
    let cfg = view.config;
    let mut lines = vec![
        format!("# {}", view.config_path.display()),
        format!("api_url = \"{}\"", cfg.api_url),
        format!("timeout = {}", cfg.timeout),
        format!("insecure = {}", cfg.insecure),
    ];
    if let Some(ref ca) = cfg.ca_cert {
        lines.push(format!("ca_cert = \"{}\"", ca.display()));
    }
    lines.push(format!("credential_store = \"{}\"", cfg.credential_store.as_str()));
    if let Some(ref path) = view.resolved_credentials_path {
        lines.push(format!("credentials_path = \"{}\"", path.display()));
    }

    lines.push(String::new());
    lines.push("[credentials]".into());
    for (key, state) in &view.credentials {
        lines.push(format!("{key} = {state}"));
    }

    lines.join("\n")
}

// ── Set ─────────────────────────────────────────────────────────────

fn invalid(field: &str, reason: impl Into<String>) -> CliError {
    CliError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

fn optional_path(value: &str) -> Option<PathBuf> {
    match value.trim() {
        "" | "none" => None,
        path => Some(PathBuf::from(path)),
    }
}

fn apply_setting(cfg: &mut Config, key: &str, value: &str) -> Result<(), CliError> {
    match key.replace('-', "_").as_str() {
        "api_url" => {
            let candidate = Config {
                api_url: value.to_owned(),
                ..cfg.clone()
            };
            candidate.to_session_config()?;
            cfg.api_url = value.to_owned();
        }
        "timeout" => {
            cfg.timeout = value
                .parse()
                .map_err(|_| invalid("timeout", "must be a whole number of seconds"))?;
        }
        "insecure" => {
            cfg.insecure = value
                .parse()
                .map_err(|_| invalid("insecure", "must be 'true' or 'false'"))?;
        }
        "ca_cert" => cfg.ca_cert = optional_path(value),
        "credential_store" => {
            cfg.credential_store = match value {
                "file" => CredentialBackend::File,
                "keyring" => CredentialBackend::Keyring,
                _ => return Err(invalid("credential_store", "must be 'file' or 'keyring'")),
            };
        }
        "credentials_path" => cfg.credentials_path = optional_path(value),
        other => {
            return Err(invalid(
                "key",
                format!("unknown key '{other}' (expected one of: {SETTABLE_KEYS})"),
            ));
        }
    }
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            let config_path = config::config_path();
            let current = config::load_file_config(&config_path)?;
            eprintln!("✨ atomfan configuration");
            eprintln!("   Config path: {}\n", config_path.display());

            let api_url: String = Input::new()
                .with_prompt("API URL")
                .default(current.api_url.clone())
                .interact_text()
                .map_err(prompt_err)?;

            let store_choices = &[
                "Credentials file in your data directory",
                "System keyring",
            ];
            let default_store = usize::from(current.credential_store == CredentialBackend::Keyring);
            let store_selection = Select::new()
                .with_prompt("Where should the session be saved?")
                .items(store_choices)
                .default(default_store)
                .interact()
                .map_err(prompt_err)?;

            let timeout: u64 = Input::new()
                .with_prompt("Request timeout (seconds)")
                .default(current.timeout)
                .interact_text()
                .map_err(prompt_err)?;

            let mut cfg = current;
            apply_setting(&mut cfg, "api_url", &api_url)?;
            cfg.timeout = timeout;
            cfg.credential_store = if store_selection == 0 {
                CredentialBackend::File
            } else {
                CredentialBackend::Keyring
            };

            let written = config::save_config(&cfg)?;
            eprintln!("\n✓ Configuration written to {}", written.display());
            eprintln!("\n  Next: atomfan login");
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = config::resolve(global)?;
            let store = cfg.open_store();
            let view = ConfigView {
                config_path: config::config_path(),
                config: &cfg,
                resolved_credentials_path: (cfg.credential_store == CredentialBackend::File)
                    .then(|| cfg.credentials_file()),
                credentials: credential_presence(store.as_ref()),
            };
            let out = output::render_single(&global.output, &view, format_config_redacted, |v| {
                v.config_path.display().to_string()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Set <key> <value> ───────────────────────────────────────
        ConfigCommand::Set { key, value } => {
            let path = config::config_path();
            let mut cfg = config::load_file_config(&path)?;
            apply_setting(&mut cfg, &key, &value)?;
            config::save_config(&cfg)?;
            util::note(global, &format!("✓ Set {key} in {}", path.display()));
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::CredentialsPath => {
            let cfg = config::resolve(global)?;
            output::print_output(&cfg.credentials_file().display().to_string(), global.quiet);
            Ok(())
        }
    }
}
