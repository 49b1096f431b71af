//! Login / logout handlers.

use std::io::{self, IsTerminal};

use secrecy::SecretString;

use atomfan_core::Session;

use crate::cli::{GlobalOpts, LoginArgs};
use crate::error::CliError;

use super::{devices, util};

pub async fn login(
    session: &mut Session,
    args: LoginArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let api_key = secret_or_prompt(args.api_key, "API key", "api-key")?;
    let refresh_token = secret_or_prompt(args.refresh_token, "Refresh token", "refresh-token")?;

    let devices = util::with_spinner(
        global,
        "Authenticating",
        session.authenticate(api_key, refresh_token),
    )
    .await?;

    util::note(
        global,
        &format!("✓ Logged in ({} fan(s) on this account)", devices.len()),
    );
    devices::print_devices(devices, global)
}

pub fn logout(session: &mut Session, global: &GlobalOpts) -> Result<(), CliError> {
    session.logout()?;
    util::note(global, "✓ Logged out, saved credentials removed");
    Ok(())
}

/// Use the flag value, or prompt with hidden input when on a terminal.
fn secret_or_prompt(
    value: Option<String>,
    label: &str,
    flag: &str,
) -> Result<SecretString, CliError> {
    let value = match value {
        Some(v) => v,
        None if io::stdin().is_terminal() => {
            rpassword::prompt_password(format!("{label}: ")).map_err(util::prompt_err)?
        }
        None => {
            return Err(CliError::Validation {
                field: flag.into(),
                reason: format!("pass --{flag} when not running interactively"),
            });
        }
    };

    let value = value.trim().to_owned();
    if value.is_empty() {
        return Err(CliError::Validation {
            field: flag.into(),
            reason: format!("{label} cannot be empty"),
        });
    }
    Ok(SecretString::from(value))
}
