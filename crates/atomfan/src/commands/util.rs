//! Shared helpers for command handlers.

use std::io::{self, IsTerminal};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use atomfan_core::Session;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Pick up the saved session without touching the network.
///
/// Fails with `NotLoggedIn` unless a saved access token was found.
pub fn require_session(session: &mut Session) -> Result<(), CliError> {
    if session.restore()? {
        Ok(())
    } else {
        Err(CliError::NotLoggedIn)
    }
}

/// Await `action` behind a stderr spinner.
///
/// The spinner is the terminal rendering of the session's loading flag;
/// it is skipped in quiet mode and when stderr is not a terminal.
pub async fn with_spinner<T>(
    global: &GlobalOpts,
    message: &str,
    action: impl Future<Output = T>,
) -> T {
    let spinner = spinner(global, message);
    let out = action.await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    out
}

fn spinner(global: &GlobalOpts, message: &str) -> Option<ProgressBar> {
    if global.quiet || !io::stderr().is_terminal() {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    Some(pb)
}

/// Map a dialoguer / interactive I/O failure into CliError.
pub fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

/// Print a status line to stderr unless `--quiet`.
pub fn note(global: &GlobalOpts, message: &str) {
    if !global.quiet {
        eprintln!("{message}");
    }
}
