//! Command dispatch: bridges CLI args -> session actions -> output formatting.

pub mod auth;
pub mod config_cmd;
pub mod devices;
pub mod util;

use atomfan_core::Session;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch an API-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    session: &mut Session,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Login(args) => auth::login(session, args, global).await,
        Command::Logout => auth::logout(session, global),
        Command::Devices(args) => devices::handle(session, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
