mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, GlobalOpts};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.global);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        tracing::debug!(code, "command failed");
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

/// `RUST_LOG` wins; otherwise `-v` picks the level and `-q` keeps only
/// errors.
fn init_tracing(global: &GlobalOpts) {
    let level = match (global.quiet, global.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "atomfan=info,atomfan_core=info,atomfan_api=info,atomfan_config=info",
        (false, 2) => "atomfan=debug,atomfan_core=debug,atomfan_api=debug,atomfan_config=debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if global.log_json {
        builder.json().with_current_span(false).init();
    } else {
        builder.with_target(false).init();
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let Cli { global, command } = cli;
    match command {
        // Local only: no session, no network.
        Command::Config(args) => commands::config_cmd::handle(args, &global),
        Command::Completions(args) => {
            print_completions(args.shell);
            Ok(())
        }

        // Never log the command itself; login carries secrets.
        api_command => {
            let mut session = config::open_session(&global)?;
            commands::dispatch(api_command, &mut session, &global).await
        }
    }
}

fn print_completions(shell: clap_complete::Shell) {
    use clap::CommandFactory;

    let mut cmd = Cli::command();
    let name = cmd.get_name().to_owned();
    clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
}
