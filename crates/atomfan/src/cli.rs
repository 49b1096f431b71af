//! Clap derive structures for the `atomfan` CLI.
//!
//! Also compiled by `build.rs` for man pages and completions, so this
//! module may only depend on `clap` and `clap_complete`.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// atomfan -- control Atomberg smart fans from the terminal
#[derive(Debug, Parser)]
#[command(
    name = "atomfan",
    version,
    about = "Control Atomberg smart fans from the command line",
    long_about = "Control Atomberg smart fans through the Atomberg cloud API.\n\n\
        Log in once with your developer API key and refresh token; the\n\
        session is saved and the access token is renewed automatically\n\
        when it expires.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// API base URL (overrides config and ATOMBERG_API_URL)
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short = 'o', default_value = "table", global = true)]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Request timeout in seconds (overrides config)
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Skip TLS certificate verification
    #[arg(long, short = 'k', global = true)]
    pub insecure: bool,

    /// Where credentials are persisted (overrides config)
    #[arg(long, global = true)]
    pub store: Option<StoreKind>,

    /// Write diagnostic logs to stderr as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,
}

// ── Shared Enums ─────────────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    /// JSON file in the user data directory
    File,
    /// System keyring
    Keyring,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PowerState {
    On,
    Off,
}

impl PowerState {
    pub fn is_on(self) -> bool {
        self == Self::On
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Normal,
    Sleep,
    Turbo,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Exchange an API key and refresh token for a session
    Login(LoginArgs),

    /// Forget the saved session and credentials
    Logout,

    /// List, inspect and control fans
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Login ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Developer API key (prompted when omitted)
    #[arg(long)]
    pub api_key: Option<String>,

    /// Refresh token (prompted when omitted)
    #[arg(long)]
    pub refresh_token: Option<String>,
}

// ── Devices ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List fans on the account
    #[command(alias = "ls")]
    List,

    /// Show one fan
    Get {
        /// Device ID
        device: String,
    },

    /// Show the raw status the API reports for one fan
    Status {
        /// Device ID
        device: String,
    },

    /// Turn a fan on or off
    Power {
        /// Device ID
        device: String,
        state: PowerState,
    },

    /// Set fan speed
    Speed {
        /// Device ID
        device: String,
        /// Speed step (0-6)
        #[arg(value_parser = clap::value_parser!(u8).range(0..=6))]
        speed: u8,
    },

    /// Set fan mode
    Mode {
        /// Device ID
        device: String,
        mode: ModeArg,
    },

    /// Send a combined command (at least one of --power, --speed, --mode)
    Set {
        /// Device ID
        device: String,

        #[arg(long)]
        power: Option<PowerState>,

        /// Speed step (0-6)
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=6))]
        speed: Option<u8>,

        #[arg(long)]
        mode: Option<ModeArg>,
    },
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create the config file with guided setup
    Init,

    /// Display the resolved configuration (credentials redacted)
    Show,

    /// Set a configuration value
    Set {
        /// Config key: api_url, timeout, insecure, ca_cert,
        /// credential_store, credentials_path
        key: String,

        /// Value to set
        value: String,
    },

    /// Print the config file path
    Path,

    /// Print the credentials file path used by the file store
    CredentialsPath,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
