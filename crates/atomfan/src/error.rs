//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable process exit codes.

use miette::Diagnostic;
use thiserror::Error;

use atomfan_config::ConfigError;
use atomfan_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Authentication ───────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(
        code(atomfan::auth_failed),
        help(
            "Check the API key and refresh token from the Atomberg developer portal,\n\
             then run: atomfan login"
        )
    )]
    AuthFailed { message: String },

    #[error("Session expired. Please re-authenticate.")]
    #[diagnostic(code(atomfan::session_expired), help("Run: atomfan login"))]
    SessionExpired,

    #[error("Not logged in")]
    #[diagnostic(
        code(atomfan::not_logged_in),
        help("Run: atomfan login --api-key <KEY> --refresh-token <TOKEN>")
    )]
    NotLoggedIn,

    // ── Devices ──────────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(
        code(atomfan::not_found),
        help("Run: atomfan devices list to see available fans")
    )]
    DeviceNotFound { message: String },

    #[error("Device '{identifier}' not found")]
    #[diagnostic(
        code(atomfan::not_found),
        help("Run: atomfan devices list to see available fans")
    )]
    UnknownDevice { identifier: String },

    // ── API / connection ─────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(
        code(atomfan::api_error),
        help("The Atomberg API rejected the request. Re-run with -vv for details.")
    )]
    ApiError { message: String, status: u16 },

    #[error("{message}")]
    #[diagnostic(
        code(atomfan::connection_failed),
        help(
            "Check your network connection and the API URL\n\
             (--api-url, ATOMBERG_API_URL or api_url in the config file)."
        )
    )]
    ConnectionFailed { message: String },

    #[error("Could not set up the HTTP client: {message}")]
    #[diagnostic(
        code(atomfan::client_setup),
        help("Check api_url, ca_cert and insecure in: atomfan config show")
    )]
    ClientSetup { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(atomfan::validation))]
    Validation { field: String, reason: String },

    // ── Local state ──────────────────────────────────────────────────
    #[error("Credential store error: {message}")]
    #[diagnostic(
        code(atomfan::credential_store),
        help("Try --store file, or check: atomfan config credentials-path")
    )]
    CredentialStore { message: String },

    #[error(transparent)]
    #[diagnostic(
        code(atomfan::config),
        help("Run: atomfan config path to locate the config file")
    )]
    Config(#[from] ConfigError),

    // ── Output ───────────────────────────────────────────────────────
    #[error("Failed to render output: {0}")]
    #[diagnostic(code(atomfan::render))]
    Render(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::AuthFailed { .. } | Self::SessionExpired | Self::NotLoggedIn => exit_code::AUTH,
            Self::DeviceNotFound { .. } | Self::UnknownDevice { .. } => exit_code::NOT_FOUND,
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Validation { .. } | Self::Config(ConfigError::Validation { .. }) => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::AuthenticationFailed { message } => Self::AuthFailed { message },
            CoreError::SessionExpired => Self::SessionExpired,
            CoreError::NotAuthenticated => Self::NotLoggedIn,
            CoreError::DeviceNotFound { message } => Self::DeviceNotFound { message },
            CoreError::RequestFailed {
                message,
                status: Some(status),
            } => Self::ApiError { message, status },
            CoreError::RequestFailed {
                message,
                status: None,
            } => Self::ConnectionFailed { message },
            CoreError::ValidationFailed { message } => Self::Validation {
                field: "command".into(),
                reason: message,
            },
            CoreError::Store(e) => Self::CredentialStore {
                message: e.to_string(),
            },
            CoreError::Config { message } => Self::ClientSetup { message },
        }
    }
}
