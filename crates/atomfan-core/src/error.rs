// ── Core error types ──
//
// User-facing errors from atomfan-core. Remote messages pass through
// verbatim; the `From<atomfan_api::Error>` impl only decides which domain
// bucket a transport-layer failure belongs to.

use thiserror::Error;

use crate::store::StoreError;

/// Message shown when the one-shot token recovery fails.
pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please re-authenticate.";

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Session errors ───────────────────────────────────────────────
    #[error("{message}")]
    AuthenticationFailed { message: String },

    /// The access token was rejected and re-acquiring it (or the single
    /// retry after re-acquiring it) failed as well.
    #[error("Session expired. Please re-authenticate.")]
    SessionExpired,

    #[error("Not authenticated. Log in with an API key and refresh token first.")]
    NotAuthenticated,

    // ── Device errors ────────────────────────────────────────────────
    #[error("{message}")]
    DeviceNotFound { message: String },

    /// A device operation failed for any reason other than an expired
    /// token. `status` is absent for transport failures.
    #[error("{message}")]
    RequestFailed { message: String, status: Option<u16> },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    // ── Environment errors ───────────────────────────────────────────
    #[error("Credential store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Returns `true` when the user must authenticate again.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            Self::SessionExpired | Self::NotAuthenticated | Self::AuthenticationFailed { .. }
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<atomfan_api::Error> for CoreError {
    fn from(err: atomfan_api::Error) -> Self {
        use atomfan_api::Error as Api;

        match err {
            Api::Authentication { message } => Self::AuthenticationFailed { message },
            // Only reachable when recovery is bypassed; report it as the
            // session failure it is.
            Api::Unauthorized { .. } => Self::SessionExpired,
            Api::DeviceNotFound => Self::DeviceNotFound {
                message: Api::DeviceNotFound.to_string(),
            },
            Api::DeviceFetch { message, status }
            | Api::Control { message, status }
            | Api::StatusFetch { message, status } => Self::RequestFailed {
                message,
                status: Some(status),
            },
            Api::Network { message } => Self::RequestFailed {
                message,
                status: None,
            },
            Api::InvalidCommand { reason } => Self::ValidationFailed { message: reason },
            Api::InvalidUrl(e) => Self::Config {
                message: format!("Invalid URL: {e}"),
            },
            Api::Tls(message) => Self::Config { message },
        }
    }
}
