use thiserror::Error;

/// Top-level error type for the `atomfan-api` crate.
///
/// Every device operation separates "unauthorized" from everything else:
/// a 401 is the one failure the session layer recovers from on its own.
/// All other variants carry a message that is safe to show to a user
/// verbatim. Raw transport errors are logged, never embedded.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The token exchange failed (rejected credentials, transport failure,
    /// or a response without an access token).
    #[error("{message}")]
    Authentication { message: String },

    /// HTTP 401 on an authenticated call. The access token is stale or
    /// revoked; exchanging the refresh token again may resolve it.
    #[error("Unauthorized. Token may have expired.")]
    Unauthorized { status: u16 },

    // ── Device operations ───────────────────────────────────────────
    /// HTTP 404 on a control call. The message is fixed regardless of
    /// what the server sent.
    #[error("Device not found or not accessible.")]
    DeviceNotFound,

    /// Non-success status while listing devices.
    #[error("{message}")]
    DeviceFetch { message: String, status: u16 },

    /// Non-success status while sending a control command.
    #[error("{message}")]
    Control { message: String, status: u16 },

    /// Non-success status while reading device status.
    #[error("{message}")]
    StatusFetch { message: String, status: u16 },

    /// Command rejected before it was sent (empty, or speed out of range).
    #[error("Invalid command: {reason}")]
    InvalidCommand { reason: String },

    // ── Transport ───────────────────────────────────────────────────
    /// Transport-level failure or an unparseable success body.
    #[error("{message}")]
    Network { message: String },

    /// Base URL could not be parsed or extended.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The HTTP client could not be built (bad CA file, TLS backend).
    #[error("TLS error: {0}")]
    Tls(String),
}

impl Error {
    /// Returns `true` for the 401 case the session layer recovers from.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// HTTP status carried by the error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { status }
            | Self::DeviceFetch { status, .. }
            | Self::Control { status, .. }
            | Self::StatusFetch { status, .. } => Some(*status),
            Self::DeviceNotFound => Some(404),
            _ => None,
        }
    }
}
