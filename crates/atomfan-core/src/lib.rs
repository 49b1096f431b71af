//! Session layer between `atomfan-api` and the CLI.
//!
//! - **[`Session`]** owns the credential triple and the cached device
//!   list. Every authenticated call goes through a one-shot recovery
//!   path: a 401 triggers exactly one token re-exchange and exactly one
//!   retry, after which the session either continues or ends in
//!   [`SessionState::LoggedOut`] with [`CoreError::SessionExpired`].
//!
//! - **[`KeyValueStore`]** is the persistence seam. [`MemoryStore`] lives
//!   here; file and keyring backends live in `atomfan-config`.
//!   [`CredentialStore`] is the typed view the session uses.
//!
//! - **[`SessionConfig`]** describes the endpoint and transport. It never
//!   carries credentials.

pub mod config;
pub mod error;
pub mod session;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{SessionConfig, TlsVerification};
pub use error::{CoreError, SESSION_EXPIRED_MESSAGE};
pub use session::{Session, SessionState};
pub use store::{CredentialStore, Credentials, KeyValueStore, MemoryStore, StoreError};

// Domain types callers need alongside a session.
pub use atomfan_api::{
    ControlCommand, DEFAULT_BASE_URL, Device, DeviceStatus, FanMode, FanSpeed, MAX_SPEED,
};
