// ── Runtime session configuration ──
//
// Describes *where* and *how* to reach the API. Carries no credentials
// and never touches disk: the CLI builds a `SessionConfig` from its
// config file, environment and flags, then hands it in.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use atomfan_api::{TlsMode, TransportConfig};

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Trust an additional CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification. Only for local test rigs and debugging proxies.
    DangerAcceptInvalid,
}

/// Connection settings for one API endpoint.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// API root (e.g. `https://api.atomberg-iot.com`).
    pub base_url: Url,
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl SessionConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
        }
    }

    pub(crate) fn transport(&self) -> TransportConfig {
        let tls = match self.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(ref path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        };
        TransportConfig {
            tls,
            timeout: self.timeout,
        }
    }
}
