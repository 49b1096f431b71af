// HTTP client construction: TLS trust, timeout, user agent.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::{Certificate, ClientBuilder};

use crate::error::Error;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("atomfan/", env!("CARGO_PKG_VERSION"));

/// How server certificates are checked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsMode {
    #[default]
    System,
    /// System roots plus one extra PEM certificate.
    CustomCa(PathBuf),
    /// No verification. Test rigs and intercepting proxies only.
    DangerAcceptInvalid,
}

impl TlsMode {
    fn configure(&self, builder: ClientBuilder) -> Result<ClientBuilder, Error> {
        Ok(match self {
            Self::System => builder,
            Self::CustomCa(path) => builder.add_root_certificate(load_ca(path)?),
            Self::DangerAcceptInvalid => builder.danger_accept_invalid_certs(true),
        })
    }
}

fn load_ca(path: &Path) -> Result<Certificate, Error> {
    let pem = std::fs::read(path)
        .map_err(|e| Error::Tls(format!("cannot read CA file {}: {e}", path.display())))?;
    Certificate::from_pem(&pem)
        .map_err(|e| Error::Tls(format!("{} is not a PEM certificate: {e}", path.display())))
}

/// Settings for the one `reqwest::Client` an [`AtombergClient`] uses.
///
/// [`AtombergClient`]: crate::AtombergClient
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    /// Whole-request timeout; expiry surfaces as a transport failure.
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl TransportConfig {
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT);

        self.tls
            .configure(builder)?
            .build()
            .map_err(|e| Error::Tls(format!("HTTP client setup failed: {e}")))
    }
}
