// Atomberg cloud API HTTP client
//
// Wraps `reqwest::Client` with endpoint construction and response
// normalization. The client holds no session state: every authenticated
// call takes the access token explicitly, and token refresh is the
// session layer's concern.

use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::{ControlCommand, Device, DeviceEnvelope, ErrorBody, TokenRequest, TokenResponse};
use crate::transport::TransportConfig;

/// Production API root.
pub const DEFAULT_BASE_URL: &str = "https://api.atomberg-iot.com";

const AUTH_UNREACHABLE: &str =
    "Failed to authenticate. Please check your credentials and network connection.";

// ── Per-operation error shaping ─────────────────────────────────────

/// The authenticated device operations. Each one maps failures into its
/// own error variant and message wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    ListDevices,
    ControlDevice,
    DeviceStatus,
}

impl Operation {
    /// Generic message for transport failures and unreadable bodies.
    fn retry_hint(self) -> &'static str {
        match self {
            Self::ListDevices => "Failed to fetch devices. Please try again.",
            Self::ControlDevice => "Failed to control device. Please try again.",
            Self::DeviceStatus => "Failed to fetch device status. Please try again.",
        }
    }

    fn status_message(self, status: StatusCode) -> String {
        let code = status.as_u16();
        match self {
            Self::ListDevices => format!("Failed to fetch devices: {code}"),
            Self::ControlDevice => format!("Failed to control device: {code}"),
            Self::DeviceStatus => format!("Failed to fetch device status: {code}"),
        }
    }

    fn remote_error(self, message: String, status: StatusCode) -> Error {
        let status = status.as_u16();
        match self {
            Self::ListDevices => Error::DeviceFetch { message, status },
            Self::ControlDevice => Error::Control { message, status },
            Self::DeviceStatus => Error::StatusFetch { message, status },
        }
    }

    fn network_error(self, cause: &reqwest::Error) -> Error {
        debug!(operation = ?self, error = %cause, "request failed");
        Error::Network {
            message: self.retry_hint().into(),
        }
    }
}

// ── Client ──────────────────────────────────────────────────────────

/// Async client for the Atomberg cloud API.
///
/// Cheap to clone: the underlying `reqwest::Client` is reference counted.
#[derive(Debug, Clone)]
pub struct AtombergClient {
    http: reqwest::Client,
    base_url: Url,
}

impl AtombergClient {
    /// Build a client for `base_url` using the given transport settings.
    pub fn new(base_url: &str, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::with_client(http, base_url)
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: &str) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self { http, base_url })
    }

    /// The API root all endpoint paths are appended to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Parse the base URL and strip any trailing slash so a path prefix
    /// (e.g. `https://proxy/atomberg/`) is preserved when joining.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        if url.cannot_be_a_base() {
            return Err(Error::InvalidUrl(
                url::ParseError::RelativeUrlWithCannotBeABaseBase,
            ));
        }
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&path);
        Ok(url)
    }

    // ── URL builder ─────────────────────────────────────────────────

    /// Append path segments to the base URL. Each segment is
    /// percent-encoded, so a device id can never escape its slot.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorized(
        builder: reqwest::RequestBuilder,
        access_token: &SecretString,
    ) -> reqwest::RequestBuilder {
        builder
            .bearer_auth(access_token.expose_secret())
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
    }

    // ── Operations ──────────────────────────────────────────────────

    /// Exchange the long-lived API key and refresh token for a short-lived
    /// access token.
    ///
    /// Fails with [`Error::Authentication`] on any non-success status (using
    /// the server's `message` when it sends one), on transport failure, and
    /// when the response carries no usable `access_token`.
    pub async fn exchange_token(
        &self,
        api_key: &SecretString,
        refresh_token: &SecretString,
    ) -> Result<SecretString, Error> {
        let url = self.endpoint(&["auth", "token"])?;
        debug!("POST {url}");

        let body = TokenRequest {
            api_key: api_key.expose_secret(),
            refresh_token: refresh_token.expose_secret(),
        };

        let resp = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                debug!(error = %e, "token exchange failed in transport");
                Error::Authentication {
                    message: AUTH_UNREACHABLE.into(),
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let message = remote_message(resp)
                .await
                .unwrap_or_else(|| format!("Authentication failed: {}", status.as_u16()));
            return Err(Error::Authentication { message });
        }

        let token: TokenResponse = resp.json().await.map_err(|e| {
            debug!(error = %e, "token response was not valid JSON");
            Error::Authentication {
                message: AUTH_UNREACHABLE.into(),
            }
        })?;

        match token.access_token {
            Some(token) if !token.is_empty() => {
                debug!("token exchange successful");
                Ok(SecretString::from(token))
            }
            _ => Err(Error::Authentication {
                message: "Authentication response did not include an access token.".into(),
            }),
        }
    }

    /// List the fans registered to the account.
    ///
    /// The device array is located by [`DeviceEnvelope::classify`]; an
    /// unrecognized body yields an empty list.
    pub async fn list_devices(&self, access_token: &SecretString) -> Result<Vec<Device>, Error> {
        let url = self.endpoint(&["devices"])?;
        debug!("GET {url}");

        let builder = Self::authorized(self.http.get(url), access_token);
        let body = Self::execute(Operation::ListDevices, builder).await?;

        let devices = DeviceEnvelope::classify(body).into_devices();
        debug!(count = devices.len(), "fetched devices");
        Ok(devices)
    }

    /// Send a control command to one device and return the raw response.
    ///
    /// A 404 always maps to [`Error::DeviceNotFound`], whatever the server
    /// said.
    pub async fn control_device(
        &self,
        access_token: &SecretString,
        device_id: &str,
        command: &ControlCommand,
    ) -> Result<Value, Error> {
        command.validate()?;

        let url = self.endpoint(&["devices", device_id, "control"])?;
        debug!(%command, "POST {url}");

        let builder = Self::authorized(self.http.post(url).json(command), access_token);
        Self::execute(Operation::ControlDevice, builder).await
    }

    /// Fetch the raw status document for one device.
    pub async fn get_device_status(
        &self,
        access_token: &SecretString,
        device_id: &str,
    ) -> Result<Value, Error> {
        let url = self.endpoint(&["devices", device_id, "status"])?;
        debug!("GET {url}");

        let builder = Self::authorized(self.http.get(url), access_token);
        Self::execute(Operation::DeviceStatus, builder).await
    }

    // ── Response handling ───────────────────────────────────────────

    /// Send an authenticated request and normalize the outcome.
    async fn execute(
        op: Operation,
        builder: reqwest::RequestBuilder,
    ) -> Result<Value, Error> {
        let resp = builder.send().await.map_err(|e| op.network_error(&e))?;
        let status = resp.status();

        if status == StatusCode::UNAUTHORIZED {
            debug!(operation = ?op, "access token rejected");
            return Err(Error::Unauthorized {
                status: status.as_u16(),
            });
        }

        if op == Operation::ControlDevice && status == StatusCode::NOT_FOUND {
            return Err(Error::DeviceNotFound);
        }

        if !status.is_success() {
            let message = remote_message(resp)
                .await
                .unwrap_or_else(|| op.status_message(status));
            return Err(op.remote_error(message, status));
        }

        resp.json().await.map_err(|e| op.network_error(&e))
    }
}

/// Pull `message` out of an error body, if the server sent a non-empty one.
async fn remote_message(resp: reqwest::Response) -> Option<String> {
    let raw = resp.text().await.ok()?;
    serde_json::from_str::<ErrorBody>(&raw)
        .ok()?
        .message
        .filter(|m| !m.is_empty())
}
