// ── Session lifecycle ──
//
// Owns the credential triple, the cached device list and the observable
// session state. Every authenticated call runs through `with_recovery`,
// which on a 401 re-exchanges the stored key pair exactly once, persists
// the new access token and retries the original call exactly once.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{debug, info, warn};

use atomfan_api::{AtombergClient, ControlCommand, Device};

use crate::config::SessionConfig;
use crate::error::CoreError;
use crate::store::{CredentialStore, Credentials, KeyValueStore};

// ── SessionState ─────────────────────────────────────────────────

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum SessionState {
    #[default]
    LoggedOut,
    Authenticating,
    LoggedIn,
    /// A call was rejected with 401 and the token is being re-acquired.
    Recovering,
}

// ── Session ──────────────────────────────────────────────────────

/// Authenticated view of one Atomberg account.
///
/// Actions take `&mut self`: the session is driven by a single caller and
/// never has two requests in flight.
pub struct Session {
    client: AtombergClient,
    store: CredentialStore,
    state: SessionState,
    credentials: Option<Credentials>,
    devices: Vec<Device>,
    last_error: Option<String>,
    loading: bool,
    last_refreshed: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(client: AtombergClient, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            client,
            store: CredentialStore::new(store),
            state: SessionState::LoggedOut,
            credentials: None,
            devices: Vec::new(),
            last_error: None,
            loading: false,
            last_refreshed: None,
        }
    }

    /// Build the HTTP client from `config` and wrap it in a fresh session.
    pub fn from_config(
        config: &SessionConfig,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self, CoreError> {
        let client = AtombergClient::new(config.base_url.as_str(), &config.transport())?;
        Ok(Self::new(client, store))
    }

    // ── Observers ────────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(
            self.state,
            SessionState::LoggedIn | SessionState::Recovering
        )
    }

    /// Devices from the most recent successful fetch.
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn device(&self, id: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.id == id)
    }

    /// Message of the most recent failed action. Cleared when the next
    /// action starts.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        self.last_refreshed
    }

    /// Whether an API key and refresh token are held in memory, whatever
    /// the session state.
    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    pub fn base_url(&self) -> &url::Url {
        self.client.base_url()
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Load persisted credentials without touching the network.
    ///
    /// Returns `true` when a saved access token put the session straight
    /// into `LoggedIn`. Credentials without an access token are kept in
    /// memory but the session stays `LoggedOut`.
    pub fn restore(&mut self) -> Result<bool, CoreError> {
        let Some(credentials) = self.store.load()? else {
            debug!("no persisted credentials");
            return Ok(false);
        };

        let has_token = credentials.access_token.is_some();
        self.credentials = Some(credentials);
        if has_token {
            info!("restored persisted session");
            self.transition(SessionState::LoggedIn);
        } else {
            debug!("persisted credentials carry no access token");
        }
        Ok(has_token)
    }

    /// [`restore`](Self::restore), then fetch devices if that logged in.
    pub async fn resume(&mut self) -> Result<bool, CoreError> {
        if !self.restore()? {
            return Ok(false);
        }
        self.fetch_devices().await?;
        Ok(true)
    }

    /// Exchange `api_key` and `refresh_token` for an access token, persist
    /// all three, then fetch devices.
    ///
    /// On exchange failure nothing is persisted and the session is
    /// `LoggedOut`.
    pub async fn authenticate(
        &mut self,
        api_key: SecretString,
        refresh_token: SecretString,
    ) -> Result<&[Device], CoreError> {
        self.begin();
        let result = self.login(api_key, refresh_token).await;
        self.finish(result)?;
        self.fetch_devices().await
    }

    async fn login(
        &mut self,
        api_key: SecretString,
        refresh_token: SecretString,
    ) -> Result<(), CoreError> {
        if api_key.expose_secret().is_empty() || refresh_token.expose_secret().is_empty() {
            return Err(CoreError::ValidationFailed {
                message: "both an API key and a refresh token are required".into(),
            });
        }

        self.transition(SessionState::Authenticating);
        let access_token = match self.client.exchange_token(&api_key, &refresh_token).await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "token exchange failed");
                self.transition(SessionState::LoggedOut);
                return Err(e.into());
            }
        };

        let credentials = Credentials {
            api_key,
            refresh_token,
            access_token: Some(access_token),
        };
        if let Err(e) = self.store.save_login(&credentials) {
            self.transition(SessionState::LoggedOut);
            return Err(e.into());
        }

        self.credentials = Some(credentials);
        self.transition(SessionState::LoggedIn);
        info!("authenticated");
        Ok(())
    }

    /// Forget everything: persisted keys, in-memory credentials, devices.
    ///
    /// The in-memory reset always happens; a failure to clear the store
    /// is still reported.
    pub fn logout(&mut self) -> Result<(), CoreError> {
        let cleared = self.store.clear();

        self.credentials = None;
        self.devices.clear();
        self.last_error = None;
        self.loading = false;
        self.last_refreshed = None;
        self.transition(SessionState::LoggedOut);
        info!("logged out");

        cleared.map_err(CoreError::from)
    }

    // ── Device actions ───────────────────────────────────────────

    /// Replace the cached device list with a fresh fetch.
    pub async fn fetch_devices(&mut self) -> Result<&[Device], CoreError> {
        self.begin();
        let result = self.refresh_devices().await;
        self.finish(result)?;
        Ok(&self.devices)
    }

    /// Send `command` to one device, then refresh the device list once.
    ///
    /// Returns the control call's response body. A failure in the
    /// follow-up refresh is returned even though the command was applied.
    pub async fn control_device(
        &mut self,
        device_id: &str,
        command: &ControlCommand,
    ) -> Result<Value, CoreError> {
        self.begin();
        let result = self.control_then_refresh(device_id, command).await;
        self.finish(result)
    }

    /// Raw status document for one device.
    pub async fn device_status(&mut self, device_id: &str) -> Result<Value, CoreError> {
        self.begin();
        let result = self
            .with_recovery(|client, token| async move {
                client.get_device_status(&token, device_id).await
            })
            .await;
        self.finish(result)
    }

    async fn refresh_devices(&mut self) -> Result<(), CoreError> {
        let devices = self
            .with_recovery(|client, token| async move { client.list_devices(&token).await })
            .await?;
        self.devices = devices;
        self.last_refreshed = Some(Utc::now());
        Ok(())
    }

    async fn control_then_refresh(
        &mut self,
        device_id: &str,
        command: &ControlCommand,
    ) -> Result<Value, CoreError> {
        command.validate()?;

        let response = self
            .with_recovery(|client, token| async move {
                client.control_device(&token, device_id, command).await
            })
            .await?;
        debug!(device_id, %command, "command accepted, refreshing devices");

        self.refresh_devices().await?;
        Ok(response)
    }

    // ── Token recovery ───────────────────────────────────────────

    /// Run `op` with the current access token. On 401, re-acquire the
    /// token once and run `op` once more. If either step fails the session
    /// ends in `LoggedOut` with [`CoreError::SessionExpired`].
    async fn with_recovery<T, F, Fut>(&mut self, op: F) -> Result<T, CoreError>
    where
        F: Fn(AtombergClient, SecretString) -> Fut,
        Fut: Future<Output = Result<T, atomfan_api::Error>>,
    {
        let token = self.access_token()?;

        match op(self.client.clone(), token).await {
            Ok(value) => Ok(value),
            Err(e) if e.is_unauthorized() => {
                warn!("access token rejected, re-acquiring once");
                self.transition(SessionState::Recovering);

                match self.recover(&op).await {
                    Ok(value) => {
                        self.transition(SessionState::LoggedIn);
                        Ok(value)
                    }
                    Err(cause) => {
                        warn!(error = %cause, "session recovery failed");
                        self.transition(SessionState::LoggedOut);
                        Err(CoreError::SessionExpired)
                    }
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn recover<T, F, Fut>(&mut self, op: &F) -> Result<T, CoreError>
    where
        F: Fn(AtombergClient, SecretString) -> Fut,
        Fut: Future<Output = Result<T, atomfan_api::Error>>,
    {
        let (api_key, refresh_token) = match self.credentials {
            Some(ref c) => (c.api_key.clone(), c.refresh_token.clone()),
            None => return Err(CoreError::NotAuthenticated),
        };

        let fresh = self.client.exchange_token(&api_key, &refresh_token).await?;
        self.store.save_access_token(&fresh)?;
        if let Some(ref mut credentials) = self.credentials {
            credentials.access_token = Some(fresh.clone());
        }
        info!("access token re-acquired, retrying");

        op(self.client.clone(), fresh).await.map_err(CoreError::from)
    }

    // ── Internals ────────────────────────────────────────────────

    fn access_token(&self) -> Result<SecretString, CoreError> {
        if self.state == SessionState::LoggedOut {
            return Err(CoreError::NotAuthenticated);
        }
        self.credentials
            .as_ref()
            .and_then(|c| c.access_token.clone())
            .ok_or(CoreError::NotAuthenticated)
    }

    fn begin(&mut self) {
        self.loading = true;
        self.last_error = None;
    }

    fn finish<T>(&mut self, result: Result<T, CoreError>) -> Result<T, CoreError> {
        self.loading = false;
        if let Err(ref e) = result {
            self.last_error = Some(e.to_string());
        }
        result
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            debug!(from = %self.state, to = %next, "session state change");
            self.state = next;
        }
    }
}
