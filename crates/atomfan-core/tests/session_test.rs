#![allow(clippy::unwrap_used)]
// Session lifecycle tests against a wiremock API.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use atomfan_core::store::{ACCESS_TOKEN, API_KEY, REFRESH_TOKEN};
use atomfan_core::{
    ControlCommand, CoreError, FanSpeed, KeyValueStore, MemoryStore, SESSION_EXPIRED_MESSAGE,
    Session, SessionConfig, SessionState,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, Arc<MemoryStore>, Session) {
    let server = MockServer::start().await;
    let store = Arc::new(MemoryStore::new());
    let config = SessionConfig::new(server.uri().parse().unwrap());
    let session = Session::from_config(&config, store.clone()).unwrap();
    (server, store, session)
}

fn secret(value: &str) -> SecretString {
    SecretString::from(value.to_owned())
}

fn stored(store: &MemoryStore, key: &str) -> Option<String> {
    store.get(key).unwrap()
}

/// Seed the store with a full credential triple and restore from it.
fn seed(store: &MemoryStore, session: &mut Session, access: &str) {
    store.set(API_KEY, "key").unwrap();
    store.set(REFRESH_TOKEN, "refresh").unwrap();
    store.set(ACCESS_TOKEN, access).unwrap();
    assert!(session.restore().unwrap());
}

async fn mount_token(server: &MockServer, access: &str, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .and(body_json(json!({"api_key": "key", "refresh_token": "refresh"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": access})))
        .expect(expected_calls)
        .mount(server)
        .await;
}

async fn mount_devices_for(server: &MockServer, access: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/devices"))
        .and(header("authorization", format!("Bearer {access}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_devices_unauthorized(server: &MockServer, access: &str) {
    Mock::given(method("GET"))
        .and(path("/devices"))
        .and(header("authorization", format!("Bearer {access}").as_str()))
        .respond_with(ResponseTemplate::new(401))
        .mount(server)
        .await;
}

fn one_fan() -> serde_json::Value {
    json!([{"id": "f1", "name": "Hall", "status": {"power": true, "speed": 2, "mode": "normal"}}])
}

// ── Authentication ──────────────────────────────────────────────────

#[tokio::test]
async fn test_authenticate_persists_and_fetches() {
    let (server, store, mut session) = setup().await;
    mount_token(&server, "access-1", 1).await;
    mount_devices_for(&server, "access-1", one_fan()).await;

    let devices = session
        .authenticate(secret("key"), secret("refresh"))
        .await
        .unwrap();
    assert_eq!(devices.len(), 1);

    assert_eq!(session.state(), SessionState::LoggedIn);
    assert!(session.last_refreshed().is_some());
    assert!(!session.is_loading());
    assert_eq!(session.last_error(), None);
    assert_eq!(stored(&store, API_KEY).as_deref(), Some("key"));
    assert_eq!(stored(&store, REFRESH_TOKEN).as_deref(), Some("refresh"));
    assert_eq!(stored(&store, ACCESS_TOKEN).as_deref(), Some("access-1"));
}

#[tokio::test]
async fn test_authenticate_failure_persists_nothing() {
    let (server, store, mut session) = setup().await;

    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "bad key"})))
        .mount(&server)
        .await;

    let err = session
        .authenticate(secret("key"), secret("refresh"))
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::AuthenticationFailed { .. }));
    assert_eq!(session.state(), SessionState::LoggedOut);
    assert_eq!(session.last_error(), Some("bad key"));
    assert!(store.is_empty());
}

// ── Restore ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_resume_fetches_with_saved_token() {
    let (server, store, mut session) = setup().await;
    store.set(API_KEY, "key").unwrap();
    store.set(REFRESH_TOKEN, "refresh").unwrap();
    store.set(ACCESS_TOKEN, "saved").unwrap();
    mount_token(&server, "unused", 0).await;
    mount_devices_for(&server, "saved", one_fan()).await;

    assert!(session.resume().await.unwrap());
    assert_eq!(session.state(), SessionState::LoggedIn);
    assert_eq!(session.devices()[0].id, "f1");
}

#[tokio::test]
async fn test_resume_without_access_token_makes_no_requests() {
    let (server, store, mut session) = setup().await;
    store.set(API_KEY, "key").unwrap();
    store.set(REFRESH_TOKEN, "refresh").unwrap();

    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    assert!(!session.resume().await.unwrap());
    assert_eq!(session.state(), SessionState::LoggedOut);
}

// ── One-shot recovery ───────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_recovers_from_expired_token() {
    let (server, store, mut session) = setup().await;
    seed(&store, &mut session, "stale");

    mount_devices_unauthorized(&server, "stale").await;
    mount_token(&server, "fresh", 1).await;
    mount_devices_for(&server, "fresh", one_fan()).await;

    let devices = session.fetch_devices().await.unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(session.state(), SessionState::LoggedIn);
    assert_eq!(stored(&store, ACCESS_TOKEN).as_deref(), Some("fresh"));
}

#[tokio::test]
async fn test_retry_rejected_again_expires_session() {
    let (server, store, mut session) = setup().await;
    seed(&store, &mut session, "stale");

    mount_devices_unauthorized(&server, "stale").await;
    mount_devices_unauthorized(&server, "fresh").await;
    // A second refresh would fail the `expect(1)`.
    mount_token(&server, "fresh", 1).await;

    let err = session.fetch_devices().await.unwrap_err();
    assert!(matches!(err, CoreError::SessionExpired));
    assert_eq!(session.state(), SessionState::LoggedOut);
    assert_eq!(session.last_error(), Some(SESSION_EXPIRED_MESSAGE));
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn test_failed_refresh_expires_session_and_keeps_key_pair() {
    let (server, store, mut session) = setup().await;
    seed(&store, &mut session, "stale");

    mount_devices_unauthorized(&server, "stale").await;
    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let err = session.fetch_devices().await.unwrap_err();
    assert_eq!(err.to_string(), SESSION_EXPIRED_MESSAGE);
    assert_eq!(session.state(), SessionState::LoggedOut);
    assert_eq!(stored(&store, API_KEY).as_deref(), Some("key"));
    assert_eq!(stored(&store, REFRESH_TOKEN).as_deref(), Some("refresh"));
}

#[tokio::test]
async fn test_non_401_failure_leaves_session_logged_in() {
    let (server, store, mut session) = setup().await;
    seed(&store, &mut session, "access-1");

    Mock::given(method("GET"))
        .and(path("/devices"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;
    mount_token(&server, "unused", 0).await;

    let err = session.fetch_devices().await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::RequestFailed {
            status: Some(502),
            ..
        }
    ));
    assert_eq!(session.state(), SessionState::LoggedIn);
    assert_eq!(session.last_error(), Some("Failed to fetch devices: 502"));
}

// ── Control ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_control_refetches_devices_once() {
    let (server, store, mut session) = setup().await;
    seed(&store, &mut session, "access-1");

    Mock::given(method("POST"))
        .and(path("/devices/f1/control"))
        .and(body_json(json!({"speed": 4})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({"devices": [{"id": "f1", "status": {"power": true, "speed": 4}}]}),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let cmd = ControlCommand::speed(FanSpeed::new(4).unwrap());
    let body = session.control_device("f1", &cmd).await.unwrap();

    assert_eq!(body, json!({"status": "ok"}));
    assert_eq!(session.device("f1").unwrap().status.speed, 4);
}

#[tokio::test]
async fn test_control_recovers_then_refetches() {
    let (server, store, mut session) = setup().await;
    seed(&store, &mut session, "stale");

    Mock::given(method("POST"))
        .and(path("/devices/f1/control"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/devices/f1/control"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    mount_token(&server, "fresh", 1).await;
    mount_devices_for(&server, "fresh", one_fan()).await;

    session
        .control_device("f1", &ControlCommand::power(false))
        .await
        .unwrap();
    assert_eq!(session.state(), SessionState::LoggedIn);
    assert_eq!(stored(&store, ACCESS_TOKEN).as_deref(), Some("fresh"));
}

#[tokio::test]
async fn test_control_retry_rejected_again_expires_session() {
    let (server, store, mut session) = setup().await;
    seed(&store, &mut session, "stale");

    Mock::given(method("POST"))
        .and(path("/devices/f1/control"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;
    mount_token(&server, "fresh", 1).await;
    Mock::given(method("GET"))
        .and(path("/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(one_fan()))
        .expect(0)
        .mount(&server)
        .await;

    let err = session
        .control_device("f1", &ControlCommand::power(true))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::SessionExpired));
    assert_eq!(session.state(), SessionState::LoggedOut);
    assert_eq!(session.last_error(), Some(SESSION_EXPIRED_MESSAGE));
    assert_eq!(stored(&store, ACCESS_TOKEN).as_deref(), Some("fresh"));
}

#[tokio::test]
async fn test_control_refetch_can_expire_session() {
    let (server, store, mut session) = setup().await;
    seed(&store, &mut session, "stale");

    Mock::given(method("POST"))
        .and(path("/devices/f1/control"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .expect(1)
        .mount(&server)
        .await;
    mount_devices_unauthorized(&server, "stale").await;
    mount_devices_unauthorized(&server, "fresh").await;
    mount_token(&server, "fresh", 1).await;

    let err = session
        .control_device("f1", &ControlCommand::power(false))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::SessionExpired));
    assert_eq!(session.state(), SessionState::LoggedOut);
    assert!(!session.is_loading());
}

#[tokio::test]
async fn test_control_not_found_skips_refetch() {
    let (server, store, mut session) = setup().await;
    seed(&store, &mut session, "access-1");

    Mock::given(method("POST"))
        .and(path("/devices/ghost/control"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let err = session
        .control_device("ghost", &ControlCommand::power(true))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::DeviceNotFound { .. }));
    assert_eq!(
        session.last_error(),
        Some("Device not found or not accessible.")
    );
}

#[tokio::test]
async fn test_empty_command_is_rejected_locally() {
    let (server, store, mut session) = setup().await;
    seed(&store, &mut session, "access-1");

    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = session
        .control_device("f1", &ControlCommand::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::ValidationFailed { .. }));
}

// ── Status ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_device_status_recovers_once() {
    let (server, store, mut session) = setup().await;
    seed(&store, &mut session, "stale");

    Mock::given(method("GET"))
        .and(path("/devices/f1/status"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/devices/f1/status"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"power": false})))
        .mount(&server)
        .await;
    mount_token(&server, "fresh", 1).await;

    let status = session.device_status("f1").await.unwrap();
    assert_eq!(status, json!({"power": false}));
}

// ── Logout ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_logout_clears_everything() {
    let (server, store, mut session) = setup().await;
    mount_token(&server, "access-1", 1).await;
    mount_devices_for(&server, "access-1", one_fan()).await;
    session
        .authenticate(secret("key"), secret("refresh"))
        .await
        .unwrap();

    session.logout().unwrap();

    assert_eq!(session.state(), SessionState::LoggedOut);
    assert!(session.devices().is_empty());
    assert!(!session.has_credentials());
    assert!(store.is_empty());

    let err = session.fetch_devices().await.unwrap_err();
    assert!(matches!(err, CoreError::NotAuthenticated));
}
