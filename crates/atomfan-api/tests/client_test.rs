#![allow(clippy::unwrap_used)]
// Integration tests for `AtombergClient` using wiremock.

use pretty_assertions::assert_eq;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use atomfan_api::{AtombergClient, ControlCommand, Error, FanMode, FanSpeed};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, AtombergClient) {
    let server = MockServer::start().await;
    let client = AtombergClient::with_client(reqwest::Client::new(), &server.uri()).unwrap();
    (server, client)
}

fn secret(value: &str) -> SecretString {
    SecretString::from(value.to_owned())
}

fn token() -> SecretString {
    secret("access-1")
}

async fn mount_devices(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/devices"))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

// ── Token exchange ──────────────────────────────────────────────────

#[tokio::test]
async fn test_exchange_token_success() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"api_key": "key", "refresh_token": "refresh"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "fresh"})))
        .expect(1)
        .mount(&server)
        .await;

    let access = client
        .exchange_token(&secret("key"), &secret("refresh"))
        .await
        .unwrap();
    assert_eq!(access.expose_secret(), "fresh");
}

#[tokio::test]
async fn test_exchange_token_uses_remote_message() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({"message": "API key revoked"})),
        )
        .mount(&server)
        .await;

    let result = client.exchange_token(&secret("k"), &secret("r")).await;
    match result {
        Err(Error::Authentication { ref message }) => assert_eq!(message, "API key revoked"),
        other => panic!("expected Authentication error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_exchange_token_falls_back_to_status() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .respond_with(ResponseTemplate::new(500).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client
        .exchange_token(&secret("k"), &secret("r"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Authentication { .. }));
    assert_eq!(err.to_string(), "Authentication failed: 500");
}

#[tokio::test]
async fn test_exchange_token_without_access_token_fails() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": ""})))
        .mount(&server)
        .await;

    let result = client.exchange_token(&secret("k"), &secret("r")).await;
    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_exchange_token_network_failure_is_generic() {
    // Nothing listens on the discard port.
    let client = AtombergClient::with_client(reqwest::Client::new(), "http://127.0.0.1:9").unwrap();

    let err = client
        .exchange_token(&secret("k"), &secret("r"))
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Failed to authenticate. Please check your credentials and network connection."
    );
}

// ── Device listing ──────────────────────────────────────────────────

#[tokio::test]
async fn test_list_devices_bare_array() {
    let (server, client) = setup().await;
    mount_devices(
        &server,
        json!([
            {"id": "f1", "name": "Living Room", "status": {"power": true, "speed": 3, "mode": "normal"}},
            {"id": "f2", "name": "Bedroom", "status": {"power": false, "speed": 0, "mode": "sleep"}}
        ]),
    )
    .await;

    let devices = client.list_devices(&token()).await.unwrap();

    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0].id, "f1");
    assert_eq!(devices[0].name, "Living Room");
    assert!(devices[0].status.power);
    assert_eq!(devices[0].status.speed, 3);
    assert_eq!(devices[1].status.mode, FanMode::Sleep);
}

#[tokio::test]
async fn test_list_devices_devices_envelope() {
    let (server, client) = setup().await;
    mount_devices(&server, json!({"devices": [{"id": "a"}, {"id": "b"}]})).await;

    let devices = client.list_devices(&token()).await.unwrap();
    let ids: Vec<_> = devices.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
}

#[tokio::test]
async fn test_list_devices_data_envelope() {
    let (server, client) = setup().await;
    mount_devices(&server, json!({"data": [{"id": "1", "name": "Study"}]})).await;

    let devices = client.list_devices(&token()).await.unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].id, "1");
}

#[tokio::test]
async fn test_list_devices_unknown_envelope_is_empty() {
    let (server, client) = setup().await;
    mount_devices(&server, json!({})).await;

    let devices = client.list_devices(&token()).await.unwrap();
    assert!(devices.is_empty());
}

#[tokio::test]
async fn test_list_devices_unauthorized_ignores_body() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/devices"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "custom"})))
        .mount(&server)
        .await;

    let err = client.list_devices(&token()).await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(err.status(), Some(401));
    assert_eq!(err.to_string(), "Unauthorized. Token may have expired.");
}

#[tokio::test]
async fn test_list_devices_server_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/devices"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    match client.list_devices(&token()).await {
        Err(Error::DeviceFetch { ref message, status }) => {
            assert_eq!(message, "Failed to fetch devices: 503");
            assert_eq!(status, 503);
        }
        other => panic!("expected DeviceFetch error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_list_devices_unparseable_body() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client.list_devices(&token()).await.unwrap_err();
    assert!(matches!(err, Error::Network { .. }));
    assert_eq!(err.to_string(), "Failed to fetch devices. Please try again.");
}

// ── Device control ──────────────────────────────────────────────────

#[tokio::test]
async fn test_control_device_sends_partial_command() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/devices/f1/control"))
        .and(header("authorization", "Bearer access-1"))
        .and(body_json(json!({"speed": 5, "mode": "turbo"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true, "queued": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let cmd = ControlCommand::speed(FanSpeed::new(5).unwrap()).with_mode(FanMode::Turbo);
    let body = client.control_device(&token(), "f1", &cmd).await.unwrap();
    assert_eq!(body, json!({"ok": true, "queued": 1}));
}

#[tokio::test]
async fn test_control_device_not_found_has_fixed_message() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/devices/ghost/control"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"message": "no such device: ghost"})),
        )
        .mount(&server)
        .await;

    let err = client
        .control_device(&token(), "ghost", &ControlCommand::power(true))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DeviceNotFound));
    assert_eq!(err.to_string(), "Device not found or not accessible.");
}

#[tokio::test]
async fn test_control_device_unauthorized() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/devices/f1/control"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client
        .control_device(&token(), "f1", &ControlCommand::power(false))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Unauthorized { status: 401 }));
}

#[tokio::test]
async fn test_control_device_remote_message() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/devices/f1/control"))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({"message": "Device is offline"})),
        )
        .mount(&server)
        .await;

    match client
        .control_device(&token(), "f1", &ControlCommand::power(true))
        .await
    {
        Err(Error::Control { ref message, status }) => {
            assert_eq!(message, "Device is offline");
            assert_eq!(status, 409);
        }
        other => panic!("expected Control error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_control_device_rejects_empty_command_locally() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let result = client
        .control_device(&token(), "f1", &ControlCommand::default())
        .await;
    assert!(matches!(result, Err(Error::InvalidCommand { .. })));
}

// ── Device status ───────────────────────────────────────────────────

#[tokio::test]
async fn test_get_device_status_returns_raw_body() {
    let (server, client) = setup().await;

    let status = json!({"power": true, "speed": 2, "mode": "normal", "rssi": -61});
    Mock::given(method("GET"))
        .and(path("/devices/f1/status"))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&status))
        .mount(&server)
        .await;

    let body = client.get_device_status(&token(), "f1").await.unwrap();
    assert_eq!(body, status);
}

#[tokio::test]
async fn test_get_device_status_unauthorized() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/devices/f1/status"))
        .respond_with(ResponseTemplate::new(401).set_body_string("expired"))
        .mount(&server)
        .await;

    let err = client.get_device_status(&token(), "f1").await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert!(err.is_unauthorized());
}

#[tokio::test]
async fn test_get_device_status_other_failure() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/devices/f1/status"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client.get_device_status(&token(), "f1").await.unwrap_err();
    assert!(matches!(err, Error::StatusFetch { status: 404, .. }));
    assert_eq!(err.to_string(), "Failed to fetch device status: 404");
}
