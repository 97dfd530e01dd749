#![allow(clippy::unwrap_used)]
// Integration tests for `CloudClient` and `AuthClient` using wiremock.

use serde_json::json;
use url::Url;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use probelink_api::{AccessToken, AuthClient, CloudClient, Error};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, CloudClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&format!("{}/", server.uri())).unwrap();
    let client = CloudClient::with_client(reqwest::Client::new(), base_url);
    (server, client)
}

fn token() -> AccessToken {
    AccessToken::new("test-access-token".to_string().into())
}

// ── Token endpoint tests ────────────────────────────────────────────

#[tokio::test]
async fn test_login_success() {
    let server = MockServer::start().await;
    let base_url = Url::parse(&format!("{}/", server.uri())).unwrap();
    let auth = AuthClient::with_client(reqwest::Client::new(), base_url).unwrap();

    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessToken": "at-123",
            "refreshToken": "rt-456",
            "expiresIn": 3600
        })))
        .mount(&server)
        .await;

    let secret: secrecy::SecretString = "hunter2".to_string().into();
    let grant = auth.login("user@example.com", &secret).await.unwrap();
    assert_eq!(grant.expires_in_secs, 3600);
}

#[tokio::test]
async fn test_refresh_rejected_is_invalid_credentials() {
    let server = MockServer::start().await;
    let base_url = Url::parse(&format!("{}/", server.uri())).unwrap();
    let auth = AuthClient::with_client(reqwest::Client::new(), base_url).unwrap();

    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "refresh token revoked"
        })))
        .mount(&server)
        .await;

    let rt: secrecy::SecretString = "stale-token".to_string().into();
    let result = auth.refresh(&rt).await;

    match result {
        Err(Error::InvalidCredentials { ref message }) => {
            assert!(
                message.contains("revoked"),
                "expected revocation message, got: {message}"
            );
        }
        other => panic!("expected InvalidCredentials, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_refresh_server_error_is_transient() {
    let server = MockServer::start().await;
    let base_url = Url::parse(&format!("{}/", server.uri())).unwrap();
    let auth = AuthClient::with_client(reqwest::Client::new(), base_url).unwrap();

    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let rt: secrecy::SecretString = "rt".to_string().into();
    let err = auth.refresh(&rt).await.unwrap_err();
    assert!(err.is_transient(), "503 should be transient, got: {err:?}");
}

// ── Device list tests ───────────────────────────────────────────────

#[tokio::test]
async fn test_list_devices() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/v1/devices"))
        .and(header("authorization", "Bearer test-access-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "deviceId": "dev-a", "label": "Smoker", "type": "gateway" },
                { "deviceId": "dev-b" }
            ],
            "totalCount": 2
        })))
        .mount(&server)
        .await;

    let devices = client.list_devices(&token()).await.unwrap();

    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0].device_id, "dev-a");
    assert_eq!(devices[0].label.as_deref(), Some("Smoker"));
    assert_eq!(devices[0].device_type.as_deref(), Some("gateway"));
    assert!(devices[1].label.is_none());
}

#[tokio::test]
async fn test_list_devices_paginates() {
    let (server, client) = setup().await;

    let full_page: Vec<_> = (0..100)
        .map(|i| json!({ "deviceId": format!("dev-{i}") }))
        .collect();

    Mock::given(method("GET"))
        .and(path("/v1/devices"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": full_page,
            "totalCount": 101
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/devices"))
        .and(query_param("offset", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "deviceId": "dev-100" }],
            "totalCount": 101
        })))
        .mount(&server)
        .await;

    let devices = client.list_devices(&token()).await.unwrap();
    assert_eq!(devices.len(), 101);
    assert_eq!(devices[100].device_id, "dev-100");
}

// ── Device status tests ─────────────────────────────────────────────

#[tokio::test]
async fn test_get_device_status_with_partial_readings() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/v1/devices/dev-a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "deviceId": "dev-a",
            "label": "Smoker",
            "type": "gateway",
            "probes": [
                {
                    "probeId": "1",
                    "label": "Brisket",
                    "temperature": 72.5,
                    "batteryPercent": 90.0,
                    "lastSeen": "2026-08-23T10:00:00Z"
                },
                {
                    "probeId": "2",
                    "signalStrength": -61.0
                }
            ]
        })))
        .mount(&server)
        .await;

    let status = client.get_device_status(&token(), "dev-a").await.unwrap();

    assert_eq!(status.probes.len(), 2);
    let brisket = &status.probes[0];
    assert_eq!(brisket.temperature, Some(72.5));
    assert_eq!(brisket.battery_percent, Some(90.0));
    // Absent is absent, not zero.
    assert!(brisket.signal_strength.is_none());
    let bare = &status.probes[1];
    assert!(bare.temperature.is_none());
    assert_eq!(bare.signal_strength, Some(-61.0));
}

// ── Error mapping tests ─────────────────────────────────────────────

#[tokio::test]
async fn test_expired_token_maps_to_token_expired() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = client.list_devices(&token()).await;
    assert!(
        matches!(result, Err(Error::TokenExpired)),
        "expected TokenExpired, got: {result:?}"
    );
}

#[tokio::test]
async fn test_deregistered_device_maps_to_not_found() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/v1/devices/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client
        .get_device_status(&token(), "gone")
        .await
        .unwrap_err();
    assert!(err.is_not_found(), "expected NotFound, got: {err:?}");
}

#[tokio::test]
async fn test_rate_limited_reports_retry_after() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/v1/devices"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "120"))
        .mount(&server)
        .await;

    let err = client.list_devices(&token()).await.unwrap_err();
    match &err {
        Error::RateLimited { retry_after_secs } => {
            assert_eq!(*retry_after_secs, Some(120));
        }
        other => panic!("expected RateLimited, got: {other:?}"),
    }
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_vendor_error_body_surfaces_message() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/v1/devices"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "message": "upstream outage" })),
        )
        .mount(&server)
        .await;

    let err = client.list_devices(&token()).await.unwrap_err();
    match err {
        Error::Api { status, ref message } => {
            assert_eq!(status, 500);
            assert!(message.contains("upstream outage"));
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}
