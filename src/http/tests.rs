//! Tests for the HTTP client module

use super::*;
use crate::auth::{SessionEvent, SessionHook};
use crate::error::Error;
use crate::session::CredentialStore;
use reqwest::Method;
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use test_case::test_case;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn signed_in_store(access: &str, refresh: &str) -> CredentialStore {
    let store = CredentialStore::in_memory();
    store.set(access, refresh).await;
    store
}

fn client_for(server: &MockServer, store: CredentialStore) -> HttpClient {
    let config = HttpClientConfig::builder().base_url(server.uri()).build();
    HttpClient::new(config, store).unwrap()
}

fn recording_hook() -> (SessionHook, Arc<Mutex<Vec<SessionEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let hook: SessionHook = Arc::new(move |event| sink.lock().unwrap().push(event));
    (hook, events)
}

async fn mount_refresh(server: &MockServer, from: &str, to_access: &str, to_refresh: &str) {
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(body_json(json!({ "refresh_token": from })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": to_access,
            "refresh_token": to_refresh,
            "token_type": "bearer"
        })))
        .expect(1)
        .mount(server)
        .await;
}

// ============================================================================
// Config Tests
// ============================================================================

#[test]
fn test_http_client_config_default() {
    let config = HttpClientConfig::default();
    assert_eq!(config.timeout, Duration::from_secs(30));
    assert_eq!(config.refresh_path, "/auth/refresh");
    assert!(config.base_url.is_none());
    assert_eq!(config.user_agent, format!("agency-admin/{}", crate::VERSION));
}

#[test]
fn test_http_client_config_builder() {
    let config = HttpClientConfig::builder()
        .base_url("https://admin.example.com/api")
        .timeout(Duration::from_secs(60))
        .refresh_path("/v2/token/refresh")
        .header("X-Custom", "value")
        .user_agent("test-agent/1.0")
        .build();

    assert_eq!(
        config.base_url,
        Some("https://admin.example.com/api".to_string())
    );
    assert_eq!(config.timeout, Duration::from_secs(60));
    assert_eq!(config.refresh_path, "/v2/token/refresh");
    assert_eq!(
        config.default_headers.get("X-Custom"),
        Some(&"value".to_string())
    );
    assert_eq!(config.user_agent, "test-agent/1.0");
}

#[test]
fn test_request_config_builder() {
    let config = RequestConfig::new()
        .query("page", "1")
        .header("X-Request-Id", "abc123")
        .json(json!({"key": "value"}))
        .timeout(Duration::from_secs(10))
        .skip_refresh();

    assert_eq!(config.query.get("page"), Some(&"1".to_string()));
    assert_eq!(
        config.headers.get("X-Request-Id"),
        Some(&"abc123".to_string())
    );
    assert!(config.body.is_some());
    assert_eq!(config.timeout, Some(Duration::from_secs(10)));
    assert!(config.skip_refresh);
}

#[test]
fn test_outgoing_request_retried_marker() {
    let mut request = OutgoingRequest::new(Method::GET, "/models", RequestConfig::new());
    assert!(!request.is_retried());

    request.mark_retried();
    assert!(request.is_retried());
    assert!(OutgoingRequest::new(Method::GET, "/x", RequestConfig::new())
        .retried()
        .is_retried());
}

#[test_case(Some("https://api.test"), "/models", "https://api.test/models" ; "leading slash")]
#[test_case(Some("https://api.test/"), "models", "https://api.test/models" ; "trailing slash on base")]
#[test_case(Some("https://api.test"), "https://other.test/x", "https://other.test/x" ; "absolute url")]
#[test_case(None, "https://other.test/x", "https://other.test/x" ; "no base")]
fn test_build_url(base: Option<&str>, input: &str, expected: &str) {
    let mut builder = HttpClientConfig::builder();
    if let Some(base) = base {
        builder = builder.base_url(base);
    }
    let client = HttpClient::new(builder.build(), CredentialStore::in_memory()).unwrap();

    assert_eq!(client.build_url(input), expected);
}

// ============================================================================
// Request Tests
// ============================================================================

#[tokio::test]
async fn test_valid_token_no_refresh() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/models"))
        .and(header("Authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server, signed_in_store("access-1", "refresh-1").await);
    let response = client.get("/api/models").await.unwrap();

    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_no_token_sends_no_authorization_header() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/public/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = client_for(&server, CredentialStore::in_memory());
    client.get("/public/health").await.unwrap();

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    assert!(received[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_default_headers_and_query() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/inquiries"))
        .and(query_param("status", "open"))
        .and(header("X-Client", "dashboard"))
        .and(header("X-Request-Id", "req-1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = HttpClientConfig::builder()
        .base_url(server.uri())
        .header("X-Client", "dashboard")
        .build();
    let client = HttpClient::new(config, CredentialStore::in_memory()).unwrap();

    client
        .request(
            Method::GET,
            "/api/inquiries",
            RequestConfig::new()
                .query("status", "open")
                .header("X-Request-Id", "req-1"),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_bearer_token_overrides_caller_authorization() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/models"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let config = HttpClientConfig::builder()
        .base_url(server.uri())
        .header("Authorization", "Basic ZGVmYXVsdA==")
        .build();
    let client = HttpClient::new(config, signed_in_store("access-1", "refresh-1").await).unwrap();

    client
        .request(
            Method::GET,
            "/api/models",
            RequestConfig::new().header("authorization", "Bearer caller-token"),
        )
        .await
        .unwrap();

    let received = server.received_requests().await.unwrap();
    let values: Vec<_> = received[0]
        .headers
        .get_all("authorization")
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert_eq!(values, vec!["Bearer access-1".to_string()]);
}

#[tokio::test]
async fn test_caller_authorization_used_when_signed_out() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/public/status"))
        .and(header("Authorization", "Basic c3RhdHVz"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, CredentialStore::in_memory());
    client
        .request(
            Method::GET,
            "/public/status",
            RequestConfig::new().header("Authorization", "Basic c3RhdHVz"),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_put_patch_delete_are_authorized() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/api/models/7"))
        .and(header("Authorization", "Bearer access-1"))
        .and(body_json(json!({"name": "Mina"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/api/models/7"))
        .and(header("Authorization", "Bearer access-1"))
        .and(body_json(json!({"region": "overseas"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/api/models/7"))
        .and(header("Authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, signed_in_store("access-1", "refresh-1").await);

    client.put("/api/models/7", json!({"name": "Mina"})).await.unwrap();
    client
        .patch("/api/models/7", json!({"region": "overseas"}))
        .await
        .unwrap();
    let response = client.delete("/api/models/7").await.unwrap();

    assert_eq!(response.status(), 204);
}

#[tokio::test]
async fn test_get_and_post_json() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/finance/report"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total": 42})))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/camera-tests"))
        .and(body_json(json!({"model_id": 3})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 9})))
        .mount(&server)
        .await;

    let client = client_for(&server, signed_in_store("a", "r").await);

    let report: serde_json::Value = client.get_json("/api/finance/report").await.unwrap();
    assert_eq!(report["total"], 42);

    let created: serde_json::Value = client
        .post_json("/api/camera-tests", json!({"model_id": 3}))
        .await
        .unwrap();
    assert_eq!(created["id"], 9);
}

// ============================================================================
// Refresh Flow Tests
// ============================================================================

#[tokio::test]
async fn test_expired_token_refreshes_and_replays() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/models"))
        .and(header("Authorization", "Bearer expired"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/models"))
        .and(header("Authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": [1]})))
        .expect(1)
        .mount(&server)
        .await;

    mount_refresh(&server, "refresh-1", "fresh", "refresh-2").await;

    let (hook, events) = recording_hook();
    let config = HttpClientConfig::builder().base_url(server.uri()).build();
    let client = HttpClient::builder(config)
        .store(signed_in_store("expired", "refresh-1").await)
        .session_hook(hook)
        .build()
        .unwrap();

    let body: serde_json::Value = client.get_json("/api/models").await.unwrap();

    assert_eq!(body["items"][0], 1);
    let credential = client.store().get().unwrap();
    assert_eq!(credential.access_token, "fresh");
    assert_eq!(credential.refresh_token, "refresh-2");
    assert_eq!(*events.lock().unwrap(), vec![SessionEvent::Refreshed]);
    assert!(!client.coordinator().is_refreshing());
}

#[tokio::test]
async fn test_retried_request_unauthorized_is_terminal() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/models"))
        .respond_with(ResponseTemplate::new(401).set_body_string("token invalid"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let store = signed_in_store("access-1", "refresh-1").await;
    let client = client_for(&server, store.clone());

    let request =
        OutgoingRequest::new(Method::GET, "/api/models", RequestConfig::new()).retried();
    let err = client.send(request).await.unwrap_err();

    match err {
        Error::Unauthorized { body } => assert_eq!(body, "token invalid"),
        other => panic!("expected Unauthorized, got {other:?}"),
    }
    // A terminal 401 alone does not end the session
    assert!(store.is_authenticated());
}

#[tokio::test]
async fn test_replay_unauthorized_again_is_terminal() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/admin-only"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    mount_refresh(&server, "refresh-1", "fresh", "refresh-2").await;

    let client = client_for(&server, signed_in_store("expired", "refresh-1").await);
    let err = client.get("/api/admin-only").await.unwrap_err();

    assert!(matches!(err, Error::Unauthorized { .. }));
    assert_eq!(client.store().access_token().as_deref(), Some("fresh"));
}

#[tokio::test]
async fn test_refresh_failure_expires_session() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/models"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(401).set_body_string("refresh token revoked"))
        .expect(1)
        .mount(&server)
        .await;

    let (hook, events) = recording_hook();
    let config = HttpClientConfig::builder().base_url(server.uri()).build();
    let store = signed_in_store("expired", "revoked").await;
    let client = HttpClient::builder(config)
        .store(store.clone())
        .session_hook(hook)
        .build()
        .unwrap();

    let err = client.get("/api/models").await.unwrap_err();

    assert!(err.is_session_expired());
    assert!(err.to_string().contains("refresh token revoked"));
    assert!(store.get().is_none());
    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], SessionEvent::Expired { .. }));
}

#[tokio::test]
async fn test_skip_refresh_surfaces_unauthorized() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server, CredentialStore::in_memory());
    let err = client
        .request(
            Method::POST,
            "/auth/login",
            RequestConfig::new().json(json!({})).skip_refresh(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Unauthorized { .. }));
}

// ============================================================================
// Pass-through Errors
// ============================================================================

#[test_case(403 ; "forbidden")]
#[test_case(404 ; "not found")]
#[test_case(500 ; "server error")]
#[test_case(503 ; "unavailable")]
#[tokio::test]
async fn test_other_statuses_pass_through(status: u16) {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/qr"))
        .respond_with(ResponseTemplate::new(status).set_body_string("nope"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server, signed_in_store("a", "r").await);
    let err = client.get("/api/qr").await.unwrap_err();

    match err {
        Error::HttpStatus { status: got, body } => {
            assert_eq!(got, status);
            assert_eq!(body, "nope");
        }
        other => panic!("expected HttpStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn test_timeout_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, signed_in_store("a", "r").await);
    let err = client
        .request(
            Method::GET,
            "/api/slow",
            RequestConfig::new().timeout(Duration::from_millis(50)),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Timeout { timeout_ms: 50 }));
}
