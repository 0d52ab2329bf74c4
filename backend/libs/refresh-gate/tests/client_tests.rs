/// Integration tests for ApiClient against a mock HTTP API
use refresh_gate::{
    ApiClient, CallError, FnReauthenticator, RefreshError, RefreshGateConfig, TokenPair, TokenStore,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> (ApiClient, Arc<TokenStore>, Arc<AtomicUsize>) {
    let tokens = Arc::new(TokenStore::with_tokens(TokenPair {
        access_token: "old-access".to_string(),
        refresh_token: "old-refresh".to_string(),
    }));
    let redirects = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&redirects);

    let client = ApiClient::new(
        server.uri(),
        "/auth/refresh",
        Arc::clone(&tokens),
        RefreshGateConfig {
            refresh_timeout: Duration::from_secs(2),
        },
        Arc::new(FnReauthenticator(move |_: &RefreshError| {
            counter.fetch_add(1, Ordering::SeqCst);
        })),
    );
    (client, tokens, redirects)
}

async fn mount_profile_endpoints(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("authorization", "Bearer old-access"))
        .respond_with(ResponseTemplate::new(401))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("authorization", "Bearer new-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 42})))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_expired_token_is_refreshed_and_call_replayed() {
    let server = MockServer::start().await;
    mount_profile_endpoints(&server).await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(body_json(json!({"refresh_token": "old-refresh"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "new-access",
            "refresh_token": "new-refresh"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (client, tokens, redirects) = client_for(&server);

    let profile: Value = client.get_json("/me").await.unwrap();
    assert_eq!(profile["id"], 42);
    assert_eq!(tokens.access_token().as_deref(), Some("new-access"));
    assert_eq!(tokens.refresh_token().as_deref(), Some("new-refresh"));
    assert_eq!(redirects.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_concurrent_expired_calls_trigger_one_refresh() {
    let server = MockServer::start().await;
    mount_profile_endpoints(&server).await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "access_token": "new-access",
                    "refresh_token": "new-refresh"
                }))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (client, _, _) = client_for(&server);

    let calls = (0..5).map(|_| client.get_json::<Value>("/me"));
    let results = futures::future::join_all(calls).await;

    for result in results {
        assert_eq!(result.unwrap()["id"], 42);
    }
    assert_eq!(client.gate().refresh_calls(), 1);
}

#[tokio::test]
async fn test_rejected_refresh_clears_session_and_redirects_once() {
    let server = MockServer::start().await;
    mount_profile_endpoints(&server).await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(401).set_delay(Duration::from_millis(100)))
        .expect(1)
        .mount(&server)
        .await;

    let (client, tokens, redirects) = client_for(&server);

    let calls = (0..3).map(|_| client.get_json::<Value>("/me"));
    let results = futures::future::join_all(calls).await;

    for result in results {
        assert!(matches!(
            result,
            Err(CallError::SessionExpired(RefreshError::Rejected(_)))
        ));
    }
    assert_eq!(redirects.load(Ordering::SeqCst), 1);
    assert!(!tokens.is_authenticated());
}

#[tokio::test]
async fn test_server_errors_pass_through_without_refresh() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (client, _, _) = client_for(&server);

    let result = client
        .post_json::<Value, Value>("/orders", &json!({"sku": "A-1"}))
        .await;

    match result {
        Err(CallError::Status { status, body }) => {
            assert_eq!(status, 503);
            assert_eq!(body, "maintenance");
        }
        other => panic!("unexpected result: {:?}", other),
    }
}
