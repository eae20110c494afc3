use std::time::{Duration, Instant};

use lib_playstore::configs::{EndpointConfig, ThrottleConfig};
use lib_playstore::error::{ErrorCategory, QueryError, StoreError, TransportError};
use lib_playstore::{PlayStoreClient, StoreConfig};
use project_tests::{init_test_logging, replies, MockBackend, Reply};

async fn logged_in(config: StoreConfig) -> PlayStoreClient {
    let mut client = PlayStoreClient::new(config).unwrap();
    client.login(Some("tok")).await.unwrap();
    client
}

#[tokio::test]
async fn transient_failure_is_retried() {
    init_test_logging();
    let backend = MockBackend::start().await;
    backend.on("/fdfe/details", Reply::status(503));
    backend.on("/fdfe/details", Reply::ok(replies::details("com.a", 9)));
    let client = logged_in(backend.config()).await;

    let doc = client.details("com.a").await.unwrap();
    assert_eq!(doc.version_code(), Some(9));
    assert_eq!(backend.hits("/fdfe/details"), 2);
}

#[tokio::test]
async fn retries_are_bounded() {
    let backend = MockBackend::start().await;
    backend.on("/fdfe/details", Reply::status(503));
    let client = logged_in(backend.config()).await;

    let err = client.details("com.a").await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::Query(QueryError::Transport(TransportError::HttpStatus { status: 503, .. }))
    ));
    assert_eq!(err.category(), ErrorCategory::Network);
    // One attempt plus two retries.
    assert_eq!(backend.hits("/fdfe/details"), 3);
}

#[tokio::test]
async fn persistent_throttling_is_rate_limited() {
    let backend = MockBackend::start().await;
    backend.on("/fdfe/search", Reply::status(429));
    let client = logged_in(backend.config()).await;

    let err = client.search("maps").await.unwrap_err();
    assert!(
        matches!(
            err,
            StoreError::Query(QueryError::Transport(TransportError::RateLimited { status: 429 }))
        ),
        "{:?}",
        err
    );
    assert_eq!(backend.hits("/fdfe/search"), 3);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let backend = MockBackend::start().await;
    backend.on("/fdfe/browse", Reply::status(400));
    let client = logged_in(backend.config()).await;

    assert!(client.browse().await.is_err());
    assert_eq!(backend.hits("/fdfe/browse"), 1);
}

fn throttled(backend: &MockBackend, enabled: bool) -> StoreConfig {
    let mut config = backend.config();
    config.throttle = ThrottleConfig {
        enabled,
        interval_ms: 250,
    };
    config
}

#[tokio::test]
async fn throttle_spaces_sequential_requests() {
    init_test_logging();
    let backend = MockBackend::start().await;
    backend.on("/fdfe/details", Reply::ok(replies::details("com.a", 1)));
    let client = logged_in(throttled(&backend, true)).await;

    let started = Instant::now();
    for _ in 0..4 {
        client.details("com.a").await.unwrap();
    }
    assert!(started.elapsed() >= Duration::from_millis(750));
    assert_eq!(backend.hits("/fdfe/details"), 4);
}

#[tokio::test]
async fn throttle_serializes_concurrent_callers() {
    let backend = MockBackend::start().await;
    backend.on("/fdfe/details", Reply::ok(replies::details("com.a", 1)));
    let client = logged_in(throttled(&backend, true)).await;

    let started = Instant::now();
    let (a, b, c, d) = tokio::join!(
        client.details("com.a"),
        client.details("com.a"),
        client.details("com.a"),
        client.details("com.a"),
    );
    assert!(a.is_ok() && b.is_ok() && c.is_ok() && d.is_ok());
    assert!(started.elapsed() >= Duration::from_millis(750));
}

#[tokio::test]
async fn throttle_paces_each_retry_attempt() {
    init_test_logging();
    let backend = MockBackend::start().await;
    backend.on("/fdfe/details", Reply::status(503));
    backend.on("/fdfe/details", Reply::ok(replies::details("com.a", 1)));
    let client = logged_in(throttled(&backend, true)).await;

    client.details("com.a").await.unwrap();

    let attempts = backend.requests_to("/fdfe/details");
    assert_eq!(attempts.len(), 2);
    let gap = attempts[1].at.duration_since(attempts[0].at);
    assert!(gap >= Duration::from_millis(240), "retry sent after {:?}", gap);
}

#[tokio::test]
async fn disabled_throttle_adds_no_delay() {
    let backend = MockBackend::start().await;
    backend.on("/fdfe/details", Reply::ok(replies::details("com.a", 1)));
    let client = logged_in(throttled(&backend, false)).await;

    let started = Instant::now();
    for _ in 0..4 {
        client.details("com.a").await.unwrap();
    }
    assert!(started.elapsed() < Duration::from_millis(750));
}

#[tokio::test]
async fn stalled_reply_hits_the_read_timeout() {
    let backend = MockBackend::start().await;
    backend.on(
        "/fdfe/details",
        Reply::ok(replies::details("com.a", 1)).after(Duration::from_secs(3)),
    );
    let mut config = backend.config();
    config.timeouts.read_secs = 1;
    config.retry.max_retries = 0;
    let client = logged_in(config).await;

    let started = Instant::now();
    let err = client.details("com.a").await.unwrap_err();
    assert!(
        matches!(err, StoreError::Query(QueryError::Transport(TransportError::Network(_)))),
        "{:?}",
        err
    );
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn backend_calls_go_through_the_configured_proxy() {
    init_test_logging();
    let backend = MockBackend::start().await;
    backend.on("/fdfe/details", Reply::ok(replies::details("com.a", 2)));

    // The store host does not resolve; only the proxy can answer.
    let mut config = backend.config();
    config.endpoints = EndpointConfig::rooted_at("http://store.invalid");
    config.proxy.http = Some(backend.base_url().to_string());
    let client = logged_in(config).await;

    client.details("com.a").await.unwrap();
    let sent = backend.requests_to("/fdfe/details");
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].header("host"), Some("store.invalid"));
}

#[tokio::test]
async fn store_headers_identify_the_device() {
    let backend = MockBackend::start().await;
    backend.on("/fdfe/details", Reply::ok(replies::details("com.a", 2)));
    let client = logged_in(backend.config()).await;

    client.details("com.a").await.unwrap();
    let sent = &backend.requests()[0];
    let agent = sent.header("user-agent").unwrap_or_default();
    assert!(agent.starts_with("Android-Finsky/"), "{}", agent);
    assert!(sent.header("x-dfe-client-id").is_some());
    assert!(sent.header("accept-language").is_some());
}
