use lib_playstore::auth::fetch_remote_token;
use lib_playstore::configs::AccountConfig;
use lib_playstore::error::{AuthError, ErrorCategory, StoreError};
use lib_playstore::PlayStoreClient;
use project_tests::{init_test_logging, replies, MockBackend, Reply};

fn account(password: &str) -> AccountConfig {
    AccountConfig {
        email: "user@example.com".into(),
        password: Some(password.into()),
        master_token: None,
    }
}

#[tokio::test]
async fn injected_token_skips_the_handshake() {
    init_test_logging();
    let backend = MockBackend::start().await;
    backend.on("/fdfe/details", Reply::ok(replies::details("com.a", 3)));

    let mut config = backend.config();
    config.account = Some(account("pw"));
    let mut client = PlayStoreClient::new(config).unwrap();
    client.login(Some("pre-issued")).await.unwrap();
    client.details("com.a").await.unwrap();

    assert_eq!(backend.hits("/checkin"), 0);
    assert_eq!(backend.hits("/auth"), 0);
    let sent = backend.requests_to("/fdfe/details");
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].header("authorization"), Some("GoogleLogin auth=pre-issued"));
}

#[tokio::test]
async fn password_login_runs_checkin_then_exchange() {
    init_test_logging();
    let backend = MockBackend::start().await;
    backend.on("/checkin", Reply::ok(replies::checkin(0xabc, 7)));
    backend.on("/auth", Reply::ok(replies::auth_form(&[("SID", "x"), ("Auth", "session-1")])));
    backend.on("/fdfe/details", Reply::ok(replies::details("com.a", 3)));

    let mut config = backend.config();
    config.account = Some(account("hunter2"));
    let mut client = PlayStoreClient::new(config).unwrap();

    let session = client.login(None).await.unwrap();
    assert_eq!(session.token(), "session-1");
    assert_eq!(session.checkin().map(|c| c.android_id), Some(0xabc));

    let sent = backend.requests();
    assert_eq!(sent[0].target, "/checkin");
    assert_eq!(sent[0].header("content-type"), Some("application/x-protobuffer"));
    assert_eq!(sent[1].target, "/auth");
    let form = sent[1].body_text();
    assert!(form.contains("Email=user%40example.com"), "{}", form);
    assert!(form.contains("Passwd=hunter2"), "{}", form);
    assert!(form.contains("androidId=abc"), "{}", form);
    assert!(form.contains("service=androidmarket"), "{}", form);

    client.details("com.a").await.unwrap();
    let details = backend.requests_to("/fdfe/details");
    assert_eq!(details[0].header("x-dfe-device-id"), Some("abc"));
    assert_eq!(details[0].header("authorization"), Some("GoogleLogin auth=session-1"));
}

#[tokio::test]
async fn master_token_reply_is_exchanged_once_more() {
    init_test_logging();
    let backend = MockBackend::start().await;
    backend.on("/checkin", Reply::ok(replies::checkin(42, 1)));
    backend.on("/auth", Reply::ok(replies::auth_form(&[("Token", "aas_et/master")])));
    backend.on("/auth", Reply::ok(replies::auth_form(&[("Auth", "session-2")])));

    let mut config = backend.config();
    config.account = Some(account("pw"));
    let mut client = PlayStoreClient::new(config).unwrap();
    let session = client.login(None).await.unwrap();
    assert_eq!(session.token(), "session-2");

    let exchanges = backend.requests_to("/auth");
    assert_eq!(exchanges.len(), 2);
    assert!(exchanges[1].body_text().contains("Token=aas_et%2Fmaster"));
}

#[tokio::test]
async fn rejected_credentials_are_unauthorized() {
    init_test_logging();
    let backend = MockBackend::start().await;
    backend.on("/checkin", Reply::ok(replies::checkin(42, 1)));
    backend.on(
        "/auth",
        Reply::status(403).with_body(replies::auth_form(&[("Error", "BadAuthentication")])),
    );

    let mut config = backend.config();
    config.account = Some(account("wrong"));
    let mut client = PlayStoreClient::new(config).unwrap();
    let err = client.login(None).await.unwrap_err();

    match &err {
        StoreError::Auth(AuthError::Unauthorized(reason)) => {
            assert_eq!(reason, "BadAuthentication")
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(err.category(), ErrorCategory::Auth);
    assert_eq!(backend.hits("/auth"), 1);
    assert!(client.session().is_none());
}

#[tokio::test]
async fn error_key_in_a_success_reply_is_unauthorized() {
    let backend = MockBackend::start().await;
    backend.on("/checkin", Reply::ok(replies::checkin(42, 1)));
    backend.on("/auth", Reply::ok(replies::auth_form(&[("Error", "NeedsBrowser")])));

    let mut config = backend.config();
    config.account = Some(account("pw"));
    let mut client = PlayStoreClient::new(config).unwrap();
    assert!(matches!(
        client.login(None).await,
        Err(StoreError::Auth(AuthError::Unauthorized(_)))
    ));
}

#[tokio::test]
async fn malformed_checkin_is_a_protocol_mismatch() {
    init_test_logging();
    let backend = MockBackend::start().await;
    // Length-delimited field announcing 127 bytes that never arrive.
    backend.on("/checkin", Reply::ok(&b"\x22\x7f\x01"[..]));

    let mut config = backend.config();
    config.account = Some(account("pw"));
    let mut client = PlayStoreClient::new(config).unwrap();
    let err = client.login(None).await.unwrap_err();

    assert!(
        matches!(err, StoreError::Auth(AuthError::ProtocolMismatch(_))),
        "{:?}",
        err
    );
    assert_eq!(err.category(), ErrorCategory::Protocol);
    assert_eq!(backend.hits("/auth"), 0);
}

#[tokio::test]
async fn checkin_without_android_id_is_a_protocol_mismatch() {
    let backend = MockBackend::start().await;
    backend.on("/checkin", Reply::ok(replies::checkin(0, 0)));

    let mut config = backend.config();
    config.account = Some(account("pw"));
    let mut client = PlayStoreClient::new(config).unwrap();
    assert!(matches!(
        client.login(None).await,
        Err(StoreError::Auth(AuthError::ProtocolMismatch(_)))
    ));
}

#[tokio::test]
async fn remote_token_is_the_trimmed_body() {
    let backend = MockBackend::start().await;
    backend.on("/token", Reply::ok("  remote-session\n"));
    backend.on("/spaced", Reply::ok("\tab cd\r\n"));
    backend.on("/revoked", Reply::status(500));

    let token = fetch_remote_token(&backend.url("/token")).await.unwrap();
    assert_eq!(token, "remote-session");
    // Only the ends are stripped.
    let token = fetch_remote_token(&backend.url("/spaced")).await.unwrap();
    assert_eq!(token, "ab cd");

    assert!(matches!(
        fetch_remote_token(&backend.url("/revoked")).await,
        Err(AuthError::Unauthorized(_))
    ));
}
