use futures_util::TryStreamExt;

use lib_playstore::codec::ResponseEnvelope;
use lib_playstore::error::{ErrorCategory, QueryError, StoreError};
use lib_playstore::query::QueryEngine;
use lib_playstore::PlayStoreClient;
use project_tests::{init_test_logging, replies, MockBackend, Reply};

async fn logged_in(backend: &MockBackend) -> PlayStoreClient {
    let mut client = PlayStoreClient::new(backend.config()).unwrap();
    client.login(Some("tok")).await.unwrap();
    client
}

fn docids(envelope: &ResponseEnvelope) -> Vec<&str> {
    envelope.items().iter().map(|d| d.docid.as_str()).collect()
}

#[tokio::test]
async fn list_pages_follow_continuations_to_the_end() {
    init_test_logging();
    let backend = MockBackend::start().await;
    backend.on(
        "/fdfe/list?c=3&cat=GAME&ctr=ACTION",
        Reply::ok(replies::list_page(&["a", "b"], Some("list?page=2"))),
    );
    backend.on(
        "/fdfe/list?page=2",
        Reply::ok(replies::list_page(&["c"], Some("list?page=3"))),
    );
    backend.on("/fdfe/list?page=3", Reply::ok(replies::list_page(&["d"], None)));
    let client = logged_in(&backend).await;

    let request = QueryEngine::list_request(Some("GAME"), Some("ACTION")).unwrap();
    let pages = client.get_pages(request).await.unwrap();

    assert_eq!(pages.len(), 3);
    let all: Vec<&str> = pages.items().map(|d| d.docid.as_str()).collect();
    assert_eq!(all, ["a", "b", "c", "d"]);
    assert_eq!(backend.requests().len(), 3);
    assert!(pages.pages()[2].continuation().is_none());
}

#[tokio::test]
async fn a_cycling_marker_stops_with_stale_continuation() {
    init_test_logging();
    let backend = MockBackend::start().await;
    backend.on(
        "/fdfe/search?c=3&q=maps",
        Reply::ok(replies::search_page(&["a"], Some("search?page=2"))),
    );
    backend.on(
        "/fdfe/search?page=2",
        Reply::ok(replies::search_page(&["b"], Some("search?page=2"))),
    );
    let client = logged_in(&backend).await;

    let partial = client
        .get_pages(QueryEngine::search_request("maps"))
        .await
        .unwrap_err();

    assert_eq!(partial.pages.len(), 2);
    assert!(matches!(partial.error, QueryError::StaleContinuation(_)));
    assert_eq!(backend.hits("/fdfe/search?page=2"), 1);
}

#[tokio::test]
async fn an_expired_marker_is_stale() {
    let backend = MockBackend::start().await;
    backend.on(
        "/fdfe/search?c=3&q=maps",
        Reply::ok(replies::search_page(&["a"], Some("search?page=9"))),
    );
    backend.on("/fdfe/search?page=9", Reply::status(410));
    let client = logged_in(&backend).await;

    let partial = client
        .get_pages(QueryEngine::search_request("maps"))
        .await
        .unwrap_err();
    assert_eq!(partial.pages.len(), 1);
    assert!(matches!(partial.error, QueryError::StaleContinuation(ref m) if m == "search?page=9"));
}

#[tokio::test]
async fn pager_streams_and_restarts() {
    let backend = MockBackend::start().await;
    backend.on(
        "/fdfe/search?c=3&q=maps",
        Reply::ok(replies::search_page(&["a"], Some("search?page=2"))),
    );
    backend.on("/fdfe/search?page=2", Reply::ok(replies::search_page(&["b"], None)));
    let client = logged_in(&backend).await;

    let mut pager = client.pager(QueryEngine::search_request("maps")).unwrap();
    let first = pager.next_page().await.unwrap().unwrap();
    assert_eq!(docids(&first), ["a"]);
    pager.restart();
    let pages: Vec<ResponseEnvelope> = pager.into_stream().try_collect().await.unwrap();
    assert_eq!(pages.len(), 2);
    assert_eq!(docids(&pages[1]), ["b"]);
    assert_eq!(backend.hits("/fdfe/search?c=3"), 2);
}

#[tokio::test]
async fn expansion_continues_from_a_fetched_first_page() {
    let backend = MockBackend::start().await;
    backend.on(
        "/fdfe/search?c=3&q=maps",
        Reply::ok(replies::search_page(&["a"], Some("search?page=2"))),
    );
    backend.on("/fdfe/search?page=2", Reply::ok(replies::search_page(&["b"], None)));
    let client = logged_in(&backend).await;

    let first = client.search("maps").await.unwrap();
    let pages = client
        .get_pages_from(QueryEngine::search_request("maps"), first)
        .await
        .unwrap();

    assert_eq!(pages.len(), 2);
    assert_eq!(docids(&pages.pages()[0]), ["a"]);
    assert_eq!(docids(&pages.pages()[1]), ["b"]);
    assert_eq!(backend.hits("/fdfe/search?c=3"), 1);
    assert_eq!(backend.hits("/fdfe/search?page=2"), 1);
}

#[tokio::test]
async fn similar_apps_expand_across_pages() {
    let backend = MockBackend::start().await;
    backend.on(
        "/fdfe/rec?c=3&doc=com.a",
        Reply::ok(replies::list_page(&["com.b"], Some("rec?page=2"))),
    );
    backend.on("/fdfe/rec?page=2", Reply::ok(replies::list_page(&["com.c"], None)));
    let client = logged_in(&backend).await;

    let pages = client
        .get_pages(QueryEngine::similar_request("com.a"))
        .await
        .unwrap();
    let all: Vec<&str> = pages.items().map(|d| d.docid.as_str()).collect();
    assert_eq!(all, ["com.b", "com.c"]);
}

#[tokio::test]
async fn bulk_details_keeps_unknown_slots() {
    init_test_logging();
    let backend = MockBackend::start().await;
    backend.on(
        "/fdfe/bulkDetails",
        Reply::ok(replies::bulk(&[Some("com.a"), None, Some("com.c")])),
    );
    let client = logged_in(&backend).await;

    let packages = vec!["com.a".to_string(), "com.b".to_string(), "com.c".to_string()];
    let docs = client.bulk_details(&packages, false, true).await.unwrap();

    let ids: Vec<Option<&str>> = docs.iter().map(|d| d.as_ref().map(|d| d.docid.as_str())).collect();
    assert_eq!(ids, [Some("com.a"), None, Some("com.c")]);

    let sent = backend.requests_to("/fdfe/bulkDetails");
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].method, "POST");
    assert_eq!(sent[0].header("content-type"), Some("application/x-protobuf"));
}

#[tokio::test]
async fn short_bulk_replies_are_aligned_by_docid() {
    let backend = MockBackend::start().await;
    backend.on(
        "/fdfe/bulkDetails",
        Reply::ok(replies::bulk(&[Some("com.c"), Some("com.a")])),
    );
    let client = logged_in(&backend).await;

    let packages = vec!["com.a".to_string(), "com.b".to_string(), "com.c".to_string()];
    let docs = client.bulk_details(&packages, false, true).await.unwrap();
    let ids: Vec<Option<&str>> = docs.iter().map(|d| d.as_ref().map(|d| d.docid.as_str())).collect();
    assert_eq!(ids, [Some("com.a"), None, Some("com.c")]);
}

#[tokio::test]
async fn unknown_package_is_not_found() {
    let backend = MockBackend::start().await;
    backend.on("/fdfe/details", Reply::status(404));
    let client = logged_in(&backend).await;

    let err = client.details("com.missing").await.unwrap_err();
    assert!(matches!(err, StoreError::Query(QueryError::NotFound(ref p)) if p == "com.missing"));
    assert_eq!(err.category(), ErrorCategory::NotFound);
}

#[tokio::test]
async fn rejected_session_surfaces_as_unauthorized() {
    let backend = MockBackend::start().await;
    backend.on("/fdfe/details", Reply::status(401));
    let client = logged_in(&backend).await;

    let err = client.details("com.a").await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Auth);
    assert_eq!(backend.hits("/fdfe/details"), 1);
}

#[tokio::test]
async fn similar_and_free_requests_hit_their_paths() {
    let backend = MockBackend::start().await;
    backend.on("/fdfe/rec", Reply::ok(replies::list_page(&["com.b"], None)));
    backend.on("/fdfe/details", Reply::ok(replies::details("com.a", 5)));
    let client = logged_in(&backend).await;

    let similar = client.list_similar("com.a").await.unwrap();
    assert_eq!(docids(&similar), ["com.b"]);
    assert_eq!(backend.requests()[0].target, "/fdfe/rec?c=3&doc=com.a&rt=1");

    match client.free_request("details?doc=com.a").await.unwrap() {
        ResponseEnvelope::Details(Some(doc)) => assert_eq!(doc.version_code(), Some(5)),
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn subcategory_without_category_is_rejected_locally() {
    let backend = MockBackend::start().await;
    let client = logged_in(&backend).await;

    let err = client.list(None, Some("ACTION")).await.unwrap_err();
    assert!(matches!(err, StoreError::Query(QueryError::InvalidArgument(_))));
    assert_eq!(err.category(), ErrorCategory::Usage);
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn envelopes_serialize_with_a_kind_tag() {
    let backend = MockBackend::start().await;
    backend.on("/fdfe/details", Reply::ok(replies::details("com.a", 5)));
    let client = logged_in(&backend).await;

    let envelope = client.free_request("details?doc=com.a").await.unwrap();
    let json = serde_json::to_value(&envelope).unwrap();
    assert_eq!(json["kind"], "details");
    assert_eq!(json["value"]["docid"], "com.a");
    assert_eq!(json["value"]["app"]["versionCode"], 5);
}
