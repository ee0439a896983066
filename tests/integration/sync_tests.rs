//! Integration tests for the sync engine
//!
//! These tests use wiremock to stand in for the web client (landing page
//! and bundle) and the private API, and drive full chains end-to-end.

use bookmark_sync::state::ApiIdentifiers;
use bookmark_sync::storage::{open_storage, ArchiveConsumer, Storage, MAX_REMOVAL_FAILURES};
use bookmark_sync::sync::{
    BookmarkConsumer, BookmarkEntry, BookmarksQuery, ChainEnd, EngineSettings, SyncEngine,
    SyncScheduler,
};
use bookmark_sync::SyncError;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

const COOKIE: &str = "auth_token=secret; ct0=csrf-token; lang=en";
const BEARER: &str = "AAAAAAAAAAAAAAAAAAAAAtestbearer%3Dxyz";
const LIST_OP: &str = "ListOp-1";
const DELETE_OP: &str = "DeleteOp_2";
const LIST_PATH: &str = "/i/api/graphql/ListOp-1/Bookmarks";

fn settings(server: &MockServer, page_size: u32, min_interval: Duration) -> EngineSettings {
    EngineSettings {
        page_size,
        min_interval,
        timeout: Duration::from_secs(2),
        base_url: server.uri(),
    }
}

/// Engine with identifiers installed, ready to run chains
fn ready_engine(server: &MockServer, page_size: u32) -> SyncEngine {
    let engine = SyncEngine::new(settings(server, page_size, Duration::from_millis(1)), COOKIE)
        .expect("engine");
    engine.apply_identifiers(&ApiIdentifiers {
        bearer_token: BEARER.to_string(),
        list_operation_id: LIST_OP.to_string(),
        delete_operation_id: DELETE_OP.to_string(),
    });
    engine
}

fn item(id: &str) -> Value {
    json!({
        "entryId": format!("tweet-{}", id),
        "content": {
            "entryType": "TimelineTimelineItem",
            "itemContent": {"tweet_results": {"result": {
                "rest_id": id,
                "core": {"user_results": {"result": {
                    "rest_id": "42",
                    "legacy": {"screen_name": "alice", "name": "Alice"}
                }}},
                "legacy": {"id_str": id, "full_text": format!("bookmark {}", id)}
            }}}
        }
    })
}

fn empty_item(id: &str) -> Value {
    json!({
        "entryId": format!("tweet-{}", id),
        "content": {
            "entryType": "TimelineTimelineItem",
            "itemContent": {"tweet_results": {"result": {"rest_id": id}}}
        }
    })
}

fn bottom(cursor: &str) -> Value {
    json!({
        "entryId": "cursor-bottom",
        "content": {
            "entryType": "TimelineTimelineCursor",
            "cursorType": "Bottom",
            "value": cursor
        }
    })
}

fn page(entries: Vec<Value>) -> Value {
    json!({"data": {"bookmark_timeline": {"timeline": {"instructions": [{
        "type": "TimelineAddEntries",
        "entries": entries
    }]}}}})
}

/// Matches list queries whose `variables.cursor` equals the given value
struct CursorIs(&'static str);

impl Match for CursorIs {
    fn matches(&self, request: &Request) -> bool {
        matches!(
            BookmarksQuery::from_url(&request.url),
            Ok(Some(query)) if query.variables.cursor == self.0
        )
    }
}

/// Consumer that records ids and accepts everything
#[derive(Default)]
struct Collect(Mutex<Vec<String>>);

impl Collect {
    fn ids(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

impl BookmarkConsumer for Collect {
    fn on_item(&self, entry: &BookmarkEntry) -> bool {
        self.0.lock().unwrap().push(entry.id().to_string());
        true
    }
}

async fn mount_client(server: &MockServer, bundle: &str) {
    let landing = format!(
        r#"<html><head>
        <script src="{0}/responsive-web/client-web/vendor.11aa.js"></script>
        <script src="{0}/responsive-web/client-web/main.3f9c2e.js"></script>
        </head><body></body></html>"#,
        server.uri()
    );

    Mock::given(method("GET"))
        .and(path("/i/bookmarks"))
        .and(header("cookie", COOKIE))
        .respond_with(ResponseTemplate::new(200).set_body_string(landing))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/responsive-web/client-web/main.3f9c2e.js"))
        .respond_with(ResponseTemplate::new(200).set_body_string(bundle.to_string()))
        .mount(server)
        .await;
}

fn bundle_source() -> String {
    format!(
        r#"e.exports={{queryId:"{}",operationName:"Bookmarks",operationType:"query"}};
        e.exports={{queryId:"{}",operationName:"DeleteBookmark",operationType:"mutation"}};
        const s="{}";"#,
        LIST_OP, DELETE_OP, BEARER
    )
}

// ===== Bootstrap =====

#[tokio::test]
async fn test_bootstrap_discovers_identifiers() {
    let server = MockServer::start().await;
    mount_client(&server, &bundle_source()).await;

    let engine = SyncEngine::new(settings(&server, 20, Duration::from_millis(1)), COOKIE).unwrap();
    assert!(!engine.credentials().has_identifiers());

    let identifiers = engine.bootstrap().await.unwrap();
    assert_eq!(identifiers.bearer_token, BEARER);
    assert_eq!(identifiers.list_operation_id, LIST_OP);
    assert_eq!(identifiers.delete_operation_id, DELETE_OP);

    let credentials = engine.credentials();
    assert!(credentials.has_identifiers());
    assert_eq!(credentials.csrf_token(), "csrf-token");
}

#[tokio::test]
async fn test_bootstrap_without_bundle_reference() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/i/bookmarks"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>login</body></html>"))
        .mount(&server)
        .await;

    let engine = SyncEngine::new(settings(&server, 20, Duration::from_millis(1)), COOKIE).unwrap();
    let result = engine.bootstrap().await;

    assert!(matches!(result, Err(SyncError::DiscoveryFailed("main bundle"))));
    assert!(!engine.credentials().has_identifiers());
}

#[tokio::test]
async fn test_bootstrap_bundle_without_token() {
    let server = MockServer::start().await;
    mount_client(&server, &bundle_source().replace(BEARER, "no-token-here")).await;

    let engine = SyncEngine::new(settings(&server, 20, Duration::from_millis(1)), COOKIE).unwrap();
    let result = engine.bootstrap().await;

    assert!(matches!(result, Err(SyncError::DiscoveryFailed("access token"))));
}

#[tokio::test]
async fn test_bootstrap_landing_page_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/i/bookmarks"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let engine = SyncEngine::new(settings(&server, 20, Duration::from_millis(1)), COOKIE).unwrap();
    let error = engine.bootstrap().await.unwrap_err();

    assert!(matches!(error, SyncError::UpstreamStatus { status: 503, .. }));
    assert!(error.is_upstream_unavailable());
}

// ===== Pagination chain =====

#[tokio::test]
async fn test_api_errors_stop_after_eleven_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"errors": [{"message": "Rate limit exceeded", "code": 88}]})),
        )
        .expect(11)
        .mount(&server)
        .await;

    let engine = ready_engine(&server, 20);
    let collect = Collect::default();
    let report = engine.run_chain(false, &collect).await.unwrap();

    assert_eq!(report.attempts, 11);
    assert_eq!(report.pages, 0);
    match report.end {
        ChainEnd::RetriesExhausted { errors } => {
            assert_eq!(errors.len(), 11);
            assert_eq!(errors[0], "Rate limit exceeded");
        }
        other => panic!("expected RetriesExhausted, got {:?}", other),
    }
    assert!(!engine.is_running());
    assert!(collect.ids().is_empty());
}

#[tokio::test]
async fn test_api_error_then_success_continues() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"errors": [{"message": "Try again"}]})),
        )
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![item("1")])))
        .expect(1)
        .mount(&server)
        .await;

    let engine = ready_engine(&server, 20);
    let collect = Collect::default();
    let report = engine.run_chain(false, &collect).await.unwrap();

    assert_eq!(report.attempts, 3);
    assert!(matches!(report.end, ChainEnd::Exhausted));
    assert_eq!(collect.ids(), vec!["1"]);
    assert_eq!(engine.run_state().retry_count(), 0);
}

#[tokio::test]
async fn test_consumer_false_stops_chain() {
    let server = MockServer::start().await;
    let authorization = format!("Bearer {}", BEARER);
    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .and(header("authorization", authorization.as_str()))
        .and(header("x-csrf-token", "csrf-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![
            item("1"),
            item("2"),
            item("3"),
            bottom("next"),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let engine = ready_engine(&server, 20);
    let calls = AtomicUsize::new(0);
    let consumer = |_: &BookmarkEntry| calls.fetch_add(1, Ordering::SeqCst) == 0;

    let report = engine.run_chain(false, &consumer).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(report.delivered, 2);
    assert!(matches!(report.end, ChainEnd::ConsumerStopped));
    assert_eq!(engine.cursor(), "");
}

#[tokio::test]
async fn test_fresh_chain_follows_bottom_cursor() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .and(CursorIs(""))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(page(vec![item("1"), item("2"), bottom("c1")])),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .and(CursorIs("c1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![item("3")])))
        .expect(1)
        .mount(&server)
        .await;

    let engine = ready_engine(&server, 20);
    engine.run_state().set_cursor("stale");
    let collect = Collect::default();
    let report = engine.run_chain(false, &collect).await.unwrap();

    assert_eq!(collect.ids(), vec!["1", "2", "3"]);
    assert_eq!(report.pages, 2);
    assert_eq!(report.cursor, "c1");
    assert!(matches!(report.end, ChainEnd::Exhausted));
}

#[tokio::test]
async fn test_fresh_chain_halts_without_bottom_cursor() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(page(vec![item("1"), item("2")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let engine = ready_engine(&server, 2);
    let collect = Collect::default();
    let report = engine.run_chain(false, &collect).await.unwrap();

    assert_eq!(report.attempts, 1);
    assert!(matches!(report.end, ChainEnd::Exhausted));
}

#[tokio::test]
async fn test_resume_advances_only_past_empty_pages() {
    let server = MockServer::start().await;

    // Full page of items that no longer resolve: cursor moves on
    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .and(CursorIs(""))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![
            empty_item("90"),
            empty_item("91"),
            bottom("c1"),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    // Full page with content: same window fetched again
    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .and(CursorIs("c1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![
            item("1"),
            item("2"),
            bottom("c2"),
        ])))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    // Short page: list exhausted
    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .and(CursorIs("c1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![item("3"), bottom("c2")])))
        .expect(1)
        .mount(&server)
        .await;

    let engine = ready_engine(&server, 2);
    let collect = Collect::default();
    let report = engine.run_chain(true, &collect).await.unwrap();

    assert_eq!(collect.ids(), vec!["1", "2", "3"]);
    assert_eq!(report.pages, 3);
    assert_eq!(report.empty, 2);
    assert_eq!(report.cursor, "c1");
    assert_eq!(engine.cursor(), "c1");
    assert!(matches!(report.end, ChainEnd::Exhausted));
}

#[tokio::test]
async fn test_resume_keeps_cursor_between_chains() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .and(CursorIs("kept"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![])))
        .expect(1)
        .mount(&server)
        .await;

    let engine = ready_engine(&server, 20);
    engine.run_state().set_cursor("kept");
    let report = engine.run_chain(true, &Collect::default()).await.unwrap();

    assert!(matches!(report.end, ChainEnd::Exhausted));
    assert_eq!(engine.cursor(), "kept");

    engine.reset_cursor();
    assert_eq!(engine.cursor(), "");
}

#[tokio::test]
async fn test_second_chain_is_rejected_while_running() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page(vec![item("1")]))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let engine = ready_engine(&server, 20);
    let collect = Collect::default();

    let (first, second) = tokio::join!(engine.run_chain(false, &collect), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let running = engine.is_running();
        (running, engine.run_chain(false, &collect).await)
    });

    let (was_running, rejected) = second;
    assert!(was_running);
    assert!(rejected.is_none());
    assert!(first.is_some());
    assert!(!engine.is_running());
    assert_eq!(collect.ids(), vec!["1"]);
}

#[tokio::test]
async fn test_upstream_status_ends_chain() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let engine = ready_engine(&server, 20);
    let report = engine.run_chain(true, &Collect::default()).await.unwrap();

    match report.end {
        ChainEnd::Failed(e) => {
            assert!(matches!(e, SyncError::UpstreamStatus { status: 503, .. }));
            assert!(e.is_upstream_unavailable());
        }
        other => panic!("expected Failed, got {:?}", other),
    }
    assert!(!engine.is_running());
}

#[tokio::test]
async fn test_malformed_body_ends_chain() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let engine = ready_engine(&server, 20);
    let report = engine.run_chain(false, &Collect::default()).await.unwrap();

    assert!(matches!(report.end, ChainEnd::Failed(SyncError::Decode(_))));
}

#[tokio::test]
async fn test_chain_without_identifiers_fails() {
    let server = MockServer::start().await;
    let engine = SyncEngine::new(settings(&server, 20, Duration::from_millis(1)), COOKIE).unwrap();

    let report = engine.run_chain(false, &Collect::default()).await.unwrap();

    assert!(matches!(report.end, ChainEnd::Failed(SyncError::NotBootstrapped)));
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_request_timeout_ends_chain() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page(vec![item("1")]))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let engine = SyncEngine::new(
        EngineSettings {
            timeout: Duration::from_millis(200),
            ..settings(&server, 20, Duration::from_millis(1))
        },
        COOKIE,
    )
    .unwrap();
    engine.apply_identifiers(&ApiIdentifiers {
        bearer_token: BEARER.to_string(),
        list_operation_id: LIST_OP.to_string(),
        delete_operation_id: DELETE_OP.to_string(),
    });

    let collect = Collect::default();
    let report = engine.run_chain(false, &collect).await.unwrap();

    match report.end {
        ChainEnd::Failed(e) => {
            assert!(matches!(e, SyncError::Timeout { .. }));
            assert!(e.is_upstream_unavailable());
        }
        other => panic!("expected Failed, got {:?}", other),
    }
    assert!(collect.ids().is_empty());
    assert!(!engine.is_running());
}

#[tokio::test]
async fn test_missing_identifiers_skip_the_throttle() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![item("1")])))
        .expect(1)
        .mount(&server)
        .await;

    let engine = SyncEngine::new(settings(&server, 20, Duration::from_secs(10)), COOKIE).unwrap();
    let started = Instant::now();

    let report = engine.run_chain(false, &Collect::default()).await.unwrap();
    assert!(matches!(report.end, ChainEnd::Failed(SyncError::NotBootstrapped)));
    assert!(matches!(
        engine.delete_item("1").await,
        Err(SyncError::NotBootstrapped)
    ));

    engine.apply_identifiers(&ApiIdentifiers {
        bearer_token: BEARER.to_string(),
        list_operation_id: LIST_OP.to_string(),
        delete_operation_id: DELETE_OP.to_string(),
    });
    let report = engine.run_chain(false, &Collect::default()).await.unwrap();

    assert!(matches!(report.end, ChainEnd::Exhausted));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_requests_are_spaced_by_min_interval() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .and(CursorIs(""))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![item("1"), bottom("c1")])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .and(CursorIs("c1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![item("2")])))
        .mount(&server)
        .await;

    let engine = SyncEngine::new(settings(&server, 20, Duration::from_millis(250)), COOKIE).unwrap();
    engine.apply_identifiers(&ApiIdentifiers {
        bearer_token: BEARER.to_string(),
        list_operation_id: LIST_OP.to_string(),
        delete_operation_id: DELETE_OP.to_string(),
    });

    let started = Instant::now();
    let report = engine.run_chain(false, &Collect::default()).await.unwrap();

    assert_eq!(report.pages, 2);
    assert!(started.elapsed() >= Duration::from_millis(250));
}

// ===== Single-item operations =====

#[tokio::test]
async fn test_delete_item() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/i/api/graphql/DeleteOp_2/DeleteBookmark"))
        .and(header("x-csrf-token", "csrf-token"))
        .and(body_json(json!({
            "variables": {"tweet_id": "123"},
            "queryId": DELETE_OP
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": {"tweet_bookmark_delete": "Done"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let engine = ready_engine(&server, 20);
    assert_eq!(engine.delete_item("123").await.unwrap(), "Done");
}

#[tokio::test]
async fn test_delete_item_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/i/api/graphql/DeleteOp_2/DeleteBookmark"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"errors": [{"message": "Not found", "code": 144}]})),
        )
        .mount(&server)
        .await;

    let engine = ready_engine(&server, 20);
    let error = engine.delete_item("404").await.unwrap_err();
    assert!(matches!(error, SyncError::Api(ref message) if message == "Not found"));
}

#[tokio::test]
async fn test_tweet_detail() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/i/api/2/timeline/conversation/123.json"))
        .and(query_param("tweet_mode", "extended"))
        .and(query_param("include_tweet_replies", "true"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"globalObjects": {"tweets": {"123": {"full_text": "hi"}}}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let engine = ready_engine(&server, 20);
    let document = engine.tweet_detail("123").await.unwrap();
    assert_eq!(document["globalObjects"]["tweets"]["123"]["full_text"], "hi");
}

#[tokio::test]
async fn test_download_to_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/media/photo.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8, 0xFF, 0xE0]))
        .mount(&server)
        .await;

    let engine = ready_engine(&server, 20);
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("photo.jpg");

    engine
        .download_to(&format!("{}/media/photo.jpg", server.uri()), &target)
        .await
        .unwrap();
    assert_eq!(std::fs::read(&target).unwrap(), vec![0xFF, 0xD8, 0xFF, 0xE0]);

    let missing = engine
        .download_to(&format!("{}/media/missing.jpg", server.uri()), &target)
        .await;
    assert!(matches!(missing, Err(SyncError::UpstreamStatus { status: 404, .. })));
}

#[tokio::test]
async fn test_failed_removal_is_retried_then_abandoned() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/i/api/graphql/DeleteOp_2/DeleteBookmark"))
        .respond_with(ResponseTemplate::new(500))
        .expect(u64::from(MAX_REMOVAL_FAILURES))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut storage = open_storage(&dir.path().join("archive.db")).unwrap();
    let run_id = storage.create_run("hash").unwrap();
    let (consumer, rx) = ArchiveConsumer::removing(storage, run_id);
    let consumer = Arc::new(consumer);
    let engine = Arc::new(ready_engine(&server, 20));

    let deleter = {
        let consumer = consumer.clone();
        let engine = engine.clone();
        tokio::spawn(async move { consumer.process_removals(&engine, rx).await })
    };

    let mut entry = BookmarkEntry::default();
    entry.tweet.id_str = "1".to_string();
    entry.author.legacy.screen_name = "alice".to_string();

    for attempt in 1..=MAX_REMOVAL_FAILURES {
        assert!(consumer.on_item(&entry));
        tokio::time::timeout(Duration::from_secs(5), async {
            while consumer.removal_failures("1") < attempt {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("removal attempt");
        assert!(!consumer.is_queued("1"));
    }

    assert!(!consumer.on_item(&entry));
    assert!(!consumer.is_queued("1"));

    consumer.close_removals();
    deleter.await.unwrap();
}

// ===== Scheduler =====

#[tokio::test]
async fn test_scheduler_runs_chains_until_stopped() {
    let server = MockServer::start().await;
    mount_client(&server, &bundle_source()).await;
    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![item("1")])))
        .expect(2..)
        .mount(&server)
        .await;

    let engine = Arc::new(
        SyncEngine::new(settings(&server, 20, Duration::from_millis(1)), COOKIE).unwrap(),
    );
    let collect = Arc::new(Collect::default());
    let mut scheduler = SyncScheduler::new(engine.clone(), collect.clone())
        .with_interval(Duration::from_millis(50));

    scheduler.start(false).await.unwrap();
    assert!(scheduler.is_started());
    assert!(engine.credentials().has_identifiers());

    tokio::time::sleep(Duration::from_millis(230)).await;
    scheduler.stop().await;
    assert!(!scheduler.is_started());

    let delivered = collect.ids().len();
    assert!(delivered >= 2, "expected at least two chains, got {}", delivered);

    // No further chains after stop
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(collect.ids().len(), delivered);
}

#[tokio::test]
async fn test_scheduler_does_not_start_when_bootstrap_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/i/bookmarks"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![])))
        .expect(0)
        .mount(&server)
        .await;

    let engine = Arc::new(
        SyncEngine::new(settings(&server, 20, Duration::from_millis(1)), COOKIE).unwrap(),
    );
    let mut scheduler = SyncScheduler::new(engine, Arc::new(Collect::default()))
        .with_interval(Duration::from_millis(20));

    let result = scheduler.start(false).await;
    assert!(matches!(result, Err(SyncError::UpstreamStatus { status: 404, .. })));
    assert!(!scheduler.is_started());

    tokio::time::sleep(Duration::from_millis(60)).await;
}
