mod common;

use catsync_storage::{JsonSnapshotStore, SnapshotStore};
use catsync_sync::{
    CatalogClient, CatalogConfig, Cursor, EntityConfig, FetchError, RecordMapping,
    SourceClient, SourceSettings, SyncEngine, SyncMode, parse_page,
};
use catsync_types::{Freshness, RecordId};
use catsync_variants::FallbackChains;
use common::RecordingSleeper;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer, settings: SourceSettings) -> CatalogClient {
    let config = CatalogConfig {
        endpoint: server.uri(),
        ..Default::default()
    };
    CatalogClient::new(config, settings, &EntityConfig::anime()).unwrap()
}

fn media_page(current_page: u32, has_next_page: bool, media: Value) -> Value {
    json!({
        "data": {
            "Page": {
                "pageInfo": { "currentPage": current_page, "hasNextPage": has_next_page },
                "media": media,
            }
        }
    })
}

fn anime(id: u64, updated_at: i64, romaji: &str) -> Value {
    json!({
        "id": id,
        "updatedAt": updated_at,
        "siteUrl": format!("https://anilist.co/anime/{id}"),
        "format": "TV",
        "title": { "romaji": romaji, "english": null, "native": null },
    })
}

// ── Config defaults ─────────────────────────────────────────────

#[test]
fn catalog_config_default() {
    let cfg = CatalogConfig::default();
    assert_eq!(cfg.endpoint, "https://graphql.anilist.co");
    assert_eq!(cfg.timeout_secs, 60);
}

#[test]
fn catalog_config_serde_roundtrip() {
    let cfg = CatalogConfig {
        endpoint: "http://localhost:8080".to_string(),
        timeout_secs: 5,
    };
    let json = serde_json::to_string(&cfg).unwrap();
    let back: CatalogConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back.endpoint, "http://localhost:8080");
    assert_eq!(back.timeout_secs, 5);
}

// ── Requests ────────────────────────────────────────────────────

#[tokio::test]
async fn posts_query_with_page_and_sort() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .and(header("content-type", "application/json"))
        .and(header("accept", "application/json"))
        .and(body_partial_json(json!({ "variables": { "page": 3, "sort": "ID" } })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(media_page(3, true, json!([anime(21, 1700000000, "One Piece")]))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let page = client(&server, SourceSettings::default())
        .fetch_page(&Cursor::full(2))
        .await
        .unwrap();

    assert_eq!(page.info.current_page, 3);
    assert!(page.info.has_next_page);
    let record = &page.records[0];
    assert_eq!(record.id, RecordId::Numeric(21));
    assert_eq!(record.freshness, Freshness::new(1700000000));
    assert_eq!(record.page.as_deref(), Some("https://anilist.co/anime/21"));
    assert_eq!(record.pointer("/title/romaji"), Some(&json!("One Piece")));
    assert_eq!(record.field("format"), Some(&json!("TV")));
    assert!(record.field("id").is_none());
}

#[tokio::test]
async fn proxy_prefix_and_headers_are_applied() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex("^/proxy/"))
        .and(header("x-proxy-key", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(media_page(1, false, json!([]))))
        .expect(1)
        .mount(&server)
        .await;

    let settings = SourceSettings::from_vars(
        Some(&format!("{}/proxy/", server.uri())),
        Some(r#"{"x-proxy-key": "secret"}"#),
    );
    let config = CatalogConfig {
        endpoint: "https://graphql.anilist.co".to_string(),
        ..Default::default()
    };
    let client = CatalogClient::new(config, settings, &EntityConfig::anime()).unwrap();

    let page = client.fetch_page(&Cursor::full(0)).await.unwrap();
    assert!(page.records.is_empty());
}

// ── Failure classification ──────────────────────────────────────

#[tokio::test]
async fn rate_limit_reports_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "12"))
        .mount(&server)
        .await;

    let err = client(&server, SourceSettings::default())
        .fetch_page(&Cursor::full(0))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        FetchError::RateLimited {
            retry_after: Some(Duration::from_secs(12))
        }
    );
}

#[tokio::test]
async fn server_error_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client(&server, SourceSettings::default())
        .fetch_page(&Cursor::full(0))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Transient(_)));
}

#[tokio::test]
async fn client_error_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;

    let err = client(&server, SourceSettings::default())
        .fetch_page(&Cursor::full(0))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Fatal(_)));
}

#[tokio::test]
async fn non_json_body_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = client(&server, SourceSettings::default())
        .fetch_page(&Cursor::full(0))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Fatal(_)));
}

#[test]
fn parse_page_requires_list_and_page_info() {
    let mapping = RecordMapping::catalog(true);

    let errors = json!({ "errors": [{ "message": "Invalid token" }], "data": null });
    assert!(parse_page(errors, "media", &mapping).is_err());

    let no_list = json!({ "data": { "Page": { "pageInfo": { "currentPage": 1, "hasNextPage": false } } } });
    assert!(parse_page(no_list, "media", &mapping).is_err());

    let no_info = json!({ "data": { "Page": { "media": [] } } });
    assert!(parse_page(no_info, "media", &mapping).is_err());

    let wrong_list = media_page(1, false, json!([]));
    assert!(parse_page(wrong_list, "staff", &mapping).is_err());
}

#[test]
fn parse_page_rejects_entries_without_id() {
    let body = media_page(1, false, json!([{ "updatedAt": 1 }]));
    let err = parse_page(body, "media", &RecordMapping::catalog(true)).unwrap_err();
    assert!(err.is_fatal());
}

// ── End to end ──────────────────────────────────────────────────

#[tokio::test]
async fn incremental_run_against_mock_catalog() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "variables": { "page": 1, "sort": "UPDATED_AT_DESC" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(media_page(
            1,
            true,
            json!([anime(30, 3000, "New"), anime(10, 2500, "Edited")]),
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "variables": { "page": 2, "sort": "UPDATED_AT_DESC" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(media_page(
            2,
            true,
            json!([anime(20, 2000, "Known"), anime(5, 100, "Old")]),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = JsonSnapshotStore::open(dir.path()).unwrap();
    let prior = parse_page(
        media_page(1, false, json!([anime(10, 1000, "Original"), anime(20, 2000, "Known")])),
        "media",
        &RecordMapping::catalog(true),
    )
    .unwrap();
    store
        .replace("anime", &prior.records.into_iter().collect())
        .unwrap();

    let engine = SyncEngine::new(
        EntityConfig::anime(),
        Arc::new(client(&server, SourceSettings::default())),
        Arc::new(store.clone()),
        Arc::new(FallbackChains::chinese()),
    )
    .with_sleeper(RecordingSleeper::new());

    let report = engine.run(SyncMode::Incremental, 0).await.unwrap();

    assert!(report.is_done());
    assert_eq!(report.pages, 2);
    assert_eq!(report.stats.added, 1);
    assert_eq!(report.stats.updated, 1);
    assert_eq!(report.stats.unchanged, 1);

    let snapshot = store.load("anime").unwrap();
    assert_eq!(snapshot.len(), 3);
    assert_eq!(
        snapshot.get(&RecordId::Numeric(10)).unwrap().pointer("/title/romaji"),
        Some(&json!("Edited"))
    );
}
