//! Provider adapter tests against local mock upstreams.
//!
//! Tests verify:
//! - GitHub contents requests: URL encoding, auth header, base64 upload body,
//!   sha-authorized delete and error mapping
//! - Cloudflare requests: purge body, deployment trigger and status parsing,
//!   envelope failures

use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::{OriginalUri, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::json;

use imghost::error::{CdnError, ContentError};
use imghost::{
    CdnProvider, CloudflareCdn, ContentRoot, ContentStore, DeploymentStage, EntryKind,
    GitHubContentStore, ImageLibrary, ImageQuery,
};

/// A request seen by a mock upstream.
#[derive(Debug, Clone)]
struct Recorded {
    method: Method,
    path: String,
    authorization: String,
    body: serde_json::Value,
}

type Log = Arc<Mutex<Vec<Recorded>>>;

/// Serve `router` on an ephemeral local port and return its base URL.
async fn spawn_upstream(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn record(log: &Log, method: &Method, uri: &OriginalUri, headers: &HeaderMap, body: &Bytes) {
    log.lock().unwrap().push(Recorded {
        method: method.clone(),
        path: uri.0.path().to_string(),
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string(),
        body: serde_json::from_slice(body).unwrap_or(serde_json::Value::Null),
    });
}

// =============================================================================
// GitHub
// =============================================================================

const CONTENTS: &str = "/repos/octo/images/contents";

async fn github_mock(
    State(log): State<Log>,
    method: Method,
    uri: OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    record(&log, &method, &uri, &headers, &body);

    let path = uri.0.path().strip_prefix(CONTENTS).unwrap_or_default();
    if method == Method::PUT {
        return (StatusCode::CREATED, Json(json!({ "content": {} }))).into_response();
    }
    if method == Method::DELETE {
        return Json(json!({ "commit": {} })).into_response();
    }

    match path {
        "/frontend" => Json(json!([
            { "name": "cats", "path": "frontend/cats", "type": "dir", "size": 0, "sha": "d1" },
            { "name": "css", "path": "frontend/css", "type": "dir", "size": 0, "sha": "d2" },
            { "name": "a.png", "path": "frontend/a.png", "type": "file", "size": 10, "sha": "s1" },
            { "name": "notes.md", "path": "frontend/notes.md", "type": "file", "size": 3, "sha": "s2" },
            { "name": "b.avif", "path": "frontend/b.avif", "type": "file", "size": 20, "sha": "s3" }
        ]))
        .into_response(),
        "/frontend/my%20cats" => Json(json!([
            { "name": "x.jpg", "path": "frontend/my cats/x.jpg", "type": "file", "size": 1, "sha": "s4" }
        ]))
        .into_response(),
        "/frontend/a.png" => Json(json!(
            { "name": "a.png", "path": "frontend/a.png", "type": "file", "size": 10, "sha": "s1" }
        ))
        .into_response(),
        "/frontend/private" => (
            StatusCode::FORBIDDEN,
            Json(json!({ "message": "Resource not accessible by integration" })),
        )
            .into_response(),
        _ => (StatusCode::NOT_FOUND, Json(json!({ "message": "Not Found" }))).into_response(),
    }
}

async fn github_store() -> (GitHubContentStore, Log) {
    let log = Log::default();
    let router = Router::new()
        .fallback(github_mock)
        .with_state(Arc::clone(&log));
    let base = spawn_upstream(router).await;
    let store = GitHubContentStore::new(reqwest::Client::new(), base, "octo/images", "ghp_test");
    (store, log)
}

#[tokio::test]
async fn test_github_list_directory() {
    let (store, log) = github_store().await;

    let entries = store.list_directory("frontend").await.unwrap();

    assert_eq!(entries.len(), 5);
    assert_eq!(entries[0].kind, EntryKind::Dir);
    assert_eq!(entries[2].name, "a.png");
    assert_eq!(entries[2].sha, "s1");

    let requests = log.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, Method::GET);
    assert_eq!(requests[0].authorization, "token ghp_test");
}

#[tokio::test]
async fn test_github_paths_are_segment_encoded() {
    let (store, log) = github_store().await;

    let entries = store.list_directory("frontend/my cats").await.unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(
        log.lock().unwrap()[0].path,
        format!("{}/frontend/my%20cats", CONTENTS)
    );
}

#[tokio::test]
async fn test_github_missing_path_is_not_found() {
    let (store, _log) = github_store().await;

    let err = store.list_directory("frontend/ghost").await.unwrap_err();

    assert!(matches!(err, ContentError::NotFound(_)));
    assert!(err.to_string().contains("404"));
}

#[tokio::test]
async fn test_github_error_keeps_message() {
    let (store, _log) = github_store().await;

    let err = store.list_directory("frontend/private").await.unwrap_err();

    match err {
        ContentError::Api { status, message } => {
            assert_eq!(status, 403);
            assert!(message.contains("Resource not accessible by integration"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_github_file_is_not_a_directory() {
    let (store, _log) = github_store().await;

    let err = store.list_directory("frontend/a.png").await.unwrap_err();

    assert!(matches!(err, ContentError::UnexpectedResponse(_)));
}

#[tokio::test]
async fn test_github_put_sends_base64() {
    let (store, log) = github_store().await;

    store
        .put_file("frontend/cats/new.png", b"hello", "Upload new.png")
        .await
        .unwrap();

    let requests = log.lock().unwrap().clone();
    assert_eq!(requests[0].method, Method::PUT);
    assert_eq!(requests[0].path, format!("{}/frontend/cats/new.png", CONTENTS));
    assert_eq!(requests[0].body["content"], "aGVsbG8=");
    assert_eq!(requests[0].body["message"], "Upload new.png");
}

#[tokio::test]
async fn test_library_delete_uses_entry_sha() {
    let (store, log) = github_store().await;
    let library = ImageLibrary::with_root(store, ContentRoot::new("frontend"));

    library.delete_image("a.png").await.unwrap();

    let requests = log.lock().unwrap().clone();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].method, Method::GET);
    assert_eq!(requests[1].method, Method::DELETE);
    assert_eq!(requests[1].path, format!("{}/frontend/a.png", CONTENTS));
    assert_eq!(requests[1].body["sha"], "s1");
}

#[tokio::test]
async fn test_library_over_github() {
    let (store, _log) = github_store().await;
    let library = ImageLibrary::with_root(store, ContentRoot::new("frontend"));

    let folders = library.list_folders().await.unwrap();
    assert_eq!(folders, vec!["cats".to_string()]);

    let page = library
        .list_images(
            &ImageQuery::new("frontend", 1, 20),
            Some("https://img.example.com/"),
        )
        .await
        .unwrap();
    let names: Vec<&str> = page.images.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["a.png", "b.avif"]);
    assert_eq!(page.images[1].url, "https://img.example.com/b.avif");
    assert_eq!(page.pagination.total, 1);
}

// =============================================================================
// Cloudflare
// =============================================================================

const PROJECT: &str = "/accounts/acc-1/pages/projects/img-host";

async fn cloudflare_mock(
    State(log): State<Log>,
    method: Method,
    uri: OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    record(&log, &method, &uri, &headers, &body);

    let path = uri.0.path().to_string();
    let deployments = format!("{}/deployments", PROJECT);
    let ok = |result: serde_json::Value| {
        Json(json!({ "success": true, "errors": [], "messages": [], "result": result }))
            .into_response()
    };

    if method == Method::POST && path == "/zones/zone-1/purge_cache" {
        ok(json!({ "id": "zone-1" }))
    } else if method == Method::POST && path == deployments {
        ok(json!({ "id": "dep-9", "latest_stage": { "name": "queued", "status": "active" } }))
    } else if method == Method::GET && path == format!("{}/dep-9", deployments) {
        ok(json!({ "id": "dep-9", "latest_stage": { "name": "deploy", "status": "success" } }))
    } else if method == Method::GET && path == PROJECT {
        ok(json!({ "name": "img-host" }))
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({
                "success": false,
                "errors": [{ "code": 8000007, "message": "Project not found" }],
                "messages": [],
                "result": null
            })),
        )
            .into_response()
    }
}

async fn cloudflare_cdn() -> (CloudflareCdn, Log) {
    let log = Log::default();
    let router = Router::new()
        .fallback(cloudflare_mock)
        .with_state(Arc::clone(&log));
    let base = spawn_upstream(router).await;
    let cdn = CloudflareCdn::new(reqwest::Client::new(), base, "cf-token", "zone-1", "acc-1");
    (cdn, log)
}

#[tokio::test]
async fn test_cloudflare_purge_body() {
    let (cdn, log) = cloudflare_cdn().await;

    cdn.purge_prefixes(&["img.example.com/".to_string()])
        .await
        .unwrap();

    let requests = log.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].authorization, "Bearer cf-token");
    assert_eq!(requests[0].body, json!({ "prefixes": ["img.example.com/"] }));
}

#[tokio::test]
async fn test_cloudflare_trigger_and_status() {
    let (cdn, _log) = cloudflare_cdn().await;

    let id = cdn.trigger_deployment().await.unwrap();
    assert_eq!(id.as_deref(), Some("dep-9"));

    let stage = cdn.deployment_status("dep-9").await.unwrap();
    assert_eq!(stage, DeploymentStage::Success);
    assert!(stage.is_completed());
}

#[tokio::test]
async fn test_cloudflare_envelope_failure() {
    let (cdn, _log) = cloudflare_cdn().await;

    let err = cdn.deployment_status("missing").await.unwrap_err();

    match err {
        CdnError::Api { errors } => assert!(errors.contains("Project not found")),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_cloudflare_check_project() {
    let (cdn, _log) = cloudflare_cdn().await;
    assert!(cdn.check_project().await.is_ok());

    let (cdn, _log) = cloudflare_cdn().await;
    let cdn = cdn.with_project("other-site");
    assert!(cdn.check_project().await.is_err());
}

#[tokio::test]
async fn test_cloudflare_unreachable() {
    // Nothing listens on port 9 locally
    let cdn = CloudflareCdn::new(
        reqwest::Client::new(),
        "http://127.0.0.1:9",
        "cf-token",
        "zone-1",
        "acc-1",
    );

    let err = cdn.trigger_deployment().await.unwrap_err();

    assert!(matches!(err, CdnError::Request(_)));
}
