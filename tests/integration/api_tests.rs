//! API integration tests for the image, cache and deployment routes.
//!
//! Tests verify:
//! - Listing with extension filtering, search and pagination
//! - Upload validation and provider writes
//! - Delete path decoding and provider errors
//! - Cache purge and deployment routes
//! - Fallback envelopes, the `/api` alias and CORS preflight

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use imghost::error::{CdnError, ContentError};
use imghost::{
    create_router, ContentEntry, ContentRoot, ContentStore, DeploymentStage, ImageLibrary,
    RouterConfig, SessionAuth, TokenPolicy,
};

use super::test_utils::{
    authed, body_json, body_text, get_authed, multipart_body, test_router, upload_request,
    MockCdn, MockContentStore, TEST_DOMAIN, TEST_PASSWORD,
};

fn sample_store() -> MockContentStore {
    MockContentStore::new()
        .with_file("frontend/a.png", b"png")
        .with_file("frontend/b.txt", b"text")
        .with_file("frontend/c.jpg", b"jpeg")
        .with_file("frontend/d.webp", b"webp")
        .with_file("frontend/cats/tabby.png", b"tabby")
        .with_file("frontend/cats/Tiger.JPG", b"tiger")
        .with_file("frontend/css/site.css", b"body{}")
        .with_file("frontend/js/app.js", b"1")
}

// =============================================================================
// Root and Fallbacks
// =============================================================================

#[tokio::test]
async fn test_root_banner() {
    let router = test_router(MockContentStore::new(), MockCdn::new());

    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "Image Hosting API is running");
}

#[tokio::test]
async fn test_unknown_route_is_404_envelope() {
    let router = test_router(MockContentStore::new(), MockCdn::new());

    // No token: unknown paths are not behind the auth gate
    let request = Request::builder()
        .uri("/api/nope")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "API route not found");
}

#[tokio::test]
async fn test_wrong_method_is_405_envelope() {
    let router = test_router(MockContentStore::new(), MockCdn::new());

    let request = Request::builder()
        .method("GET")
        .uri("/api/login")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "Method not allowed");
}

#[tokio::test]
async fn test_cors_preflight() {
    let store = MockContentStore::new();
    let router = test_router(store.clone(), MockCdn::new());

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/folders")
        .header("origin", "https://admin.example.com")
        .header("access-control-request-method", "GET")
        .header(
            "access-control-request-headers",
            "authorization,x-image-domain",
        )
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers.get("access-control-allow-origin").unwrap(), "*");
    assert_eq!(headers.get("access-control-max-age").unwrap(), "86400");
    let allowed = headers
        .get("access-control-allow-headers")
        .unwrap()
        .to_str()
        .unwrap()
        .to_lowercase();
    assert!(allowed.contains("x-image-domain"));
    assert!(allowed.contains("authorization"));
    assert_eq!(store.call_count(), 0);
}

#[tokio::test]
async fn test_cors_header_on_regular_response() {
    let router = test_router(sample_store(), MockCdn::new());

    let request = authed("GET", "/api/folders")
        .header("origin", "https://admin.example.com")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
}

/// Store whose every call panics.
struct PanickingStore;

#[async_trait]
impl ContentStore for PanickingStore {
    async fn list_directory(&self, _path: &str) -> Result<Vec<ContentEntry>, ContentError> {
        panic!("boom")
    }

    async fn get_entry(&self, _path: &str) -> Result<ContentEntry, ContentError> {
        panic!("boom")
    }

    async fn put_file(
        &self,
        _path: &str,
        _content: &[u8],
        _message: &str,
    ) -> Result<(), ContentError> {
        panic!("boom")
    }

    async fn delete_file(
        &self,
        _path: &str,
        _sha: &str,
        _message: &str,
    ) -> Result<(), ContentError> {
        panic!("boom")
    }
}

#[tokio::test]
async fn test_panic_envelope_carries_cors_header() {
    let library = ImageLibrary::with_root(PanickingStore, ContentRoot::new("frontend"));
    let auth = SessionAuth::new(TEST_PASSWORD, TokenPolicy::AnyBearer);
    let router = create_router(
        library,
        MockCdn::new(),
        auth,
        RouterConfig::new().with_tracing(false),
    );

    let request = authed("GET", "/api/folders")
        .header("origin", "https://admin.example.com")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "Server error: boom");
}

#[tokio::test]
async fn test_wrong_method_on_protected_route_is_405_without_token() {
    let store = MockContentStore::new();
    let router = test_router(store.clone(), MockCdn::new());

    let request = Request::builder()
        .method("DELETE")
        .uri("/api/folders")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(store.call_count(), 0);
}

// =============================================================================
// Folders
// =============================================================================

#[tokio::test]
async fn test_folders_skip_reserved_names() {
    let router = test_router(sample_store(), MockCdn::new());

    let response = router.oneshot(get_authed("/api/folders")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["folders"], serde_json::json!(["cats"]));
}

#[tokio::test]
async fn test_routes_answer_without_api_prefix() {
    let router = test_router(sample_store(), MockCdn::new());

    let response = router.oneshot(get_authed("/folders")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["folders"], serde_json::json!(["cats"]));
}

#[tokio::test]
async fn test_folders_provider_error_is_500() {
    let store = sample_store();
    store.fail_with(ContentError::Api {
        status: 403,
        message: "Bad credentials".to_string(),
    });
    let router = test_router(store, MockCdn::new());

    let response = router.oneshot(get_authed("/api/folders")).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    let message = json["message"].as_str().unwrap();
    assert!(message.starts_with("Failed to list folders: "));
    assert!(message.contains("Bad credentials"));
}

// =============================================================================
// Image Listing
// =============================================================================

#[tokio::test]
async fn test_list_images_filters_and_paginates() {
    let router = test_router(sample_store(), MockCdn::new());

    let response = router
        .oneshot(get_authed("/api/images?path=frontend&page=1&limit=2"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);

    let images = json["data"]["images"].as_array().unwrap();
    let names: Vec<&str> = images.iter().map(|i| i["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["a.png", "c.jpg"]);
    assert_eq!(images[0]["url"], format!("{}/a.png", TEST_DOMAIN));
    assert_eq!(images[0]["size"], 3);
    assert!(images[0]["created_at"].is_string());

    let pagination = &json["data"]["pagination"];
    assert_eq!(pagination["current"], 1);
    assert_eq!(pagination["total"], 2);
    assert_eq!(pagination["hasNext"], true);
}

#[tokio::test]
async fn test_list_images_last_page() {
    let router = test_router(sample_store(), MockCdn::new());

    let response = router
        .oneshot(get_authed("/api/images?page=2&limit=2"))
        .await
        .unwrap();

    let json = body_json(response).await;
    let images = json["data"]["images"].as_array().unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0]["name"], "d.webp");
    assert_eq!(json["data"]["pagination"]["hasNext"], false);
}

#[tokio::test]
async fn test_limit_larger_than_folder_is_one_page() {
    let store = MockContentStore::new();
    for i in 0..1500 {
        store.insert(&format!("frontend/many/{:04}.png", i), b"x");
    }
    let router = test_router(store, MockCdn::new());

    let response = router
        .oneshot(get_authed("/api/images?path=many&page=1&limit=2000"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["images"].as_array().unwrap().len(), 1500);
    assert_eq!(json["data"]["pagination"]["total"], 1);
    assert_eq!(json["data"]["pagination"]["hasNext"], false);
}

#[tokio::test]
async fn test_list_images_in_subfolder() {
    let router = test_router(sample_store(), MockCdn::new());

    let response = router
        .oneshot(get_authed("/api/images?path=cats"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let images = json["data"]["images"].as_array().unwrap();
    assert_eq!(images.len(), 2);
    assert_eq!(images[0]["url"], format!("{}/cats/Tiger.JPG", TEST_DOMAIN));
}

#[tokio::test]
async fn test_search_applies_before_pagination() {
    let router = test_router(sample_store(), MockCdn::new());

    // Case-insensitive; total counts matches only
    let response = router
        .oneshot(get_authed("/api/images?path=cats&search=TIG&limit=1"))
        .await
        .unwrap();

    let json = body_json(response).await;
    let images = json["data"]["images"].as_array().unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0]["name"], "Tiger.JPG");
    assert_eq!(json["data"]["pagination"]["total"], 1);
    assert_eq!(json["data"]["pagination"]["hasNext"], false);
}

#[tokio::test]
async fn test_non_numeric_paging_falls_back_to_defaults() {
    let router = test_router(sample_store(), MockCdn::new());

    let response = router
        .oneshot(get_authed("/api/images?page=abc&limit=-5"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["images"].as_array().unwrap().len(), 3);
    assert_eq!(json["data"]["pagination"]["current"], 1);
}

#[tokio::test]
async fn test_list_images_requires_domain() {
    let store = sample_store();
    let router = test_router(store.clone(), MockCdn::new());

    let request = Request::builder()
        .uri("/api/images")
        .header("authorization", "Bearer abc")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert!(json["message"]
        .as_str()
        .unwrap()
        .contains("Missing image domain"));
    assert_eq!(store.call_count(), 0);
}

#[tokio::test]
async fn test_list_missing_folder_is_500() {
    let router = test_router(sample_store(), MockCdn::new());

    let response = router
        .oneshot(get_authed("/api/images?path=nope"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert!(json["message"]
        .as_str()
        .unwrap()
        .starts_with("Failed to list images: "));
}

// =============================================================================
// Upload
// =============================================================================

#[tokio::test]
async fn test_upload_writes_file_and_returns_url() {
    let store = sample_store();
    let router = test_router(store.clone(), MockCdn::new());

    let body = multipart_body(
        Some(("new.png", b"fresh")),
        &[("path", "dogs"), ("create_folder", "true")],
    );
    let response = router.oneshot(upload_request(body, true)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["name"], "new.png");
    assert_eq!(json["data"]["url"], format!("{}/dogs/new.png", TEST_DOMAIN));
    assert_eq!(
        store.content("frontend/dogs/new.png").as_deref(),
        Some(&b"fresh"[..])
    );
}

#[tokio::test]
async fn test_upload_defaults_to_root() {
    let store = MockContentStore::new();
    let router = test_router(store.clone(), MockCdn::new());

    let body = multipart_body(Some(("root.gif", b"gif")), &[]);
    let response = router.oneshot(upload_request(body, true)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["url"], format!("{}/root.gif", TEST_DOMAIN));
    assert!(store.contains("frontend/root.gif"));
}

#[tokio::test]
async fn test_upload_rejects_unsupported_extension() {
    let store = MockContentStore::new();
    let router = test_router(store.clone(), MockCdn::new());

    let body = multipart_body(Some(("x.txt", b"hello")), &[("path", "cats")]);
    let response = router.oneshot(upload_request(body, true)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert!(json["message"]
        .as_str()
        .unwrap()
        .contains("Unsupported file format"));
    assert_eq!(store.call_count(), 0);
}

#[tokio::test]
async fn test_upload_requires_domain() {
    let store = MockContentStore::new();
    let router = test_router(store.clone(), MockCdn::new());

    let body = multipart_body(Some(("ok.png", b"png")), &[]);
    let response = router.oneshot(upload_request(body, false)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(store.call_count(), 0);
}

#[tokio::test]
async fn test_upload_without_file() {
    let store = MockContentStore::new();
    let router = test_router(store.clone(), MockCdn::new());

    let body = multipart_body(None, &[("path", "cats")]);
    let response = router.oneshot(upload_request(body, true)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["message"], "No file provided");
    assert_eq!(store.call_count(), 0);
}

#[tokio::test]
async fn test_upload_rejects_non_multipart_body() {
    let router = test_router(MockContentStore::new(), MockCdn::new());

    let request = authed("POST", "/api/upload")
        .header("content-type", "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
}

// =============================================================================
// Delete
// =============================================================================

#[tokio::test]
async fn test_delete_then_list() {
    let store = sample_store();
    let router = test_router(store.clone(), MockCdn::new());

    let request = authed("DELETE", "/api/images/frontend/a.png")
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["success"], true);
    assert!(!store.contains("frontend/a.png"));

    let response = router.oneshot(get_authed("/api/images")).await.unwrap();
    let json = body_json(response).await;
    let names: Vec<&str> = json["data"]["images"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["c.jpg", "d.webp"]);
}

#[tokio::test]
async fn test_delete_decodes_each_segment() {
    let store = MockContentStore::new().with_file("frontend/my cats/a#1.png", b"x");
    let router = test_router(store.clone(), MockCdn::new());

    let request = authed("DELETE", "/images/frontend/my%20cats/a%231.png")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(!store.contains("frontend/my cats/a#1.png"));
}

#[tokio::test]
async fn test_delete_missing_file_is_500() {
    let router = test_router(sample_store(), MockCdn::new());

    let request = authed("DELETE", "/api/images/frontend/ghost.png")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    let message = json["message"].as_str().unwrap();
    assert!(message.starts_with("Failed to delete image: "));
    assert!(message.contains("404"));
}

#[tokio::test]
async fn test_delete_bad_encoding_is_400() {
    let store = sample_store();
    let router = test_router(store.clone(), MockCdn::new());

    let request = authed("DELETE", "/api/images/frontend/%FF.png")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(store.call_count(), 0);
}

// =============================================================================
// Cache and Deployments
// =============================================================================

#[tokio::test]
async fn test_purge_cache_sends_single_prefix() {
    let cdn = MockCdn::new();
    let router = test_router(MockContentStore::new(), cdn.clone());

    let request = authed("POST", "/api/purge-cache")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["message"], "Cache purged");
    assert_eq!(cdn.purges(), vec![vec!["img.example.com/".to_string()]]);
}

#[tokio::test]
async fn test_purge_cache_requires_domain() {
    let cdn = MockCdn::new();
    let router = test_router(MockContentStore::new(), cdn.clone());

    let request = Request::builder()
        .method("POST")
        .uri("/api/purge-cache")
        .header("authorization", "Bearer abc")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(cdn.call_count(), 0);
}

#[tokio::test]
async fn test_deploy_returns_id() {
    let router = test_router(MockContentStore::new(), MockCdn::new());

    let request = authed("POST", "/api/deploy").body(Body::empty()).unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["message"], "Deployment triggered");
    assert_eq!(json["deploymentId"], "dep-1");
}

#[tokio::test]
async fn test_deploy_without_id() {
    let cdn = MockCdn::new().with_deployment_id(None);
    let router = test_router(MockContentStore::new(), cdn);

    let request = authed("POST", "/api/deploy").body(Body::empty()).unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert!(json["deploymentId"].is_null());
}

#[tokio::test]
async fn test_deploy_status_flags() {
    let cdn = MockCdn::new();
    cdn.push_stage(Ok(DeploymentStage::Active));
    cdn.push_stage(Ok(DeploymentStage::Success));
    cdn.push_stage(Ok(DeploymentStage::Canceled));
    let router = test_router(MockContentStore::new(), cdn);

    let expected = [
        ("active", false, false, true),
        ("success", true, false, false),
        ("canceled", false, true, false),
    ];
    for (status, completed, failed, in_progress) in expected {
        let response = router
            .clone()
            .oneshot(get_authed("/api/deploy-status?deploymentId=dep-1"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["status"], status);
        assert_eq!(json["isCompleted"], completed);
        assert_eq!(json["isFailed"], failed);
        assert_eq!(json["isInProgress"], in_progress);
    }
}

#[tokio::test]
async fn test_deploy_status_provider_error() {
    let cdn = MockCdn::new();
    cdn.push_stage(Err(CdnError::Api {
        errors: r#"[{"code":8000007,"message":"not found"}]"#.to_string(),
    }));
    let router = test_router(MockContentStore::new(), cdn);

    let response = router
        .oneshot(get_authed("/api/deploy-status?deploymentId=dep-1"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["status"], "error");
    assert_eq!(json["isCompleted"], false);
    assert_eq!(json["isFailed"], false);
    assert_eq!(json["isInProgress"], false);
    assert!(json["message"]
        .as_str()
        .unwrap()
        .starts_with("Failed to get deployment status: "));
}

#[tokio::test]
async fn test_deploy_status_requires_id() {
    let cdn = MockCdn::new();
    let router = test_router(MockContentStore::new(), cdn.clone());

    let response = router
        .oneshot(get_authed("/api/deploy-status"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Missing deploymentId");
    assert_eq!(cdn.call_count(), 0);
}
