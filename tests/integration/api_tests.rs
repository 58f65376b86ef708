//! API integration tests for the image endpoint.
//!
//! Tests verify:
//! - Response body shape and listing order
//! - CORS headers on success and failure
//! - Plain-text 500 bodies for listing and signing failures
//! - The Lambda router answering regardless of path

use std::sync::atomic::Ordering;
use std::time::Duration;

use axum::http::{Method, Request, StatusCode};
use tower::ServiceExt;

use image_gallery::{create_function_router, create_router, RouterConfig, SignedUrlRecord};

use super::test_utils::{body_bytes, body_json, get, MockImageStore};

fn assert_cors_headers(response: &axum::response::Response) {
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "*"
    );
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-credentials")
            .unwrap(),
        "true"
    );
}

// =============================================================================
// Success Path
// =============================================================================

#[tokio::test]
async fn test_image_list_returns_one_record_per_object() {
    let store = MockImageStore::new().with_keys(["a", "b", "c"]);
    let router = create_router(store, RouterConfig::new());

    let response = router.oneshot(get("/image")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/json"
    );
    assert_cors_headers(&response);

    let records: Vec<SignedUrlRecord> =
        serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(records.len(), 3);

    let filenames: Vec<_> = records.iter().map(|r| r.filename.as_str()).collect();
    assert_eq!(filenames, vec!["a", "b", "c"]);

    for record in &records {
        assert!(record.url.contains(&format!("/{}?", record.filename)));
        assert!(record.url.contains("X-Amz-Signature="));
    }
}

#[tokio::test]
async fn test_image_list_preserves_listing_order() {
    let store = MockImageStore::new().with_keys(["z.png", "a.png"]);
    let router = create_router(store, RouterConfig::new());

    let response = router.oneshot(get("/image")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body[0]["filename"], "z.png");
    assert_eq!(body[1]["filename"], "a.png");
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_image_list_empty_bucket() {
    let store = MockImageStore::new();
    let router = create_router(store, RouterConfig::new());

    let response = router.oneshot(get("/image")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_cors_headers(&response);
    assert_eq!(body_bytes(response).await, b"[]");
}

#[tokio::test]
async fn test_image_list_uses_configured_expiry() {
    let store = MockImageStore::new().with_keys(["a.png"]);
    let router = create_router(
        store,
        RouterConfig::new().with_url_expiry(Duration::from_secs(900)),
    );

    let body = body_json(router.oneshot(get("/image")).await.unwrap()).await;
    let url = body[0]["url"].as_str().unwrap();
    assert!(url.contains("X-Amz-Expires=900"));
}

#[tokio::test]
async fn test_image_list_default_expiry_is_one_day() {
    let store = MockImageStore::new().with_keys(["a.png"]);
    let router = create_router(store, RouterConfig::new());

    let body = body_json(router.oneshot(get("/image")).await.unwrap()).await;
    let url = body[0]["url"].as_str().unwrap();
    assert!(url.contains("X-Amz-Expires=86400"));
}

#[tokio::test]
async fn test_each_request_lists_and_signs_again() {
    let store = MockImageStore::new().with_keys(["a.png", "b.png"]);
    let list_calls = store.list_calls();
    let presign_calls = store.presign_calls();
    let router = create_router(store, RouterConfig::new());

    for _ in 0..2 {
        let response = router.clone().oneshot(get("/image")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(list_calls.load(Ordering::SeqCst), 2);
    assert_eq!(presign_calls.load(Ordering::SeqCst), 4);
}

// =============================================================================
// Failure Path
// =============================================================================

#[tokio::test]
async fn test_listing_failure_returns_500_with_message() {
    let store = MockImageStore::new()
        .with_keys(["a.png"])
        .failing_list("The specified bucket does not exist");
    let presign_calls = store.presign_calls();
    let router = create_router(store, RouterConfig::new());

    let response = router.oneshot(get("/image")).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/plain; charset=utf-8"
    );
    assert_cors_headers(&response);
    assert_eq!(
        body_bytes(response).await,
        b"The specified bucket does not exist"
    );
    assert_eq!(presign_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_one_signing_failure_fails_whole_response() {
    let store = MockImageStore::new()
        .with_keys(["a.png", "b.png", "c.png"])
        .failing_presign("b.png", "Access Denied");
    let router = create_router(store, RouterConfig::new());

    let response = router.oneshot(get("/image")).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_bytes(response).await, b"Access Denied");
}

// =============================================================================
// Routing
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let router = create_router(MockImageStore::new(), RouterConfig::new());

    let response = router.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_local_router_unknown_path() {
    let router = create_router(MockImageStore::new(), RouterConfig::new());

    let response = router.oneshot(get("/images")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_local_router_preflight() {
    let router = create_router(MockImageStore::new(), RouterConfig::new());

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/image")
        .header("origin", "https://gallery.example.com")
        .header("access-control-request-method", "GET")
        .body(axum::body::Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "*"
    );
    let methods = response
        .headers()
        .get("access-control-allow-methods")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(methods.contains("GET"));
}

#[tokio::test]
async fn test_cross_origin_get_keeps_single_allow_origin() {
    let store = MockImageStore::new().with_keys(["a.png"]);
    let router = create_router(store, RouterConfig::new());

    let request = Request::builder()
        .uri("/image")
        .header("origin", "https://gallery.example.com")
        .body(axum::body::Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let origins: Vec<_> = response
        .headers()
        .get_all("access-control-allow-origin")
        .iter()
        .collect();
    assert_eq!(origins, vec!["*"]);
    assert_cors_headers(&response);
}

#[tokio::test]
async fn test_function_router_ignores_path() {
    let store = MockImageStore::new().with_keys(["a.png"]);
    let router = create_function_router(store, RouterConfig::new().with_tracing(false));

    for uri in ["/image", "/prod/image", "/"] {
        let response = router.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "uri {}", uri);
        assert_cors_headers(&response);

        let body = body_json(response).await;
        assert_eq!(body[0]["filename"], "a.png");
    }
}

#[tokio::test]
async fn test_function_router_failure() {
    let store = MockImageStore::new().failing_list("Access Denied");
    let router = create_function_router(store, RouterConfig::new());

    let response = router.oneshot(get("/image")).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_bytes(response).await, b"Access Denied");
}
