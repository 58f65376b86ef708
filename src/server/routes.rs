//! Router configuration for the image gallery API.
//!
//! Two routers share one handler:
//!
//! ```text
//! create_router             (local `serve`)
//!   /health                 - Health check
//!   /image                  - Signed image list
//!
//! create_function_router    (Lambda behind API Gateway)
//!   *                       - Signed image list; API Gateway already routed GET /image
//! ```
//!
//! # Example
//!
//! ```ignore
//! use image_gallery::server::routes::{create_router, RouterConfig};
//! use image_gallery::store::{create_s3_client, S3ImageStore};
//!
//! let client = create_s3_client(None, None).await;
//! let store = S3ImageStore::new(client, "my-images");
//!
//! let router = create_router(store, RouterConfig::new());
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::{routing::get, Router};
use http::header::CONTENT_TYPE;
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{health_handler, image_handler, GalleryState};
use crate::gallery::SIGNED_URL_EXPIRY;
use crate::store::ImageStore;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Lifetime of issued URLs
    pub url_expiry: Duration,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Create a configuration issuing 24 hour URLs with tracing enabled.
    pub fn new() -> Self {
        Self {
            url_expiry: SIGNED_URL_EXPIRY,
            enable_tracing: true,
        }
    }

    /// Set the lifetime of issued URLs.
    pub fn with_url_expiry(mut self, url_expiry: Duration) -> Self {
        self.url_expiry = url_expiry;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Router Builders
// =============================================================================

/// Create the local application router.
///
/// Serves `GET /image` and `GET /health` with CORS preflight handling for
/// any origin.
pub fn create_router<S>(store: S, config: RouterConfig) -> Router
where
    S: ImageStore + 'static,
{
    let state = GalleryState::new(store).with_url_expiry(config.url_expiry);

    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/image", get(image_handler::<S>))
        .with_state(state)
        .layer(build_cors_layer());

    with_optional_tracing(router, config.enable_tracing)
}

/// Create the router run inside the Lambda function.
///
/// API Gateway only forwards `GET /image` here and answers preflight itself,
/// so every request reaches the image handler regardless of its path.
pub fn create_function_router<S>(store: S, config: RouterConfig) -> Router
where
    S: ImageStore + 'static,
{
    let state = GalleryState::new(store).with_url_expiry(config.url_expiry);

    let router = Router::new()
        .fallback(image_handler::<S>)
        .with_state(state);

    with_optional_tracing(router, config.enable_tracing)
}

fn with_optional_tracing(router: Router, enabled: bool) -> Router {
    if enabled {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer: any origin, `GET` only.
fn build_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(86400))
}

// =============================================================================
// Tests
// =============================================================================
