//! HTTP request handlers for the image gallery API.
//!
//! # Endpoints
//!
//! - `GET /image` - List every image with a signed download URL
//! - `GET /health` - Health check endpoint (local server only)

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{
        header::{ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_ORIGIN},
        HeaderName, StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, info};

use crate::error::StoreError;
use crate::gallery::{list_signed_urls, SIGNED_URL_EXPIRY};
use crate::store::ImageStore;

/// CORS headers attached to every `/image` response.
const CORS_HEADERS: [(HeaderName, &str); 2] = [
    (ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
    (ACCESS_CONTROL_ALLOW_CREDENTIALS, "true"),
];

// =============================================================================
// Application State
// =============================================================================

/// Shared state for the gallery handlers.
pub struct GalleryState<S: ImageStore> {
    /// Store holding the images
    pub store: Arc<S>,

    /// Lifetime of each issued URL
    pub url_expiry: Duration,
}

impl<S: ImageStore> GalleryState<S> {
    /// Create state issuing URLs valid for 24 hours.
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(store),
            url_expiry: SIGNED_URL_EXPIRY,
        }
    }

    /// Override the lifetime of issued URLs.
    pub fn with_url_expiry(mut self, url_expiry: Duration) -> Self {
        self.url_expiry = url_expiry;
        self
    }
}

impl<S: ImageStore> Clone for GalleryState<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            url_expiry: self.url_expiry,
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Failure of the image listing.
///
/// Rendered as `500` with the raw store message as a plain-text body. The
/// CORS headers are kept so browser clients can read the message.
#[derive(Debug)]
pub struct ImageListError(pub StoreError);

impl IntoResponse for ImageListError {
    fn into_response(self) -> Response {
        let message = self.0.to_string();

        error!(
            error_type = store_error_type(&self.0),
            status = StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            "Image listing failed: {}",
            message
        );

        (StatusCode::INTERNAL_SERVER_ERROR, CORS_HEADERS, message).into_response()
    }
}

impl From<StoreError> for ImageListError {
    fn from(err: StoreError) -> Self {
        ImageListError(err)
    }
}

fn store_error_type(err: &StoreError) -> &'static str {
    match err {
        StoreError::List(_) => "list_error",
        StoreError::Presign(_) => "presign_error",
        StoreError::InvalidExpiry(_) => "invalid_expiry",
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle image list requests.
///
/// # Endpoint
///
/// `GET /image`
///
/// # Response
///
/// `200 OK` with JSON body, in bucket listing order:
/// ```json
/// [
///   { "filename": "cat.png", "url": "https://...&X-Amz-Signature=..." }
/// ]
/// ```
///
/// # Headers
///
/// - `Access-Control-Allow-Origin: *`
/// - `Access-Control-Allow-Credentials: true`
///
/// # Errors
///
/// - `500 Internal Server Error`: listing or signing failed, body is the
///   provider's message
pub async fn image_handler<S: ImageStore + 'static>(
    State(state): State<GalleryState<S>>,
) -> Result<Response, ImageListError> {
    let records = list_signed_urls(state.store.as_ref(), state.url_expiry).await?;

    info!(
        bucket = state.store.bucket(),
        count = records.len(),
        "Issued signed image URLs"
    );

    Ok((CORS_HEADERS, Json(records)).into_response())
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =============================================================================
// Tests
// =============================================================================
