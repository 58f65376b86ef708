//! # Image Gallery
//!
//! A serverless image gallery on AWS: a static front-end served through
//! CloudFront, and an API that lists the image bucket and returns a
//! time-limited signed download URL for every image.
//!
//! ## Features
//!
//! - **Signed image listing**: `GET /image` returns `[{filename, url}]` in bucket
//!   listing order, with URLs valid for 24 hours
//! - **One handler, two hosts**: the same Axum router runs inside Lambda and as
//!   a local server
//! - **Stack synthesis**: the buckets, distribution, function, IAM role and
//!   API Gateway are emitted as a CloudFormation template with exported outputs
//! - **Asset upload**: local picture and front-end directories are mirrored into
//!   their buckets (stale objects pruned), with CloudFront invalidation
//!
//! ## Architecture
//!
//! - [`store`] - Image bucket access (list + presign) behind the `ImageStore` trait
//! - [`gallery`] - Concurrent signing of a bucket listing
//! - [`server`] - Axum handlers and routers
//! - [`stack`] - CloudFormation template synthesis
//! - [`deploy`] - Asset upload and cache invalidation
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use image_gallery::{create_router, create_s3_client, RouterConfig, S3ImageStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = create_s3_client(None, Some("us-east-1")).await;
//!     let store = S3ImageStore::new(client, "my-gallery-images");
//!     let router = create_router(store, RouterConfig::new());
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod config;
pub mod deploy;
pub mod error;
pub mod gallery;
pub mod server;
pub mod stack;
pub mod store;

// Re-export commonly used types
pub use config::{
    CheckConfig, Cli, Command, FunctionConfig, ServeConfig, StoreArgs, SynthConfig, UploadConfig,
};
pub use deploy::{
    collect_assets, content_type_for, create_cloudfront_client, invalidate_distribution,
    listing_prefix, object_key, prune_bucket, stale_keys, upload_directory, UploadReport,
};
pub use error::{DeployError, StackError, StoreError};
pub use gallery::{
    list_signed_urls, sign_objects, SignedUrlRecord, MAX_SIGNED_URL_EXPIRY, SIGNED_URL_EXPIRY,
};
pub use server::{
    create_function_router, create_router, health_handler, image_handler, GalleryState,
    HealthResponse, ImageListError, RouterConfig,
};
pub use stack::{synthesize, Architecture, StackConfig, Template};
pub use store::{
    create_s3_client, shared_s3_client, ImageStore, ListingMode, S3ImageStore, StoredObject,
};
