//! Image store abstraction.
//!
//! The image endpoint only ever does two things against storage: list the
//! bucket and presign a GET URL per object. Both sit behind [`ImageStore`] so
//! the handler can be driven by S3 in production and by an in-memory store in
//! tests.
//!
//! ```text
//! ┌──────────────────────────────┐
//! │        image_handler         │
//! └──────────────┬───────────────┘
//!                ▼
//! ┌──────────────────────────────┐
//! │      ImageStore trait        │
//! │  list_objects / presign_get  │
//! └──────────────┬───────────────┘
//!                ▼
//! ┌──────────────────────────────┐
//! │        S3ImageStore          │
//! │ (aws-sdk-s3, shared client)  │
//! └──────────────────────────────┘
//! ```

mod s3;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreError;

pub use s3::{create_s3_client, shared_s3_client, S3ImageStore};

/// One entry of a bucket listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Object key, unique within the bucket
    pub key: String,
}

impl StoredObject {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

/// How much of a bucket listing to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListingMode {
    /// A single listing request; truncated results are not followed up.
    #[default]
    FirstPage,

    /// Follow continuation tokens until the listing is complete.
    AllPages,
}

/// Read-only access to the bucket holding the gallery images.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Name of the underlying bucket.
    fn bucket(&self) -> &str;

    /// List the objects in the bucket, in the order the provider returns them.
    async fn list_objects(&self) -> Result<Vec<StoredObject>, StoreError>;

    /// Produce a URL granting GET access to `key` for `expires_in`.
    async fn presign_get(&self, key: &str, expires_in: Duration) -> Result<String, StoreError>;
}
