//! Signed URL listing for the gallery bucket.

use std::time::Duration;

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StoreError;
use crate::store::{ImageStore, StoredObject};

/// Lifetime of every issued URL (24 hours).
pub const SIGNED_URL_EXPIRY: Duration = Duration::from_secs(24 * 60 * 60);

/// Longest lifetime SigV4 query presigning accepts (7 days).
pub const MAX_SIGNED_URL_EXPIRY: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// One image as returned by `GET /image`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedUrlRecord {
    /// Object key in the image bucket
    pub filename: String,

    /// Time-limited GET URL for the object
    pub url: String,
}

async fn sign_object<S: ImageStore + ?Sized>(
    store: &S,
    object: StoredObject,
    expires_in: Duration,
) -> Result<SignedUrlRecord, StoreError> {
    let url = store.presign_get(&object.key, expires_in).await?;
    Ok(SignedUrlRecord {
        filename: object.key,
        url,
    })
}

/// List the bucket and sign a URL for every object.
///
/// Signing runs concurrently; the output keeps listing order. The first
/// failure fails the whole call, no partial result is returned.
pub async fn list_signed_urls<S: ImageStore + ?Sized>(
    store: &S,
    expires_in: Duration,
) -> Result<Vec<SignedUrlRecord>, StoreError> {
    let objects = store.list_objects().await?;
    sign_objects(store, objects, expires_in).await
}

/// Sign a URL for every object of an existing listing, in the given order.
pub async fn sign_objects<S: ImageStore + ?Sized>(
    store: &S,
    objects: Vec<StoredObject>,
    expires_in: Duration,
) -> Result<Vec<SignedUrlRecord>, StoreError> {
    debug!(
        bucket = store.bucket(),
        count = objects.len(),
        "Signing image URLs"
    );

    try_join_all(
        objects
            .into_iter()
            .map(|object| sign_object(store, object, expires_in)),
    )
    .await
}
