//! Asset deployment into the stack's buckets.
//!
//! Mirrors a local directory into a bucket (the picture folder into the image
//! bucket, the front-end build into the site bucket) and, for the site,
//! invalidates the CloudFront cache so the new build is served. Objects under
//! the destination prefix that the directory no longer contains are pruned
//! unless pruning is turned off.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use aws_sdk_cloudfront::types::{InvalidationBatch, Paths};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use futures::{stream, StreamExt, TryStreamExt};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::DeployError;

/// Number of PutObject requests in flight during an upload.
pub const UPLOAD_CONCURRENCY: usize = 8;

/// Keys per DeleteObjects request (the API maximum).
pub const DELETE_BATCH_SIZE: usize = 1000;

/// Totals of a finished upload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadReport {
    pub files: usize,
    pub bytes: u64,
    /// Stale objects removed from the destination
    pub deleted: usize,
}

/// Compute the object key of `path`, a file below `root`.
///
/// Keys always use `/` separators. Returns `None` when `path` is not under
/// `root` or is not valid UTF-8.
pub fn object_key(root: &Path, path: &Path, prefix: Option<&str>) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;

    let parts = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;
    if parts.is_empty() {
        return None;
    }
    let relative_key = parts.join("/");

    match prefix.map(|p| p.trim_matches('/')) {
        Some(p) if !p.is_empty() => Some(format!("{}/{}", p, relative_key)),
        _ => Some(relative_key),
    }
}

/// Content type stored with an uploaded object.
pub fn content_type_for(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// List every regular file below `dir`, in file-name order.
pub fn collect_assets(dir: &Path) -> Result<Vec<PathBuf>, DeployError> {
    if !dir.is_dir() {
        return Err(DeployError::MissingDirectory(dir.display().to_string()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| DeployError::Io {
            path: e
                .path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| dir.display().to_string()),
            message: e.to_string(),
        })?;

        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

/// Listing prefix owned by an upload with key prefix `prefix`.
///
/// `None` means the whole bucket.
pub fn listing_prefix(prefix: Option<&str>) -> Option<String> {
    match prefix.map(|p| p.trim_matches('/')) {
        Some(p) if !p.is_empty() => Some(format!("{}/", p)),
        _ => None,
    }
}

/// Keys of `existing` that the upload did not write, in listing order.
pub fn stale_keys(existing: Vec<String>, uploaded: &HashSet<String>) -> Vec<String> {
    existing
        .into_iter()
        .filter(|key| !uploaded.contains(key))
        .collect()
}

/// Upload every file below `dir` to `bucket`.
///
/// With `prune` set, objects under the destination prefix that `dir` does not
/// contain are deleted once every upload has succeeded.
pub async fn upload_directory(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    dir: &Path,
    prefix: Option<&str>,
    prune: bool,
) -> Result<UploadReport, DeployError> {
    let assets = collect_assets(dir)?;
    info!(
        bucket = bucket,
        source = %dir.display(),
        files = assets.len(),
        prune = prune,
        "Uploading assets"
    );

    let uploaded: HashSet<String> = assets
        .iter()
        .filter_map(|path| object_key(dir, path, prefix))
        .collect();

    let mut report = stream::iter(assets)
        .map(|path| upload_file(client, bucket, dir, path, prefix))
        .buffer_unordered(UPLOAD_CONCURRENCY)
        .try_fold(UploadReport::default(), |mut report, bytes| async move {
            report.files += 1;
            report.bytes += bytes;
            Ok(report)
        })
        .await?;

    if prune {
        report.deleted = prune_bucket(client, bucket, prefix, &uploaded).await?;
    }

    info!(
        bucket = bucket,
        files = report.files,
        bytes = report.bytes,
        deleted = report.deleted,
        "Upload complete"
    );
    Ok(report)
}

/// Delete every object under the upload's prefix that is not in `uploaded`.
///
/// Returns the number of deleted objects.
pub async fn prune_bucket(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    prefix: Option<&str>,
    uploaded: &HashSet<String>,
) -> Result<usize, DeployError> {
    let existing = list_keys(client, bucket, listing_prefix(prefix)).await?;
    let stale = stale_keys(existing, uploaded);

    if stale.is_empty() {
        debug!(bucket = bucket, "Nothing to prune");
        return Ok(0);
    }

    info!(bucket = bucket, stale = stale.len(), "Pruning stale objects");
    delete_keys(client, bucket, &stale).await
}

async fn list_keys(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    prefix: Option<String>,
) -> Result<Vec<String>, DeployError> {
    let mut keys = Vec::new();
    let mut continuation_token: Option<String> = None;

    loop {
        let output = client
            .list_objects_v2()
            .bucket(bucket)
            .set_prefix(prefix.clone())
            .set_continuation_token(continuation_token.take())
            .send()
            .await
            .map_err(|e| DeployError::Prune {
                bucket: bucket.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        keys.extend(
            output
                .contents()
                .iter()
                .filter_map(|obj| obj.key())
                .map(str::to_string),
        );

        match output.next_continuation_token() {
            Some(token) if output.is_truncated() == Some(true) => {
                continuation_token = Some(token.to_string());
            }
            _ => break,
        }
    }

    Ok(keys)
}

async fn delete_keys(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    keys: &[String],
) -> Result<usize, DeployError> {
    let prune_error = |message: String| DeployError::Prune {
        bucket: bucket.to_string(),
        message,
    };

    let mut deleted = 0;
    for batch in keys.chunks(DELETE_BATCH_SIZE) {
        let objects = batch
            .iter()
            .map(|key| ObjectIdentifier::builder().key(key).build())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| prune_error(e.to_string()))?;

        let delete = Delete::builder()
            .set_objects(Some(objects))
            .quiet(true)
            .build()
            .map_err(|e| prune_error(e.to_string()))?;

        let output = client
            .delete_objects()
            .bucket(bucket)
            .delete(delete)
            .send()
            .await
            .map_err(|e| prune_error(DisplayErrorContext(&e).to_string()))?;

        // Quiet mode reports failures only
        if let Some(failed) = output.errors().first() {
            return Err(DeployError::Delete {
                bucket: bucket.to_string(),
                key: failed.key().unwrap_or_default().to_string(),
                message: failed.message().unwrap_or("unknown error").to_string(),
            });
        }

        deleted += batch.len();
        debug!(bucket = bucket, batch = batch.len(), "Deleted stale objects");
    }

    Ok(deleted)
}

async fn upload_file(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    root: &Path,
    path: PathBuf,
    prefix: Option<&str>,
) -> Result<u64, DeployError> {
    let key = object_key(root, &path, prefix).ok_or_else(|| DeployError::Io {
        path: path.display().to_string(),
        message: "path is not valid UTF-8 or not below the source directory".to_string(),
    })?;

    let io_error = |e: &dyn std::fmt::Display| DeployError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    };

    let size = tokio::fs::metadata(&path)
        .await
        .map_err(|e| io_error(&e))?
        .len();
    let body = ByteStream::from_path(&path)
        .await
        .map_err(|e| io_error(&e))?;

    client
        .put_object()
        .bucket(bucket)
        .key(&key)
        .content_type(content_type_for(&path))
        .body(body)
        .send()
        .await
        .map_err(|e| DeployError::Upload {
            bucket: bucket.to_string(),
            key: key.clone(),
            message: DisplayErrorContext(&e).to_string(),
        })?;

    debug!(bucket = bucket, key = %key, bytes = size, "Uploaded asset");
    Ok(size)
}

/// Create a CloudFront client from the default provider chain.
pub async fn create_cloudfront_client() -> aws_sdk_cloudfront::Client {
    let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    aws_sdk_cloudfront::Client::new(&sdk_config)
}

/// Invalidate every cached path of a distribution.
///
/// Returns the invalidation ID.
pub async fn invalidate_distribution(
    client: &aws_sdk_cloudfront::Client,
    distribution_id: &str,
) -> Result<String, DeployError> {
    let invalidation_error = |message: String| DeployError::Invalidation {
        distribution_id: distribution_id.to_string(),
        message,
    };

    let paths = Paths::builder()
        .quantity(1)
        .items("/*")
        .build()
        .map_err(|e| invalidation_error(e.to_string()))?;

    let batch = InvalidationBatch::builder()
        .paths(paths)
        .caller_reference(caller_reference())
        .build()
        .map_err(|e| invalidation_error(e.to_string()))?;

    let output = client
        .create_invalidation()
        .distribution_id(distribution_id)
        .invalidation_batch(batch)
        .send()
        .await
        .map_err(|e| {
            invalidation_error(aws_sdk_cloudfront::error::DisplayErrorContext(&e).to_string())
        })?;

    let id = output
        .invalidation()
        .map(|i| i.id().to_string())
        .unwrap_or_default();

    info!(
        distribution_id = distribution_id,
        invalidation_id = %id,
        "Created CloudFront invalidation"
    );
    Ok(id)
}

/// Unique reference for an invalidation request.
fn caller_reference() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    format!("image-gallery-{}", millis)
}
