use thiserror::Error;

/// Errors from the image store (listing or signing).
///
/// The `Display` output is the bare provider message: the image endpoint
/// returns it verbatim as the body of a 500 response.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Listing the bucket failed (unreachable, access denied, missing bucket)
    #[error("{0}")]
    List(String),

    /// Presigning a GET URL for one object failed
    #[error("{0}")]
    Presign(String),

    /// Requested URL lifetime cannot be expressed as a presigning config
    #[error("invalid presigned URL expiry: {0}")]
    InvalidExpiry(String),
}

/// Errors raised while pushing local assets to the stack's buckets.
#[derive(Debug, Error)]
pub enum DeployError {
    /// Source directory does not exist or is not a directory
    #[error("asset directory not found: {0}")]
    MissingDirectory(String),

    /// Local filesystem error while walking or reading assets
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },

    /// PutObject failed for one asset
    #[error("failed to upload s3://{bucket}/{key}: {message}")]
    Upload {
        bucket: String,
        key: String,
        message: String,
    },

    /// Listing or deleting stale objects failed as a whole
    #[error("failed to prune s3://{bucket}: {message}")]
    Prune { bucket: String, message: String },

    /// DeleteObjects reported a failure for one stale object
    #[error("failed to delete s3://{bucket}/{key}: {message}")]
    Delete {
        bucket: String,
        key: String,
        message: String,
    },

    /// CloudFront refused the invalidation request
    #[error("failed to invalidate distribution {distribution_id}: {message}")]
    Invalidation {
        distribution_id: String,
        message: String,
    },
}

/// Errors from synthesizing the CloudFormation template.
#[derive(Debug, Error)]
pub enum StackError {
    /// Stack configuration is out of range
    #[error("invalid stack configuration: {0}")]
    InvalidConfig(String),

    /// Template could not be rendered as JSON
    #[error("failed to serialize template: {0}")]
    Serialize(#[from] serde_json::Error),
}
