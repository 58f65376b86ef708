//! S3-backed image store.

use std::error::Error as StdError;
use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::list_objects_v2::ListObjectsV2Output;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client;
use tokio::sync::OnceCell;
use tracing::debug;

use super::{ImageStore, ListingMode, StoredObject};
use crate::error::StoreError;

/// Client shared by every invocation handled by this process.
static SHARED_CLIENT: OnceCell<Client> = OnceCell::const_new();

/// S3 implementation of [`ImageStore`].
///
/// Lists with `ListObjectsV2` and signs with SigV4 query-string presigning,
/// so every issued URL carries its own `X-Amz-Expires`.
#[derive(Clone)]
pub struct S3ImageStore {
    client: Client,
    bucket: String,
    listing: ListingMode,
}

impl S3ImageStore {
    /// Create a store for `bucket` that reads only the first listing page.
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            listing: ListingMode::FirstPage,
        }
    }

    /// Set how much of the listing is fetched per request.
    pub fn with_listing_mode(mut self, listing: ListingMode) -> Self {
        self.listing = listing;
        self
    }

    pub fn listing_mode(&self) -> ListingMode {
        self.listing
    }

    /// Fetch one `ListObjectsV2` page.
    async fn fetch_page(&self, continuation_token: Option<String>) -> Result<Page, StoreError> {
        let result = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .set_continuation_token(continuation_token)
            .send()
            .await
            .map_err(|e| StoreError::List(sdk_message(&e)))?;

        Ok(Page::from_output(&result))
    }
}

/// One page of a bucket listing.
struct Page {
    objects: Vec<StoredObject>,
    /// Continuation token when the listing was truncated
    next_token: Option<String>,
}

impl Page {
    /// Keys in response order; the token is kept only for a truncated listing.
    fn from_output(output: &ListObjectsV2Output) -> Self {
        let objects = output
            .contents()
            .iter()
            .filter_map(|obj| obj.key())
            .map(StoredObject::new)
            .collect();

        let next_token = if output.is_truncated() == Some(true) {
            output.next_continuation_token().map(str::to_string)
        } else {
            None
        };

        Self {
            objects,
            next_token,
        }
    }
}

/// Drive `fetch` through the listing according to `mode`.
async fn collect_pages<F, Fut>(
    mode: ListingMode,
    mut fetch: F,
) -> Result<Vec<StoredObject>, StoreError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page, StoreError>>,
{
    let mut objects = Vec::new();
    let mut continuation_token: Option<String> = None;

    loop {
        let page = fetch(continuation_token.take()).await?;
        objects.extend(page.objects);

        match (mode, page.next_token) {
            (ListingMode::AllPages, Some(token)) => continuation_token = Some(token),
            (ListingMode::FirstPage, Some(_)) => {
                debug!(
                    returned = objects.len(),
                    "Listing truncated, returning first page only"
                );
                break;
            }
            (_, None) => break,
        }
    }

    Ok(objects)
}

#[async_trait]
impl ImageStore for S3ImageStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn list_objects(&self) -> Result<Vec<StoredObject>, StoreError> {
        collect_pages(self.listing, |token| self.fetch_page(token)).await
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> Result<String, StoreError> {
        let config = PresigningConfig::expires_in(expires_in)
            .map_err(|e| StoreError::InvalidExpiry(e.to_string()))?;

        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(config)
            .await
            .map_err(|e| StoreError::Presign(sdk_message(&e)))?;

        Ok(presigned.uri().to_string())
    }
}

/// Extract the provider's message from an SDK error.
///
/// Service errors carry a short message ("Access Denied", "The specified
/// bucket does not exist"); everything else falls back to the full error chain.
fn sdk_message<E, R>(err: &SdkError<E, R>) -> String
where
    E: ProvideErrorMetadata + StdError + 'static,
    R: Debug,
{
    err.as_service_error()
        .and_then(|se| se.message())
        .map(str::to_string)
        .unwrap_or_else(|| DisplayErrorContext(err).to_string())
}

/// Create an S3 client with an optional custom endpoint and region.
///
/// With no region the default provider chain decides (`AWS_REGION` inside
/// Lambda). A custom endpoint (MinIO, LocalStack) switches to path-style
/// addressing.
pub async fn create_s3_client(endpoint_url: Option<&str>, region: Option<&str>) -> Client {
    let mut config_loader = aws_config::defaults(aws_config::BehaviorVersion::latest());

    if let Some(region) = region {
        config_loader = config_loader.region(aws_config::Region::new(region.to_string()));
    }

    if let Some(endpoint) = endpoint_url {
        config_loader = config_loader.endpoint_url(endpoint);
    }

    let sdk_config = config_loader.load().await;

    let s3_config = if endpoint_url.is_some() {
        aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build()
    } else {
        aws_sdk_s3::config::Builder::from(&sdk_config).build()
    };

    Client::from_conf(s3_config)
}

/// Return the process-wide S3 client, building it on first use.
///
/// Later calls ignore their arguments and hand out clones of the first client;
/// clones share the same connection pool.
pub async fn shared_s3_client(endpoint_url: Option<&str>, region: Option<&str>) -> Client {
    SHARED_CLIENT
        .get_or_init(|| create_s3_client(endpoint_url, region))
        .await
        .clone()
}
