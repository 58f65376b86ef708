//! Configuration management for the image gallery.
//!
//! All settings come from command-line arguments with environment variable
//! fallbacks. The image bucket uses the same variable the deployed function
//! receives from the stack, so the binary needs no extra configuration inside
//! Lambda.
//!
//! # Environment Variables
//!
//! - `IMAGE_PHOTO_BUCKET_NAME` - Image bucket name (required by `lambda`, `serve`, `check`;
//!   running with no subcommand starts `lambda` from this alone)
//! - `GALLERY_S3_ENDPOINT` - Custom S3 endpoint for S3-compatible services
//! - `GALLERY_S3_REGION` - AWS region (default: provider chain)
//! - `GALLERY_URL_EXPIRY_SECS` - Signed URL lifetime (default: 86400)
//! - `GALLERY_ALL_PAGES` - Follow listing continuation tokens (default: false)
//! - `GALLERY_HOST` / `GALLERY_PORT` - Local server bind address (default: 0.0.0.0:3000)

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::gallery::{MAX_SIGNED_URL_EXPIRY, SIGNED_URL_EXPIRY};
use crate::stack::{Architecture, StackConfig, DEFAULT_CODE_KEY};
use crate::store::ListingMode;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default function memory in MB.
pub const DEFAULT_MEMORY_MB: u32 = 128;

/// Default function timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u32 = 10;

/// Default API Gateway stage.
pub const DEFAULT_STAGE: &str = "prod";

// =============================================================================
// CLI
// =============================================================================

/// Image gallery: signed-URL image listing and the stack that hosts it.
#[derive(Parser, Debug, Clone)]
#[command(name = "image-gallery")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    // `lambda` configured from the environment when omitted
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Resolve the command to run.
    ///
    /// The `provided.al2023` runtime starts `bootstrap` without arguments, so
    /// a missing subcommand means the function, with every setting taken from
    /// its environment variables.
    pub fn into_command(self) -> Result<Command, clap::Error> {
        match self.command {
            Some(command) => Ok(command),
            None => FunctionArgs::try_parse_from(["image-gallery"])
                .map(|args| Command::Lambda(args.config)),
        }
    }
}

/// Function settings without a subcommand.
#[derive(Parser, Debug)]
#[command(name = "image-gallery")]
struct FunctionArgs {
    #[command(flatten)]
    config: FunctionConfig,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the image listing function under the AWS Lambda runtime.
    Lambda(FunctionConfig),

    /// Serve the image API locally over HTTP.
    Serve(ServeConfig),

    /// Print the CloudFormation template of the stack.
    Synth(SynthConfig),

    /// Upload a local directory verbatim into a bucket.
    Upload(UploadConfig),

    /// Check bucket connectivity and optionally print signed URLs.
    Check(CheckConfig),
}

// =============================================================================
// Shared Store Arguments
// =============================================================================

/// Image bucket access settings shared by the runtime commands.
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// Bucket holding the gallery images.
    #[arg(long = "bucket", env = "IMAGE_PHOTO_BUCKET_NAME")]
    pub bucket: String,

    /// Custom S3 endpoint URL for S3-compatible services (MinIO, LocalStack).
    #[arg(long, env = "GALLERY_S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// AWS region; the default provider chain decides when unset.
    #[arg(long, env = "GALLERY_S3_REGION")]
    pub s3_region: Option<String>,

    /// Lifetime of issued URLs in seconds (1 to 604800).
    #[arg(long = "url-expiry", default_value_t = SIGNED_URL_EXPIRY.as_secs(), env = "GALLERY_URL_EXPIRY_SECS")]
    pub url_expiry_secs: u64,

    /// Follow listing continuation tokens instead of returning the first page.
    #[arg(long, default_value_t = false, env = "GALLERY_ALL_PAGES")]
    pub all_pages: bool,
}

impl StoreArgs {
    pub fn validate(&self) -> Result<(), String> {
        if self.bucket.trim().is_empty() {
            return Err(
                "Image bucket name is required. Set --bucket or IMAGE_PHOTO_BUCKET_NAME"
                    .to_string(),
            );
        }

        if self.url_expiry_secs == 0 || self.url_expiry_secs > MAX_SIGNED_URL_EXPIRY.as_secs() {
            return Err(format!(
                "url_expiry must be between 1 and {} seconds",
                MAX_SIGNED_URL_EXPIRY.as_secs()
            ));
        }

        Ok(())
    }

    pub fn url_expiry(&self) -> Duration {
        Duration::from_secs(self.url_expiry_secs)
    }

    pub fn listing_mode(&self) -> ListingMode {
        if self.all_pages {
            ListingMode::AllPages
        } else {
            ListingMode::FirstPage
        }
    }
}

// =============================================================================
// Lambda Command
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct FunctionConfig {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl FunctionConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.store.validate()
    }
}

// =============================================================================
// Serve Command
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "GALLERY_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "GALLERY_PORT")]
    pub port: u16,

    #[command(flatten)]
    pub store: StoreArgs,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.host.is_empty() {
            return Err("host must not be empty".to_string());
        }
        self.store.validate()
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// =============================================================================
// Synth Command
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct SynthConfig {
    /// Write the template to this file instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Emit compact JSON.
    #[arg(long, default_value_t = false)]
    pub compact: bool,

    /// API Gateway stage name.
    #[arg(long, default_value = DEFAULT_STAGE)]
    pub stage: String,

    /// Instruction set of the function binary.
    #[arg(long, value_enum, default_value_t = Architecture::Arm64)]
    pub architecture: Architecture,

    /// Function memory in MB.
    #[arg(long, default_value_t = DEFAULT_MEMORY_MB)]
    pub memory: u32,

    /// Function timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u32,

    /// Default key of the function package in the code bucket.
    #[arg(long, default_value = DEFAULT_CODE_KEY)]
    pub code_key: String,
}

impl SynthConfig {
    /// Stack settings described by these arguments.
    pub fn stack_config(&self) -> StackConfig {
        StackConfig {
            stage_name: self.stage.clone(),
            architecture: self.architecture,
            memory_size_mb: self.memory,
            timeout_secs: self.timeout,
            code_key: self.code_key.clone(),
            ..StackConfig::default()
        }
    }
}

// =============================================================================
// Upload Command
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct UploadConfig {
    /// Local directory to upload (e.g. `picture` or the front-end `build`).
    #[arg(long)]
    pub source: PathBuf,

    /// Destination bucket (see the stack's bucket name outputs).
    #[arg(long)]
    pub bucket: String,

    /// Key prefix for every uploaded object.
    #[arg(long)]
    pub prefix: Option<String>,

    /// CloudFront distribution to invalidate after the upload.
    #[arg(long)]
    pub distribution_id: Option<String>,

    /// Keep objects under the prefix that the source directory no longer has.
    #[arg(long, default_value_t = false)]
    pub no_prune: bool,

    /// Custom S3 endpoint URL for S3-compatible services.
    #[arg(long, env = "GALLERY_S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// AWS region; the default provider chain decides when unset.
    #[arg(long, env = "GALLERY_S3_REGION")]
    pub s3_region: Option<String>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl UploadConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.bucket.trim().is_empty() {
            return Err("Destination bucket is required. Set --bucket".to_string());
        }
        if !self.source.is_dir() {
            return Err(format!(
                "Source directory not found: {}",
                self.source.display()
            ));
        }
        if matches!(self.distribution_id.as_deref(), Some(id) if id.trim().is_empty()) {
            return Err("distribution_id must not be empty".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Check Command
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct CheckConfig {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Print a signed URL for every listed image.
    #[arg(long, default_value_t = false)]
    pub sign: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl CheckConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.store.validate()
    }
}

// =============================================================================
// Tests
// =============================================================================
