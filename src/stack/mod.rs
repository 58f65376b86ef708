//! Deployment stack for the gallery.
//!
//! Synthesizes the CloudFormation template that declares both buckets, the
//! CloudFront distribution, the image function with its IAM role and the
//! API Gateway front door, and publishes their identifiers as exported
//! outputs.
//!
//! ```text
//!   client ──► Distribution ──► ReactBucket          (static site)
//!   client ──► GetImageApi /image ──► GetImageFunction ──► ImageBucket
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use image_gallery::stack::{synthesize, StackConfig};
//!
//! let template = synthesize(&StackConfig::default())?;
//! println!("{}", template.to_json(true)?);
//! ```

pub mod intrinsic;
pub mod resources;
pub mod template;

use clap::ValueEnum;

use crate::error::StackError;
use intrinsic::{get_att, reference, sub};
use resources::*;
pub use template::{DeletionPolicy, Export, Output, Parameter, Resource, Template};

// =============================================================================
// Outputs
// =============================================================================

pub const IMAGE_BUCKET_OUTPUT: &str = "ImageBucketNameExport";
pub const REACT_BUCKET_OUTPUT: &str = "ReactBucketNameExport";
pub const API_ENDPOINT_OUTPUT: &str = "ApiEndpointExport";
pub const REACT_URL_OUTPUT: &str = "ReactURLExport";

// =============================================================================
// Configuration
// =============================================================================

/// Default key of the function package in the code bucket.
pub const DEFAULT_CODE_KEY: &str = "image-gallery/bootstrap.zip";

/// Instruction set the function is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Architecture {
    #[default]
    #[value(name = "arm64")]
    Arm64,
    #[value(name = "x86_64")]
    X86_64,
}

impl Architecture {
    /// Name used by the Lambda API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Architecture::Arm64 => "arm64",
            Architecture::X86_64 => "x86_64",
        }
    }
}

/// Tunables of the synthesized stack.
#[derive(Debug, Clone)]
pub struct StackConfig {
    /// Template description
    pub description: String,

    /// Index document of the site bucket and root object of the distribution
    pub index_document: String,

    /// CloudFront price class
    pub price_class: String,

    /// API Gateway stage name
    pub stage_name: String,

    pub architecture: Architecture,

    /// Function memory in MB (128-10240)
    pub memory_size_mb: u32,

    /// Function timeout in seconds (1-900)
    pub timeout_secs: u32,

    /// Default of the `FunctionCodeKey` parameter
    pub code_key: String,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            description: "Image gallery: static site, image bucket and signed-URL API".to_string(),
            index_document: "index.html".to_string(),
            price_class: "PriceClass_100".to_string(),
            stage_name: "prod".to_string(),
            architecture: Architecture::Arm64,
            memory_size_mb: 128,
            timeout_secs: 10,
            code_key: DEFAULT_CODE_KEY.to_string(),
        }
    }
}

impl StackConfig {
    pub fn validate(&self) -> Result<(), StackError> {
        if !(128..=10_240).contains(&self.memory_size_mb) {
            return Err(StackError::InvalidConfig(format!(
                "memory_size_mb must be between 128 and 10240, got {}",
                self.memory_size_mb
            )));
        }

        if !(1..=900).contains(&self.timeout_secs) {
            return Err(StackError::InvalidConfig(format!(
                "timeout_secs must be between 1 and 900, got {}",
                self.timeout_secs
            )));
        }

        let stage_ok = !self.stage_name.is_empty()
            && self
                .stage_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !stage_ok {
            return Err(StackError::InvalidConfig(format!(
                "stage_name must be non-empty and contain only letters, digits, '-' or '_', got '{}'",
                self.stage_name
            )));
        }

        if self.index_document.is_empty() {
            return Err(StackError::InvalidConfig(
                "index_document must not be empty".to_string(),
            ));
        }

        if self.code_key.is_empty() {
            return Err(StackError::InvalidConfig(
                "code_key must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// Synthesis
// =============================================================================

/// Build the complete gallery template.
pub fn synthesize(config: &StackConfig) -> Result<Template, StackError> {
    config.validate()?;

    let mut template = Template::new(&config.description);

    template.add_parameter(
        CODE_BUCKET_PARAM,
        Parameter::string("Bucket holding the packaged image function"),
    );
    template.add_parameter(
        CODE_KEY_PARAM,
        Parameter::string("Key of the packaged image function (zip with a bootstrap binary)")
            .with_default(&config.code_key),
    );

    // Storage and delivery
    template.add_resource(IMAGE_BUCKET, image_bucket());
    template.add_resource(REACT_BUCKET, react_bucket(config));
    template.add_resource(REACT_BUCKET_POLICY, react_bucket_policy());
    template.add_resource(DISTRIBUTION, distribution(config));

    // Function
    template.add_resource(FUNCTION_ROLE, function_role());
    template.add_resource(FUNCTION, function(config));

    // API
    template.add_resource(API, rest_api());
    template.add_resource(API_IMAGE_RESOURCE, image_resource());
    template.add_resource(API_IMAGE_GET, image_get_method());
    template.add_resource(
        API_IMAGE_OPTIONS,
        preflight_method(reference(API_IMAGE_RESOURCE)),
    );
    template.add_resource(
        API_ROOT_OPTIONS,
        preflight_method(get_att(API, "RootResourceId")),
    );
    template.add_resource(API_DEPLOYMENT, deployment());
    template.add_resource(API_STAGE, stage(config));
    template.add_resource(API_PERMISSION, invoke_permission());

    // Outputs
    template.add_output(
        IMAGE_BUCKET_OUTPUT,
        Output::exported(reference(IMAGE_BUCKET), IMAGE_BUCKET_OUTPUT)
            .with_description("Bucket holding the gallery images"),
    );
    template.add_output(
        REACT_BUCKET_OUTPUT,
        Output::exported(reference(REACT_BUCKET), REACT_BUCKET_OUTPUT)
            .with_description("Bucket holding the front-end build"),
    );
    template.add_output(
        API_ENDPOINT_OUTPUT,
        Output::exported(
            sub(format!(
                "https://${{{}}}.execute-api.${{AWS::Region}}.${{AWS::URLSuffix}}/{}/",
                API, config.stage_name
            )),
            API_ENDPOINT_OUTPUT,
        )
        .with_description("Base URL of the image API"),
    );
    template.add_output(
        REACT_URL_OUTPUT,
        Output::exported(get_att(DISTRIBUTION, "DomainName"), REACT_URL_OUTPUT)
            .with_description("Domain name of the CloudFront distribution"),
    );

    Ok(template)
}

/// Names of the outputs every synthesized template exports.
pub fn output_names() -> [&'static str; 4] {
    [
        IMAGE_BUCKET_OUTPUT,
        REACT_BUCKET_OUTPUT,
        API_ENDPOINT_OUTPUT,
        REACT_URL_OUTPUT,
    ]
}
