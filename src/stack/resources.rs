//! Resource declarations for the gallery stack.
//!
//! Each function returns one resource; [`super::synthesize`] wires them
//! together under the logical IDs below.

use serde_json::{json, Value};

use super::intrinsic::{get_att, join, reference, sub};
use super::template::{DeletionPolicy, Resource};
use super::StackConfig;

// =============================================================================
// Logical IDs
// =============================================================================

pub const IMAGE_BUCKET: &str = "ImageBucket";
pub const REACT_BUCKET: &str = "ReactBucket";
pub const REACT_BUCKET_POLICY: &str = "ReactBucketPolicy";
pub const DISTRIBUTION: &str = "Distribution";
pub const FUNCTION_ROLE: &str = "GetImageFunctionRole";
pub const FUNCTION: &str = "GetImageFunction";
pub const API: &str = "GetImageApi";
pub const API_IMAGE_RESOURCE: &str = "GetImageApiImageResource";
pub const API_IMAGE_GET: &str = "GetImageApiImageGet";
pub const API_IMAGE_OPTIONS: &str = "GetImageApiImageOptions";
pub const API_ROOT_OPTIONS: &str = "GetImageApiRootOptions";
pub const API_DEPLOYMENT: &str = "GetImageApiDeployment";
pub const API_STAGE: &str = "GetImageApiStage";
pub const API_PERMISSION: &str = "GetImageFunctionApiPermission";

/// Template parameter naming the bucket that holds the function package.
pub const CODE_BUCKET_PARAM: &str = "FunctionCodeBucket";

/// Template parameter naming the function package's key.
pub const CODE_KEY_PARAM: &str = "FunctionCodeKey";

/// Environment variable through which the function learns its bucket.
pub const BUCKET_ENV_VAR: &str = "IMAGE_PHOTO_BUCKET_NAME";

/// Path part of the image endpoint.
pub const IMAGE_PATH: &str = "image";

/// Name of the REST API.
pub const API_NAME: &str = "GetImageApi";

const SITE_ORIGIN_ID: &str = "ReactBucketOrigin";

/// Headers API Gateway allows on preflight by default.
const PREFLIGHT_ALLOW_HEADERS: &str =
    "'Content-Type,X-Amz-Date,Authorization,X-Api-Key,X-Amz-Security-Token,X-Amz-User-Agent'";

// =============================================================================
// Storage
// =============================================================================

/// Private bucket for the gallery images.
pub fn image_bucket() -> Resource {
    Resource::new(
        "AWS::S3::Bucket",
        json!({
            "PublicAccessBlockConfiguration": {
                "BlockPublicAcls": true,
                "BlockPublicPolicy": true,
                "IgnorePublicAcls": true,
                "RestrictPublicBuckets": true
            }
        }),
    )
    .with_removal_policy(DeletionPolicy::Delete)
}

/// Public static-website bucket for the compiled front-end.
pub fn react_bucket(config: &StackConfig) -> Resource {
    Resource::new(
        "AWS::S3::Bucket",
        json!({
            "WebsiteConfiguration": {
                "IndexDocument": config.index_document
            },
            "PublicAccessBlockConfiguration": {
                "BlockPublicAcls": false,
                "BlockPublicPolicy": false,
                "IgnorePublicAcls": false,
                "RestrictPublicBuckets": false
            }
        }),
    )
    .with_removal_policy(DeletionPolicy::Delete)
}

/// Anonymous read on every object of the site bucket.
pub fn react_bucket_policy() -> Resource {
    Resource::new(
        "AWS::S3::BucketPolicy",
        json!({
            "Bucket": reference(REACT_BUCKET),
            "PolicyDocument": {
                "Version": "2012-10-17",
                "Statement": [{
                    "Effect": "Allow",
                    "Principal": { "AWS": "*" },
                    "Action": ["s3:GetObject"],
                    "Resource": object_arns(REACT_BUCKET)
                }]
            }
        }),
    )
}

// =============================================================================
// Content Delivery
// =============================================================================

/// CloudFront distribution with the site bucket as its only origin.
pub fn distribution(config: &StackConfig) -> Resource {
    Resource::new(
        "AWS::CloudFront::Distribution",
        json!({
            "DistributionConfig": {
                "Enabled": true,
                "DefaultRootObject": config.index_document,
                "HttpVersion": "http2",
                "IPV6Enabled": true,
                "PriceClass": config.price_class,
                "ViewerCertificate": { "CloudFrontDefaultCertificate": true },
                "Origins": [{
                    "Id": SITE_ORIGIN_ID,
                    "DomainName": get_att(REACT_BUCKET, "RegionalDomainName"),
                    "S3OriginConfig": {}
                }],
                "DefaultCacheBehavior": {
                    "TargetOriginId": SITE_ORIGIN_ID,
                    "ViewerProtocolPolicy": "redirect-to-https",
                    "AllowedMethods": ["GET", "HEAD"],
                    "CachedMethods": ["GET", "HEAD"],
                    "Compress": true,
                    "ForwardedValues": {
                        "QueryString": false,
                        "Cookies": { "Forward": "none" }
                    }
                }
            }
        }),
    )
}

// =============================================================================
// Function
// =============================================================================

/// Execution role: logs plus list/get/put on the image bucket.
pub fn function_role() -> Resource {
    Resource::new(
        "AWS::IAM::Role",
        json!({
            "AssumeRolePolicyDocument": {
                "Version": "2012-10-17",
                "Statement": [{
                    "Effect": "Allow",
                    "Principal": { "Service": "lambda.amazonaws.com" },
                    "Action": ["sts:AssumeRole"]
                }]
            },
            "ManagedPolicyArns": [
                sub("arn:${AWS::Partition}:iam::aws:policy/service-role/AWSLambdaBasicExecutionRole")
            ],
            "Policies": [{
                "PolicyName": "ImageBucketAccess",
                "PolicyDocument": {
                    "Version": "2012-10-17",
                    "Statement": [
                        {
                            "Effect": "Allow",
                            "Action": ["s3:GetObject", "s3:PutObject"],
                            "Resource": object_arns(IMAGE_BUCKET)
                        },
                        {
                            "Effect": "Allow",
                            "Action": ["s3:ListBucket"],
                            "Resource": get_att(IMAGE_BUCKET, "Arn")
                        }
                    ]
                }
            }]
        }),
    )
}

/// The image listing function, packaged as a `bootstrap` binary.
pub fn function(config: &StackConfig) -> Resource {
    Resource::new(
        "AWS::Lambda::Function",
        json!({
            "Description": "Lists gallery images with time-limited signed URLs",
            "Runtime": "provided.al2023",
            "Handler": "bootstrap",
            "Architectures": [config.architecture.as_str()],
            "MemorySize": config.memory_size_mb,
            "Timeout": config.timeout_secs,
            "Role": get_att(FUNCTION_ROLE, "Arn"),
            "Code": {
                "S3Bucket": reference(CODE_BUCKET_PARAM),
                "S3Key": reference(CODE_KEY_PARAM)
            },
            "Environment": {
                "Variables": { BUCKET_ENV_VAR: reference(IMAGE_BUCKET) }
            }
        }),
    )
    .depends_on([FUNCTION_ROLE])
}

// =============================================================================
// API Gateway
// =============================================================================

pub fn rest_api() -> Resource {
    Resource::new("AWS::ApiGateway::RestApi", json!({ "Name": API_NAME }))
}

pub fn image_resource() -> Resource {
    Resource::new(
        "AWS::ApiGateway::Resource",
        json!({
            "RestApiId": reference(API),
            "ParentId": get_att(API, "RootResourceId"),
            "PathPart": IMAGE_PATH
        }),
    )
}

/// `GET /image` proxied to the function.
pub fn image_get_method() -> Resource {
    Resource::new(
        "AWS::ApiGateway::Method",
        json!({
            "RestApiId": reference(API),
            "ResourceId": reference(API_IMAGE_RESOURCE),
            "HttpMethod": "GET",
            "AuthorizationType": "NONE",
            "Integration": {
                "Type": "AWS_PROXY",
                "IntegrationHttpMethod": "POST",
                "Uri": sub(format!(
                    "arn:${{AWS::Partition}}:apigateway:${{AWS::Region}}:lambda:path/2015-03-31/functions/${{{}.Arn}}/invocations",
                    FUNCTION
                ))
            }
        }),
    )
}

/// CORS preflight answered by API Gateway itself.
///
/// `resource_id` is the resource the `OPTIONS` method hangs off.
pub fn preflight_method(resource_id: Value) -> Resource {
    Resource::new(
        "AWS::ApiGateway::Method",
        json!({
            "RestApiId": reference(API),
            "ResourceId": resource_id,
            "HttpMethod": "OPTIONS",
            "AuthorizationType": "NONE",
            "Integration": {
                "Type": "MOCK",
                "RequestTemplates": { "application/json": "{ statusCode: 200 }" },
                "IntegrationResponses": [{
                    "StatusCode": "204",
                    "ResponseParameters": {
                        "method.response.header.Access-Control-Allow-Headers": PREFLIGHT_ALLOW_HEADERS,
                        "method.response.header.Access-Control-Allow-Origin": "'*'",
                        "method.response.header.Access-Control-Allow-Methods": "'GET'"
                    }
                }]
            },
            "MethodResponses": [{
                "StatusCode": "204",
                "ResponseParameters": {
                    "method.response.header.Access-Control-Allow-Headers": true,
                    "method.response.header.Access-Control-Allow-Origin": true,
                    "method.response.header.Access-Control-Allow-Methods": true
                }
            }]
        }),
    )
}

pub fn deployment() -> Resource {
    Resource::new(
        "AWS::ApiGateway::Deployment",
        json!({
            "RestApiId": reference(API),
            "Description": "Image gallery API"
        }),
    )
    .depends_on([API_IMAGE_GET, API_IMAGE_OPTIONS, API_ROOT_OPTIONS])
}

pub fn stage(config: &StackConfig) -> Resource {
    Resource::new(
        "AWS::ApiGateway::Stage",
        json!({
            "RestApiId": reference(API),
            "DeploymentId": reference(API_DEPLOYMENT),
            "StageName": config.stage_name
        }),
    )
}

/// Lets API Gateway invoke the function for `GET /image` on any stage.
pub fn invoke_permission() -> Resource {
    Resource::new(
        "AWS::Lambda::Permission",
        json!({
            "Action": "lambda:InvokeFunction",
            "FunctionName": get_att(FUNCTION, "Arn"),
            "Principal": "apigateway.amazonaws.com",
            "SourceArn": sub(format!(
                "arn:${{AWS::Partition}}:execute-api:${{AWS::Region}}:${{AWS::AccountId}}:${{{}}}/*/GET/{}",
                API, IMAGE_PATH
            ))
        }),
    )
}

// =============================================================================
// Helpers
// =============================================================================

/// `arn:...:bucket/*` for a bucket declared in this template.
fn object_arns(bucket_logical_id: &str) -> Value {
    join(vec![get_att(bucket_logical_id, "Arn"), json!("/*")])
}
