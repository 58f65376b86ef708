//! Stack synthesis tests.
//!
//! Tests verify the rendered template document: resource inventory,
//! exported outputs, the function's bucket wiring and permissions,
//! and the site bucket and distribution settings.

use serde_json::{json, Value};

use image_gallery::stack::output_names;
use image_gallery::{synthesize, Architecture, StackConfig};

fn rendered(config: &StackConfig) -> Value {
    let template = synthesize(config).unwrap();
    serde_json::from_str(&template.to_json(true).unwrap()).unwrap()
}

fn default_template() -> Value {
    rendered(&StackConfig::default())
}

#[test]
fn test_template_declares_every_resource() {
    let doc = default_template();
    let resources = doc["Resources"].as_object().unwrap();

    let expected = [
        ("ImageBucket", "AWS::S3::Bucket"),
        ("ReactBucket", "AWS::S3::Bucket"),
        ("ReactBucketPolicy", "AWS::S3::BucketPolicy"),
        ("Distribution", "AWS::CloudFront::Distribution"),
        ("GetImageFunctionRole", "AWS::IAM::Role"),
        ("GetImageFunction", "AWS::Lambda::Function"),
        ("GetImageApi", "AWS::ApiGateway::RestApi"),
        ("GetImageApiImageResource", "AWS::ApiGateway::Resource"),
        ("GetImageApiImageGet", "AWS::ApiGateway::Method"),
        ("GetImageApiImageOptions", "AWS::ApiGateway::Method"),
        ("GetImageApiRootOptions", "AWS::ApiGateway::Method"),
        ("GetImageApiDeployment", "AWS::ApiGateway::Deployment"),
        ("GetImageApiStage", "AWS::ApiGateway::Stage"),
        ("GetImageFunctionApiPermission", "AWS::Lambda::Permission"),
    ];

    assert_eq!(resources.len(), expected.len());
    for (logical_id, resource_type) in expected {
        assert_eq!(
            resources[logical_id]["Type"], resource_type,
            "resource {}",
            logical_id
        );
    }
}

#[test]
fn test_outputs_are_exported_under_their_own_names() {
    let doc = default_template();
    let outputs = doc["Outputs"].as_object().unwrap();

    assert_eq!(outputs.len(), 4);
    for name in output_names() {
        assert_eq!(outputs[name]["Export"]["Name"], name);
    }

    assert_eq!(
        outputs["ImageBucketNameExport"]["Value"],
        json!({ "Ref": "ImageBucket" })
    );
    assert_eq!(
        outputs["ReactBucketNameExport"]["Value"],
        json!({ "Ref": "ReactBucket" })
    );
    assert_eq!(
        outputs["ReactURLExport"]["Value"],
        json!({ "Fn::GetAtt": ["Distribution", "DomainName"] })
    );

    let endpoint = outputs["ApiEndpointExport"]["Value"]["Fn::Sub"]
        .as_str()
        .unwrap();
    assert!(endpoint.starts_with("https://${GetImageApi}.execute-api."));
    assert!(endpoint.ends_with("/prod/"));
}

#[test]
fn test_function_receives_image_bucket_name() {
    let doc = default_template();
    let function = &doc["Resources"]["GetImageFunction"]["Properties"];

    assert_eq!(
        function["Environment"]["Variables"]["IMAGE_PHOTO_BUCKET_NAME"],
        json!({ "Ref": "ImageBucket" })
    );
    assert_eq!(function["Role"], json!({ "Fn::GetAtt": ["GetImageFunctionRole", "Arn"] }));
    assert_eq!(function["Handler"], "bootstrap");
    assert_eq!(function["Architectures"], json!(["arm64"]));
}

#[test]
fn test_function_role_scoped_to_image_bucket() {
    let doc = default_template();
    let statements = &doc["Resources"]["GetImageFunctionRole"]["Properties"]["Policies"][0]
        ["PolicyDocument"]["Statement"];

    let actions: Vec<&str> = statements
        .as_array()
        .unwrap()
        .iter()
        .flat_map(|s| s["Action"].as_array().unwrap())
        .map(|a| a.as_str().unwrap())
        .collect();
    assert_eq!(actions, vec!["s3:GetObject", "s3:PutObject", "s3:ListBucket"]);

    // Listing is granted on the bucket itself, object access on its contents
    assert_eq!(
        statements[1]["Resource"],
        json!({ "Fn::GetAtt": ["ImageBucket", "Arn"] })
    );
    let object_resource = serde_json::to_string(&statements[0]["Resource"]).unwrap();
    assert!(object_resource.contains("ImageBucket"));
    assert!(object_resource.contains("/*"));
}

#[test]
fn test_buckets_are_removed_with_the_stack() {
    let doc = default_template();

    for bucket in ["ImageBucket", "ReactBucket"] {
        assert_eq!(doc["Resources"][bucket]["DeletionPolicy"], "Delete");
        assert_eq!(doc["Resources"][bucket]["UpdateReplacePolicy"], "Delete");
    }
}

#[test]
fn test_site_bucket_and_distribution() {
    let doc = default_template();

    let react = &doc["Resources"]["ReactBucket"]["Properties"];
    assert_eq!(
        react["WebsiteConfiguration"]["IndexDocument"],
        "index.html"
    );

    let policy = &doc["Resources"]["ReactBucketPolicy"]["Properties"]["PolicyDocument"];
    assert_eq!(policy["Statement"][0]["Action"], json!(["s3:GetObject"]));

    let config = &doc["Resources"]["Distribution"]["Properties"]["DistributionConfig"];
    assert_eq!(config["DefaultRootObject"], "index.html");
    assert_eq!(
        config["Origins"][0]["DomainName"],
        json!({ "Fn::GetAtt": ["ReactBucket", "RegionalDomainName"] })
    );
    assert_eq!(
        config["DefaultCacheBehavior"]["TargetOriginId"],
        config["Origins"][0]["Id"]
    );
}

#[test]
fn test_api_routes_image_to_function_with_preflight() {
    let doc = default_template();
    let resources = &doc["Resources"];

    assert_eq!(
        resources["GetImageApiImageResource"]["Properties"]["PathPart"],
        "image"
    );

    let get = &resources["GetImageApiImageGet"]["Properties"];
    assert_eq!(get["HttpMethod"], "GET");
    assert_eq!(get["Integration"]["Type"], "AWS_PROXY");

    for preflight in ["GetImageApiImageOptions", "GetImageApiRootOptions"] {
        let method = &resources[preflight]["Properties"];
        assert_eq!(method["HttpMethod"], "OPTIONS");
        let headers = &method["Integration"]["IntegrationResponses"][0]["ResponseParameters"];
        assert_eq!(
            headers["method.response.header.Access-Control-Allow-Origin"],
            "'*'"
        );
    }

    let depends_on = resources["GetImageApiDeployment"]["DependsOn"]
        .as_array()
        .unwrap();
    assert!(depends_on.contains(&json!("GetImageApiImageGet")));
}

#[test]
fn test_custom_stage_and_architecture() {
    let config = StackConfig {
        stage_name: "dev".to_string(),
        architecture: Architecture::X86_64,
        ..StackConfig::default()
    };
    let doc = rendered(&config);

    assert_eq!(
        doc["Resources"]["GetImageApiStage"]["Properties"]["StageName"],
        "dev"
    );
    assert!(doc["Outputs"]["ApiEndpointExport"]["Value"]["Fn::Sub"]
        .as_str()
        .unwrap()
        .ends_with("/dev/"));
    assert_eq!(
        doc["Resources"]["GetImageFunction"]["Properties"]["Architectures"],
        json!(["x86_64"])
    );
}

#[test]
fn test_invalid_config_is_rejected() {
    let config = StackConfig {
        stage_name: "has space".to_string(),
        ..StackConfig::default()
    };
    assert!(synthesize(&config).is_err());
}

#[test]
fn test_compact_and_pretty_render_the_same_document() {
    let template = synthesize(&StackConfig::default()).unwrap();

    let pretty: Value = serde_json::from_str(&template.to_json(true).unwrap()).unwrap();
    let compact = template.to_json(false).unwrap();

    assert!(!compact.contains('\n'));
    assert_eq!(pretty, serde_json::from_str::<Value>(&compact).unwrap());
    assert_eq!(pretty["AWSTemplateFormatVersion"], "2010-09-09");
}
