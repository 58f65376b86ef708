//! Image Gallery - signed-URL image listing and its deployment stack.
//!
//! This binary is both the Lambda function (`lambda`) and the operator tool
//! (`serve`, `synth`, `upload`, `check`).

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use image_gallery::{
    config::{CheckConfig, Cli, Command, FunctionConfig, ServeConfig, SynthConfig, UploadConfig},
    create_cloudfront_client, create_function_router, create_router, create_s3_client,
    invalidate_distribution, shared_s3_client, sign_objects, stack, upload_directory,
    ImageStore, RouterConfig, S3ImageStore,
};

#[tokio::main]
async fn main() -> ExitCode {
    let command = match Cli::parse().into_command() {
        Ok(command) => command,
        Err(e) => e.exit(),
    };

    match command {
        Command::Lambda(config) => run_lambda(config).await,
        Command::Serve(config) => run_serve(config).await,
        Command::Synth(config) => run_synth(config),
        Command::Upload(config) => run_upload(config).await,
        Command::Check(config) => run_check(config).await,
    }
}

/// Log output style.
#[derive(Clone, Copy)]
enum LogTarget {
    Terminal,
    /// CloudWatch adds its own timestamps and renders no colors
    CloudWatch,
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool, target: LogTarget) {
    let env_filter = if verbose {
        "image_gallery=debug,tower_http=debug"
    } else {
        "image_gallery=info,tower_http=info"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| env_filter.into());

    match target {
        LogTarget::Terminal => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
        LogTarget::CloudWatch => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .without_time()
                    .with_target(false),
            )
            .init(),
    }
}

// =============================================================================
// Lambda Command
// =============================================================================

async fn run_lambda(config: FunctionConfig) -> ExitCode {
    init_logging(config.verbose, LogTarget::CloudWatch);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let store_args = &config.store;
    let client = shared_s3_client(
        store_args.s3_endpoint.as_deref(),
        store_args.s3_region.as_deref(),
    )
    .await;
    let store = S3ImageStore::new(client, store_args.bucket.clone())
        .with_listing_mode(store_args.listing_mode());

    info!(
        bucket = %store_args.bucket,
        url_expiry_secs = store_args.url_expiry_secs,
        "Starting image function"
    );

    let router = create_function_router(
        store,
        RouterConfig::new().with_url_expiry(store_args.url_expiry()),
    );

    if let Err(e) = lambda_http::run(router).await {
        error!("Lambda runtime error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose, LogTarget::Terminal);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let store_args = &config.store;

    info!("Configuration:");
    info!("  Image bucket: {}", store_args.bucket);
    if let Some(ref endpoint) = store_args.s3_endpoint {
        info!("  S3 endpoint: {}", endpoint);
    }
    if let Some(ref region) = store_args.s3_region {
        info!("  S3 region: {}", region);
    }
    info!("  URL expiry: {}s", store_args.url_expiry_secs);
    info!(
        "  Listing: {}",
        if store_args.all_pages {
            "all pages"
        } else {
            "first page only"
        }
    );

    let client = shared_s3_client(
        store_args.s3_endpoint.as_deref(),
        store_args.s3_region.as_deref(),
    )
    .await;
    let store = S3ImageStore::new(client, store_args.bucket.clone())
        .with_listing_mode(store_args.listing_mode());

    let router_config = RouterConfig::new()
        .with_url_expiry(store_args.url_expiry())
        .with_tracing(!config.no_tracing);
    let router = create_router(store, router_config);

    let addr = config.bind_address();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    info!("Server listening on: http://{}", addr);
    info!("  curl http://{}/image", addr);

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

// =============================================================================
// Synth Command
// =============================================================================

fn run_synth(config: SynthConfig) -> ExitCode {
    let template = match stack::synthesize(&config.stack_config()) {
        Ok(template) => template,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let rendered = match template.to_json(!config.compact) {
        Ok(rendered) => rendered,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match config.output {
        Some(ref path) => {
            if let Err(e) = std::fs::write(path, rendered + "\n") {
                eprintln!("Error: failed to write {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
            eprintln!("Template written to {}", path.display());
            eprintln!("Outputs: {}", stack::output_names().join(", "));
        }
        None => println!("{}", rendered),
    }

    ExitCode::SUCCESS
}

// =============================================================================
// Upload Command
// =============================================================================

async fn run_upload(config: UploadConfig) -> ExitCode {
    init_logging(config.verbose, LogTarget::Terminal);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let client = create_s3_client(config.s3_endpoint.as_deref(), config.s3_region.as_deref()).await;

    match upload_directory(
        &client,
        &config.bucket,
        &config.source,
        config.prefix.as_deref(),
        !config.no_prune,
    )
    .await
    {
        Ok(report) => info!(
            "Uploaded {} file(s), {} bytes to s3://{}, pruned {} stale object(s)",
            report.files, report.bytes, config.bucket, report.deleted
        ),
        Err(e) => {
            error!("Upload failed: {}", e);
            return ExitCode::FAILURE;
        }
    }

    if let Some(ref distribution_id) = config.distribution_id {
        let cloudfront = create_cloudfront_client().await;
        if let Err(e) = invalidate_distribution(&cloudfront, distribution_id).await {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    }

    ExitCode::SUCCESS
}

// =============================================================================
// Check Command
// =============================================================================

async fn run_check(config: CheckConfig) -> ExitCode {
    if config.verbose {
        init_logging(true, LogTarget::Terminal);
    }

    println!("Image Gallery Configuration Check");
    println!("═════════════════════════════════");
    println!();

    if let Err(e) = config.validate() {
        println!("✗ Configuration: {}", e);
        return ExitCode::FAILURE;
    }

    let store_args = &config.store;
    println!("✓ Bucket: {}", store_args.bucket);
    if let Some(ref endpoint) = store_args.s3_endpoint {
        println!("✓ Endpoint: {}", endpoint);
    }
    println!();

    let client = create_s3_client(
        store_args.s3_endpoint.as_deref(),
        store_args.s3_region.as_deref(),
    )
    .await;
    let store = S3ImageStore::new(client, store_args.bucket.clone())
        .with_listing_mode(store_args.listing_mode());

    print!("Listing images... ");
    let objects = match store.list_objects().await {
        Ok(objects) => {
            println!("✓ {} image(s)", objects.len());
            objects
        }
        Err(e) => {
            println!("✗ failed");
            println!();
            println!("Error: {}", e);
            println!();
            println!("Please check:");
            println!("  - Your AWS credentials are configured correctly");
            println!(
                "  - The bucket '{}' exists and is accessible",
                store_args.bucket
            );
            return ExitCode::FAILURE;
        }
    };

    if config.sign {
        println!();
        match sign_objects(&store, objects, store_args.url_expiry()).await {
            Ok(records) => {
                for record in &records {
                    println!("  {}", record.filename);
                    println!("    {}", record.url);
                }
            }
            Err(e) => {
                println!("✗ Signing failed: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        for object in &objects {
            println!("  {}", object.key);
        }
    }

    println!();
    println!("═════════════════════════════════");
    println!("✓ All checks passed!");

    ExitCode::SUCCESS
}
