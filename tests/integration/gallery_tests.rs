//! Signed URL listing tests.
//!
//! Tests verify:
//! - Output order follows listing order even when signing completes out of order
//! - Any signing failure fails the whole listing
//! - Listing failures stop before any signing

use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use image_gallery::error::StoreError;
use image_gallery::{list_signed_urls, sign_objects, ImageStore, SIGNED_URL_EXPIRY};

use super::test_utils::MockImageStore;

#[tokio::test]
async fn test_order_survives_out_of_order_signing() {
    // The first key takes longest to sign, so completion order is reversed
    let store = MockImageStore::new()
        .with_keys(["z.png", "m.png", "a.png"])
        .delayed_presign("z.png", Duration::from_millis(60))
        .delayed_presign("m.png", Duration::from_millis(30));

    let records = list_signed_urls(&store, SIGNED_URL_EXPIRY).await.unwrap();

    let filenames: Vec<_> = records.iter().map(|r| r.filename.as_str()).collect();
    assert_eq!(filenames, vec!["z.png", "m.png", "a.png"]);
}

#[tokio::test]
async fn test_signing_runs_concurrently() {
    let keys: Vec<String> = (0..8).map(|i| format!("img-{}.png", i)).collect();
    let mut store = MockImageStore::new().with_keys(keys.clone());
    for key in &keys {
        store = store.delayed_presign(key.clone(), Duration::from_millis(200));
    }

    let started = Instant::now();
    let records = list_signed_urls(&store, SIGNED_URL_EXPIRY).await.unwrap();

    assert_eq!(records.len(), 8);
    // Sequential signing would take 1.6s
    assert!(started.elapsed() < Duration::from_millis(1200));
}

#[tokio::test]
async fn test_filename_matches_key() {
    let store = MockImageStore::new().with_keys(["nested/dir/photo.jpg", "plain.gif"]);

    let records = list_signed_urls(&store, SIGNED_URL_EXPIRY).await.unwrap();

    assert_eq!(records[0].filename, "nested/dir/photo.jpg");
    assert!(records[0].url.contains("nested/dir/photo.jpg"));
    assert_eq!(records[1].filename, "plain.gif");
}

#[tokio::test]
async fn test_signing_failure_has_no_partial_result() {
    let store = MockImageStore::new()
        .with_keys(["a.png", "b.png", "c.png"])
        .failing_presign("c.png", "Request has expired");

    let result = list_signed_urls(&store, SIGNED_URL_EXPIRY).await;

    match result {
        Err(StoreError::Presign(message)) => assert_eq!(message, "Request has expired"),
        other => panic!("expected presign error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_listing_failure_skips_signing() {
    let store = MockImageStore::new()
        .with_keys(["a.png"])
        .failing_list("Access Denied");
    let presign_calls = store.presign_calls();

    let result = list_signed_urls(&store, SIGNED_URL_EXPIRY).await;

    assert!(matches!(result, Err(StoreError::List(_))));
    assert_eq!(presign_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_empty_listing() {
    let store = MockImageStore::new();
    let presign_calls = store.presign_calls();

    let records = list_signed_urls(&store, SIGNED_URL_EXPIRY).await.unwrap();

    assert!(records.is_empty());
    assert_eq!(presign_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_signing_an_existing_listing_does_not_list_again() {
    let store = MockImageStore::new().with_keys(["a.png", "b.png"]);
    let list_calls = store.list_calls();

    let objects = store.list_objects().await.unwrap();
    let records = sign_objects(&store, objects.clone(), SIGNED_URL_EXPIRY)
        .await
        .unwrap();

    assert_eq!(list_calls.load(Ordering::SeqCst), 1);
    assert_eq!(records.len(), objects.len());
    for (record, object) in records.iter().zip(&objects) {
        assert_eq!(record.filename, object.key);
    }
}
