//! Real service integration tests against MinIO.
//!
//! # Requirements
//!
//! A MinIO instance with default credentials must be reachable on
//! `localhost:9000`, e.g.:
//!
//! ```bash
//! docker run -p 9000:9000 minio/minio server /data
//! ```
//!
//! # Running the tests
//!
//! ```bash
//! cargo test --test integration minio -- --ignored
//! ```
//!
//! These tests are marked as `#[ignore]` by default because they require an
//! external service to be running.

use std::io::SeekFrom;
use std::time::Duration;

use s3_primary_store::config::{Credentials, S3Options, StoreConfig};
use s3_primary_store::{
    create_s3_client, ObjectStore, S3Storage, StoreError, VersionedObjectStore,
};

const MINIO_ENDPOINT: &str = "http://localhost:9000";
const MINIO_ACCESS_KEY: &str = "minioadmin";
const MINIO_SECRET_KEY: &str = "minioadmin";
const TEST_BUCKET: &str = "primary-store-test";

fn minio_config() -> StoreConfig {
    StoreConfig {
        bucket: TEST_BUCKET.to_string(),
        options: S3Options {
            version: None,
            region: "us-east-1".to_string(),
            credentials: Credentials {
                key: MINIO_ACCESS_KEY.to_string(),
                secret: MINIO_SECRET_KEY.to_string(),
            },
            endpoint: Some(MINIO_ENDPOINT.to_string()),
            use_path_style_endpoint: true,
        },
        serversideencryption: None,
        part_size: None,
        concurrency: None,
    }
}

/// Check if the MinIO service is reachable.
async fn is_minio_available() -> bool {
    let client = create_s3_client(&minio_config().options).await;
    matches!(
        tokio::time::timeout(Duration::from_secs(2), client.list_buckets().send()).await,
        Ok(Ok(_))
    )
}

/// Create the (versioned) test bucket if it does not exist yet.
async fn ensure_versioned_bucket() {
    let client = create_s3_client(&minio_config().options).await;
    let _ = client.create_bucket().bucket(TEST_BUCKET).send().await;
    let _ = client
        .put_bucket_versioning()
        .bucket(TEST_BUCKET)
        .versioning_configuration(
            aws_sdk_s3::types::VersioningConfiguration::builder()
                .status(aws_sdk_s3::types::BucketVersioningStatus::Enabled)
                .build(),
        )
        .send()
        .await;
}

#[tokio::test]
#[ignore]
async fn test_write_then_read_returns_same_bytes() {
    if !is_minio_available().await {
        eprintln!("Skipping: MinIO not available at {}", MINIO_ENDPOINT);
        return;
    }
    ensure_versioned_bucket().await;

    let storage = S3Storage::new(minio_config()).unwrap();
    let payload: Vec<u8> = (0..100_000u32).flat_map(|i| i.to_le_bytes()).collect();

    let mut reader: &[u8] = &payload;
    storage.write_object("roundtrip.bin", &mut reader).await.unwrap();

    let mut stream = storage.read_object("roundtrip.bin").await.unwrap();
    assert_eq!(stream.size(), payload.len() as u64);

    let mut content = Vec::new();
    stream.read_to_end(&mut content).await.unwrap();
    assert_eq!(content, payload);

    // Seeking re-reads the tail only.
    let offset = payload.len() as u64 - 1024;
    stream.seek(SeekFrom::Start(offset)).unwrap();
    let mut tail = Vec::new();
    stream.read_to_end(&mut tail).await.unwrap();
    assert_eq!(tail, payload[offset as usize..]);

    storage.delete_object("roundtrip.bin").await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_delete_makes_subsequent_reads_fail() {
    if !is_minio_available().await {
        eprintln!("Skipping: MinIO not available at {}", MINIO_ENDPOINT);
        return;
    }
    ensure_versioned_bucket().await;

    let storage = S3Storage::new(minio_config()).unwrap();

    let mut reader: &[u8] = b"short lived";
    storage.write_object("doomed.txt", &mut reader).await.unwrap();
    storage.delete_object("doomed.txt").await.unwrap();

    let err = storage.read_object("doomed.txt").await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[tokio::test]
#[ignore]
async fn test_version_listing_and_restore() {
    if !is_minio_available().await {
        eprintln!("Skipping: MinIO not available at {}", MINIO_ENDPOINT);
        return;
    }
    ensure_versioned_bucket().await;

    let storage = S3Storage::new(minio_config()).unwrap();
    let key = "versioned.txt";

    let mut first: &[u8] = b"first revision";
    storage.write_object(key, &mut first).await.unwrap();
    let mut second: &[u8] = b"second revision";
    storage.write_object(key, &mut second).await.unwrap();

    // The current version never shows up in the listing.
    let versions = storage.get_versions(key).await.unwrap();
    assert!(!versions.is_empty());
    let oldest = versions.last().unwrap();

    let mut stream = storage
        .get_content_of_version(key, &oldest.version)
        .await
        .unwrap();
    let mut content = Vec::new();
    stream.read_to_end(&mut content).await.unwrap();
    assert_eq!(content, b"first revision");

    // Restoring the old version makes it the current content again.
    storage.restore_version(key, &oldest.version).await.unwrap();
    let mut restored = storage.read_object(key).await.unwrap();
    let mut content = Vec::new();
    restored.read_to_end(&mut content).await.unwrap();
    assert_eq!(content, b"first revision");

    // Explicit version save is a no-op on a versioned bucket.
    assert!(storage.save_version(key).await.unwrap());
}
