//! Configuration for the S3 primary store.
//!
//! The storage adapter is driven by a single configuration record matching
//! the host application's `objectstore` entry:
//!
//! ```json
//! {
//!     "bucket": "owncloud",
//!     "serversideencryption": "AES256",
//!     "options": {
//!         "version": "2006-03-01",
//!         "region": "us-east-1",
//!         "credentials": { "key": "accessKey1", "secret": "verySecretKey1" },
//!         "endpoint": "http://scality:8000/",
//!         "use_path_style_endpoint": true
//!     }
//! }
//! ```
//!
//! The administrative CLI loads the same record from a JSON file given via
//! `--config` or the `S3STORE_CONFIG` environment variable.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use serde::Deserialize;

use crate::error::StoreError;

// =============================================================================
// Default Values
// =============================================================================

/// Default AWS region.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Minimum multipart part size accepted by S3 (5 MiB).
pub const MIN_PART_SIZE: u64 = 5 * 1024 * 1024;

/// Default multipart part size.
pub const DEFAULT_PART_SIZE: u64 = MIN_PART_SIZE;

/// Default number of concurrent part uploads.
pub const DEFAULT_CONCURRENCY: usize = 5;

// =============================================================================
// Configuration Record
// =============================================================================

/// Static credentials for the object store.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub key: String,
    pub secret: String,
}

/// Connection options for the S3 client.
#[derive(Debug, Clone, Deserialize)]
pub struct S3Options {
    /// S3 API version pin. Accepted for compatibility with existing host
    /// configurations; the SDK always speaks the 2006-03-01 API.
    #[serde(default)]
    pub version: Option<String>,

    /// AWS region.
    #[serde(default = "default_region")]
    pub region: String,

    pub credentials: Credentials,

    /// Custom endpoint URL for S3-compatible services (MinIO, Ceph, Scality).
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Use path-style addressing instead of virtual-hosted-style.
    /// Required by most S3-compatible services.
    #[serde(default)]
    pub use_path_style_endpoint: bool,
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

/// The object-store configuration record.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Bucket holding all objects of this storage.
    pub bucket: String,

    pub options: S3Options,

    /// Server-side encryption algorithm to request on writes (e.g. `AES256`).
    #[serde(default)]
    pub serversideencryption: Option<String>,

    /// Multipart part size in bytes.
    #[serde(default)]
    pub part_size: Option<u64>,

    /// Number of part uploads in flight during a multipart write.
    #[serde(default)]
    pub concurrency: Option<usize>,
}

impl StoreConfig {
    /// Load the configuration record from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, StoreError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let config: StoreConfig = serde_json::from_str(&raw)
            .map_err(|e| StoreError::Config(format!("cannot parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration record.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.bucket.is_empty() {
            return Err(StoreError::Config("bucket must not be empty".to_string()));
        }
        if let Some(part_size) = self.part_size {
            if part_size < MIN_PART_SIZE {
                return Err(StoreError::Config(format!(
                    "part_size must be at least {} bytes, got {}",
                    MIN_PART_SIZE, part_size
                )));
            }
        }
        if self.concurrency == Some(0) {
            return Err(StoreError::Config(
                "concurrency must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Effective multipart part size.
    pub fn part_size(&self) -> u64 {
        self.part_size.unwrap_or(DEFAULT_PART_SIZE)
    }

    /// Effective part-upload concurrency.
    pub fn concurrency(&self) -> usize {
        self.concurrency.unwrap_or(DEFAULT_CONCURRENCY)
    }
}

// =============================================================================
// CLI
// =============================================================================

/// Administrative CLI for the S3 primary store.
#[derive(Parser, Debug)]
#[command(name = "store")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the object-store configuration file (JSON).
    #[arg(long, global = true, env = "S3STORE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a bucket as necessary to be used.
    CreateBucket(CreateBucketArgs),

    /// List objects, buckets or versions of an object.
    List(ListArgs),
}

#[derive(Args, Debug)]
pub struct CreateBucketArgs {
    /// Name of the bucket to be created.
    pub bucket: String,

    /// If the bucket exists its configuration will be updated.
    #[arg(long)]
    pub update_configuration: bool,

    /// No warning about the usage of this command will be displayed.
    #[arg(long)]
    pub accept_warning: bool,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Name of the bucket; its objects will be listed.
    pub bucket: Option<String>,

    /// Key of the object; its versions will be listed.
    pub object: Option<String>,
}

impl Cli {
    /// Load the configuration record named by `--config` / `S3STORE_CONFIG`.
    pub fn load_config(&self) -> Result<StoreConfig, StoreError> {
        let path = self
            .config
            .as_deref()
            .ok_or_else(|| StoreError::Config("no object store is configured".to_string()))?;
        StoreConfig::from_file(path)
    }
}

// =============================================================================
// Tests
// =============================================================================
