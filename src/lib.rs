//! # S3 Primary Store
//!
//! S3-compatible object storage as the primary backing store for a
//! file-storage host application.
//!
//! The host addresses objects by an opaque key (urn) through the
//! [`store::ObjectStore`] trait; version inspection and restore go through
//! [`store::VersionedObjectStore`]. Both are implemented by
//! [`store::S3Storage`] on top of the AWS S3 SDK, so multipart uploads,
//! version listing and ranged reads are delegated to the remote store
//! rather than reimplemented here.
//!
//! ## Modules
//!
//! - [`store`] - Host-facing traits and the S3 storage adapter
//! - [`io`] - S3 client construction and the lazy ranged-read stream
//! - [`cli`] - `create-bucket` and `list` administrative commands
//! - [`config`] - Configuration record and CLI argument types
//! - [`error`] - Failure taxonomy
//!
//! ## Example
//!
//! ```rust,no_run
//! use s3_primary_store::{ObjectStore, S3Storage, StoreConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = StoreConfig::from_file("objectstore.json".as_ref())?;
//!     let storage = S3Storage::new(config)?;
//!
//!     let mut source = tokio::fs::File::open("photo.jpg").await?;
//!     storage.write_object("urn:oid:42", &mut source).await?;
//!
//!     let mut stream = storage.read_object("urn:oid:42").await?;
//!     let mut content = Vec::new();
//!     stream.read_to_end(&mut content).await?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod io;
pub mod store;

// Re-export commonly used types
pub use config::{Cli, Command, CreateBucketArgs, ListArgs, S3Options, StoreConfig};
pub use error::StoreError;
pub use io::{create_s3_client, LazyReadStream};
pub use store::{ObjectStore, ObjectVersion, S3Storage, VersionedObjectStore};
