//! Object-store abstraction layer.
//!
//! The host application talks to its primary storage through the
//! [`ObjectStore`] trait, addressing objects by an opaque key (urn). Hosts
//! with a versioned bucket additionally use [`VersionedObjectStore`] to
//! inspect and restore older object versions. No object metadata is kept
//! locally; the remote store is authoritative for size, ETag and timestamp.
//!
//! [`S3Storage`] is the S3-backed implementation of both traits.

mod s3;

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::AsyncRead;

use crate::error::StoreError;

pub use s3::S3Storage;

/// One non-current version of a stored object.
///
/// Field values map straight from the remote listing: `VersionId`,
/// `LastModified` (epoch seconds), `Key`, `ETag` and `Size`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectVersion {
    pub version: String,
    pub timestamp: i64,
    pub oid: String,
    pub etag: String,
    pub size: u64,
}

/// Primary object storage as seen by the host.
#[async_trait]
pub trait ObjectStore {
    /// Stream type returned by reads.
    type Stream;

    /// Identifier of this storage, stable across restarts.
    fn storage_id(&self) -> &str;

    /// Upload the content of `reader` under the given urn, replacing any
    /// existing object.
    async fn write_object(
        &self,
        urn: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<(), StoreError>;

    /// Open the object for reading.
    async fn read_object(&self, urn: &str) -> Result<Self::Stream, StoreError>;

    /// Delete the object.
    async fn delete_object(&self, urn: &str) -> Result<(), StoreError>;
}

/// Version operations available on top of a versioned bucket.
#[async_trait]
pub trait VersionedObjectStore: ObjectStore {
    /// List all non-current versions of the object, newest first as
    /// reported by the remote.
    async fn get_versions(&self, urn: &str) -> Result<Vec<ObjectVersion>, StoreError>;

    /// Fetch one explicit version of the object.
    async fn get_version(&self, urn: &str, version_id: &str)
        -> Result<ObjectVersion, StoreError>;

    /// Open a specific version of the object for reading.
    async fn get_content_of_version(
        &self,
        urn: &str,
        version_id: &str,
    ) -> Result<Self::Stream, StoreError>;

    /// Make the given version the current one again.
    async fn restore_version(&self, urn: &str, version_id: &str) -> Result<(), StoreError>;

    /// Ask the storage to create a version of the object now.
    ///
    /// Returns true when nothing needs to be done because versions are
    /// created by the storage itself.
    async fn save_version(&self, urn: &str) -> Result<bool, StoreError>;
}
