use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    CompletedMultipartUpload, CompletedPart, ServerSideEncryption,
};
use aws_sdk_s3::Client;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::OnceCell;
use tokio::task::JoinSet;

use crate::config::StoreConfig;
use crate::error::{operation_error, remote_error, write_error, StoreError};
use crate::io::{create_s3_client, LazyReadStream};

use super::{ObjectStore, ObjectVersion, VersionedObjectStore};

/// Remote error message marking a transient overload rejection. A write
/// hitting it is retried exactly once.
const TRANSIENT_WRITE_MARKER: &str = "Please reduce your request rate";

/// S3-backed primary object storage.
///
/// The SDK client is established lazily on the first operation and reused
/// for the lifetime of the instance. Initialization probes the remote with
/// a bucket listing and verifies that the configured bucket exists.
pub struct S3Storage {
    config: StoreConfig,
    client_override: Option<Client>,
    connection: OnceCell<Client>,
}

impl S3Storage {
    /// Create a storage instance from a configuration record.
    ///
    /// No remote call happens here; connection setup is deferred to the
    /// first operation.
    pub fn new(config: StoreConfig) -> Result<Self, StoreError> {
        config.validate()?;
        Ok(Self {
            config,
            client_override: None,
            connection: OnceCell::new(),
        })
    }

    /// Create a storage instance around a pre-configured SDK client.
    ///
    /// The connection options of the record are ignored; the initialization
    /// probes still run on first use. Useful for tests and for hosts that
    /// manage their own client.
    pub fn with_client(config: StoreConfig, client: Client) -> Result<Self, StoreError> {
        config.validate()?;
        Ok(Self {
            config,
            client_override: Some(client),
            connection: OnceCell::new(),
        })
    }

    fn bucket(&self) -> &str {
        &self.config.bucket
    }

    /// Establish (or reuse) the SDK client.
    async fn init(&self) -> Result<&Client, StoreError> {
        self.connection
            .get_or_try_init(|| async {
                let client = match &self.client_override {
                    Some(client) => client.clone(),
                    None => create_s3_client(&self.config.options).await,
                };

                if let Err(e) = client.list_buckets().send().await {
                    let (_, message) = remote_error(&e);
                    tracing::error!(error = %message, "object store unreachable");
                    return Err(StoreError::ServiceUnavailable(message));
                }

                if let Err(e) = client.head_bucket().bucket(self.bucket()).send().await {
                    let not_found = e
                        .as_service_error()
                        .map(|se| se.is_not_found())
                        .unwrap_or(false);
                    if not_found {
                        return Err(StoreError::MissingBucket(self.bucket().to_string()));
                    }
                    return Err(operation_error(&e));
                }

                tracing::debug!(bucket = %self.bucket(), "object store connection established");
                Ok(client)
            })
            .await
    }

    fn server_side_encryption(&self) -> Option<ServerSideEncryption> {
        self.config
            .serversideencryption
            .as_deref()
            .map(ServerSideEncryption::from)
    }

    /// Upload a payload that fits in a single part.
    async fn put_single(&self, client: &Client, urn: &str, data: Bytes) -> Result<(), StoreError> {
        match self.try_put(client, urn, data.clone()).await {
            Err(err) if is_transient_write(&err) => {
                tracing::warn!(urn, error = %err, "transient write failure, retrying once");
                self.try_put(client, urn, data).await
            }
            result => result,
        }
    }

    async fn try_put(&self, client: &Client, urn: &str, data: Bytes) -> Result<(), StoreError> {
        client
            .put_object()
            .bucket(self.bucket())
            .key(urn)
            .set_server_side_encryption(self.server_side_encryption())
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| write_error(&e))?;
        Ok(())
    }

    /// Upload a payload larger than one part via a multipart upload.
    ///
    /// `first` is the already-read first part; the remainder is drawn from
    /// `reader` part by part. On failure the multipart upload is aborted so
    /// the remote does not accumulate orphaned parts.
    async fn put_multipart(
        &self,
        client: &Client,
        urn: &str,
        first: Bytes,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<(), StoreError> {
        let create = client
            .create_multipart_upload()
            .bucket(self.bucket())
            .key(urn)
            .set_server_side_encryption(self.server_side_encryption())
            .send()
            .await
            .map_err(|e| write_error(&e))?;
        let upload_id = create
            .upload_id()
            .ok_or_else(|| StoreError::Write {
                status: None,
                message: "remote did not return a multipart upload id".to_string(),
            })?
            .to_string();

        match self.upload_parts(client, urn, &upload_id, first, reader).await {
            Ok(parts) => {
                let completed = CompletedMultipartUpload::builder()
                    .set_parts(Some(parts))
                    .build();
                client
                    .complete_multipart_upload()
                    .bucket(self.bucket())
                    .key(urn)
                    .upload_id(&upload_id)
                    .multipart_upload(completed)
                    .send()
                    .await
                    .map_err(|e| write_error(&e))?;
                Ok(())
            }
            Err(err) => {
                if let Err(abort_err) = client
                    .abort_multipart_upload()
                    .bucket(self.bucket())
                    .key(urn)
                    .upload_id(&upload_id)
                    .send()
                    .await
                {
                    let (_, message) = remote_error(&abort_err);
                    tracing::warn!(urn, error = %message, "failed to abort multipart upload");
                }
                Err(err)
            }
        }
    }

    async fn upload_parts(
        &self,
        client: &Client,
        urn: &str,
        upload_id: &str,
        first: Bytes,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<Vec<CompletedPart>, StoreError> {
        let part_size = self.config.part_size() as usize;
        let concurrency = self.config.concurrency().max(1);

        let mut tasks: JoinSet<Result<CompletedPart, StoreError>> = JoinSet::new();
        let mut completed = Vec::new();
        let mut part_number: i32 = 0;
        let mut chunk = first;

        while !chunk.is_empty() {
            part_number += 1;
            while tasks.len() >= concurrency {
                completed.push(join_part(&mut tasks).await?);
            }

            let task_client = client.clone();
            let bucket = self.bucket().to_string();
            let key = urn.to_string();
            let upload_id = upload_id.to_string();
            tasks.spawn(async move {
                upload_one_part(task_client, bucket, key, upload_id, part_number, chunk).await
            });

            chunk = read_part(reader, part_size).await?;
        }

        while !tasks.is_empty() {
            completed.push(join_part(&mut tasks).await?);
        }

        completed.sort_by_key(|p| p.part_number().unwrap_or(0));
        tracing::debug!(urn, parts = completed.len(), "multipart upload assembled");
        Ok(completed)
    }
}

#[async_trait]
impl ObjectStore for S3Storage {
    type Stream = LazyReadStream;

    fn storage_id(&self) -> &str {
        self.bucket()
    }

    async fn write_object(
        &self,
        urn: &str,
        reader: &mut (dyn AsyncRead + Send + Unpin),
    ) -> Result<(), StoreError> {
        let client = self.init().await?;
        let part_size = self.config.part_size() as usize;

        let first = read_part(reader, part_size).await?;
        if first.len() < part_size {
            self.put_single(client, urn, first).await
        } else {
            self.put_multipart(client, urn, first, reader).await
        }
    }

    async fn read_object(&self, urn: &str) -> Result<LazyReadStream, StoreError> {
        let client = self.init().await?;
        LazyReadStream::new(client.clone(), self.bucket().to_string(), urn.to_string()).await
    }

    async fn delete_object(&self, urn: &str) -> Result<(), StoreError> {
        let client = self.init().await?;
        client
            .delete_object()
            .bucket(self.bucket())
            .key(urn)
            .send()
            .await
            .map_err(|e| operation_error(&e))?;
        Ok(())
    }
}

#[async_trait]
impl VersionedObjectStore for S3Storage {
    async fn get_versions(&self, urn: &str) -> Result<Vec<ObjectVersion>, StoreError> {
        let client = self.init().await?;
        let resp = client
            .list_object_versions()
            .bucket(self.bucket())
            .prefix(urn)
            .send()
            .await
            .map_err(|e| operation_error(&e))?;
        Ok(non_latest_versions(urn, resp.versions()))
    }

    async fn get_version(
        &self,
        urn: &str,
        version_id: &str,
    ) -> Result<ObjectVersion, StoreError> {
        let client = self.init().await?;
        let resp = client
            .list_object_versions()
            .bucket(self.bucket())
            .prefix(urn)
            .send()
            .await
            .map_err(|e| operation_error(&e))?;
        find_version(urn, version_id, resp.versions()).ok_or_else(|| {
            StoreError::NotFound(format!(
                "s3://{}/{}?versionId={}",
                self.bucket(),
                urn,
                version_id
            ))
        })
    }

    async fn get_content_of_version(
        &self,
        urn: &str,
        version_id: &str,
    ) -> Result<LazyReadStream, StoreError> {
        let client = self.init().await?;
        LazyReadStream::with_version(
            client.clone(),
            self.bucket().to_string(),
            urn.to_string(),
            Some(version_id.to_string()),
        )
        .await
    }

    async fn restore_version(&self, urn: &str, version_id: &str) -> Result<(), StoreError> {
        let client = self.init().await?;
        client
            .copy_object()
            .bucket(self.bucket())
            .key(urn)
            .copy_source(version_copy_source(self.bucket(), urn, version_id))
            .send()
            .await
            .map_err(|e| operation_error(&e))?;
        Ok(())
    }

    async fn save_version(&self, _urn: &str) -> Result<bool, StoreError> {
        // In a versioned bucket the versions are created automatically.
        Ok(true)
    }
}

/// Map one remote version entry.
fn map_version(v: &aws_sdk_s3::types::ObjectVersion) -> ObjectVersion {
    ObjectVersion {
        version: v.version_id().unwrap_or_default().to_string(),
        timestamp: v.last_modified().map(|t| t.secs()).unwrap_or(0),
        oid: v.key().unwrap_or_default().to_string(),
        etag: v.e_tag().unwrap_or_default().to_string(),
        size: v.size().unwrap_or(0).max(0) as u64,
    }
}

/// Keep versions of exactly this urn, excluding the current one.
///
/// The listing is prefix-based, so entries for sibling keys sharing the urn
/// as prefix must be dropped.
fn non_latest_versions(
    urn: &str,
    versions: &[aws_sdk_s3::types::ObjectVersion],
) -> Vec<ObjectVersion> {
    versions
        .iter()
        .filter(|v| v.key() == Some(urn) && v.is_latest() != Some(true))
        .map(map_version)
        .collect()
}

/// Find one explicit version of the urn in a prefix listing.
fn find_version(
    urn: &str,
    version_id: &str,
    versions: &[aws_sdk_s3::types::ObjectVersion],
) -> Option<ObjectVersion> {
    versions
        .iter()
        .find(|v| v.key() == Some(urn) && v.version_id() == Some(version_id))
        .map(map_version)
}

/// Copy source addressing a specific version, with the key percent-encoded.
fn version_copy_source(bucket: &str, urn: &str, version_id: &str) -> String {
    format!(
        "/{}/{}?versionId={}",
        bucket,
        urlencoding::encode(urn),
        version_id
    )
}

fn is_transient_write(err: &StoreError) -> bool {
    matches!(err, StoreError::Write { message, .. } if message.contains(TRANSIENT_WRITE_MARKER))
}

/// Read up to one part from the source stream.
async fn read_part(
    reader: &mut (dyn AsyncRead + Send + Unpin),
    part_size: usize,
) -> Result<Bytes, StoreError> {
    let mut buf = BytesMut::with_capacity(part_size);
    while buf.len() < part_size {
        let n = reader.read_buf(&mut buf).await.map_err(|e| StoreError::Write {
            status: None,
            message: format!("cannot read source stream: {}", e),
        })?;
        if n == 0 {
            break;
        }
    }
    Ok(buf.freeze())
}

async fn join_part(
    tasks: &mut JoinSet<Result<CompletedPart, StoreError>>,
) -> Result<CompletedPart, StoreError> {
    match tasks.join_next().await {
        Some(Ok(result)) => result,
        Some(Err(join_err)) => Err(StoreError::Write {
            status: None,
            message: format!("part upload task failed: {}", join_err),
        }),
        None => Err(StoreError::Write {
            status: None,
            message: "no part upload in flight".to_string(),
        }),
    }
}

/// Upload one part, retrying once on the transient overload rejection.
async fn upload_one_part(
    client: Client,
    bucket: String,
    key: String,
    upload_id: String,
    part_number: i32,
    data: Bytes,
) -> Result<CompletedPart, StoreError> {
    match try_upload_part(&client, &bucket, &key, &upload_id, part_number, data.clone()).await {
        Err(err) if is_transient_write(&err) => {
            tracing::warn!(key = %key, part_number, error = %err, "transient part failure, retrying once");
            try_upload_part(&client, &bucket, &key, &upload_id, part_number, data).await
        }
        result => result,
    }
}

async fn try_upload_part(
    client: &Client,
    bucket: &str,
    key: &str,
    upload_id: &str,
    part_number: i32,
    data: Bytes,
) -> Result<CompletedPart, StoreError> {
    let resp = client
        .upload_part()
        .bucket(bucket)
        .key(key)
        .upload_id(upload_id)
        .part_number(part_number)
        .body(ByteStream::from(data))
        .send()
        .await
        .map_err(|e| write_error(&e))?;
    Ok(CompletedPart::builder()
        .part_number(part_number)
        .set_e_tag(resp.e_tag().map(ToString::to_string))
        .build())
}
