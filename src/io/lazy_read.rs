use std::io::SeekFrom;

use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::{Buf, Bytes};

use crate::error::{operation_error, StoreError};

/// A lazy, seekable read stream over a remote object.
///
/// No GET request is issued until the first byte is read. The object size is
/// learned from a HEAD request at construction. Seeking discards any open
/// response body; the next read re-issues a ranged GET starting at the new
/// offset, so a seek never downloads bytes that are skipped over.
pub struct LazyReadStream {
    client: Client,
    bucket: String,
    key: String,
    version_id: Option<String>,
    size: u64,
    pos: u64,
    body: Option<ByteStream>,
    buffer: Bytes,
    identifier: String,
}

impl LazyReadStream {
    /// Open the current version of an object.
    ///
    /// Performs a HEAD request to determine the object size. Returns
    /// `NotFound` if the object does not exist.
    pub async fn new(client: Client, bucket: String, key: String) -> Result<Self, StoreError> {
        Self::with_version(client, bucket, key, None).await
    }

    /// Open a specific version of an object.
    pub async fn with_version(
        client: Client,
        bucket: String,
        key: String,
        version_id: Option<String>,
    ) -> Result<Self, StoreError> {
        let identifier = match &version_id {
            Some(v) => format!("s3://{}/{}?versionId={}", bucket, key, v),
            None => format!("s3://{}/{}", bucket, key),
        };

        let head = client
            .head_object()
            .bucket(&bucket)
            .key(&key)
            .set_version_id(version_id.clone())
            .send()
            .await
            .map_err(|e| {
                let is_not_found = e
                    .as_service_error()
                    .map(|se| se.is_not_found())
                    .unwrap_or(false);
                if is_not_found {
                    return StoreError::NotFound(identifier.clone());
                }

                let status_is_404 = e
                    .raw_response()
                    .map(|r| r.status().as_u16() == 404)
                    .unwrap_or(false);
                if status_is_404 {
                    return StoreError::NotFound(identifier.clone());
                }

                operation_error(&e)
            })?;

        let size = head.content_length().unwrap_or(0) as u64;

        Ok(Self {
            client,
            bucket,
            key,
            version_id,
            size,
            pos: 0,
            body: None,
            buffer: Bytes::new(),
            identifier,
        })
    }

    /// Read up to `buf.len()` bytes at the current position.
    ///
    /// The first read after construction or after a seek opens a ranged GET
    /// starting at the current position. Returns 0 at end of stream.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize, StoreError> {
        if buf.is_empty() || !self.fill_buffer().await? {
            return Ok(0);
        }
        let n = buf.len().min(self.buffer.len());
        buf[..n].copy_from_slice(&self.buffer[..n]);
        self.buffer.advance(n);
        self.pos += n as u64;
        Ok(n)
    }

    /// Read everything from the current position to the end of the object.
    pub async fn read_to_end(&mut self, out: &mut Vec<u8>) -> Result<usize, StoreError> {
        let start = out.len();
        while self.fill_buffer().await? {
            out.extend_from_slice(&self.buffer);
            self.pos += self.buffer.len() as u64;
            self.buffer = Bytes::new();
        }
        Ok(out.len() - start)
    }

    /// Move the read position.
    ///
    /// A seek away from the current position drops the open response body,
    /// so the next read issues a fresh ranged GET. Seeking to the current
    /// position is a no-op and keeps the open body.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64, StoreError> {
        let target = resolve_seek(self.pos, self.size, pos)?;
        if target != self.pos {
            tracing::debug!(
                identifier = %self.identifier,
                from = self.pos,
                to = target,
                "seek discards open stream"
            );
            self.body = None;
            self.buffer = Bytes::new();
            self.pos = target;
        }
        Ok(self.pos)
    }

    /// Total object size as reported by the HEAD request.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Current read position.
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// `s3://bucket/key[?versionId=...]`, for logging.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Ensure `self.buffer` holds unread bytes. Returns false at end of
    /// stream.
    async fn fill_buffer(&mut self) -> Result<bool, StoreError> {
        while self.buffer.is_empty() {
            match self.body.as_mut() {
                None => {
                    if self.pos >= self.size {
                        return Ok(false);
                    }
                    let body = self.open_at(self.pos).await?;
                    self.body = Some(body);
                }
                Some(body) => match body.try_next().await {
                    Ok(Some(chunk)) => self.buffer = chunk,
                    Ok(None) => {
                        self.body = None;
                        return Ok(false);
                    }
                    Err(e) => {
                        self.body = None;
                        return Err(StoreError::Operation {
                            status: None,
                            message: e.to_string(),
                        });
                    }
                },
            }
        }
        Ok(true)
    }

    async fn open_at(&self, offset: u64) -> Result<ByteStream, StoreError> {
        tracing::debug!(identifier = %self.identifier, offset, "opening ranged read");
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&self.key)
            .set_version_id(self.version_id.clone())
            .range(format!("bytes={}-", offset))
            .send()
            .await
            .map_err(|e| operation_error(&e))?;
        Ok(resp.body)
    }
}

impl std::fmt::Debug for LazyReadStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyReadStream")
            .field("identifier", &self.identifier)
            .field("size", &self.size)
            .field("pos", &self.pos)
            .field("open", &self.body.is_some())
            .finish()
    }
}

/// Resolve a `SeekFrom` against the current position and object size.
///
/// Rejects positions before the start or past the end of the object.
fn resolve_seek(current: u64, size: u64, pos: SeekFrom) -> Result<u64, StoreError> {
    let target: i128 = match pos {
        SeekFrom::Start(offset) => offset as i128,
        SeekFrom::Current(delta) => current as i128 + delta as i128,
        SeekFrom::End(delta) => size as i128 + delta as i128,
    };
    if target < 0 || target > size as i128 {
        return Err(StoreError::SeekOutOfBounds {
            position: target.clamp(i64::MIN as i128, i64::MAX as i128) as i64,
            size,
        });
    }
    Ok(target as u64)
}
