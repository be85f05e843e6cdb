use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use thiserror::Error;

/// Failures surfaced by the object-store adapter.
///
/// Remote failures carry the HTTP status code reported by the store (when
/// one was received) and the remote error message, matching the two
/// exception kinds the host distinguishes: write failures and generic
/// operation failures.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The remote object store did not answer the initial bucket listing.
    #[error("no S3 object store available: {0}")]
    ServiceUnavailable(String),

    /// The configured bucket does not exist.
    #[error("bucket <{0}> does not exist")]
    MissingBucket(String),

    /// A write (single-part or multipart) was rejected by the remote store.
    #[error("write failed{}: {message}", fmt_status(.status))]
    Write { status: Option<u16>, message: String },

    /// A non-write operation (read, delete, list, restore) failed remotely.
    #[error("operation failed{}: {message}", fmt_status(.status))]
    Operation { status: Option<u16>, message: String },

    /// The requested object or object version is absent.
    #[error("object not found: {0}")]
    NotFound(String),

    /// Requested position is outside the object bounds.
    #[error("seek out of bounds: position {position}, size is {size}")]
    SeekOutOfBounds { position: i64, size: u64 },

    /// The configuration record is missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),
}

fn fmt_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (status {code})"),
        None => String::new(),
    }
}

/// Extract the remote status code and error message from an SDK error.
///
/// Prefers the service error message (the S3 `<Message>` element) over the
/// SDK's outer display, which only names the error phase.
pub(crate) fn remote_error<E>(err: &SdkError<E>) -> (Option<u16>, String)
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let status = err.raw_response().map(|r| r.status().as_u16());
    let message = err
        .meta()
        .message()
        .map(ToString::to_string)
        .unwrap_or_else(|| err.to_string());
    (status, message)
}

/// Wrap an SDK error as a write failure.
pub(crate) fn write_error<E>(err: &SdkError<E>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let (status, message) = remote_error(err);
    StoreError::Write { status, message }
}

/// Wrap an SDK error as a generic operation failure.
pub(crate) fn operation_error<E>(err: &SdkError<E>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let (status, message) = remote_error(err);
    StoreError::Operation { status, message }
}
