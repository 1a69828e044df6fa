use thiserror::Error;

use crate::persist::PersistError;

/// Failure of a single chat-platform API call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("http status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("rate limited (retry after {retry_after:?}s)")]
    RateLimited { retry_after: Option<u64> },
    #[error("platform error: {0}")]
    Platform(String),
    #[error("timeout: {0}")]
    Timeout(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("malformed response: {0}")]
    Decode(String),
}

impl ApiError {
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return ApiError::Timeout(err.to_string());
        }
        if err.is_decode() {
            return ApiError::Decode(err.to_string());
        }
        ApiError::Network(err.to_string())
    }
}

/// Failure talking to the cloud storage services or their token endpoint.
#[derive(Debug, Error)]
pub enum CloudError {
    #[error("credentials: {0}")]
    Credentials(String),
    #[error("http status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("timeout: {0}")]
    Timeout(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CloudError {
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return CloudError::Timeout(err.to_string());
        }
        if err.is_decode() {
            return CloudError::Decode(err.to_string());
        }
        CloudError::Network(err.to_string())
    }

    /// Turns a non-success response into `HttpStatus`, keeping the body for diagnostics.
    pub(crate) async fn check_status(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, CloudError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(CloudError::HttpStatus {
            status: status.as_u16(),
            body,
        })
    }
}

/// Failure while persisting a channel or finishing a sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("serialize error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
    #[error("upload to gs://{bucket}/{destination} failed: {source}")]
    Upload {
        bucket: String,
        destination: String,
        source: CloudError,
    },
    #[error("batch commit for channel {channel} failed: {source}")]
    Commit { channel: String, source: CloudError },
}

/// Failure that ends an archive run.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("fetching history for channel {channel} failed: {source}")]
    History { channel: String, source: ApiError },
    #[error(transparent)]
    Sink(#[from] SinkError),
}
