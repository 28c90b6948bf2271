use thiserror::Error;

use crate::retry::Retryable;
use crate::ring::ApiError;

/// Typed download errors enabling retry and fallback decisions.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("HTTP error {status} fetching {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Transfer from {url} failed after {bytes_written} bytes: {source}")]
    Http {
        url: String,
        bytes_written: u64,
        source: reqwest::Error,
    },

    #[error("Disk error: {0}")]
    Disk(#[from] std::io::Error),

    #[error(transparent)]
    Api(ApiError),
}

impl DownloadError {
    /// The locator does not have the recording; the fallback may.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DownloadError::HttpStatus { status: 404, .. })
    }
}

impl Retryable for DownloadError {
    fn is_retryable(&self) -> bool {
        match self {
            DownloadError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            DownloadError::Http { .. } => true,
            DownloadError::Disk(_) => false,
            DownloadError::Api(e) => e.is_retryable(),
        }
    }
}

impl From<ApiError> for DownloadError {
    /// Keep HTTP statuses visible so a 404 from the share route still
    /// reads as not-found.
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::HttpStatus { status, url } => DownloadError::HttpStatus { status, url },
            ApiError::Http { url, source } => DownloadError::Http {
                url,
                bytes_written: 0,
                source,
            },
            other => DownloadError::Api(other),
        }
    }
}
