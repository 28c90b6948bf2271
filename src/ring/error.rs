use thiserror::Error;

use crate::auth::AuthError;
use crate::retry::Retryable;

/// Failure talking to the Ring REST API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Request to {url} failed: {source}")]
    Http {
        url: String,
        source: reqwest::Error,
    },

    #[error("Unexpected response from {url}: {source}")]
    Decode {
        url: String,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl Retryable for ApiError {
    /// Rate limiting, server errors and dropped connections are transient;
    /// client errors, bad payloads and auth failures are not.
    fn is_retryable(&self) -> bool {
        match self {
            ApiError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            ApiError::Http { .. } => true,
            ApiError::Decode { .. } => false,
            ApiError::Auth(_) => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum DeviceListError {
    #[error("Failed to list devices: {0}")]
    Api(#[from] ApiError),

    #[error("No doorbells found on this account")]
    NoDoorbells,
}

/// History could not be fetched for one device; the run moves on to the next.
#[derive(Debug, Error)]
#[error("Failed to fetch history for {device}: {source}")]
pub struct FetchError {
    pub device: String,
    #[source]
    pub source: ApiError,
}
