use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while obtaining or refreshing a Ring session.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Failed login: {0}")]
    FailedLogin(String),

    #[error("Two-factor authentication code required")]
    TwoFactorRequired,

    #[error("Two-factor authentication failed: {0}")]
    TwoFactorRejected(String),

    #[error("Token refresh rejected: {0}")]
    RefreshRejected(String),

    #[error("OAuth error (HTTP {code}): {message}")]
    ApiError { code: u16, message: String },

    #[error("Failed to read credentials from the terminal: {0}")]
    Prompt(String),

    #[error("Failed to write token cache {path}: {source}")]
    CacheWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
