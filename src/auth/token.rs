use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;

use super::error::AuthError;
use super::responses::TokenResponse;

/// Ring access tokens live for an hour; treat them as stale a minute early so
/// a request never goes out with a token that expires in flight.
const EXPIRY_MARGIN_SECS: i64 = 60;
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// OAuth token bundle as persisted in the token cache file.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedToken {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    /// The hardware id the token was issued to; Ring rejects refreshes
    /// from a different one.
    pub hardware_id: String,
}

impl std::fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedToken")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("hardware_id", &self.hardware_id)
            .finish_non_exhaustive()
    }
}

impl CachedToken {
    /// Build a cache entry from an OAuth response. A response without a new
    /// refresh token keeps `previous_refresh`.
    pub fn from_response(
        resp: TokenResponse,
        hardware_id: &str,
        previous_refresh: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Self, AuthError> {
        let refresh_token = resp
            .refresh_token
            .or_else(|| previous_refresh.map(str::to_string))
            .ok_or_else(|| AuthError::FailedLogin("Token response has no refresh token".into()))?;
        let expires_in = resp.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        Ok(Self {
            access_token: resp.access_token,
            refresh_token,
            expires_at: now + Duration::seconds(expires_in),
            scope: resp.scope,
            token_type: resp.token_type,
            hardware_id: hardware_id.to_string(),
        })
    }

    pub fn expires_soon(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_MARGIN_SECS) >= self.expires_at
    }
}

/// Read the token cache. A missing file is `Ok(None)`; a corrupt one is
/// logged and treated as missing so the user is simply asked to log in again.
pub async fn read_cache(path: &Path) -> Result<Option<CachedToken>, AuthError> {
    let contents = match fs::read(path).await {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No token cache at {}", path.display());
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };
    match serde_json::from_slice::<CachedToken>(&contents) {
        Ok(token) => {
            tracing::debug!("Loaded cached token from {}", path.display());
            Ok(Some(token))
        }
        Err(e) => {
            tracing::warn!(
                "Token cache {} is unreadable ({}), a fresh login is needed",
                path.display(),
                e
            );
            Ok(None)
        }
    }
}

/// Write the token cache with owner-only permissions.
pub async fn write_cache(path: &Path, token: &CachedToken) -> Result<(), AuthError> {
    let cache_err = |source| AuthError::CacheWrite {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(cache_err)?;
    }
    let json = serde_json::to_string_pretty(token)?;
    fs::write(path, json).await.map_err(cache_err)?;
    #[cfg(unix)]
    {
        // Token cache holds a long-lived refresh token
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .await
            .map_err(cache_err)?;
    }
    tracing::debug!("Saved token cache to {}", path.display());
    Ok(())
}
