use chrono::Utc;

use super::error::AuthError;
use super::provider::SessionProvider;
use super::token::CachedToken;

/// Authenticated Ring session. Owns the current token and the provider used
/// to refresh and persist it.
pub struct Session {
    token: CachedToken,
    provider: Box<dyn SessionProvider>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(token: CachedToken, provider: Box<dyn SessionProvider>) -> Self {
        Self { token, provider }
    }

    pub fn hardware_id(&self) -> &str {
        &self.token.hardware_id
    }

    /// Current bearer token, refreshed first if it is about to expire.
    pub async fn access_token(&mut self) -> Result<String, AuthError> {
        if self.token.expires_soon(Utc::now()) {
            tracing::debug!("Access token expired, refreshing");
            self.refresh().await?;
        }
        Ok(self.token.access_token.clone())
    }

    /// Refresh unconditionally, e.g. after the API answered 401.
    pub async fn refresh(&mut self) -> Result<(), AuthError> {
        let fresh = self.provider.refresh(&self.token).await?;
        persist_or_warn(self.provider.as_ref(), &fresh).await;
        self.token = fresh;
        tracing::debug!("Access token refreshed");
        Ok(())
    }
}

/// A token that cannot be cached is still good for this run; the next run
/// just has to log in again.
pub(crate) async fn persist_or_warn(provider: &dyn SessionProvider, token: &CachedToken) {
    if let Err(e) = provider.persist(token).await {
        tracing::warn!("Failed to save token cache: {}", e);
    }
}
