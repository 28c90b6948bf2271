use std::io::IsTerminal;
use std::path::PathBuf;

use async_trait::async_trait;
use uuid::Uuid;

use super::error::AuthError;
use super::oauth::OAuthClient;
use super::token::{self, CachedToken};
use super::twofa;

/// Source of session tokens. The terminal implementation prompts on stdin and
/// persists to the token cache; tests substitute a fake.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Token from a previous run, if any.
    async fn load_cached(&self) -> Result<Option<CachedToken>, AuthError>;

    /// Obtain a brand new token from the user's credentials.
    async fn interactive_login(&self) -> Result<CachedToken, AuthError>;

    async fn refresh(&self, token: &CachedToken) -> Result<CachedToken, AuthError>;

    async fn persist(&self, token: &CachedToken) -> Result<(), AuthError>;
}

/// Token cache on disk plus email/password/2FA prompts on the terminal.
pub struct TokenCacheProvider {
    cache_path: PathBuf,
    oauth: OAuthClient,
}

impl TokenCacheProvider {
    pub fn new(cache_path: PathBuf, oauth: OAuthClient) -> Self {
        Self { cache_path, oauth }
    }
}

#[async_trait]
impl SessionProvider for TokenCacheProvider {
    async fn load_cached(&self) -> Result<Option<CachedToken>, AuthError> {
        token::read_cache(&self.cache_path).await
    }

    async fn interactive_login(&self) -> Result<CachedToken, AuthError> {
        if !std::io::stdin().is_terminal() {
            return Err(AuthError::FailedLogin(format!(
                "No usable token in {} and stdin is not a terminal; \
                 run once interactively to log in",
                self.cache_path.display()
            )));
        }

        let email = twofa::prompt_email().await?;
        let password = twofa::prompt_password().await?;
        let hardware_id = Uuid::new_v4().to_string();

        tracing::debug!("Authenticating as {}", email);
        match self
            .oauth
            .password_grant(&email, &password, None, &hardware_id)
            .await
        {
            Ok(token) => Ok(token),
            Err(AuthError::TwoFactorRequired) => {
                tracing::info!("Two-factor authentication is required");
                let code = twofa::prompt_code().await?;
                self.oauth
                    .password_grant(&email, &password, Some(&code), &hardware_id)
                    .await
            }
            Err(e) => Err(e),
        }
    }

    async fn refresh(&self, token: &CachedToken) -> Result<CachedToken, AuthError> {
        self.oauth.refresh_grant(token).await
    }

    async fn persist(&self, token: &CachedToken) -> Result<(), AuthError> {
        token::write_cache(&self.cache_path, token).await
    }
}
