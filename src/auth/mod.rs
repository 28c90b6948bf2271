//! Ring authentication: cached OAuth token reuse, refresh, and interactive
//! email/password login with an optional 2FA challenge.
//!
//! Flow: cached token → refresh if expired → interactive login if there is no
//! usable token. Every new token is written back to the token cache.

pub mod endpoints;
pub mod error;
pub mod oauth;
pub mod provider;
pub mod responses;
pub mod session;
pub mod token;
pub mod twofa;

use chrono::Utc;

pub use self::error::AuthError;
pub use self::provider::{SessionProvider, TokenCacheProvider};
pub use self::session::Session;

use self::session::persist_or_warn;

/// Produce an authenticated session from `provider`.
///
/// A valid cached token is reused silently. An expired one is refreshed; if
/// the refresh is rejected the user is asked to log in again.
pub async fn acquire_session(provider: Box<dyn SessionProvider>) -> Result<Session, AuthError> {
    if let Some(cached) = provider.load_cached().await? {
        if !cached.expires_soon(Utc::now()) {
            tracing::debug!("Reusing cached token");
            return Ok(Session::new(cached, provider));
        }

        tracing::debug!("Cached token expired, refreshing");
        match provider.refresh(&cached).await {
            Ok(fresh) => {
                persist_or_warn(provider.as_ref(), &fresh).await;
                tracing::info!("Authenticated with refreshed token");
                return Ok(Session::new(fresh, provider));
            }
            Err(e) => {
                tracing::warn!("Token refresh failed, logging in again: {}", e);
            }
        }
    }

    let token = provider.interactive_login().await?;
    persist_or_warn(provider.as_ref(), &token).await;
    tracing::info!("Authentication completed successfully");
    Ok(Session::new(token, provider))
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_valid_cached_token_is_reused_silently() {
        let provider = FakeProvider::new(Some(fresh("cached")));
        let calls = provider.calls.clone();

        let mut session = acquire_session(Box::new(provider)).await.unwrap();
        assert_eq!(session.access_token().await.unwrap(), "cached");

        let calls = calls.lock().unwrap();
        assert_eq!(calls.logins, 0);
        assert_eq!(calls.refreshes, 0);
        assert!(calls.persisted.is_empty());
    }

    #[tokio::test]
    async fn test_missing_cache_prompts_and_persists() {
        let provider = FakeProvider::new(None);
        let calls = provider.calls.clone();

        let mut session = acquire_session(Box::new(provider)).await.unwrap();
        assert_eq!(session.access_token().await.unwrap(), "login");

        let calls = calls.lock().unwrap();
        assert_eq!(calls.logins, 1);
        assert_eq!(calls.persisted, vec!["login".to_string()]);
    }

    #[tokio::test]
    async fn test_expired_cache_is_refreshed() {
        let expired = token("old", Utc::now() - Duration::minutes(5));
        let provider = FakeProvider::new(Some(expired));
        let calls = provider.calls.clone();

        let mut session = acquire_session(Box::new(provider)).await.unwrap();
        assert_eq!(session.access_token().await.unwrap(), "old+r1");

        let calls = calls.lock().unwrap();
        assert_eq!(calls.logins, 0);
        assert_eq!(calls.persisted, vec!["old+r1".to_string()]);
    }

    #[tokio::test]
    async fn test_rejected_refresh_falls_back_to_login() {
        let expired = token("old", Utc::now() - Duration::minutes(5));
        let mut provider = FakeProvider::new(Some(expired));
        provider.refresh_ok = false;
        let calls = provider.calls.clone();

        let mut session = acquire_session(Box::new(provider)).await.unwrap();
        assert_eq!(session.access_token().await.unwrap(), "login");
        assert_eq!(calls.lock().unwrap().logins, 1);
    }

    #[tokio::test]
    async fn test_failed_login_is_auth_error() {
        let mut provider = FakeProvider::new(None);
        provider.login_ok = false;

        let err = acquire_session(Box::new(provider)).await.unwrap_err();
        assert!(matches!(err, AuthError::TwoFactorRejected(_)));
    }

    #[tokio::test]
    async fn test_session_refreshes_on_demand() {
        let provider = FakeProvider::new(Some(fresh("cached")));
        let calls = provider.calls.clone();

        let mut session = acquire_session(Box::new(provider)).await.unwrap();
        session.refresh().await.unwrap();
        assert_eq!(session.access_token().await.unwrap(), "cached+r1");
        assert_eq!(session.hardware_id(), "hw-test");
        assert_eq!(calls.lock().unwrap().persisted, vec!["cached+r1".to_string()]);
    }
}
