//! Ring OAuth token issuance: password grant (with optional 2FA code) and
//! refresh grant.

use chrono::Utc;
use reqwest::header::USER_AGENT;
use reqwest::{Client, StatusCode};
use serde_json::json;

use super::endpoints::Endpoints;
use super::error::AuthError;
use super::responses::{OAuthErrorBody, TokenResponse};
use super::token::CachedToken;

pub(crate) const CLIENT_ID: &str = "ring_official_android";
pub(crate) const APP_USER_AGENT: &str = "android:com.ringapp";
const SCOPE: &str = "client";

#[derive(Debug, Clone)]
pub struct OAuthClient {
    http: Client,
    endpoints: Endpoints,
}

impl OAuthClient {
    pub fn new(http: Client, endpoints: Endpoints) -> Self {
        Self { http, endpoints }
    }

    /// Exchange account credentials for a token. Without `code`, an account
    /// with 2FA enabled answers [`AuthError::TwoFactorRequired`] and Ring
    /// sends the code to the user.
    pub async fn password_grant(
        &self,
        username: &str,
        password: &str,
        code: Option<&str>,
        hardware_id: &str,
    ) -> Result<CachedToken, AuthError> {
        let body = json!({
            "client_id": CLIENT_ID,
            "scope": SCOPE,
            "grant_type": "password",
            "username": username,
            "password": password,
        });

        let mut request = self
            .http
            .post(&self.endpoints.oauth_token)
            .header(USER_AGENT, APP_USER_AGENT)
            .header("hardware_id", hardware_id)
            .header("2fa-support", "true")
            .json(&body);
        if let Some(code) = code {
            request = request.header("2fa-code", code);
        }

        tracing::debug!("POST {} (password grant)", self.endpoints.oauth_token);
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_password_failure(status, code.is_some(), &text));
        }

        let resp: TokenResponse = response.json().await?;
        CachedToken::from_response(resp, hardware_id, None, Utc::now())
    }

    /// Trade the refresh token for a fresh access token.
    pub async fn refresh_grant(&self, token: &CachedToken) -> Result<CachedToken, AuthError> {
        let body = json!({
            "client_id": CLIENT_ID,
            "scope": SCOPE,
            "grant_type": "refresh_token",
            "refresh_token": token.refresh_token,
        });

        tracing::debug!("POST {} (refresh grant)", self.endpoints.oauth_token);
        let response = self
            .http
            .post(&self.endpoints.oauth_token)
            .header(USER_AGENT, APP_USER_AGENT)
            .header("hardware_id", &token.hardware_id)
            .header("2fa-support", "true")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = OAuthErrorBody::parse(&text).message(&format!("HTTP {}", status));
            return Err(AuthError::RefreshRejected(message));
        }

        let resp: TokenResponse = response.json().await?;
        CachedToken::from_response(
            resp,
            &token.hardware_id,
            Some(&token.refresh_token),
            Utc::now(),
        )
    }
}

/// Map a failed password grant onto the auth error taxonomy.
///
/// Ring answers 412 when a 2FA code is needed. Once a code has been sent, a
/// 400 or 401 means the code was wrong or expired.
fn classify_password_failure(status: StatusCode, code_sent: bool, text: &str) -> AuthError {
    let body = OAuthErrorBody::parse(text);
    match status {
        StatusCode::PRECONDITION_FAILED => {
            if let Some(channel) = &body.tsv_state {
                tracing::info!("Ring sent a verification code via {}", channel);
            }
            AuthError::TwoFactorRequired
        }
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED if code_sent => {
            AuthError::TwoFactorRejected(body.message("Verification code is invalid or expired"))
        }
        StatusCode::UNAUTHORIZED => {
            AuthError::FailedLogin(body.message("Invalid email or password"))
        }
        _ => AuthError::ApiError {
            code: status.as_u16(),
            message: body.message(text),
        },
    }
}
