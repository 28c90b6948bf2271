use std::path::Path;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use super::error::ApiError;
use super::types::{
    parse_history_page, Device, DevicesResponse, EventId, HistoryPage, LocatorKind,
    RecordingLocator, ShareResponse,
};
use super::RingApi;
use crate::auth::endpoints::Endpoints;
use crate::auth::Session;
use crate::download::error::DownloadError;
use crate::download::file;

const API_VERSION: u32 = 11;

/// Ring REST client. Every request carries the session's bearer token; a 401
/// triggers one refresh and one resend.
pub struct RingClient {
    http: Client,
    endpoints: Endpoints,
    session: Mutex<Session>,
}

impl RingClient {
    pub fn new(http: Client, endpoints: Endpoints, session: Session) -> Self {
        Self {
            http,
            endpoints,
            session: Mutex::new(session),
        }
    }

    /// Register this client with Ring. Required before some accounts will
    /// serve history; a failure is logged rather than fatal.
    pub async fn register(&self) {
        let mut session = self.session.lock().await;
        let body = json!({
            "device": {
                "hardware_id": session.hardware_id(),
                "metadata": {
                    "api_version": API_VERSION,
                    "device_model": "ring-history",
                },
                "os": "android",
            }
        });
        let url = self.endpoints.session();
        let result: Result<(), ApiError> = async {
            let token = session.access_token().await?;
            tracing::debug!("POST {}", url);
            let response = self
                .http
                .post(&url)
                .bearer_auth(token)
                .json(&body)
                .send()
                .await
                .map_err(|source| ApiError::Http {
                    url: url.clone(),
                    source,
                })?;
            ensure_success(response, &url).map(|_| ())
        }
        .await;
        if let Err(e) = result {
            tracing::warn!("Client session registration failed: {}", e);
        }
    }

    async fn send_get(
        &self,
        url: &str,
        query: &[(&str, String)],
        token: &str,
    ) -> Result<Response, ApiError> {
        tracing::debug!("GET {}", url);
        self.http
            .get(url)
            .query(query)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|source| ApiError::Http {
                url: url.to_string(),
                source,
            })
    }

    async fn authorized_get(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Response, ApiError> {
        let mut session = self.session.lock().await;
        let token = session.access_token().await?;
        let response = self.send_get(url, query, &token).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        tracing::debug!("Got 401 from {}, refreshing token", url);
        session.refresh().await?;
        let token = session.access_token().await?;
        self.send_get(url, query, &token).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let response = ensure_success(self.authorized_get(url, query).await?, url)?;
        let text = response.text().await.map_err(|source| ApiError::Http {
            url: url.to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ApiError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

fn ensure_success(response: Response, url: &str) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ApiError::HttpStatus {
            status: status.as_u16(),
            url: url.to_string(),
        })
    }
}

/// Query for one history page.
fn history_query(limit: u32, older_than: Option<EventId>) -> Vec<(&'static str, String)> {
    let mut query = vec![("limit", limit.to_string())];
    if let Some(id) = older_than {
        query.push(("older_than", id.to_string()));
    }
    query
}

#[async_trait]
impl RingApi for RingClient {
    async fn doorbells(&self) -> Result<Vec<Device>, ApiError> {
        let resp: DevicesResponse = self.get_json(&self.endpoints.devices(), &[]).await?;
        Ok(resp.into_doorbells())
    }

    async fn history_page(
        &self,
        device: &Device,
        limit: u32,
        older_than: Option<EventId>,
    ) -> Result<HistoryPage, ApiError> {
        let url = self.endpoints.history(device.id);
        let entries: Vec<Value> = self.get_json(&url, &history_query(limit, older_than)).await?;
        Ok(parse_history_page(entries, device, &self.endpoints))
    }

    async fn fetch_recording(
        &self,
        locator: &RecordingLocator,
        part_path: &Path,
    ) -> Result<u64, DownloadError> {
        let response = match locator.kind {
            LocatorKind::Primary => self.authorized_get(&locator.url, &[]).await?,
            LocatorKind::Share => {
                let share: ShareResponse = self
                    .get_json(&locator.url, &[("disable_redirect", "true".to_string())])
                    .await?;
                // Pre-signed URL; must not carry the bearer token
                self.http
                    .get(&share.url)
                    .send()
                    .await
                    .map_err(|source| ApiError::Http {
                        url: share.url.clone(),
                        source,
                    })?
            }
        };
        let response = ensure_success(response, &locator.url)?;
        file::stream_to_file(response, part_path).await
    }
}
