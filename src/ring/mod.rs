//! Thin Ring REST client: doorbell listing, history pages and recording
//! retrieval. The [`RingApi`] trait is the seam the run is written against,
//! so everything above it can be tested without a network.

pub mod client;
pub mod error;
pub mod types;

use std::path::Path;

use async_trait::async_trait;

pub use self::client::RingClient;
pub use self::error::{ApiError, DeviceListError, FetchError};
pub use self::types::{Device, EventId, HistoryEvent, HistoryPage, LocatorKind, RecordingLocator};

use crate::download::error::DownloadError;
use crate::retry::{self, RetryPolicy};

#[async_trait]
pub trait RingApi: Send + Sync {
    async fn doorbells(&self) -> Result<Vec<Device>, ApiError>;

    /// Up to `limit` events, newest first, strictly older than `older_than`.
    async fn history_page(
        &self,
        device: &Device,
        limit: u32,
        older_than: Option<EventId>,
    ) -> Result<HistoryPage, ApiError>;

    /// Stream the recording behind `locator` into `part_path`.
    async fn fetch_recording(
        &self,
        locator: &RecordingLocator,
        part_path: &Path,
    ) -> Result<u64, DownloadError>;
}

/// List the account's doorbells. An empty account is an error so the caller
/// can warn about it.
pub async fn list_doorbells(
    api: &dyn RingApi,
    policy: &RetryPolicy,
) -> Result<Vec<Device>, DeviceListError> {
    let devices = retry::with_backoff(policy, "Device listing", || api.doorbells()).await?;
    if devices.is_empty() {
        return Err(DeviceListError::NoDoorbells);
    }
    Ok(devices)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    use super::types::{Device, EventId, HistoryEvent, HistoryPage, LocatorKind, RecordingLocator};
    use super::{ApiError, RingApi};
    use crate::auth::endpoints::Endpoints;
    use crate::download::error::DownloadError;

    pub fn device(id: u64, name: &str) -> Device {
        Device {
            id,
            name: name.to_string(),
            kind: Some("doorbell".to_string()),
        }
    }

    pub fn event(id: EventId, ts: &str, device: &Device) -> HistoryEvent {
        let endpoints = Endpoints::default();
        HistoryEvent {
            id,
            created_at: DateTime::parse_from_rfc3339(ts)
                .unwrap()
                .with_timezone(&Utc),
            kind: "motion".to_string(),
            device_id: device.id,
            device_name: device.name.clone(),
            recording: RecordingLocator {
                kind: LocatorKind::Primary,
                url: endpoints.recording(id),
            },
            share: Some(RecordingLocator {
                kind: LocatorKind::Share,
                url: endpoints.share_play(id),
            }),
        }
    }

    /// Event on a default "Front Door" device, id derived from the timestamp.
    pub fn event_at(ts: &str) -> HistoryEvent {
        let ev = event(0, ts, &device(1, "Front Door"));
        HistoryEvent {
            id: ev.created_at.timestamp() as EventId,
            ..ev
        }
    }

    fn status(code: u16, url: &str) -> ApiError {
        ApiError::HttpStatus {
            status: code,
            url: url.to_string(),
        }
    }

    /// Scripted Ring account.
    #[derive(Default)]
    pub struct FakeRing {
        pub devices: Vec<Device>,
        pub devices_status: Option<u16>,
        /// Per device, newest first.
        pub events: HashMap<u64, Vec<HistoryEvent>>,
        pub history_status: HashMap<u64, u16>,
        /// Return the cursor event itself again, like an inclusive API would.
        pub inclusive_cursor: bool,
        /// Recording bodies or HTTP statuses by URL; unlisted URLs serve a body.
        pub recordings: HashMap<String, Result<Vec<u8>, u16>>,
        pub pages: Mutex<Vec<(u64, u32, Option<EventId>)>>,
        pub fetches: Mutex<Vec<String>>,
    }

    impl FakeRing {
        pub fn with_events(device: Device, events: Vec<HistoryEvent>) -> Self {
            let mut fake = FakeRing::default();
            fake.events.insert(device.id, events);
            fake.devices.push(device);
            fake
        }

        pub fn fetched(&self) -> Vec<String> {
            self.fetches.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RingApi for FakeRing {
        async fn doorbells(&self) -> Result<Vec<Device>, ApiError> {
            match self.devices_status {
                Some(code) => Err(status(code, "ring_devices")),
                None => Ok(self.devices.clone()),
            }
        }

        async fn history_page(
            &self,
            device: &Device,
            limit: u32,
            older_than: Option<EventId>,
        ) -> Result<HistoryPage, ApiError> {
            self.pages
                .lock()
                .unwrap()
                .push((device.id, limit, older_than));
            if let Some(code) = self.history_status.get(&device.id) {
                return Err(status(*code, "history"));
            }
            let events: Vec<HistoryEvent> = self
                .events
                .get(&device.id)
                .cloned()
                .unwrap_or_default()
                .into_iter()
                .filter(|e| match older_than {
                    Some(cursor) if self.inclusive_cursor => e.id <= cursor,
                    Some(cursor) => e.id < cursor,
                    None => true,
                })
                .take(limit as usize)
                .collect();
            Ok(HistoryPage {
                received: events.len(),
                last_id: events.last().map(|e| e.id),
                events,
            })
        }

        async fn fetch_recording(
            &self,
            locator: &RecordingLocator,
            part_path: &Path,
        ) -> Result<u64, DownloadError> {
            self.fetches.lock().unwrap().push(locator.url.clone());
            let body = match self.recordings.get(&locator.url) {
                Some(Ok(body)) => body.clone(),
                Some(Err(code)) => {
                    return Err(DownloadError::HttpStatus {
                        status: *code,
                        url: locator.url.clone(),
                    })
                }
                None => format!("video:{}", locator.url).into_bytes(),
            };
            tokio::fs::write(part_path, &body).await?;
            Ok(body.len() as u64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[tokio::test]
    async fn test_list_doorbells() {
        let fake = FakeRing::with_events(device(1, "Front Door"), Vec::new());
        let devices = list_doorbells(&fake, &RetryPolicy::none()).await.unwrap();
        assert_eq!(devices, vec![device(1, "Front Door")]);
    }

    #[tokio::test]
    async fn test_list_doorbells_empty_account() {
        let fake = FakeRing::default();
        let err = list_doorbells(&fake, &RetryPolicy::none()).await.unwrap_err();
        assert!(matches!(err, DeviceListError::NoDoorbells));
    }

    #[tokio::test]
    async fn test_list_doorbells_api_failure() {
        let fake = FakeRing {
            devices_status: Some(401),
            ..FakeRing::default()
        };
        let err = list_doorbells(&fake, &RetryPolicy::none()).await.unwrap_err();
        assert!(matches!(
            err,
            DeviceListError::Api(ApiError::HttpStatus { status: 401, .. })
        ));
    }
}
