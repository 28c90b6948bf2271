use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::auth::endpoints::Endpoints;

pub type EventId = u64;

/// A doorbell-class device on the account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub id: u64,
    pub name: String,
    pub kind: Option<String>,
}

/// Which route a recording is fetched through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocatorKind {
    /// Authenticated `/dings/{id}/recording`, redirects to the media file.
    Primary,
    /// `/dings/{id}/share/play`, answers with a pre-signed URL.
    Share,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingLocator {
    pub kind: LocatorKind,
    pub url: String,
}

/// One history entry (motion, ding, on-demand view, …).
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEvent {
    pub id: EventId,
    pub created_at: DateTime<Utc>,
    pub kind: String,
    pub device_id: u64,
    pub device_name: String,
    pub recording: RecordingLocator,
    pub share: Option<RecordingLocator>,
}

/// One page of `/doorbots/{id}/history`.
#[derive(Debug, Default)]
pub struct HistoryPage {
    pub events: Vec<HistoryEvent>,
    /// Raw entries in the response, including the ones that were skipped.
    pub received: usize,
    /// Id of the last raw entry; the cursor for the next (older) page.
    pub last_id: Option<EventId>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DevicesResponse {
    #[serde(default)]
    pub doorbots: Vec<RawDevice>,
    #[serde(default)]
    pub authorized_doorbots: Vec<RawDevice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawDevice {
    pub id: u64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
}

impl From<RawDevice> for Device {
    fn from(raw: RawDevice) -> Self {
        let name = raw
            .description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| format!("doorbell-{}", raw.id));
        Device {
            id: raw.id,
            name,
            kind: raw.kind,
        }
    }
}

impl DevicesResponse {
    /// Owned doorbells first, then shared ones, without duplicates.
    pub fn into_doorbells(self) -> Vec<Device> {
        let mut devices: Vec<Device> = Vec::new();
        for raw in self.doorbots.into_iter().chain(self.authorized_doorbots) {
            if devices.iter().any(|d| d.id == raw.id) {
                continue;
            }
            devices.push(raw.into());
        }
        devices
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ShareResponse {
    pub url: String,
}

/// Ids arrive as JSON numbers, occasionally as digit strings.
pub(crate) fn parse_event_id(value: Option<&Value>) -> Option<EventId> {
    match value? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Timestamps are RFC 3339 strings; older payloads use naive ISO strings
/// (taken as UTC) or epoch seconds/milliseconds.
pub(crate) fn parse_timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    match value? {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|naive| naive.and_utc())
            }),
        Value::Number(n) => {
            let raw = n.as_f64()?;
            // Anything past year ~5138 in seconds is really milliseconds
            let millis = if raw.abs() >= 1e11 { raw } else { raw * 1000.0 };
            Utc.timestamp_millis_opt(millis as i64).single()
        }
        _ => None,
    }
}

/// Turn a raw history response into typed events for `device`, skipping
/// (with a warning) entries without a usable id or timestamp.
pub(crate) fn parse_history_page(
    entries: Vec<Value>,
    device: &Device,
    endpoints: &Endpoints,
) -> HistoryPage {
    let received = entries.len();
    let last_id = entries.last().and_then(|e| parse_event_id(e.get("id")));
    let mut events = Vec::with_capacity(received);

    for entry in entries {
        let raw_id = entry.get("id").cloned().unwrap_or_default();
        let Some(id) = parse_event_id(Some(&raw_id)) else {
            tracing::warn!("Skipping history entry without a numeric id: {}", raw_id);
            continue;
        };
        let raw_created = entry.get("created_at").cloned().unwrap_or_default();
        let Some(created_at) = parse_timestamp(Some(&raw_created)) else {
            tracing::warn!(
                "Skipping event {} - unable to parse timestamp {}",
                id,
                raw_created
            );
            continue;
        };
        let kind = entry
            .get("kind")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();

        events.push(HistoryEvent {
            id,
            created_at,
            kind,
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
        });
    }

    HistoryPage {
        events,
        received,
        last_id,
    }
}
