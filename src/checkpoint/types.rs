//! On-disk shape of the resume checkpoint.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::ring::{EventId, HistoryEvent};
use crate::window::Zone;

/// Per-doorbell resume markers, keyed by device id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckpointState {
    #[serde(default)]
    pub doorbots: BTreeMap<String, DeviceCheckpoint>,
}

/// The oldest event seen for one doorbell. The next resumed run asks for
/// events strictly older than `older_than_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceCheckpoint {
    pub older_than_id: String,
    pub oldest_timestamp_utc: DateTime<Utc>,
    #[serde(serialize_with = "serialize_local")]
    pub oldest_timestamp_local: DateTime<FixedOffset>,
    pub last_run_utc: DateTime<Utc>,
}

/// Always `+HH:MM`, `+00:00` included.
fn serialize_local<S: Serializer>(ts: &DateTime<FixedOffset>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&ts.to_rfc3339())
}

impl DeviceCheckpoint {
    /// Marker for the oldest event of a batch, or `None` for an empty batch.
    pub fn from_batch(events: &[HistoryEvent], zone: &Zone, now: DateTime<Utc>) -> Option<Self> {
        let oldest = events.iter().min_by_key(|e| (e.created_at, e.id))?;
        Some(Self {
            older_than_id: oldest.id.to_string(),
            oldest_timestamp_utc: oldest.created_at,
            oldest_timestamp_local: zone.localize(&oldest.created_at),
            last_run_utc: now,
        })
    }

    fn is_older_than(&self, other: &DeviceCheckpoint) -> bool {
        self.oldest_timestamp_utc < other.oldest_timestamp_utc
    }
}

impl CheckpointState {
    /// Store `candidate` for `device_id`. A resumed run only moves the marker
    /// further back in time; any other run overwrites it. Returns whether
    /// the stored marker changed.
    pub fn record(&mut self, device_id: u64, candidate: DeviceCheckpoint, resumed: bool) -> bool {
        let key = device_id.to_string();
        if let Some(existing) = self.doorbots.get(&key) {
            if resumed && !candidate.is_older_than(existing) {
                tracing::debug!(
                    "Keeping checkpoint {} for device {}; batch is not older",
                    existing.older_than_id,
                    device_id
                );
                return false;
            }
        }
        self.doorbots.insert(key, candidate);
        true
    }

    /// Paging cursor stored for `device_id`, if any and if it parses.
    pub fn cursor_for(&self, device_id: u64) -> Option<EventId> {
        let entry = self.doorbots.get(&device_id.to_string())?;
        match entry.older_than_id.trim().parse::<EventId>() {
            Ok(id) => Some(id),
            Err(_) => {
                tracing::warn!(
                    "Ignoring invalid checkpoint cursor {:?} for device {}",
                    entry.older_than_id,
                    device_id
                );
                None
            }
        }
    }
}
