//! Console summary of a run.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

use crate::download::{DownloadOutcome, DownloadResult};
use crate::ring::{EventId, HistoryEvent, LocatorKind};
use crate::window::{TimeWindow, Zone};

#[derive(Debug, Clone)]
struct Hit {
    local: DateTime<FixedOffset>,
    kind: String,
    device: String,
    id: EventId,
}

#[derive(Debug, Clone)]
struct DeviceSummary {
    name: String,
    fetched: usize,
    matched: usize,
    error: Option<String>,
}

/// Everything a run prints at the end. Counts are kept even for devices that
/// failed so the summary is always complete.
#[derive(Debug, Default)]
pub struct RunReport {
    devices: Vec<DeviceSummary>,
    hits: BTreeMap<NaiveDate, Vec<Hit>>,
    oldest: Option<DateTime<Utc>>,
    downloads: Vec<DownloadResult>,
}

impl RunReport {
    pub fn record_device(
        &mut self,
        device_name: &str,
        events: &[HistoryEvent],
        matches: &[&HistoryEvent],
        zone: &Zone,
    ) {
        if let Some(oldest) = events.iter().map(|e| e.created_at).min() {
            self.oldest = Some(self.oldest.map_or(oldest, |o| o.min(oldest)));
        }
        for event in matches {
            let local = zone.localize(&event.created_at);
            self.hits.entry(local.date_naive()).or_default().push(Hit {
                local,
                kind: event.kind.clone(),
                device: event.device_name.clone(),
                id: event.id,
            });
        }
        self.devices.push(DeviceSummary {
            name: device_name.to_string(),
            fetched: events.len(),
            matched: matches.len(),
            error: None,
        });
    }

    pub fn record_failure(&mut self, device_name: &str, error: &dyn std::fmt::Display) {
        self.devices.push(DeviceSummary {
            name: device_name.to_string(),
            fetched: 0,
            matched: 0,
            error: Some(error.to_string()),
        });
    }

    pub fn record_download(&mut self, result: DownloadResult) {
        self.downloads.push(result);
    }

    pub fn total_events(&self) -> usize {
        self.devices.iter().map(|d| d.fetched).sum()
    }

    pub fn total_matches(&self) -> usize {
        self.devices.iter().map(|d| d.matched).sum()
    }

    pub fn downloads(&self) -> &[DownloadResult] {
        &self.downloads
    }

    pub fn failed_downloads(&self) -> usize {
        self.downloads().iter().filter(|d| !d.success()).count()
    }

    pub fn render(&self, zone: &Zone, window: &TimeWindow) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail
        let _ = self.write_to(&mut out, zone, window);
        out
    }

    fn write_to(&self, out: &mut String, zone: &Zone, window: &TimeWindow) -> std::fmt::Result {
        for d in &self.devices {
            match &d.error {
                Some(e) => writeln!(out, "{}: skipped ({})", d.name, e)?,
                None => writeln!(
                    out,
                    "{}: {} events, {} {}",
                    d.name, d.fetched, d.matched, window
                )?,
            }
        }
        writeln!(
            out,
            "Total: {} events inspected on {} doorbell(s), {} matching",
            self.total_events(),
            self.devices.len(),
            self.total_matches()
        )?;
        if let Some(oldest) = self.oldest {
            writeln!(
                out,
                "Oldest event retrieved: {} ({})",
                zone.localize(&oldest).format("%Y-%m-%d %H:%M:%S %:z"),
                zone.label()
            )?;
        }

        if self.hits.is_empty() {
            writeln!(out, "No events found {} ({}).", window, zone.label())?;
        } else {
            writeln!(out, "\nEvents {} ({}):", window, zone.label())?;
            for (day, hits) in &self.hits {
                writeln!(out, "{}", day.format("%Y-%m-%d (%A)"))?;
                let mut hits = hits.clone();
                hits.sort_by_key(|h| (h.local, h.id));
                for h in hits {
                    writeln!(
                        out,
                        "  {}  {:<8} {}  id={}",
                        h.local.format("%H:%M:%S"),
                        h.kind,
                        h.device,
                        h.id
                    )?;
                }
            }
        }

        if self.downloads.is_empty() {
            return Ok(());
        }
        writeln!(out, "\nDownloads:")?;
        let (mut saved, mut via_share, mut skipped, mut failed) = (0, 0, 0, 0);
        for d in &self.downloads {
            let path = d.destination.display();
            match &d.outcome {
                DownloadOutcome::Saved(LocatorKind::Primary) => {
                    saved += 1;
                    writeln!(out, "  saved     {}", path)?;
                }
                DownloadOutcome::Saved(LocatorKind::Share) => {
                    saved += 1;
                    via_share += 1;
                    writeln!(out, "  fallback  {}", path)?;
                }
                DownloadOutcome::Skipped => {
                    skipped += 1;
                    writeln!(out, "  exists    {}", path)?;
                }
                DownloadOutcome::Failed(e) => {
                    failed += 1;
                    writeln!(out, "  FAILED    {} (event {}): {}", path, d.event_id, e)?;
                }
            }
        }
        writeln!(
            out,
            "{} saved ({} via share URL), {} skipped, {} failed",
            saved, via_share, skipped, failed
        )
    }
}
