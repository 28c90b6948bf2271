//! One pass over the account: checkpoint, doorbells, then per doorbell
//! fetch, filter, checkpoint update and download.

use std::time::{Duration, Instant};

use chrono::Utc;

use crate::checkpoint::{self, DeviceCheckpoint};
use crate::config::Config;
use crate::download;
use crate::history::fetch_history;
use crate::report::RunReport;
use crate::ring::{self, HistoryEvent, RingApi};
use crate::window::is_in_window;

/// Run to completion. Per-device and per-event failures are logged and
/// recorded in the report; nothing here aborts the run.
pub async fn run(api: &dyn RingApi, config: &Config) -> RunReport {
    let started = Instant::now();
    let mut report = RunReport::default();

    let mut state = if config.reset_resume {
        checkpoint::reset(&config.state_file).await
    } else {
        checkpoint::load(&config.state_file).await
    };

    let devices = match ring::list_doorbells(api, &config.retry).await {
        Ok(devices) => devices,
        Err(e) => {
            tracing::warn!("{}; nothing to do", e);
            Vec::new()
        }
    };
    tracing::info!("Found {} doorbell(s)", devices.len());
    for d in &devices {
        tracing::debug!(
            id = d.id,
            kind = d.kind.as_deref().unwrap_or("unknown"),
            "doorbell {}",
            d.name
        );
    }

    let download_config = config.download_config();

    for device in &devices {
        let older_than = if config.resume {
            state.cursor_for(device.id)
        } else {
            None
        };
        match older_than {
            Some(cursor) => tracing::info!(
                "{}: resuming with events older than {}",
                device.name,
                cursor
            ),
            None if config.resume => {
                tracing::info!("{}: no checkpoint, starting from newest", device.name)
            }
            None => {}
        }

        let events = match fetch_history(api, device, config.limit, older_than, &config.retry).await
        {
            Ok(events) => events,
            Err(e) => {
                tracing::error!("{}", e);
                report.record_failure(&device.name, &e.source);
                continue;
            }
        };

        let matches: Vec<&HistoryEvent> = events
            .iter()
            .filter(|e| is_in_window(e, &config.zone, &config.window))
            .collect();
        tracing::info!(
            "{}: {} events, {} {}",
            device.name,
            events.len(),
            matches.len(),
            config.window
        );
        report.record_device(&device.name, &events, &matches, &config.zone);

        match DeviceCheckpoint::from_batch(&events, &config.zone, Utc::now()) {
            Some(marker) => {
                let cursor = marker.older_than_id.clone();
                // An unusable stored cursor restarted the walk; replace it
                let resumed = config.resume && older_than.is_some();
                if state.record(device.id, marker, resumed) {
                    tracing::debug!("{}: checkpoint moved to {}", device.name, cursor);
                }
            }
            None => tracing::info!("{}: no events returned, checkpoint unchanged", device.name),
        }

        for event in matches {
            let result = download::download(api, event, &download_config).await;
            report.record_download(result);
        }
    }

    if let Err(e) = checkpoint::save(&config.state_file, &state).await {
        tracing::error!("{}; the next --resume will start from the previous checkpoint", e);
    }

    tracing::info!("Finished in {}", format_duration(started.elapsed()));
    report
}

fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;

    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, mins, secs)
    } else if mins > 0 {
        format!("{}m {:02}s", mins, secs)
    } else {
        format!("{}s", secs)
    }
}
