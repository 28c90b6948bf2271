//! Recording downloader. Each matching event is fetched into a `.part` file
//! and renamed onto its deterministic destination, trying the event's share
//! URL once when the primary recording is not found.

pub mod error;
pub mod file;
pub mod paths;

use std::fs::FileTimes;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use self::error::DownloadError;
use crate::retry::{self, RetryPolicy};
use crate::ring::{EventId, HistoryEvent, LocatorKind, RecordingLocator, RingApi};
use crate::window::Zone;

/// Subset of application config consumed by the downloader.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    pub(crate) directory: PathBuf,
    pub(crate) zone: Zone,
    pub(crate) skip_existing: bool,
    pub(crate) retry: RetryPolicy,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DownloadOutcome {
    /// Written from the given locator.
    Saved(LocatorKind),
    /// Destination already present and `--skip-existing` was set.
    Skipped,
    Failed(String),
}

/// What happened to one event's recording. Only used for the run summary.
#[derive(Debug, Clone)]
pub struct DownloadResult {
    pub event_id: EventId,
    pub destination: PathBuf,
    pub outcome: DownloadOutcome,
}

impl DownloadResult {
    pub fn success(&self) -> bool {
        matches!(
            self.outcome,
            DownloadOutcome::Saved(_) | DownloadOutcome::Skipped
        )
    }
}

/// Download the recording for `event`. Never fails the run; failures are
/// reported in the result.
pub async fn download(
    api: &dyn RingApi,
    event: &HistoryEvent,
    config: &DownloadConfig,
) -> DownloadResult {
    let local = config.zone.localize(&event.created_at);
    let destination = paths::recording_path(&config.directory, &local, &event.device_name);
    tracing::debug!(
        event = event.id,
        device = event.device_id,
        path = %destination.display(),
        "downloading",
    );

    let outcome = match download_to(api, event, &destination, config).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!("Download failed: {}: {}", destination.display(), e);
            DownloadOutcome::Failed(e.to_string())
        }
    };

    DownloadResult {
        event_id: event.id,
        destination,
        outcome,
    }
}

async fn download_to(
    api: &dyn RingApi,
    event: &HistoryEvent,
    destination: &Path,
    config: &DownloadConfig,
) -> Result<DownloadOutcome, DownloadError> {
    if config.skip_existing && tokio::fs::try_exists(destination).await? {
        tracing::debug!("{} already exists, skipping", destination.display());
        return Ok(DownloadOutcome::Skipped);
    }
    tokio::fs::create_dir_all(&config.directory).await?;

    let part = file::part_path(destination);
    let used = match fetch_locator(api, event.id, &event.recording, &part, &config.retry).await {
        Ok(()) => LocatorKind::Primary,
        Err(e) if e.is_not_found() => {
            let Some(share) = &event.share else {
                return Err(e);
            };
            tracing::info!(
                "Recording for event {} not found, trying share URL",
                event.id
            );
            fetch_locator(api, event.id, share, &part, &config.retry).await?;
            LocatorKind::Share
        }
        Err(e) => return Err(e),
    };

    if let Err(e) = file::commit(&part, destination).await {
        file::discard(&part).await;
        return Err(e);
    }

    let mtime_path = destination.to_path_buf();
    let ts = event.created_at.timestamp();
    match tokio::task::spawn_blocking(move || set_file_mtime(&mtime_path, ts)).await {
        Ok(Err(e)) => tracing::warn!(
            "Could not set mtime on {}: {}",
            destination.display(),
            e
        ),
        Err(e) => tracing::warn!("mtime task failed: {}", e),
        Ok(Ok(())) => {}
    }

    tracing::debug!("Downloaded {}", destination.display());
    Ok(DownloadOutcome::Saved(used))
}

/// One locator, with retries for transient failures. The `.part` file is
/// removed on any failure.
async fn fetch_locator(
    api: &dyn RingApi,
    event_id: EventId,
    locator: &RecordingLocator,
    part: &Path,
    policy: &RetryPolicy,
) -> Result<(), DownloadError> {
    let what = format!("Recording {} ({:?})", event_id, locator.kind);
    match retry::with_backoff(policy, &what, || api.fetch_recording(locator, part)).await {
        Ok(bytes) => {
            tracing::debug!(
                bytes,
                path = %part.display(),
                "fetched recording",
            );
            Ok(())
        }
        Err(e) => {
            file::discard(part).await;
            Err(e)
        }
    }
}

/// Set the modification and access times of a file to the given Unix
/// timestamp, so recordings sort by when they happened.
fn set_file_mtime(path: &Path, timestamp: i64) -> std::io::Result<()> {
    let time = if timestamp >= 0 {
        UNIX_EPOCH + Duration::from_secs(timestamp as u64)
    } else {
        SystemTime::UNIX_EPOCH
    };
    let times = FileTimes::new().set_modified(time).set_accessed(time);
    let file = std::fs::File::options().write(true).open(path)?;
    file.set_times(times)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ring::test_support::{event_at, FakeRing};

    fn config(dir: &Path) -> DownloadConfig {
        DownloadConfig {
            directory: dir.join("ring_videos"),
            zone: Zone::named("Europe/London").unwrap(),
            skip_existing: false,
            retry: RetryPolicy::none(),
        }
    }

    fn files_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_primary_download() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let ev = event_at("2024-03-31T01:15:00Z");
        let fake = FakeRing::default();

        let result = download(&fake, &ev, &cfg).await;
        assert_eq!(result.outcome, DownloadOutcome::Saved(LocatorKind::Primary));
        assert!(result.success());
        assert_eq!(
            result.destination,
            cfg.directory.join("2024-03-31_02-15-00_Front_Door.mp4")
        );
        assert_eq!(
            std::fs::read(&result.destination).unwrap(),
            format!("video:{}", ev.recording.url).into_bytes()
        );
        assert_eq!(files_in(&cfg.directory), vec!["2024-03-31_02-15-00_Front_Door.mp4"]);
    }

    #[tokio::test]
    async fn test_mtime_matches_event() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let ev = event_at("2024-01-05T03:00:00Z");
        let result = download(&FakeRing::default(), &ev, &cfg).await;
        let mtime = std::fs::metadata(&result.destination)
            .unwrap()
            .modified()
            .unwrap();
        assert_eq!(
            mtime.duration_since(UNIX_EPOCH).unwrap().as_secs() as i64,
            ev.created_at.timestamp()
        );
    }

    #[tokio::test]
    async fn test_falls_back_to_share_once() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let ev = event_at("2024-01-05T03:00:00Z");
        let share_url = ev.share.as_ref().unwrap().url.clone();
        let mut fake = FakeRing::default();
        fake.recordings.insert(ev.recording.url.clone(), Err(404));

        let result = download(&fake, &ev, &cfg).await;
        assert_eq!(result.outcome, DownloadOutcome::Saved(LocatorKind::Share));
        assert_eq!(fake.fetched(), vec![ev.recording.url.clone(), share_url.clone()]);
        assert_eq!(
            std::fs::read(&result.destination).unwrap(),
            format!("video:{}", share_url).into_bytes()
        );
    }

    #[tokio::test]
    async fn test_both_locators_missing() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let ev = event_at("2024-01-05T03:00:00Z");
        let share_url = ev.share.as_ref().unwrap().url.clone();
        let mut fake = FakeRing::default();
        fake.recordings.insert(ev.recording.url.clone(), Err(404));
        fake.recordings.insert(share_url.clone(), Err(404));

        // Leftover from an interrupted run
        std::fs::create_dir_all(&cfg.directory).unwrap();
        let local = cfg.zone.localize(&ev.created_at);
        let dest = paths::recording_path(&cfg.directory, &local, &ev.device_name);
        std::fs::write(file::part_path(&dest), b"partial").unwrap();

        let result = download(&fake, &ev, &cfg).await;
        assert!(matches!(result.outcome, DownloadOutcome::Failed(_)));
        assert!(!result.success());
        assert_eq!(fake.fetched(), vec![ev.recording.url.clone(), share_url]);
        assert!(!result.destination.exists());
        assert!(files_in(&cfg.directory).is_empty());
    }

    #[tokio::test]
    async fn test_other_errors_skip_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let ev = event_at("2024-01-05T03:00:00Z");
        let mut fake = FakeRing::default();
        fake.recordings.insert(ev.recording.url.clone(), Err(403));

        let result = download(&fake, &ev, &cfg).await;
        assert!(matches!(result.outcome, DownloadOutcome::Failed(_)));
        assert_eq!(fake.fetched(), vec![ev.recording.url.clone()]);
    }

    #[tokio::test]
    async fn test_redownload_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let ev = event_at("2024-01-05T03:00:00Z");
        let mut fake = FakeRing::default();

        let first = download(&fake, &ev, &cfg).await;
        fake.recordings
            .insert(ev.recording.url.clone(), Ok(b"second".to_vec()));
        let second = download(&fake, &ev, &cfg).await;

        assert_eq!(first.destination, second.destination);
        assert_eq!(std::fs::read(&second.destination).unwrap(), b"second");
        assert_eq!(files_in(&cfg.directory).len(), 1);
    }

    #[tokio::test]
    async fn test_skip_existing() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = DownloadConfig {
            skip_existing: true,
            ..config(dir.path())
        };
        let ev = event_at("2024-01-05T03:00:00Z");
        let fake = FakeRing::default();
        let first = download(&fake, &ev, &cfg).await;
        std::fs::write(&first.destination, b"kept").unwrap();

        let second = download(&fake, &ev, &cfg).await;
        assert_eq!(second.outcome, DownloadOutcome::Skipped);
        assert!(second.success());
        assert_eq!(fake.fetched().len(), 1);
        assert_eq!(std::fs::read(&second.destination).unwrap(), b"kept");
    }
}
