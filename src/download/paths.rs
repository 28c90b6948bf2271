use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset};

/// Keep ASCII alphanumerics, `-` and `_`; everything else becomes `_`.
/// Leading and trailing underscores are trimmed.
pub fn clean_device_name(name: &str) -> String {
    let mapped: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    mapped.trim_matches('_').to_string()
}

/// `{YYYY-MM-DD_HH-MM-SS}_{device}.mp4` on the event's local wall clock.
/// Deterministic, so re-runs land on the same file.
pub fn recording_filename(local: &DateTime<FixedOffset>, device_name: &str) -> String {
    let stamp = local.format("%Y-%m-%d_%H-%M-%S");
    let device = clean_device_name(device_name);
    if device.is_empty() {
        format!("{}.mp4", stamp)
    } else {
        format!("{}_{}.mp4", stamp, device)
    }
}

pub fn recording_path(
    directory: &Path,
    local: &DateTime<FixedOffset>,
    device_name: &str,
) -> PathBuf {
    directory.join(recording_filename(local, device_name))
}
