//! Resume checkpoint: a small JSON file holding, per doorbell, the oldest
//! event a previous run reached.
//!
//! Reads never fail the run. A missing file is an empty checkpoint, a corrupt
//! one is an empty checkpoint plus a warning. Writes go to a sibling temp
//! file that is renamed over the real one.

pub mod error;
pub mod types;

use std::path::{Path, PathBuf};

use tokio::fs;

pub use self::error::CheckpointWriteError;
pub use self::types::{CheckpointState, DeviceCheckpoint};

pub async fn load(path: &Path) -> CheckpointState {
    let bytes = match fs::read(path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No checkpoint at {}", path.display());
            return CheckpointState::default();
        }
        Err(e) => {
            tracing::warn!(
                "Could not read checkpoint {}, starting fresh: {}",
                path.display(),
                e
            );
            return CheckpointState::default();
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(state) => state,
        Err(e) => {
            tracing::warn!(
                "Checkpoint {} is corrupt, starting fresh: {}",
                path.display(),
                e
            );
            CheckpointState::default()
        }
    }
}

/// Forget any stored checkpoint.
pub async fn reset(path: &Path) -> CheckpointState {
    match fs::remove_file(path).await {
        Ok(()) => tracing::info!("Cleared checkpoint {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Could not remove checkpoint {}: {}", path.display(), e),
    }
    CheckpointState::default()
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

pub async fn save(path: &Path, state: &CheckpointState) -> Result<(), CheckpointWriteError> {
    let io_err = |source| CheckpointWriteError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut json = serde_json::to_vec_pretty(state)?;
    json.push(b'\n');

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(io_err)?;
    }
    let tmp = temp_path(path);
    if let Err(e) = fs::write(&tmp, &json).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(io_err(e));
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))
            .await
            .map_err(io_err)?;
    }
    fs::rename(&tmp, path).await.map_err(io_err)?;
    tracing::debug!(
        "Saved checkpoint for {} doorbell(s) to {}",
        state.doorbots.len(),
        path.display()
    );
    Ok(())
}
