//! Error types for the checkpoint store.

use std::path::PathBuf;

use thiserror::Error;

/// The checkpoint could not be persisted. The run's results still stand but
/// the next `--resume` starts from the previous marker.
#[derive(Error, Debug)]
pub enum CheckpointWriteError {
    #[error("Failed to encode checkpoint: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Failed to write checkpoint {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}
