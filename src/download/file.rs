use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use super::error::DownloadError;

/// Sibling `.part` path that a download is streamed into before it is
/// renamed over the destination.
pub fn part_path(download_path: &Path) -> PathBuf {
    let mut name = download_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    download_path.with_file_name(name)
}

/// Stream a successful response body into `part_path`, truncating whatever
/// was there. Returns the number of bytes written.
pub async fn stream_to_file(
    response: reqwest::Response,
    part_path: &Path,
) -> Result<u64, DownloadError> {
    let url = response.url().to_string();
    let content_length = response.content_length();

    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(part_path)
        .await?;

    let mut bytes_written: u64 = 0;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|source| {
            tracing::warn!(
                "Body error for {} (content_length={:?}, bytes_so_far={})",
                url,
                content_length,
                bytes_written
            );
            DownloadError::Http {
                url: url.clone(),
                bytes_written,
                source,
            }
        })?;
        file.write_all(&chunk).await?;
        bytes_written += chunk.len() as u64;
    }
    file.flush().await?;
    file.sync_all().await?;

    Ok(bytes_written)
}

/// Move a finished `.part` file onto its destination, replacing any
/// previous copy.
pub async fn commit(part_path: &Path, download_path: &Path) -> Result<(), DownloadError> {
    fs::rename(part_path, download_path).await?;
    Ok(())
}

/// Remove a leftover `.part` file; absence is fine.
pub async fn discard(part_path: &Path) {
    match fs::remove_file(part_path).await {
        Ok(()) => tracing::debug!("Removed partial file {}", part_path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(
            "Failed to remove partial file {}: {}",
            part_path.display(),
            e
        ),
    }
}
