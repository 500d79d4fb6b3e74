use crate::core::config::InstallerConfig;
use crate::core::progress::{EventSender, InstallEvent, Progress};
use crate::error::{InstallerError, Result};
use futures_util::{Stream, StreamExt};
use reqwest::header::{HeaderMap, CONTENT_LENGTH, ETAG, LAST_MODIFIED};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// Result of probing the archive URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateCheck {
    pub available: bool,
    pub status: u16,
    pub content_length: Option<u64>,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

pub struct Downloader {
    client: reqwest::Client,
    chunk_size: usize,
}

impl Downloader {
    pub fn new(config: &InstallerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            chunk_size: config.chunk_size.max(1),
        })
    }

    /// Streams `url` into `destination`, reporting progress after every chunk.
    /// Returns the number of bytes written.
    pub async fn download(
        &self,
        url: &str,
        destination: &Path,
        events: &EventSender,
    ) -> Result<u64> {
        log::info!("Downloading {url} to {}", destination.display());
        events.send(InstallEvent::Downloading { total_bytes: None });

        let response = self.client.get(url).send().await?.error_for_status()?;
        let total_bytes = header_content_length(response.headers());
        match total_bytes {
            Some(total) => {
                log::debug!("Server declared {total} bytes");
                events.send(InstallEvent::Downloading {
                    total_bytes: Some(total),
                });
            }
            None => log::debug!("No content length, progress is indeterminate"),
        }

        let written = write_stream(
            response.bytes_stream(),
            total_bytes,
            destination,
            self.chunk_size,
            events,
        )
        .await?;

        log::info!("Downloaded {written} bytes");
        Ok(written)
    }

    /// HEAD probe against `url`. Any 2xx counts as an available update since
    /// there is no installed version to compare against.
    pub async fn check_for_update(&self, url: &str) -> Result<UpdateCheck> {
        log::info!("Probing {url}");
        let response = self.client.head(url).send().await?;
        let status = response.status();
        let headers = response.headers();

        let check = UpdateCheck {
            available: status.is_success(),
            status: status.as_u16(),
            content_length: header_content_length(headers),
            etag: header_string(headers, ETAG),
            last_modified: header_string(headers, LAST_MODIFIED),
        };
        log::debug!("Update probe result: {check:?}");
        Ok(check)
    }
}

/// Writes `stream` to `destination` in slices of at most `chunk_size` bytes.
///
/// On a stream error the bytes received so far are flushed and left on disk.
/// A body shorter than `total_bytes` is reported as a network error.
pub async fn write_stream<S, B, E>(
    mut stream: S,
    total_bytes: Option<u64>,
    destination: &Path,
    chunk_size: usize,
    events: &EventSender,
) -> Result<u64>
where
    S: Stream<Item = std::result::Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    if let Some(parent) = destination.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| InstallerError::from_io(e, parent))?;
    }

    let mut file = tokio::fs::File::create(destination)
        .await
        .map_err(|e| InstallerError::from_io(e, destination))?;
    let mut bytes_read: u64 = 0;

    while let Some(item) = stream.next().await {
        let chunk = match item {
            Ok(chunk) => chunk,
            Err(e) => {
                file.flush().await?;
                log::error!("Download interrupted after {bytes_read} bytes: {e}");
                return Err(InstallerError::network(format!(
                    "download interrupted after {bytes_read} bytes: {e}"
                )));
            }
        };

        for piece in chunk.as_ref().chunks(chunk_size.max(1)) {
            file.write_all(piece).await?;
            bytes_read += piece.len() as u64;
            events.send(InstallEvent::Progress {
                bytes_read,
                total_bytes,
                progress: Progress::from_bytes(bytes_read, total_bytes),
            });
        }
    }

    file.flush().await?;
    file.sync_all().await?;

    if let Some(total) = total_bytes {
        if bytes_read != total {
            return Err(InstallerError::network(format!(
                "incomplete download: received {bytes_read} of {total} bytes"
            )));
        }
    }

    Ok(bytes_read)
}

fn header_content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}

fn header_string(headers: &HeaderMap, name: reqwest::header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}
