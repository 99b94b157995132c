// ─── Downloader ───
// SHA-1 validated streaming downloads with byte-level progress.

use std::path::Path;
use std::time::Instant;

use futures_util::StreamExt;
use reqwest::Client;
use sha1::{Digest, Sha1};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::core::error::{LauncherError, LauncherResult};

/// Byte-level progress of a single transfer.
#[derive(Debug, Clone, Copy)]
pub struct TransferProgress {
    pub bytes_downloaded: u64,
    pub total_bytes: Option<u64>,
    /// Average transfer rate in bytes per second since the request began.
    pub rate: f64,
}

pub struct Downloader {
    client: Client,
}

impl Downloader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Streaming download reporting progress per chunk. The callback may
    /// return an error to abort the transfer; the partial file is removed
    /// and the error propagated unchanged (this is the cancellation path).
    pub async fn download_file_with_progress<F>(
        &self,
        url: &str,
        dest: &Path,
        sha1_expected: Option<&str>,
        mut on_chunk: F,
    ) -> LauncherResult<()>
    where
        F: FnMut(TransferProgress) -> LauncherResult<()>,
    {
        ensure_parent(dest).await?;

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let total_bytes = response.content_length();
        let started = Instant::now();
        let mut hasher = Sha1::new();
        let mut downloaded: u64 = 0;

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|source| LauncherError::Io {
                path: dest.to_path_buf(),
                source,
            })?;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(err) => {
                    drop(file);
                    remove_partial(dest).await;
                    return Err(err.into());
                }
            };

            hasher.update(&chunk);
            if let Err(err) = file.write_all(&chunk).await {
                drop(file);
                remove_partial(dest).await;
                return Err(LauncherError::Io {
                    path: dest.to_path_buf(),
                    source: err,
                });
            }

            downloaded += chunk.len() as u64;
            let elapsed = started.elapsed().as_secs_f64().max(1e-3);
            let progress = TransferProgress {
                bytes_downloaded: downloaded,
                total_bytes,
                rate: downloaded as f64 / elapsed,
            };
            if let Err(err) = on_chunk(progress) {
                drop(file);
                remove_partial(dest).await;
                return Err(err);
            }
        }

        file.flush().await.map_err(|source| LauncherError::Io {
            path: dest.to_path_buf(),
            source,
        })?;
        drop(file);

        if let Some(expected) = sha1_expected {
            let actual = hex::encode(hasher.finalize());
            if actual != expected {
                remove_partial(dest).await;
                return Err(LauncherError::Sha1Mismatch {
                    path: dest.to_path_buf(),
                    expected: expected.to_string(),
                    actual,
                });
            }
        }

        debug!("Downloaded (streamed): {} -> {:?}", url, dest);
        Ok(())
    }

    /// Validate an existing file's SHA-1.
    pub async fn validate_sha1(path: &Path, expected: &str) -> LauncherResult<bool> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| LauncherError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let mut hasher = Sha1::new();
        hasher.update(&bytes);
        Ok(hex::encode(hasher.finalize()) == expected)
    }
}

async fn ensure_parent(dest: &Path) -> LauncherResult<()> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| LauncherError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
    }
    Ok(())
}

async fn remove_partial(dest: &Path) {
    let _ = tokio::fs::remove_file(dest).await;
}
