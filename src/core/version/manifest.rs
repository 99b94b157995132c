// ─── Version Manifest ───
// Fetches the Mojang version manifest and keeps a verbatim on-disk copy
// so the catalog still works offline.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::error::{LauncherError, LauncherResult};

const VERSION_MANIFEST_URL: &str =
    "https://piston-meta.mojang.com/mc/game/version_manifest_v2.json";

/// Remote version classification, as published by the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionKind {
    Release,
    Snapshot,
    OldBeta,
    OldAlpha,
}

impl VersionKind {
    /// Capitalized label used in version list entries.
    pub fn label(&self) -> &'static str {
        match self {
            VersionKind::Release => "Release",
            VersionKind::Snapshot => "Snapshot",
            VersionKind::OldBeta => "Old_beta",
            VersionKind::OldAlpha => "Old_alpha",
        }
    }
}

/// Top-level manifest document.
#[derive(Debug, Serialize, Deserialize)]
pub struct VersionManifest {
    pub versions: Vec<RemoteVersion>,
}

/// A single entry in the manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteVersion {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: VersionKind,
    #[serde(rename = "releaseTime")]
    pub release_time: DateTime<Utc>,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
}

impl VersionManifest {
    /// Fetch the manifest using the shared HTTP client.
    pub async fn fetch(client: &reqwest::Client) -> LauncherResult<Self> {
        info!("Fetching Minecraft version manifest...");

        let manifest: VersionManifest = client
            .get(VERSION_MANIFEST_URL)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        info!("Loaded {} versions from manifest", manifest.versions.len());
        Ok(manifest)
    }

    /// Fetch with an on-disk fallback: a successful fetch refreshes the
    /// cache, a failed one reads it. `None` means offline with no cache.
    pub async fn fetch_or_cached(
        client: &reqwest::Client,
        cache_file: &Path,
    ) -> LauncherResult<Option<Self>> {
        match Self::fetch(client).await {
            Ok(manifest) => {
                if let Err(err) = manifest.store_cache(cache_file) {
                    warn!("Could not cache version manifest: {err}");
                }
                Ok(Some(manifest))
            }
            Err(err) => {
                warn!("Manifest fetch failed ({err}), trying cache");
                Ok(Self::load_cached(cache_file))
            }
        }
    }

    pub fn load_cached(cache_file: &Path) -> Option<Self> {
        let raw = std::fs::read_to_string(cache_file).ok()?;
        let versions: Vec<RemoteVersion> = serde_json::from_str(&raw).ok()?;
        Some(VersionManifest { versions })
    }

    pub fn store_cache(&self, cache_file: &Path) -> LauncherResult<()> {
        if let Some(parent) = cache_file.parent() {
            std::fs::create_dir_all(parent).map_err(|source| LauncherError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string(&self.versions)?;
        std::fs::write(cache_file, json).map_err(|source| LauncherError::Io {
            path: cache_file.to_path_buf(),
            source,
        })
    }

    /// Find a specific entry by id (e.g. "1.20.4").
    pub fn find_version(&self, id: &str) -> Option<&RemoteVersion> {
        self.versions.iter().find(|v| v.id == id)
    }

    /// First release-typed entry in manifest order is the latest release.
    pub fn latest_release_id(&self) -> Option<&str> {
        self.versions
            .iter()
            .find(|v| v.kind == VersionKind::Release)
            .map(|v| v.id.as_str())
    }
}
