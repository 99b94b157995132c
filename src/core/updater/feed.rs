// ─── Release Feed ───
// GitHub latest-release document: tag plus downloadable assets.

use std::time::Duration;

use serde::Deserialize;

use crate::core::error::{LauncherError, LauncherResult};

pub const DEFAULT_RELEASE_FEED_URL: &str =
    "https://api.github.com/repos/nocturne-launcher/nocturne/releases/latest";

const FEED_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
pub struct ReleaseInfo {
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub browser_download_url: String,
    #[serde(default)]
    pub size: u64,
}

pub async fn fetch_latest(client: &reqwest::Client, url: &str) -> LauncherResult<ReleaseInfo> {
    let request = client.get(url).send();
    let response = tokio::time::timeout(FEED_TIMEOUT, request)
        .await
        .map_err(|_| LauncherError::Update("Release feed timed out".into()))??;

    let status = response.status();
    if !status.is_success() {
        return Err(LauncherError::DownloadFailed {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    Ok(response.json().await?)
}

/// Archive suffix published for this platform.
pub fn platform_asset_suffix() -> &'static str {
    if cfg!(target_os = "windows") {
        "-Win.zip"
    } else {
        "-Universal.zip"
    }
}

/// Pick the platform-appropriate asset by filename suffix.
pub fn platform_asset(release: &ReleaseInfo) -> Option<&ReleaseAsset> {
    let suffix = platform_asset_suffix();
    release.assets.iter().find(|asset| asset.name.ends_with(suffix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_release_document() {
        let release: ReleaseInfo = serde_json::from_str(
            r#"{
                "tag_name": "v1.3.0",
                "assets": [
                    {"name": "Nocturne-1.3.0-Win.zip",
                     "browser_download_url": "https://example.com/win.zip",
                     "size": 1024},
                    {"name": "Nocturne-1.3.0-Universal.zip",
                     "browser_download_url": "https://example.com/universal.zip",
                     "size": 2048}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(release.tag_name, "v1.3.0");
        assert_eq!(release.assets.len(), 2);
    }

    #[test]
    fn asset_selection_matches_platform_suffix() {
        let release: ReleaseInfo = serde_json::from_str(
            r#"{
                "tag_name": "1.3.0",
                "assets": [
                    {"name": "Nocturne-1.3.0-Win.zip",
                     "browser_download_url": "https://example.com/win.zip"},
                    {"name": "Nocturne-1.3.0-Universal.zip",
                     "browser_download_url": "https://example.com/universal.zip"}
                ]
            }"#,
        )
        .unwrap();

        let asset = platform_asset(&release).unwrap();
        assert!(asset.name.ends_with(platform_asset_suffix()));
    }

    #[test]
    fn missing_platform_asset_is_none() {
        let release: ReleaseInfo = serde_json::from_str(
            r#"{"tag_name": "1.3.0",
                "assets": [{"name": "Source.tar.gz",
                            "browser_download_url": "https://example.com/src"}]}"#,
        )
        .unwrap();
        assert!(platform_asset(&release).is_none());
    }
}
