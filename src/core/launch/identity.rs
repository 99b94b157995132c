// ─── Player Identity ───
// Online username→UUID lookup with a deterministic offline fallback.

use std::time::Duration;

use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use crate::core::error::{LauncherError, LauncherResult};

const PROFILE_URL: &str = "https://api.mojang.com/users/profiles/minecraft";

/// Short timeout: the lookup has a safe offline fallback, so a slow
/// identity service must not stall the launch.
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct ProfileResponse {
    id: String,
}

/// Resolve the player's UUID. Any lookup failure (network, non-200,
/// timeout, unparsable body) degrades to the offline derivation and is
/// logged only — it never blocks the launch.
pub async fn resolve_identity(client: &reqwest::Client, username: &str) -> Uuid {
    match lookup_online(client, username).await {
        Ok(uuid) => uuid,
        Err(err) => {
            warn!("Identity lookup degraded for {username}: {err}; using offline UUID");
            offline_uuid(username)
        }
    }
}

async fn lookup_online(client: &reqwest::Client, username: &str) -> LauncherResult<Uuid> {
    let request = client.get(format!("{PROFILE_URL}/{username}")).send();
    let response = tokio::time::timeout(LOOKUP_TIMEOUT, request)
        .await
        .map_err(|_| LauncherError::Other("Identity lookup timed out".into()))??;

    let status = response.status();
    if !status.is_success() {
        return Err(LauncherError::DownloadFailed {
            url: format!("{PROFILE_URL}/{username}"),
            status: status.as_u16(),
        });
    }

    let profile: ProfileResponse = response.json().await?;
    Uuid::parse_str(&profile.id)
        .map_err(|err| LauncherError::Other(format!("Malformed profile id: {err}")))
}

/// Deterministic pseudo-identity for offline play: a v3 namespace UUID
/// over `"OfflinePlayer:" + username`. Must be reproducible byte-for-byte
/// across runs so per-player save data keeps its association.
pub fn offline_uuid(username: &str) -> Uuid {
    Uuid::new_v3(
        &Uuid::NAMESPACE_URL,
        format!("OfflinePlayer:{username}").as_bytes(),
    )
}
