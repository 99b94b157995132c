// ─── Launch Options ───
// Resolves identity, merges JVM arguments and the Java override into the
// parameter set handed to the launch command builder.

use std::path::{Path, PathBuf};

use tracing::warn;
use uuid::Uuid;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::launch::identity::resolve_identity;
use crate::core::launch::java::find_java_executable;
use crate::core::settings::{JavaMode, Settings};

pub const MAX_HEAP_FLAG: &str = "-Xmx";
pub const MIN_HEAP_FLAG: &str = "-Xms";
const DEFAULT_MIN_HEAP: &str = "-Xms512M";

/// Fully-resolved launch parameters. Built fresh per launch attempt,
/// never persisted as a whole.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub username: String,
    pub identity: Uuid,
    pub token: String,
    pub jvm_arguments: Vec<String>,
    pub executable_path: Option<PathBuf>,
}

/// Build launch options for `username` under the current settings.
///
/// Fails with `NoValidUser` for a blank username and `JavaNotFound` when
/// a custom Java folder holds no usable executable. A degraded identity
/// lookup is not an error.
pub async fn build_launch_options(
    client: &reqwest::Client,
    username: &str,
    settings: &Settings,
) -> LauncherResult<LaunchOptions> {
    let username = username.trim();
    if username.is_empty() {
        return Err(LauncherError::NoValidUser);
    }

    let identity = resolve_identity(client, username).await;
    let token = identity.to_string();
    let jvm_arguments = merge_jvm_args(&settings.jvm_args, settings.effective_ram_mb());
    let executable_path = resolve_java_override(settings)?;

    Ok(LaunchOptions {
        username: username.to_string(),
        identity,
        token,
        jvm_arguments,
        executable_path,
    })
}

/// Merge user-supplied JVM arguments with the built-in defaults.
///
/// The launcher owns max heap: user `-Xmx` flags are dropped with a
/// warning. A user `-Xms` flag is kept and suppresses the default min
/// heap. Everything else passes through verbatim, in order, with the
/// defaults appended last.
pub fn merge_jvm_args(user_args: &[String], ram_mb: u32) -> Vec<String> {
    let mut merged = Vec::with_capacity(user_args.len() + 2);
    let mut min_heap_overridden = false;

    for arg in user_args {
        if arg.starts_with(MAX_HEAP_FLAG) {
            warn!("Ignoring user-provided {MAX_HEAP_FLAG} argument: {arg}");
        } else if arg.starts_with(MIN_HEAP_FLAG) {
            merged.push(arg.clone());
            min_heap_overridden = true;
        } else {
            merged.push(arg.clone());
        }
    }

    merged.push(format!("{MAX_HEAP_FLAG}{ram_mb}M"));
    if !min_heap_overridden {
        merged.push(DEFAULT_MIN_HEAP.to_string());
    }

    merged
}

fn resolve_java_override(settings: &Settings) -> LauncherResult<Option<PathBuf>> {
    match settings.java_mode {
        JavaMode::Default => Ok(None),
        JavaMode::Custom => {
            let java_dir = Path::new(&settings.java_path);
            if settings.java_path.trim().is_empty() || !java_dir.is_dir() {
                return Err(LauncherError::JavaNotFound(java_dir.to_path_buf()));
            }
            find_java_executable(java_dir)
                .map(Some)
                .ok_or_else(|| LauncherError::JavaNotFound(java_dir.to_path_buf()))
        }
    }
}
