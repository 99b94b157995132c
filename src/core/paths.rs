use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::core::error::{LauncherError, LauncherResult};

const APP_DIR_NAME: &str = "Nocturne";

/// Resolved filesystem layout for one launcher run.
#[derive(Debug, Clone)]
pub struct RuntimePaths {
    app_data_dir: PathBuf,
    tmp_dir: PathBuf,
}

impl RuntimePaths {
    /// Root for settings, users, cached manifest and logs.
    pub fn app_data_dir(&self) -> &Path {
        &self.app_data_dir
    }

    /// Scratch directory, wiped at every startup.
    pub fn tmp_dir(&self) -> &Path {
        &self.tmp_dir
    }

    pub fn settings_file(&self) -> PathBuf {
        self.app_data_dir.join("settings.json")
    }

    pub fn users_file(&self) -> PathBuf {
        self.app_data_dir.join("users.json")
    }

    pub fn manifest_cache_file(&self) -> PathBuf {
        self.app_data_dir.join("versions.json")
    }

    pub fn crash_log_dir(&self) -> PathBuf {
        self.app_data_dir.join("logs")
    }
}

static RUNTIME_PATHS: OnceLock<RuntimePaths> = OnceLock::new();

pub fn runtime_paths() -> LauncherResult<&'static RuntimePaths> {
    if let Some(paths) = RUNTIME_PATHS.get() {
        return Ok(paths);
    }

    let app_data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME);
    let tmp_dir = app_data_dir.join("tmp");

    create_dir_checked(&app_data_dir)?;
    create_dir_checked(&tmp_dir)?;

    let paths = RuntimePaths {
        app_data_dir,
        tmp_dir,
    };

    let _ = RUNTIME_PATHS.set(paths);
    Ok(RUNTIME_PATHS.get().expect("runtime paths set"))
}

/// Remove and recreate the scratch directory. Leftovers from a previous
/// run (mod installer jars, staged downloads) are never reused.
pub fn wipe_tmp_dir(paths: &RuntimePaths) -> LauncherResult<()> {
    let tmp = paths.tmp_dir();
    if tmp.exists() {
        std::fs::remove_dir_all(tmp).map_err(|source| LauncherError::Io {
            path: tmp.to_path_buf(),
            source,
        })?;
    }
    create_dir_checked(tmp)
}

/// Default `.minecraft` location for the current platform.
pub fn default_game_dir() -> PathBuf {
    if cfg!(target_os = "windows") {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".minecraft")
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("minecraft")
    } else {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".minecraft")
    }
}

/// Directory the self-updater replaces. When the executable is shipped
/// inside a `bin/` subdirectory the application root is its parent.
pub fn app_root() -> LauncherResult<PathBuf> {
    let exe = std::env::current_exe().map_err(|source| LauncherError::Io {
        path: PathBuf::from("<current_exe>"),
        source,
    })?;
    let parent = exe
        .parent()
        .ok_or_else(|| LauncherError::Other("Executable has no parent directory".into()))?;

    if parent.file_name().is_some_and(|name| name == "bin") {
        if let Some(root) = parent.parent() {
            return Ok(root.to_path_buf());
        }
    }
    Ok(parent.to_path_buf())
}

fn create_dir_checked(path: &Path) -> LauncherResult<()> {
    std::fs::create_dir_all(path).map_err(|source| LauncherError::Io {
        path: path.to_path_buf(),
        source,
    })
}
