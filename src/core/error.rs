use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the entire launcher backend.
/// Every module returns `Result<T, LauncherError>`.
#[derive(Debug, Error)]
pub enum LauncherError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    // ── Integrity ───────────────────────────────────────
    #[error("SHA-1 mismatch for {path:?}: expected {expected}, got {actual}")]
    Sha1Mismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Catalog ─────────────────────────────────────────
    #[error("Version not found in manifest: {0}")]
    VersionNotFound(String),

    // ── Install pipeline ────────────────────────────────
    #[error("Install error: {0}")]
    Install(String),

    #[error("An install job is already running")]
    InstallBusy,

    #[error("Install cancelled")]
    InstallCancelled,

    // ── Launch configuration ────────────────────────────
    #[error("No valid user selected")]
    NoValidUser,

    #[error("No Java executable found under {0:?}")]
    JavaNotFound(PathBuf),

    #[error("Game process spawn failed: {0}")]
    ProcessSpawn(String),

    #[error("A game process is already running")]
    GameRunning,

    // ── Self-update ─────────────────────────────────────
    #[error("Update error: {0}")]
    Update(String),

    // ── Archive ─────────────────────────────────────────
    #[error("Zip extraction error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type LauncherResult<T> = Result<T, LauncherError>;

impl From<std::io::Error> for LauncherError {
    fn from(source: std::io::Error) -> Self {
        LauncherError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

