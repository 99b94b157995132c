// ─── Install Backend Boundary ───
// The game-install machinery is a collaborator behind a trait: the
// pipeline drives it, tests substitute it.

use std::path::Path;

use async_trait::async_trait;

use crate::core::error::LauncherResult;
use crate::core::launch::LaunchOptions;

/// Progress sink for one install operation. Implemented per consumer
/// (UI adapter, headless logger, test double).
pub trait InstallObserver: Send + Sync {
    /// Human-readable step description ("Downloading client jar").
    fn on_status(&self, text: &str);

    /// Step-level progress, `current` out of `max`.
    fn on_progress(&self, current: u32, max: u32);

    /// Byte-level progress of the file currently transferring. Returning
    /// an error aborts the transfer; the pipeline uses this to deliver
    /// cooperative cancellation into the backend.
    fn on_file_progress(
        &self,
        name: &str,
        current: u64,
        total: Option<u64>,
        rate: f64,
    ) -> LauncherResult<()>;

    /// Terminal callback, fired exactly once per job by the pipeline.
    /// `success` is false for both cancellation and failure.
    fn on_done(&self, success: bool);
}

/// The install/launch-command backend.
#[async_trait]
pub trait InstallBackend: Send + Sync {
    /// Download or repair a version's files under `target_dir`. Errors
    /// returned by the observer's file-progress hook must propagate
    /// unchanged so a cancel stays distinguishable from a failure.
    async fn install_version(
        &self,
        version_id: &str,
        target_dir: &Path,
        observer: &dyn InstallObserver,
    ) -> LauncherResult<()>;

    /// Assemble the full process argument vector (java executable first)
    /// for an installed version.
    fn build_launch_command(
        &self,
        version_id: &str,
        target_dir: &Path,
        options: &LaunchOptions,
    ) -> LauncherResult<Vec<String>>;
}
