// ─── Install Pipeline ───
// One cancellable install job at a time. Cancellation is cooperative: a
// flag checked at every file-progress callback aborts the backend's
// transfer with a distinguishable signal.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::install::backend::{InstallBackend, InstallObserver};

/// Handle to a running install job. Cancelling is a request; completion
/// is acknowledged through the observer's `on_done`.
pub struct InstallHandle {
    version_id: String,
    cancelled: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl InstallHandle {
    pub fn version_id(&self) -> &str {
        &self.version_id
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Wait until the job reached its terminal callback.
    pub async fn finished(self) {
        let _ = self.task.await;
    }
}

pub struct InstallPipeline {
    backend: Arc<dyn InstallBackend>,
    active: Arc<Mutex<Option<String>>>,
}

impl InstallPipeline {
    pub fn new(backend: Arc<dyn InstallBackend>) -> Self {
        Self {
            backend,
            active: Arc::new(Mutex::new(None)),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.active.lock().expect("pipeline lock poisoned").is_some()
    }

    /// Start an install job. Fails with `InstallBusy` while another job
    /// is active; the caller cancels that one and awaits its `on_done`
    /// before retrying — the pipeline never queues.
    pub fn start(
        &self,
        version_id: &str,
        target_dir: PathBuf,
        observer: Arc<dyn InstallObserver>,
    ) -> LauncherResult<InstallHandle> {
        {
            let mut active = self.active.lock().expect("pipeline lock poisoned");
            if let Some(running) = active.as_deref() {
                warn!("Install of {running} still active, rejecting {version_id}");
                return Err(LauncherError::InstallBusy);
            }
            *active = Some(version_id.to_string());
        }

        let cancelled = Arc::new(AtomicBool::new(false));
        let backend = Arc::clone(&self.backend);
        let active = Arc::clone(&self.active);
        let job_version = version_id.to_string();
        let job_cancelled = Arc::clone(&cancelled);

        let task = tokio::spawn(async move {
            let guarded = CancelAwareObserver {
                inner: Arc::clone(&observer),
                cancelled: Arc::clone(&job_cancelled),
            };

            let result = backend
                .install_version(&job_version, &target_dir, &guarded)
                .await;

            active.lock().expect("pipeline lock poisoned").take();

            match result {
                Ok(()) if job_cancelled.load(Ordering::SeqCst) => {
                    info!("Install of {job_version} cancelled after completion");
                    observer.on_done(false);
                }
                Ok(()) => observer.on_done(true),
                Err(LauncherError::InstallCancelled) => {
                    info!("Install of {job_version} cancelled");
                    observer.on_done(false);
                }
                Err(err) => {
                    error!("Install of {job_version} failed: {err}");
                    observer.on_status(&format!("Install failed: {err}"));
                    observer.on_done(false);
                }
            }
        });

        Ok(InstallHandle {
            version_id: version_id.to_string(),
            cancelled,
            task,
        })
    }

    pub fn cancel(&self, handle: &InstallHandle) {
        handle.cancel();
    }
}

/// Observer wrapper that turns the cancellation flag into an abort at the
/// next file-progress callback.
struct CancelAwareObserver {
    inner: Arc<dyn InstallObserver>,
    cancelled: Arc<AtomicBool>,
}

impl InstallObserver for CancelAwareObserver {
    fn on_status(&self, text: &str) {
        self.inner.on_status(text);
    }

    fn on_progress(&self, current: u32, max: u32) {
        self.inner.on_progress(current, max);
    }

    fn on_file_progress(
        &self,
        name: &str,
        current: u64,
        total: Option<u64>,
        rate: f64,
    ) -> LauncherResult<()> {
        if self.cancelled.load(Ordering::SeqCst) {
            return Err(LauncherError::InstallCancelled);
        }
        self.inner.on_file_progress(name, current, total, rate)
    }

    fn on_done(&self, success: bool) {
        self.inner.on_done(success);
    }
}
