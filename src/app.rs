// ─── Control-Thread Orchestration ───
// Wires the core components together for one launcher run. Worker
// failures come back as events or results and reset the flow to ready;
// nothing here unwinds across a thread boundary.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use crate::core::cli::LauncherArgs;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::build_http_client;
use crate::core::install::{InstallBackend, InstallObserver, InstallPipeline, VanillaBackend};
use crate::core::launch::build_launch_options;
use crate::core::paths::{self, RuntimePaths};
use crate::core::process::{GameEvent, ProcessSupervisor, Termination};
use crate::core::settings::{JsonSettingsStore, SettingsStore, UsersFile};
use crate::core::updater::feed::DEFAULT_RELEASE_FEED_URL;
use crate::core::updater::{SelfUpdater, UpdateObserver, UpdateOutcome, UpdateState};
use crate::core::version::{
    display_label, is_version_installed, resolve_selection, VersionCatalog,
};

pub struct Launcher {
    client: reqwest::Client,
    settings: Arc<dyn SettingsStore>,
    users: UsersFile,
    catalog: VersionCatalog,
    backend: Arc<dyn InstallBackend>,
    pipeline: InstallPipeline,
    supervisor: ProcessSupervisor,
}

impl Launcher {
    pub fn new(paths: &RuntimePaths) -> LauncherResult<Self> {
        let client = build_http_client()?;
        let settings: Arc<dyn SettingsStore> =
            Arc::new(JsonSettingsStore::new(paths.settings_file()));
        let users = UsersFile::new(paths.users_file());
        let catalog = VersionCatalog::new(client.clone(), paths.manifest_cache_file());
        let backend: Arc<dyn InstallBackend> = Arc::new(VanillaBackend::new(
            client.clone(),
            paths.manifest_cache_file(),
        ));
        let pipeline = InstallPipeline::new(Arc::clone(&backend));

        Ok(Self {
            client,
            settings,
            users,
            catalog,
            backend,
            pipeline,
            supervisor: ProcessSupervisor::new(),
        })
    }

    /// Full catalog → install → launch → supervise sequence. Returns
    /// `Ok(())` both on a finished game and on a failed install (the
    /// failure was already surfaced); hard configuration errors
    /// propagate.
    pub async fn run_launch_flow(&self) -> LauncherResult<()> {
        let settings = self.settings.load();

        let username = settings
            .username
            .clone()
            .filter(|u| !u.trim().is_empty())
            .or_else(|| {
                self.users
                    .load()
                    .into_iter()
                    .find(|u| !u.trim().is_empty())
            })
            .ok_or(LauncherError::NoValidUser)?;

        let game_dir = settings.game_dir();
        let (entries, latest) = self.catalog.refresh(&game_dir, &settings.filters).await?;

        let selection =
            resolve_selection(&entries, settings.version_id.as_deref(), latest.as_deref())
                .ok_or_else(|| LauncherError::Other("No version available to launch".into()))?;
        let entry = &entries[selection];
        if entry.is_offline_sentinel() {
            return Err(LauncherError::Other(
                "Offline with no cached versions".into(),
            ));
        }
        let version_id = entry.id.clone();
        info!("Selected version: {}", display_label(entry));

        if settings.version_id.as_deref() != Some(version_id.as_str())
            || settings.username.as_deref() != Some(username.as_str())
        {
            let mut updated = settings.clone();
            updated.version_id = Some(version_id.clone());
            updated.username = Some(username.clone());
            self.settings.save(&updated)?;
        }

        if settings.skip_version_check && is_version_installed(&game_dir, &version_id) {
            // Trust-the-cache optimization: the metadata file existing is
            // taken as install integrity. A corrupt install shows up as a
            // game crash, not here.
            info!("Skip version verification enabled, launching instantly");
        } else {
            let observer = Arc::new(ConsoleInstallObserver::default());
            let handle =
                self.pipeline
                    .start(&version_id, game_dir.clone(), observer.clone())?;
            handle.finished().await;
            if !observer.succeeded() {
                warn!("Install of {version_id} did not complete, not launching");
                return Ok(());
            }
        }

        let options = build_launch_options(&self.client, &username, &settings).await?;
        let argv = self
            .backend
            .build_launch_command(&version_id, &game_dir, &options)?;
        info!("Launching with command: {}", argv.join(" "));

        let (events_tx, mut events_rx) = tokio::sync::mpsc::unbounded_channel();
        let _game = self.supervisor.spawn(&argv, &game_dir, events_tx)?;

        while let Some(event) = events_rx.recv().await {
            match event {
                GameEvent::Log(line) => println!("{line}"),
                GameEvent::Crashed { exit_code, report } => match report {
                    Some(path) => {
                        warn!("Game crashed (code {exit_code:?}), report: {}", path.display())
                    }
                    None => warn!("Game crashed (code {exit_code:?}), no report found"),
                },
                GameEvent::Exited {
                    termination,
                    exit_code,
                } => {
                    match termination {
                        Termination::Finished => info!("Game finished normally"),
                        Termination::Killed => info!("Game killed by user"),
                        Termination::Crashed => {
                            warn!("Game terminated abnormally (code {exit_code:?})")
                        }
                    }
                    break;
                }
            }
        }

        Ok(())
    }
}

/// Run the self-update sequence for this process. Skipped entirely when
/// `--Launcher` marks the process as freshly updated.
pub async fn run_self_update(
    client: &reqwest::Client,
    args: &LauncherArgs,
) -> LauncherResult<UpdateOutcome> {
    let app_root = paths::app_root()?;
    let updater = SelfUpdater::new(
        client.clone(),
        DEFAULT_RELEASE_FEED_URL.to_string(),
        app_root,
        args.current_version().to_string(),
    );
    Ok(updater.run(&ConsoleUpdateObserver::default()).await)
}

// ── Headless observers ──────────────────────────────────

/// Install progress sink for the console flow.
#[derive(Default)]
pub struct ConsoleInstallObserver {
    success: AtomicBool,
    finished: AtomicBool,
}

impl ConsoleInstallObserver {
    pub fn succeeded(&self) -> bool {
        self.finished.load(Ordering::SeqCst) && self.success.load(Ordering::SeqCst)
    }
}

impl InstallObserver for ConsoleInstallObserver {
    fn on_status(&self, text: &str) {
        info!("{text}");
    }

    fn on_progress(&self, current: u32, max: u32) {
        debug!("Install step {current}/{max}");
    }

    fn on_file_progress(
        &self,
        name: &str,
        current: u64,
        total: Option<u64>,
        rate: f64,
    ) -> LauncherResult<()> {
        match total {
            Some(total) => debug!(
                "Downloading: {name} ({:.2}/{:.2} MB) @ {}",
                current as f64 / 1_048_576.0,
                total as f64 / 1_048_576.0,
                format_rate(rate)
            ),
            None => debug!(
                "Downloading: {name} ({:.2} MB) @ {}",
                current as f64 / 1_048_576.0,
                format_rate(rate)
            ),
        }
        Ok(())
    }

    fn on_done(&self, success: bool) {
        self.success.store(success, Ordering::SeqCst);
        self.finished.store(true, Ordering::SeqCst);
    }
}

/// Update state sink for the console flow; repeated download ticks at
/// the same percentage are dropped.
#[derive(Default)]
pub struct ConsoleUpdateObserver {
    last_percent: Mutex<Option<u8>>,
}

impl UpdateObserver for ConsoleUpdateObserver {
    fn on_state(&self, state: &UpdateState) {
        match state {
            UpdateState::Idle => {}
            UpdateState::Checking => info!("Checking for updates..."),
            UpdateState::UpdateAvailable { version, url } => {
                info!("Update {version} available from {url}")
            }
            UpdateState::AwaitingPrivilege => {
                info!("Update requires elevated privileges, relaunching...")
            }
            UpdateState::Downloading(percent) => {
                let mut last = self.last_percent.lock().expect("observer lock poisoned");
                if *last != Some(*percent) {
                    *last = Some(*percent);
                    info!("Downloading update... {percent}%");
                }
            }
            UpdateState::Installing => info!("Installing update..."),
            UpdateState::Failed(message) => warn!("Update failed: {message}"),
            UpdateState::Complete => info!("Update check complete"),
        }
    }
}

fn format_rate(bytes_per_sec: f64) -> String {
    if bytes_per_sec < 1024.0 {
        format!("{bytes_per_sec:.1} B/s")
    } else if bytes_per_sec < 1024.0 * 1024.0 {
        format!("{:.1} KB/s", bytes_per_sec / 1024.0)
    } else {
        format!("{:.2} MB/s", bytes_per_sec / (1024.0 * 1024.0))
    }
}
