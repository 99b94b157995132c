// ─── Self Updater ───
// Linear state machine run at startup, before anything else: check the
// release feed, elevate if the install location demands it, download,
// swap the application tree, relaunch.

pub mod feed;
pub mod version;

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::core::downloader::Downloader;
use crate::core::error::{LauncherError, LauncherResult};
use feed::ReleaseAsset;

/// Staging directory under the application root.
const STAGING_DIR: &str = "temp_update";

/// Entries in the application root the updater never touches: its own
/// restart path and uninstaller artifacts. Deleting these would strand
/// the user mid-update.
const PRESERVED_ENTRIES: &[&str] = &["bin", "app", STAGING_DIR, "unins000.exe", "unins000.dat"];

/// Percentage ceiling while downloading; headroom stays visible for the
/// extraction/install phase.
const DOWNLOAD_PERCENT_CAP: u8 = 90;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateState {
    Idle,
    Checking,
    UpdateAvailable { version: String, url: String },
    AwaitingPrivilege,
    Downloading(u8),
    Installing,
    /// Terminal but non-fatal: startup continues on the old version.
    Failed(String),
    Complete,
}

/// State sink, implemented by the splash UI adapter or a logger.
pub trait UpdateObserver: Send + Sync {
    fn on_state(&self, state: &UpdateState);
}

/// What the caller does next.
#[derive(Debug, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Already current; continue normal startup.
    UpToDate,
    /// Files swapped; relaunch with `--Launcher --UpdaterVer <version>`
    /// and exit.
    Applied { version: String },
    /// An elevated instance was started; this process must exit.
    Elevating,
    /// Check or install failed; continue normal startup on the old
    /// version.
    Skipped(String),
}

pub struct SelfUpdater {
    client: reqwest::Client,
    feed_url: String,
    app_root: PathBuf,
    current_version: String,
}

impl SelfUpdater {
    pub fn new(
        client: reqwest::Client,
        feed_url: String,
        app_root: PathBuf,
        current_version: String,
    ) -> Self {
        Self {
            client,
            feed_url,
            app_root,
            current_version,
        }
    }

    pub async fn run(&self, observer: &dyn UpdateObserver) -> UpdateOutcome {
        observer.on_state(&UpdateState::Checking);

        let release = match feed::fetch_latest(&self.client, &self.feed_url).await {
            Ok(release) => release,
            Err(err) => return fail(observer, format!("Update check failed: {err}")),
        };

        if !version::is_newer(&release.tag_name, &self.current_version) {
            info!(
                "Launcher is up to date ({} vs feed {})",
                self.current_version, release.tag_name
            );
            observer.on_state(&UpdateState::Complete);
            return UpdateOutcome::UpToDate;
        }

        let Some(asset) = feed::platform_asset(&release) else {
            return fail(
                observer,
                format!(
                    "Release {} has no {} asset",
                    release.tag_name,
                    feed::platform_asset_suffix()
                ),
            );
        };
        let asset = asset.clone();
        let new_version = release.tag_name.trim_start_matches('v').to_string();
        info!(
            "Update available: {} -> {new_version}",
            self.current_version
        );
        observer.on_state(&UpdateState::UpdateAvailable {
            version: new_version.clone(),
            url: asset.browser_download_url.clone(),
        });

        if !can_modify(&self.app_root) {
            #[cfg(target_os = "windows")]
            {
                observer.on_state(&UpdateState::AwaitingPrivilege);
                return match relaunch_elevated() {
                    Ok(()) => UpdateOutcome::Elevating,
                    Err(err) => fail(observer, format!("Elevation failed: {err}")),
                };
            }
            #[cfg(not(target_os = "windows"))]
            {
                return fail(
                    observer,
                    format!("Application directory {:?} is not writable", self.app_root),
                );
            }
        }

        match self.download_and_install(&asset, observer).await {
            Ok(()) => {
                observer.on_state(&UpdateState::Complete);
                UpdateOutcome::Applied {
                    version: new_version,
                }
            }
            Err(err) => {
                // No rollback: files already replaced stay replaced. The
                // preserve set keeps the restart path alive regardless.
                remove_staging(&self.app_root);
                fail(observer, format!("Could not apply update: {err}"))
            }
        }
    }

    async fn download_and_install(
        &self,
        asset: &ReleaseAsset,
        observer: &dyn UpdateObserver,
    ) -> LauncherResult<()> {
        let staging = self.app_root.join(STAGING_DIR);
        if staging.exists() {
            std::fs::remove_dir_all(&staging).map_err(|source| LauncherError::Io {
                path: staging.clone(),
                source,
            })?;
        }
        std::fs::create_dir_all(&staging).map_err(|source| LauncherError::Io {
            path: staging.clone(),
            source,
        })?;

        let zip_path = staging.join("update.zip");
        let fallback_total = asset.size;
        observer.on_state(&UpdateState::Downloading(0));

        let downloader = Downloader::new(self.client.clone());
        downloader
            .download_file_with_progress(&asset.browser_download_url, &zip_path, None, |p| {
                let total = p.total_bytes.unwrap_or(fallback_total);
                observer.on_state(&UpdateState::Downloading(download_percent(
                    p.bytes_downloaded,
                    total,
                )));
                Ok(())
            })
            .await?;

        observer.on_state(&UpdateState::Installing);

        let root = self.app_root.clone();
        let own_file = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.file_name().map(|n| n.to_os_string()));
        tokio::task::spawn_blocking(move || -> LauncherResult<()> {
            let staging = root.join(STAGING_DIR);
            extract_archive(&staging.join("update.zip"), &staging)?;
            apply_staged_tree(&root, &staging, own_file.as_deref())?;
            std::fs::remove_dir_all(&staging).map_err(|source| LauncherError::Io {
                path: staging,
                source,
            })?;
            Ok(())
        })
        .await
        .map_err(|err| LauncherError::Update(format!("Install task failed: {err}")))?
    }
}

fn fail(observer: &dyn UpdateObserver, message: String) -> UpdateOutcome {
    warn!("{message}; continuing startup on the current version");
    observer.on_state(&UpdateState::Failed(message.clone()));
    UpdateOutcome::Skipped(message)
}

/// Download percentage, capped so the bar visibly leaves room for the
/// install phase.
fn download_percent(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    (done.saturating_mul(100) / total).min(DOWNLOAD_PERCENT_CAP as u64) as u8
}

/// Self-modification precondition: can this process write into the
/// application root right now?
fn can_modify(dir: &Path) -> bool {
    let probe = dir.join(".nocturne-write-probe");
    match std::fs::write(&probe, b"probe") {
        Ok(()) => {
            let _ = std::fs::remove_file(&probe);
            true
        }
        Err(_) => false,
    }
}

fn extract_archive(zip_path: &Path, dest: &Path) -> LauncherResult<()> {
    let file = std::fs::File::open(zip_path).map_err(|source| LauncherError::Io {
        path: zip_path.to_path_buf(),
        source,
    })?;
    let mut archive = zip::ZipArchive::new(file)?;
    archive.extract(dest)?;
    Ok(())
}

/// Replace the live application tree with the staged one. Not
/// transactional: the removal and copy phases run in place, and a
/// failure in between leaves a mixed tree. Preserved entries and the
/// updater's own file are never removed.
fn apply_staged_tree(
    root: &Path,
    staging: &Path,
    own_file: Option<&OsStr>,
) -> LauncherResult<()> {
    for entry in std::fs::read_dir(root).map_err(|source| LauncherError::Io {
        path: root.to_path_buf(),
        source,
    })? {
        let Ok(entry) = entry else { continue };
        let name = entry.file_name();
        if PRESERVED_ENTRIES.iter().any(|keep| name == *keep) {
            continue;
        }
        if own_file.is_some_and(|own| name.as_os_str() == own) {
            continue;
        }

        let path = entry.path();
        let removed = if path.is_dir() {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        };
        if let Err(err) = removed {
            warn!("Could not remove {path:?} during update: {err}");
        }
    }

    for entry in std::fs::read_dir(staging).map_err(|source| LauncherError::Io {
        path: staging.to_path_buf(),
        source,
    })? {
        let Ok(entry) = entry else { continue };
        let name = entry.file_name();
        if name == "update.zip" {
            continue;
        }

        let source_path = entry.path();
        let dest_path = root.join(&name);
        if source_path.is_dir() {
            copy_dir_recursive(&source_path, &dest_path)?;
        } else {
            if dest_path.exists() {
                let _ = std::fs::remove_file(&dest_path);
            }
            std::fs::copy(&source_path, &dest_path).map_err(|source| LauncherError::Io {
                path: dest_path.clone(),
                source,
            })?;
        }
    }

    Ok(())
}

fn copy_dir_recursive(source: &Path, destination: &Path) -> LauncherResult<()> {
    std::fs::create_dir_all(destination).map_err(|io| LauncherError::Io {
        path: destination.to_path_buf(),
        source: io,
    })?;

    for entry in std::fs::read_dir(source).map_err(|io| LauncherError::Io {
        path: source.to_path_buf(),
        source: io,
    })? {
        let entry = entry.map_err(|io| LauncherError::Io {
            path: source.to_path_buf(),
            source: io,
        })?;
        let src_path = entry.path();
        let dst_path = destination.join(entry.file_name());

        if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            if dst_path.exists() {
                let _ = std::fs::remove_file(&dst_path);
            }
            std::fs::copy(&src_path, &dst_path).map_err(|io| LauncherError::Io {
                path: dst_path.clone(),
                source: io,
            })?;
        }
    }

    Ok(())
}

fn remove_staging(root: &Path) {
    let staging = root.join(STAGING_DIR);
    if staging.exists() {
        if let Err(err) = std::fs::remove_dir_all(&staging) {
            warn!("Could not clean update staging dir: {err}");
        }
    }
}

/// Start the main application with the just-updated marker and version.
pub fn relaunch_main(new_version: &str) -> LauncherResult<()> {
    let exe = std::env::current_exe().map_err(|source| LauncherError::Io {
        path: PathBuf::from("<current_exe>"),
        source,
    })?;
    std::process::Command::new(exe)
        .args(["--Launcher", "--UpdaterVer", new_version])
        .spawn()
        .map_err(|err| LauncherError::Update(format!("Could not relaunch: {err}")))?;
    Ok(())
}

#[cfg(target_os = "windows")]
fn relaunch_elevated() -> LauncherResult<()> {
    let exe = std::env::current_exe().map_err(|source| LauncherError::Io {
        path: PathBuf::from("<current_exe>"),
        source,
    })?;
    let quote = |value: &str| format!("'{}'", value.replace('\'', "''"));

    let args: Vec<String> = std::env::args().skip(1).collect();
    let args_literal = if args.is_empty() {
        "@()".to_string()
    } else {
        let rendered = args
            .iter()
            .map(|arg| quote(arg))
            .collect::<Vec<_>>()
            .join(", ");
        format!("@({rendered})")
    };

    let script = format!(
        "$ErrorActionPreference='Stop'; Start-Process -FilePath {} -ArgumentList {} -Verb RunAs",
        quote(exe.to_string_lossy().as_ref()),
        args_literal,
    );

    let status = std::process::Command::new("powershell")
        .args(["-NoProfile", "-ExecutionPolicy", "Bypass", "-Command", &script])
        .status()
        .map_err(|err| LauncherError::Update(format!("Could not request elevation: {err}")))?;

    if !status.success() {
        return Err(LauncherError::Update(
            "Elevation request was rejected".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn download_percent_caps_below_completion() {
        assert_eq!(download_percent(0, 100), 0);
        assert_eq!(download_percent(50, 100), 50);
        assert_eq!(download_percent(100, 100), DOWNLOAD_PERCENT_CAP);
        assert_eq!(download_percent(99, 100), DOWNLOAD_PERCENT_CAP);
        assert_eq!(download_percent(10, 0), 0);
    }

    #[test]
    fn apply_preserves_runtime_and_uninstaller_entries() {
        let root = tempfile::tempdir().unwrap();

        std::fs::create_dir(root.path().join("bin")).unwrap();
        std::fs::write(root.path().join("bin").join("loader"), "loader").unwrap();
        std::fs::create_dir(root.path().join("app")).unwrap();
        std::fs::write(root.path().join("app").join("app.json"), "{}").unwrap();
        std::fs::write(root.path().join("unins000.exe"), "uninstaller").unwrap();
        std::fs::write(root.path().join("nocturne.exe"), "running updater").unwrap();
        std::fs::write(root.path().join("stale.txt"), "old").unwrap();
        std::fs::create_dir(root.path().join("stale-dir")).unwrap();

        let staging = root.path().join(STAGING_DIR);
        std::fs::create_dir(&staging).unwrap();
        std::fs::write(staging.join("update.zip"), "archive").unwrap();
        std::fs::write(staging.join("fresh.txt"), "new").unwrap();
        std::fs::create_dir(staging.join("assets")).unwrap();
        std::fs::write(staging.join("assets").join("icon.png"), "png").unwrap();

        apply_staged_tree(root.path(), &staging, Some(OsStr::new("nocturne.exe"))).unwrap();

        assert!(root.path().join("bin").join("loader").exists());
        assert!(root.path().join("app").join("app.json").exists());
        assert!(root.path().join("unins000.exe").exists());
        assert!(root.path().join("nocturne.exe").exists());
        assert!(!root.path().join("stale.txt").exists());
        assert!(!root.path().join("stale-dir").exists());
        assert!(root.path().join("fresh.txt").exists());
        assert!(root.path().join("assets").join("icon.png").exists());
        // The archive itself is never copied into the live tree.
        assert!(!root.path().join("update.zip").exists());
    }

    #[test]
    fn apply_overwrites_existing_files() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join("launcher.cfg"), "old").unwrap();

        let staging = root.path().join(STAGING_DIR);
        std::fs::create_dir(&staging).unwrap();
        std::fs::write(staging.join("launcher.cfg"), "new").unwrap();

        apply_staged_tree(root.path(), &staging, None).unwrap();
        assert_eq!(
            std::fs::read_to_string(root.path().join("launcher.cfg")).unwrap(),
            "new"
        );
    }

    #[test]
    fn extract_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("update.zip");

        let file = std::fs::File::create(&zip_path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        writer.start_file("readme.txt", options).unwrap();
        writer.write_all(b"hello").unwrap();
        writer.add_directory("data", options).unwrap();
        writer.start_file("data/blob.bin", options).unwrap();
        writer.write_all(&[0u8, 1, 2]).unwrap();
        writer.finish().unwrap();

        let out = dir.path().join("out");
        extract_archive(&zip_path, &out).unwrap();
        assert_eq!(
            std::fs::read_to_string(out.join("readme.txt")).unwrap(),
            "hello"
        );
        assert!(out.join("data").join("blob.bin").exists());
    }

    #[test]
    fn writable_probe_detects_permissions() {
        let dir = tempfile::tempdir().unwrap();
        assert!(can_modify(dir.path()));
        assert!(!can_modify(&dir.path().join("does-not-exist")));
    }
}
