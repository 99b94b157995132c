// ─── Vanilla Backend ───
// Concrete install backend for unmodified game versions: version JSON
// plus client jar, both SHA-1 checked against the manifest chain.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::core::downloader::Downloader;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::install::backend::{InstallBackend, InstallObserver};
use crate::core::launch::LaunchOptions;
use crate::core::version::manifest::VersionManifest;

/// The subset of a version JSON the backend needs.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionPackage {
    pub main_class: String,
    pub downloads: PackageDownloads,
}

#[derive(Debug, Deserialize)]
pub struct PackageDownloads {
    pub client: DownloadArtifact,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadArtifact {
    pub sha1: String,
    pub size: u64,
    pub url: String,
}

pub struct VanillaBackend {
    client: reqwest::Client,
    downloader: Downloader,
    manifest_cache: PathBuf,
}

impl VanillaBackend {
    pub fn new(client: reqwest::Client, manifest_cache: PathBuf) -> Self {
        let downloader = Downloader::new(client.clone());
        Self {
            client,
            downloader,
            manifest_cache,
        }
    }

    fn version_dir(target_dir: &Path, version_id: &str) -> PathBuf {
        target_dir.join("versions").join(version_id)
    }

    fn version_json_path(target_dir: &Path, version_id: &str) -> PathBuf {
        Self::version_dir(target_dir, version_id).join(format!("{version_id}.json"))
    }

    fn version_jar_path(target_dir: &Path, version_id: &str) -> PathBuf {
        Self::version_dir(target_dir, version_id).join(format!("{version_id}.jar"))
    }

    async fn ensure_file(
        &self,
        url: &str,
        dest: &Path,
        sha1: Option<&str>,
        name: &str,
        observer: &dyn InstallObserver,
    ) -> LauncherResult<()> {
        if let Some(expected) = sha1 {
            if dest.exists() && Downloader::validate_sha1(dest, expected).await.unwrap_or(false) {
                debug!("{name} already valid, skipping download");
                return Ok(());
            }
        }

        self.downloader
            .download_file_with_progress(url, dest, sha1, |progress| {
                observer.on_file_progress(
                    name,
                    progress.bytes_downloaded,
                    progress.total_bytes,
                    progress.rate,
                )
            })
            .await
    }
}

#[async_trait]
impl InstallBackend for VanillaBackend {
    async fn install_version(
        &self,
        version_id: &str,
        target_dir: &Path,
        observer: &dyn InstallObserver,
    ) -> LauncherResult<()> {
        observer.on_status("Resolving version metadata...");
        observer.on_progress(0, 2);

        let manifest = VersionManifest::fetch_or_cached(&self.client, &self.manifest_cache)
            .await?
            .ok_or_else(|| LauncherError::VersionNotFound(version_id.to_string()))?;
        let entry = manifest
            .find_version(version_id)
            .ok_or_else(|| LauncherError::VersionNotFound(version_id.to_string()))?
            .clone();

        let json_path = Self::version_json_path(target_dir, version_id);
        let json_name = format!("{version_id}.json");
        self.ensure_file(
            &entry.url,
            &json_path,
            entry.sha1.as_deref(),
            &json_name,
            observer,
        )
        .await?;
        observer.on_progress(1, 2);

        let package = read_version_package(&json_path)?;
        observer.on_status("Downloading client jar...");

        let jar_path = Self::version_jar_path(target_dir, version_id);
        let jar_name = format!("{version_id}.jar");
        self.ensure_file(
            &package.downloads.client.url,
            &jar_path,
            Some(&package.downloads.client.sha1),
            &jar_name,
            observer,
        )
        .await?;
        observer.on_progress(2, 2);

        info!("Version {version_id} installed into {target_dir:?}");
        Ok(())
    }

    fn build_launch_command(
        &self,
        version_id: &str,
        target_dir: &Path,
        options: &LaunchOptions,
    ) -> LauncherResult<Vec<String>> {
        let json_path = Self::version_json_path(target_dir, version_id);
        let package = read_version_package(&json_path)?;
        let jar_path = Self::version_jar_path(target_dir, version_id);

        let java = options
            .executable_path
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|| "java".to_string());

        let mut argv = Vec::with_capacity(options.jvm_arguments.len() + 12);
        argv.push(java);
        argv.extend(options.jvm_arguments.iter().cloned());
        argv.push("-cp".into());
        argv.push(jar_path.to_string_lossy().into_owned());
        argv.push(package.main_class);
        argv.push("--username".into());
        argv.push(options.username.clone());
        argv.push("--uuid".into());
        argv.push(options.identity.to_string());
        argv.push("--accessToken".into());
        argv.push(options.token.clone());
        argv.push("--version".into());
        argv.push(version_id.to_string());
        argv.push("--gameDir".into());
        argv.push(target_dir.to_string_lossy().into_owned());

        Ok(argv)
    }
}

fn read_version_package(path: &Path) -> LauncherResult<VersionPackage> {
    let raw = std::fs::read_to_string(path).map_err(|source| LauncherError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn write_package(dir: &Path, id: &str) {
        let version_dir = dir.join("versions").join(id);
        std::fs::create_dir_all(&version_dir).unwrap();
        std::fs::write(
            version_dir.join(format!("{id}.json")),
            r#"{
                "mainClass": "net.minecraft.client.main.Main",
                "downloads": {
                    "client": {
                        "sha1": "abc",
                        "size": 10,
                        "url": "https://example.com/client.jar"
                    }
                }
            }"#,
        )
        .unwrap();
    }

    #[test]
    fn parses_version_package_subset() {
        let dir = tempfile::tempdir().unwrap();
        write_package(dir.path(), "1.20.4");

        let package =
            read_version_package(&VanillaBackend::version_json_path(dir.path(), "1.20.4"))
                .unwrap();
        assert_eq!(package.main_class, "net.minecraft.client.main.Main");
        assert_eq!(package.downloads.client.size, 10);
    }

    #[test]
    fn launch_command_places_java_jvm_args_then_game_args() {
        let dir = tempfile::tempdir().unwrap();
        write_package(dir.path(), "1.20.4");

        let backend =
            VanillaBackend::new(reqwest::Client::new(), dir.path().join("versions.json"));
        let options = LaunchOptions {
            username: "Alex".into(),
            identity: Uuid::nil(),
            token: Uuid::nil().to_string(),
            jvm_arguments: vec!["-Xmx2048M".into(), "-Xms512M".into()],
            executable_path: None,
        };

        let argv = backend
            .build_launch_command("1.20.4", dir.path(), &options)
            .unwrap();

        assert_eq!(argv[0], "java");
        assert_eq!(&argv[1..3], &["-Xmx2048M", "-Xms512M"]);
        let cp = argv.iter().position(|a| a == "-cp").unwrap();
        assert!(argv[cp + 1].ends_with("1.20.4.jar"));
        assert_eq!(argv[cp + 2], "net.minecraft.client.main.Main");
        let user = argv.iter().position(|a| a == "--username").unwrap();
        assert_eq!(argv[user + 1], "Alex");
        assert!(argv.contains(&"--accessToken".to_string()));
    }

    #[test]
    fn custom_java_override_is_used_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        write_package(dir.path(), "1.20.4");

        let backend =
            VanillaBackend::new(reqwest::Client::new(), dir.path().join("versions.json"));
        let options = LaunchOptions {
            username: "Alex".into(),
            identity: Uuid::nil(),
            token: Uuid::nil().to_string(),
            jvm_arguments: Vec::new(),
            executable_path: Some(PathBuf::from("/opt/java/bin/java")),
        };

        let argv = backend
            .build_launch_command("1.20.4", dir.path(), &options)
            .unwrap();
        assert_eq!(argv[0], "/opt/java/bin/java");
    }
}
