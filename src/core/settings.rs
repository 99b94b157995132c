use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::error::{LauncherError, LauncherResult};

/// Which version kinds the catalog surfaces, plus whether installed-only
/// entries are shown even when their kind is filtered out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filters {
    pub release: bool,
    pub snapshot: bool,
    pub beta: bool,
    pub alpha: bool,
    pub installed: bool,
}

impl Default for Filters {
    fn default() -> Self {
        Self {
            release: true,
            snapshot: false,
            beta: false,
            alpha: false,
            installed: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JavaMode {
    /// Use the runtime the install backend resolves.
    Default,
    /// Use the executable found under `java_path`.
    Custom,
}

/// Persisted launcher settings. Unknown keys in an on-disk document are
/// dropped on the next save; missing keys fall back to these defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub username: Option<String>,
    pub version_id: Option<String>,
    pub ram_mb: u32,
    pub minecraft_directory: Option<PathBuf>,
    pub filters: Filters,
    pub dev_console: bool,
    pub hide_on_launch: bool,
    pub jvm_args: Vec<String>,
    pub discord_rpc: bool,
    pub language: String,
    pub java_mode: JavaMode,
    pub java_path: String,
    pub skip_version_check: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            username: None,
            version_id: None,
            ram_mb: 2048,
            minecraft_directory: None,
            filters: Filters::default(),
            dev_console: false,
            hide_on_launch: true,
            jvm_args: Vec::new(),
            discord_rpc: true,
            language: "en_us".into(),
            java_mode: JavaMode::Default,
            java_path: String::new(),
            skip_version_check: false,
        }
    }
}

impl Settings {
    /// Game directory honoring the user override.
    pub fn game_dir(&self) -> PathBuf {
        self.minecraft_directory
            .clone()
            .unwrap_or_else(crate::core::paths::default_game_dir)
    }

    /// RAM allocation clamped into `[512, physical - 512]` MB.
    pub fn effective_ram_mb(&self) -> u32 {
        self.ram_mb.clamp(512, max_allocatable_ram_mb())
    }
}

/// Upper bound for the RAM allocation, derived from physical memory with
/// headroom for the OS.
pub fn max_allocatable_ram_mb() -> u32 {
    let mut system = sysinfo::System::new();
    system.refresh_memory();
    let total_mb = (system.total_memory() / (1024 * 1024)) as u32;
    total_mb.saturating_sub(512).max(512)
}

/// All settings reads and writes go through this trait so components can
/// be constructed against an in-memory store in tests.
pub trait SettingsStore: Send + Sync {
    /// A corrupt or absent document yields defaults, never an error.
    fn load(&self) -> Settings;
    fn save(&self, settings: &Settings) -> LauncherResult<()>;
}

/// File-backed store: full-document rewrite on every save,
/// last-writer-wins. Not designed for concurrent writers.
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl SettingsStore for JsonSettingsStore {
    fn load(&self) -> Settings {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                warn!("Unreadable settings file {:?}: {err}", self.path);
                Settings::default()
            }),
            Err(_) => Settings::default(),
        }
    }

    fn save(&self, settings: &Settings) -> LauncherResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| LauncherError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(settings)?;
        std::fs::write(&self.path, json).map_err(|source| LauncherError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

/// In-memory store for tests and dry runs.
#[derive(Default)]
pub struct MemorySettingsStore {
    inner: Mutex<Settings>,
}

impl MemorySettingsStore {
    pub fn with(settings: Settings) -> Self {
        Self {
            inner: Mutex::new(settings),
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> Settings {
        self.inner.lock().expect("settings store poisoned").clone()
    }

    fn save(&self, settings: &Settings) -> LauncherResult<()> {
        *self.inner.lock().expect("settings store poisoned") = settings.clone();
        Ok(())
    }
}

// ── Users store ─────────────────────────────────────────

/// Ordered list of offline usernames, persisted as a JSON array.
pub struct UsersFile {
    path: PathBuf,
}

impl UsersFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn load(&self) -> Vec<String> {
        std::fs::read_to_string(&self.path)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }

    pub fn save(&self, users: &[String]) -> LauncherResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| LauncherError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(users)?;
        std::fs::write(&self.path, json).map_err(|source| LauncherError::Io {
            path: self.path.clone(),
            source,
        })
    }

    /// Appends a username unless it is already present.
    pub fn add(&self, username: &str) -> LauncherResult<Vec<String>> {
        let mut users = self.load();
        if !users.iter().any(|u| u == username) {
            users.push(username.to_string());
            self.save(&users)?;
        }
        Ok(users)
    }

    /// Renames a username in place; a no-op when the old name is absent
    /// or the new name is already taken.
    pub fn rename(&self, old: &str, new: &str) -> LauncherResult<Vec<String>> {
        let mut users = self.load();
        if users.iter().any(|u| u == new) {
            return Ok(users);
        }
        if let Some(slot) = users.iter_mut().find(|u| *u == old) {
            *slot = new.to_string();
            self.save(&users)?;
        }
        Ok(users)
    }

    pub fn remove(&self, username: &str) -> LauncherResult<Vec<String>> {
        let mut users = self.load();
        users.retain(|u| u != username);
        self.save(&users)?;
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_first_run_document() {
        let settings = Settings::default();
        assert!(settings.filters.release);
        assert!(!settings.filters.snapshot);
        assert!(settings.filters.installed);
        assert_eq!(settings.ram_mb, 2048);
        assert!(settings.hide_on_launch);
        assert_eq!(settings.java_mode, JavaMode::Default);
        assert!(!settings.skip_version_check);
        assert_eq!(settings.language, "en_us");
    }

    #[test]
    fn json_store_round_trips_and_tolerates_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSettingsStore::new(dir.path().join("settings.json"));

        let mut settings = Settings::default();
        settings.username = Some("Alex".into());
        settings.ram_mb = 4096;
        settings.jvm_args = vec!["-XX:+UseG1GC".into()];
        settings.java_mode = JavaMode::Custom;
        store.save(&settings).unwrap();

        let loaded = store.load();
        assert_eq!(loaded.username.as_deref(), Some("Alex"));
        assert_eq!(loaded.ram_mb, 4096);
        assert_eq!(loaded.jvm_args, vec!["-XX:+UseG1GC".to_string()]);
        assert_eq!(loaded.java_mode, JavaMode::Custom);

        std::fs::write(dir.path().join("settings.json"), "{not json").unwrap();
        let fallback = store.load();
        assert_eq!(fallback.ram_mb, 2048);
    }

    #[test]
    fn partial_document_fills_missing_keys() {
        let loaded: Settings = serde_json::from_str(r#"{"username": "Steve"}"#).unwrap();
        assert_eq!(loaded.username.as_deref(), Some("Steve"));
        assert_eq!(loaded.ram_mb, 2048);
        assert!(loaded.filters.release);
    }

    #[test]
    fn memory_store_is_isolated() {
        let store = MemorySettingsStore::default();
        let mut settings = store.load();
        settings.version_id = Some("1.20.4".into());
        store.save(&settings).unwrap();
        assert_eq!(store.load().version_id.as_deref(), Some("1.20.4"));
    }

    #[test]
    fn users_file_add_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let users = UsersFile::new(dir.path().join("users.json"));

        users.add("Alex").unwrap();
        users.add("Steve").unwrap();
        users.add("Alex").unwrap();
        assert_eq!(users.load(), vec!["Alex".to_string(), "Steve".to_string()]);

        users.remove("Alex").unwrap();
        assert_eq!(users.load(), vec!["Steve".to_string()]);
    }

    #[test]
    fn users_file_rename_refuses_collisions() {
        let dir = tempfile::tempdir().unwrap();
        let users = UsersFile::new(dir.path().join("users.json"));
        users.add("Alex").unwrap();
        users.add("Steve").unwrap();

        users.rename("Alex", "Alexis").unwrap();
        assert_eq!(
            users.load(),
            vec!["Alexis".to_string(), "Steve".to_string()]
        );

        // Renaming onto an existing name leaves the list untouched.
        users.rename("Alexis", "Steve").unwrap();
        assert_eq!(
            users.load(),
            vec!["Alexis".to_string(), "Steve".to_string()]
        );
    }

    #[test]
    fn effective_ram_is_clamped_to_floor() {
        let mut settings = Settings::default();
        settings.ram_mb = 128;
        assert_eq!(settings.effective_ram_mb(), 512);
    }
}
