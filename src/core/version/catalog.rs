// ─── Version Catalog ───
// Reconciles the remote manifest with locally installed version folders
// into one deduplicated, filtered, ordered list.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::error::LauncherResult;
use crate::core::settings::Filters;
use crate::core::version::manifest::{RemoteVersion, VersionKind, VersionManifest};

/// One selectable game build. Rebuilt wholesale on every refresh, never
/// mutated in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionEntry {
    pub id: String,
    pub kind: VersionKind,
    pub installed: bool,
    /// The distinguished "Latest Release" alias duplicated at the top of
    /// the list. The same id also appears as its plain entry.
    pub latest_release: bool,
}

impl VersionEntry {
    /// Placeholder shown when there is no network and no cached manifest.
    pub fn offline_sentinel() -> Self {
        Self {
            id: String::new(),
            kind: VersionKind::Release,
            installed: false,
            latest_release: false,
        }
    }

    pub fn is_offline_sentinel(&self) -> bool {
        self.id.is_empty()
    }
}

/// Human-facing label for a catalog entry.
pub fn display_label(entry: &VersionEntry) -> String {
    if entry.is_offline_sentinel() {
        return "Offline: No cached versions".into();
    }

    let base = if entry.latest_release {
        format!("Latest Release ({})", entry.id)
    } else if entry.installed {
        entry.id.clone()
    } else {
        format!("{} - {}", entry.kind.label(), entry.id)
    };

    if entry.installed {
        format!("(Installed) {base}")
    } else {
        base
    }
}

pub struct VersionCatalog {
    client: reqwest::Client,
    cache_file: PathBuf,
}

impl VersionCatalog {
    pub fn new(client: reqwest::Client, cache_file: PathBuf) -> Self {
        Self { client, cache_file }
    }

    /// Rebuild the catalog. Returns the ordered entries and the latest
    /// release id when one is known.
    pub async fn refresh(
        &self,
        game_dir: &Path,
        filters: &Filters,
    ) -> LauncherResult<(Vec<VersionEntry>, Option<String>)> {
        let installed = installed_versions(game_dir);
        let manifest = VersionManifest::fetch_or_cached(&self.client, &self.cache_file).await?;

        let Some(manifest) = manifest else {
            debug!("No manifest and no cache, surfacing offline sentinel");
            return Ok((vec![VersionEntry::offline_sentinel()], None));
        };

        Ok(build_entries(&manifest.versions, &installed, filters))
    }
}

/// Scan `versions/` for folders that carry their own metadata file.
/// Anything matching counts as installed, remote catalog or not.
pub fn installed_versions(game_dir: &Path) -> Vec<String> {
    let versions_dir = game_dir.join("versions");
    let Ok(entries) = std::fs::read_dir(&versions_dir) else {
        return Vec::new();
    };

    let mut installed: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            entry
                .path()
                .join(format!("{name}.json"))
                .exists()
                .then_some(name)
        })
        .collect();

    installed.sort_by(|a, b| compare_version_ids(a, b));
    installed
}

/// The skip-verification fast path trusts this check alone: the folder
/// and its metadata file existing says nothing about file integrity, so
/// a stale or corrupt install surfaces as a runtime crash, not here.
pub fn is_version_installed(game_dir: &Path, version_id: &str) -> bool {
    let version_dir = game_dir.join("versions").join(version_id);
    version_dir.is_dir() && version_dir.join(format!("{version_id}.json")).exists()
}

/// Merge, filter and order. Pure so the catalog rules are testable
/// without touching network or disk.
pub fn build_entries(
    remote: &[RemoteVersion],
    installed: &[String],
    filters: &Filters,
) -> (Vec<VersionEntry>, Option<String>) {
    let installed_set: HashSet<&str> = installed.iter().map(String::as_str).collect();

    let latest_release = remote
        .iter()
        .find(|v| v.kind == VersionKind::Release)
        .map(|v| v.id.clone());

    let mut entries: Vec<VersionEntry> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for version in remote {
        if !seen.insert(version.id.as_str()) {
            continue;
        }
        entries.push(VersionEntry {
            id: version.id.clone(),
            kind: version.kind,
            installed: installed_set.contains(version.id.as_str()),
            latest_release: false,
        });
    }

    // Folders with no remote counterpart (custom builds, removed
    // versions) are still selectable; their kind defaults to release.
    for id in installed {
        if seen.insert(id.as_str()) {
            entries.push(VersionEntry {
                id: id.clone(),
                kind: VersionKind::Release,
                installed: true,
                latest_release: false,
            });
        }
    }

    entries.retain(|entry| passes_filters(entry, filters));
    entries.sort_by(|a, b| compare_entries(a, b, filters));

    if let Some(latest_id) = latest_release.as_deref() {
        entries.insert(
            0,
            VersionEntry {
                id: latest_id.to_string(),
                kind: VersionKind::Release,
                installed: installed_set.contains(latest_id),
                latest_release: true,
            },
        );
    }

    (entries, latest_release)
}

/// An entry passes when its kind is enabled, or when it is installed and
/// installed entries are surfaced regardless of kind.
pub fn passes_filters(entry: &VersionEntry, filters: &Filters) -> bool {
    let kind_enabled = match entry.kind {
        VersionKind::Release => filters.release,
        VersionKind::Snapshot => filters.snapshot,
        VersionKind::OldBeta => filters.beta,
        VersionKind::OldAlpha => filters.alpha,
    };
    kind_enabled || (filters.installed && entry.installed)
}

/// Restore a saved selection against the rebuilt list. Prefers the plain
/// entry over the latest-release alias, falls back to the alias, then to
/// the latest release itself.
pub fn resolve_selection(
    entries: &[VersionEntry],
    saved: Option<&str>,
    latest_release: Option<&str>,
) -> Option<usize> {
    if let Some(saved_id) = saved {
        let plain = entries
            .iter()
            .position(|e| e.id == saved_id && !e.latest_release);
        if let Some(index) = plain {
            return Some(index);
        }
        if let Some(index) = entries.iter().position(|e| e.id == saved_id) {
            return Some(index);
        }
    }

    let latest_id = latest_release?;
    entries.iter().position(|e| e.id == latest_id)
}

/// Lenient numeric version key: every dot-separated part must be a
/// number. Snapshot-style ids ("24w14a") do not parse and sort last.
fn version_key(id: &str) -> Option<Vec<u64>> {
    if id.is_empty() || !id.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        return None;
    }
    id.split('.').map(|part| part.parse::<u64>().ok()).collect()
}

/// Descending by parsed version; unparsable ids after parsable ones,
/// keeping their relative (manifest) order.
pub fn compare_version_ids(a: &str, b: &str) -> Ordering {
    match (version_key(a), version_key(b)) {
        (Some(ka), Some(kb)) => kb.cmp(&ka),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare_entries(a: &VersionEntry, b: &VersionEntry, filters: &Filters) -> Ordering {
    let group = |entry: &VersionEntry| {
        if filters.installed && entry.installed {
            0
        } else {
            1
        }
    };
    group(a)
        .cmp(&group(b))
        .then_with(|| compare_version_ids(&a.id, &b.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn remote(id: &str, kind: VersionKind) -> RemoteVersion {
        RemoteVersion {
            id: id.into(),
            kind,
            release_time: chrono::Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            url: format!("https://example.com/{id}.json"),
            sha1: None,
        }
    }

    fn release_filters() -> Filters {
        Filters {
            release: true,
            snapshot: false,
            beta: false,
            alpha: false,
            installed: true,
        }
    }

    #[test]
    fn latest_release_duplicated_at_top_installed_first() {
        let remote_versions = vec![
            remote("1.20.2", VersionKind::Release),
            remote("1.20.1", VersionKind::Release),
        ];
        let installed = vec!["1.20.1".to_string()];

        let (entries, latest) =
            build_entries(&remote_versions, &installed, &release_filters());

        assert_eq!(latest.as_deref(), Some("1.20.2"));
        let labels: Vec<String> = entries.iter().map(display_label).collect();
        assert_eq!(
            labels,
            vec![
                "Latest Release (1.20.2)",
                "(Installed) 1.20.1",
                "Release - 1.20.2",
            ]
        );
        assert!(entries[0].latest_release);
        assert!(!entries[2].latest_release);
    }

    #[test]
    fn every_entry_satisfies_the_filter_predicate() {
        let remote_versions = vec![
            remote("1.20.2", VersionKind::Release),
            remote("24w14a", VersionKind::Snapshot),
            remote("b1.8.1", VersionKind::OldBeta),
            remote("a1.2.6", VersionKind::OldAlpha),
        ];
        let installed = vec!["24w14a".to_string()];

        for snapshot in [false, true] {
            for show_installed in [false, true] {
                let filters = Filters {
                    release: true,
                    snapshot,
                    beta: false,
                    alpha: false,
                    installed: show_installed,
                };
                let (entries, _) = build_entries(&remote_versions, &installed, &filters);
                for entry in entries.iter().filter(|e| !e.latest_release) {
                    assert!(
                        passes_filters(entry, &filters),
                        "{} leaked past {filters:?}",
                        entry.id
                    );
                }
            }
        }
    }

    #[test]
    fn installed_only_surfaces_via_show_installed() {
        let remote_versions = vec![
            remote("1.20.2", VersionKind::Release),
            remote("24w14a", VersionKind::Snapshot),
        ];
        let installed = vec!["24w14a".to_string()];

        let shown = build_entries(&remote_versions, &installed, &release_filters()).0;
        assert!(shown.iter().any(|e| e.id == "24w14a"));

        let mut filters = release_filters();
        filters.installed = false;
        let hidden = build_entries(&remote_versions, &installed, &filters).0;
        assert!(!hidden.iter().any(|e| e.id == "24w14a"));
    }

    #[test]
    fn local_only_folders_are_synthesized() {
        let remote_versions = vec![remote("1.20.2", VersionKind::Release)];
        let installed = vec!["1.19.2-custom".to_string()];

        let (entries, _) = build_entries(&remote_versions, &installed, &release_filters());
        let custom = entries.iter().find(|e| e.id == "1.19.2-custom").unwrap();
        assert!(custom.installed);
        assert_eq!(custom.kind, VersionKind::Release);
        assert_eq!(display_label(custom), "(Installed) 1.19.2-custom");
    }

    #[test]
    fn no_duplicates_except_latest_alias() {
        let remote_versions = vec![
            remote("1.20.2", VersionKind::Release),
            remote("1.20.2", VersionKind::Release),
            remote("1.20.1", VersionKind::Release),
        ];
        let installed = vec!["1.20.1".to_string()];

        let (entries, _) = build_entries(&remote_versions, &installed, &release_filters());
        let count = |id: &str| entries.iter().filter(|e| e.id == id).count();
        assert_eq!(count("1.20.2"), 2); // alias + plain
        assert_eq!(count("1.20.1"), 1);
    }

    #[test]
    fn refresh_is_idempotent_for_unchanged_inputs() {
        let remote_versions = vec![
            remote("1.20.2", VersionKind::Release),
            remote("24w14a", VersionKind::Snapshot),
            remote("1.20.1", VersionKind::Release),
        ];
        let installed = vec!["1.20.1".to_string()];
        let filters = Filters {
            snapshot: true,
            ..release_filters()
        };

        let first = build_entries(&remote_versions, &installed, &filters);
        let second = build_entries(&remote_versions, &installed, &filters);
        assert_eq!(first, second);
    }

    #[test]
    fn numeric_component_ordering_beats_lexical() {
        assert_eq!(compare_version_ids("1.10.0", "1.2.0"), Ordering::Less);
        assert_eq!(compare_version_ids("1.2.0", "1.10.0"), Ordering::Greater);
        assert_eq!(compare_version_ids("1.20.1", "24w14a"), Ordering::Less);
        assert_eq!(compare_version_ids("24w14a", "23w31a"), Ordering::Equal);
    }

    #[test]
    fn selection_prefers_plain_entry_then_alias_then_latest() {
        let remote_versions = vec![
            remote("1.20.2", VersionKind::Release),
            remote("1.20.1", VersionKind::Release),
        ];
        let (entries, latest) = build_entries(&remote_versions, &[], &release_filters());

        // Saved id equal to the latest release lands on the plain entry.
        let index = resolve_selection(&entries, Some("1.20.2"), latest.as_deref()).unwrap();
        assert!(!entries[index].latest_release);
        assert_eq!(entries[index].id, "1.20.2");

        // Vanished saved id falls back to the latest alias at the top.
        let index = resolve_selection(&entries, Some("1.7.10"), latest.as_deref()).unwrap();
        assert_eq!(index, 0);

        // Nothing saved, no latest: no default selection.
        assert_eq!(resolve_selection(&entries, None, None), None);
    }

    #[test]
    fn installed_scan_requires_matching_metadata_file() {
        let dir = tempfile::tempdir().unwrap();
        let versions = dir.path().join("versions");

        std::fs::create_dir_all(versions.join("1.20.1")).unwrap();
        std::fs::write(versions.join("1.20.1").join("1.20.1.json"), "{}").unwrap();
        // Folder without its metadata file does not count.
        std::fs::create_dir_all(versions.join("1.20.2")).unwrap();
        // Stray file at the top level is ignored.
        std::fs::write(versions.join("readme.txt"), "hi").unwrap();

        assert_eq!(installed_versions(dir.path()), vec!["1.20.1".to_string()]);
        assert!(is_version_installed(dir.path(), "1.20.1"));
        assert!(!is_version_installed(dir.path(), "1.20.2"));
    }

    #[test]
    fn offline_sentinel_label() {
        let sentinel = VersionEntry::offline_sentinel();
        assert!(sentinel.is_offline_sentinel());
        assert_eq!(display_label(&sentinel), "Offline: No cached versions");
    }
}
