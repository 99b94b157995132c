// ─── Java Resolution ───
// Candidate search for a user-configured Java folder. The windowed
// variant is preferred on Windows so no console window flashes up.

use std::path::{Path, PathBuf};

fn candidates(java_dir: &Path) -> Vec<PathBuf> {
    if cfg!(target_os = "windows") {
        vec![
            java_dir.join("bin").join("javaw.exe"),
            java_dir.join("bin").join("java.exe"),
            java_dir.join("javaw.exe"),
            java_dir.join("java.exe"),
        ]
    } else {
        vec![java_dir.join("bin").join("java"), java_dir.join("java")]
    }
}

/// First existing, executable candidate under `java_dir`, or `None`.
pub fn find_java_executable(java_dir: &Path) -> Option<PathBuf> {
    candidates(java_dir).into_iter().find(|p| is_executable(p))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
