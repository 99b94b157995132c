// ─── Termination Classification ───
// Deliberately simple substring heuristics over the retained game log,
// isolated here so they stay unit-testable.

use std::path::{Path, PathBuf};

/// Marker the game prints during a regular shutdown.
pub const CLEAN_SHUTDOWN_MARKER: &str = "Stopping!";

const CRASH_REPORT_MARKER: &str = "crash report saved to:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Regular shutdown: the clean-shutdown marker appeared in the log.
    Finished,
    /// No marker and the user did not ask for the kill.
    Crashed,
    /// The user explicitly killed the process; no crash analysis.
    Killed,
}

/// Classify how the game ended. The exit code is carried along with the
/// crash event but does not participate in the heuristic: the log marker
/// is the signal the original relies on.
pub fn classify_termination(
    log: &[String],
    killed_by_user: bool,
    _exit_code: Option<i32>,
) -> Termination {
    if killed_by_user {
        return Termination::Killed;
    }
    if log.iter().any(|line| line.contains(CLEAN_SHUTDOWN_MARKER)) {
        Termination::Finished
    } else {
        Termination::Crashed
    }
}

/// Best-effort crash artifact location. Never fails: any parsing or IO
/// trouble degrades to "no report found".
pub fn locate_crash_report(log: &[String], game_dir: &Path) -> Option<PathBuf> {
    for line in log {
        let lowered = line.to_ascii_lowercase();
        if let Some(pos) = lowered.find(CRASH_REPORT_MARKER) {
            let raw = line[pos + CRASH_REPORT_MARKER.len()..]
                .trim()
                .trim_matches('"');
            let path = PathBuf::from(raw);
            if path.exists() {
                return Some(path);
            }
        }
    }

    newest_report_in(&game_dir.join("crash-reports"))
}

fn newest_report_in(dir: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "txt"))
        .max_by_key(|path| {
            std::fs::metadata(path)
                .and_then(|meta| meta.modified())
                .unwrap_or(std::time::UNIX_EPOCH)
        })
}
