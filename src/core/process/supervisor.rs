// ─── Process Supervisor ───
// Spawns the game, streams its combined output line-by-line, reaps it
// with a bounded grace period and classifies how it ended.

use std::io::{BufRead, BufReader as StdBufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::process::classify::{
    classify_termination, locate_crash_report, Termination,
};

/// Window after the output stream closes before the child is force
/// killed.
const EXIT_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug)]
pub enum GameEvent {
    /// One line of combined stdout/stderr, lossily decoded.
    Log(String),
    /// Emitted before `Exited` when the termination classified as a
    /// crash. `report` is best-effort and may be absent.
    Crashed {
        exit_code: Option<i32>,
        report: Option<PathBuf>,
    },
    Exited {
        termination: Termination,
        exit_code: Option<i32>,
    },
}

/// Handle to the running game. Killing through it marks the termination
/// as user-initiated so no crash analysis runs.
pub struct GameHandle {
    pid: u32,
    killed_by_user: Arc<AtomicBool>,
}

impl GameHandle {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn kill(&self) -> LauncherResult<()> {
        self.killed_by_user.store(true, Ordering::SeqCst);
        kill_process(self.pid)
    }
}

#[derive(Default)]
pub struct ProcessSupervisor {
    active: Arc<Mutex<Option<u32>>>,
}

impl ProcessSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.active.lock().expect("supervisor lock poisoned").is_some()
    }

    /// Spawn `argv` with the game directory as working directory and
    /// supervise it until exit. Events arrive on `events`; the returned
    /// handle outlives the process and is safe to kill through at any
    /// point. One game at a time.
    pub fn spawn(
        &self,
        argv: &[String],
        game_dir: &Path,
        events: UnboundedSender<GameEvent>,
    ) -> LauncherResult<GameHandle> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| LauncherError::ProcessSpawn("Empty launch command".into()))?;

        {
            let mut active = self.active.lock().expect("supervisor lock poisoned");
            if active.is_some() {
                return Err(LauncherError::GameRunning);
            }
            // Reserved below once the pid is known; the lock spans the
            // spawn so two launches cannot race past the check.
            let mut cmd = Command::new(effective_program(program));
            cmd.args(args)
                .current_dir(game_dir)
                .stdout(Stdio::piped())
                .stderr(Stdio::piped());
            configure_platform_spawn(&mut cmd);

            let mut child = cmd
                .spawn()
                .map_err(|err| LauncherError::ProcessSpawn(err.to_string()))?;
            let pid = child.id();
            *active = Some(pid);
            info!("Game process started (pid {pid})");

            let killed_by_user = Arc::new(AtomicBool::new(false));
            let log_buffer: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

            let stdout_task = child
                .stdout
                .take()
                .map(|out| spawn_reader(out, Arc::clone(&log_buffer), events.clone()));
            let stderr_task = child
                .stderr
                .take()
                .map(|err| spawn_reader(err, Arc::clone(&log_buffer), events.clone()));

            let monitor_killed = Arc::clone(&killed_by_user);
            let monitor_active = Arc::clone(&self.active);
            let monitor_game_dir = game_dir.to_path_buf();
            tokio::spawn(async move {
                if let Some(task) = stdout_task {
                    let _ = task.await;
                }
                if let Some(task) = stderr_task {
                    let _ = task.await;
                }

                let exit_code = tokio::task::spawn_blocking(move || reap(child))
                    .await
                    .unwrap_or(None);

                let log = log_buffer.lock().expect("log buffer poisoned").clone();
                let killed = monitor_killed.load(Ordering::SeqCst);
                let termination = classify_termination(&log, killed, exit_code);

                if termination == Termination::Crashed {
                    let report = locate_crash_report(&log, &monitor_game_dir);
                    let _ = events.send(GameEvent::Crashed { exit_code, report });
                }

                monitor_active
                    .lock()
                    .expect("supervisor lock poisoned")
                    .take();
                info!("Game process exited: {termination:?} (code {exit_code:?})");
                let _ = events.send(GameEvent::Exited {
                    termination,
                    exit_code,
                });
            });

            Ok(GameHandle {
                pid,
                killed_by_user,
            })
        }
    }
}

/// Line reader for one output pipe. Invalid UTF-8 is replaced, never
/// fatal; lines land in the shared buffer and the event stream.
fn spawn_reader<R>(
    stream: R,
    buffer: Arc<Mutex<Vec<String>>>,
    events: UnboundedSender<GameEvent>,
) -> tokio::task::JoinHandle<()>
where
    R: Read + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut reader = StdBufReader::new(stream);
        let mut raw = Vec::new();
        loop {
            raw.clear();
            match reader.read_until(b'\n', &mut raw) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&raw).trim_end().to_string();
                    buffer.lock().expect("log buffer poisoned").push(line.clone());
                    let _ = events.send(GameEvent::Log(line));
                }
            }
        }
    })
}

/// Wait for exit with a bounded grace period, then force kill.
fn reap(mut child: std::process::Child) -> Option<i32> {
    let deadline = Instant::now() + EXIT_GRACE;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return status.code(),
            Ok(None) => {
                if Instant::now() >= deadline {
                    break;
                }
                std::thread::sleep(Duration::from_millis(50));
            }
            Err(err) => {
                warn!("Could not poll game process: {err}");
                break;
            }
        }
    }

    warn!("Game process did not terminate in time, force killing");
    let _ = child.kill();
    child.wait().ok().and_then(|status| status.code())
}

/// Swap the console Java for the windowed variant when it exists so no
/// console window appears alongside the game.
fn effective_program(program: &str) -> String {
    if cfg!(target_os = "windows") && program.ends_with("java.exe") {
        let windowed = format!("{}w.exe", program.trim_end_matches(".exe"));
        if Path::new(&windowed).exists() {
            return windowed;
        }
    }
    program.to_string()
}

fn configure_platform_spawn(cmd: &mut Command) {
    #[cfg(target_os = "windows")]
    {
        use std::os::windows::process::CommandExt;
        const CREATE_NO_WINDOW: u32 = 0x0800_0000;
        cmd.creation_flags(CREATE_NO_WINDOW);
    }
    #[cfg(not(target_os = "windows"))]
    {
        let _ = cmd;
    }
}

/// Kill by pid: hard on Windows, SIGTERM with a SIGKILL escalation
/// elsewhere.
fn kill_process(pid: u32) -> LauncherResult<()> {
    #[cfg(target_os = "windows")]
    {
        let status = Command::new("taskkill")
            .args(["/PID", &pid.to_string(), "/T", "/F"])
            .status()
            .map_err(|e| LauncherError::Other(format!("Could not kill process {pid}: {e}")))?;

        if !status.success() {
            return Err(LauncherError::Other(format!(
                "taskkill for {pid} returned {:?}",
                status.code()
            )));
        }
        Ok(())
    }

    #[cfg(not(target_os = "windows"))]
    {
        let graceful = Command::new("kill")
            .args(["-15", &pid.to_string()])
            .status()
            .map_err(|e| LauncherError::Other(format!("Could not signal {pid}: {e}")))?;

        if graceful.success() {
            std::thread::sleep(Duration::from_millis(300));
            let check = Command::new("kill").args(["-0", &pid.to_string()]).status();
            if matches!(check, Ok(status) if !status.success()) {
                return Ok(());
            }
        }

        let force = Command::new("kill")
            .args(["-9", &pid.to_string()])
            .status()
            .map_err(|e| LauncherError::Other(format!("Could not kill process {pid}: {e}")))?;

        if !force.success() {
            return Err(LauncherError::Other(format!(
                "kill -9 for {pid} returned {:?}",
                force.code()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn run_to_exit(
        argv: &[&str],
        kill_after_first_line: bool,
    ) -> (Vec<String>, Vec<GameEvent>) {
        let dir = tempfile::tempdir().unwrap();
        let supervisor = ProcessSupervisor::new();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let argv: Vec<String> = argv.iter().map(|s| s.to_string()).collect();
        let handle = supervisor.spawn(&argv, dir.path(), tx).unwrap();
        assert!(supervisor.is_running());

        let mut logs = Vec::new();
        let mut terminal = Vec::new();
        while let Some(event) = rx.recv().await {
            match event {
                GameEvent::Log(line) => {
                    if kill_after_first_line && logs.is_empty() {
                        handle.kill().unwrap();
                    }
                    logs.push(line);
                }
                GameEvent::Exited { .. } => {
                    terminal.push(event);
                    break;
                }
                other => terminal.push(other),
            }
        }

        assert!(!supervisor.is_running());
        (logs, terminal)
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn clean_shutdown_marker_classifies_finished() {
        let (logs, terminal) = run_to_exit(&["sh", "-c", "echo 'Stopping!'"], false).await;

        assert!(logs.iter().any(|l| l.contains("Stopping!")));
        assert_eq!(terminal.len(), 1);
        assert!(matches!(
            terminal[0],
            GameEvent::Exited {
                termination: Termination::Finished,
                ..
            }
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_without_marker_emits_crash_event() {
        let (_, terminal) = run_to_exit(&["sh", "-c", "echo boom; exit 3"], false).await;

        assert_eq!(terminal.len(), 2);
        assert!(matches!(
            terminal[0],
            GameEvent::Crashed {
                exit_code: Some(3),
                report: None,
            }
        ));
        assert!(matches!(
            terminal[1],
            GameEvent::Exited {
                termination: Termination::Crashed,
                exit_code: Some(3),
            }
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn user_kill_classifies_killed_without_crash_event() {
        let (_, terminal) =
            run_to_exit(&["sh", "-c", "echo started; exec sleep 30"], true).await;

        assert_eq!(terminal.len(), 1);
        assert!(matches!(
            terminal[0],
            GameEvent::Exited {
                termination: Termination::Killed,
                ..
            }
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn second_spawn_is_rejected_while_running() {
        let dir = tempfile::tempdir().unwrap();
        let supervisor = ProcessSupervisor::new();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let argv = vec![
            "sh".to_string(),
            "-c".to_string(),
            "exec sleep 30".to_string(),
        ];
        let handle = supervisor.spawn(&argv, dir.path(), tx.clone()).unwrap();

        let second = supervisor.spawn(&argv, dir.path(), tx);
        assert!(matches!(second, Err(LauncherError::GameRunning)));

        handle.kill().unwrap();
        while let Some(event) = rx.recv().await {
            if matches!(event, GameEvent::Exited { .. }) {
                break;
            }
        }
        assert!(!supervisor.is_running());
    }

    #[test]
    fn empty_argv_is_rejected() {
        let supervisor = ProcessSupervisor::new();
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let result = supervisor.spawn(&[], Path::new("."), tx);
        assert!(matches!(result, Err(LauncherError::ProcessSpawn(_))));
    }
}
