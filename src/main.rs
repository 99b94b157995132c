use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use nocturne::app::{self, Launcher};
use nocturne::core::cli::LauncherArgs;
use nocturne::core::error::LauncherResult;
use nocturne::core::http::build_http_client;
use nocturne::core::paths::{runtime_paths, wipe_tmp_dir};
use nocturne::core::updater::{relaunch_main, UpdateOutcome};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,nocturne=debug")),
        )
        .init();

    let args = LauncherArgs::from_env();
    info!("Nocturne launcher starting... {args:?}");

    if let Err(err) = run(&args).await {
        // Last-resort catch-all: persist a crash report before exiting.
        let report = write_crash_log(&err);
        match report {
            Some(path) => error!("Fatal error: {err} (crash log: {})", path.display()),
            None => error!("Fatal error: {err}"),
        }
        std::process::exit(1);
    }
}

async fn run(args: &LauncherArgs) -> LauncherResult<()> {
    let paths = runtime_paths()?;
    wipe_tmp_dir(paths)?;

    if !args.launcher {
        let client = build_http_client()?;
        match app::run_self_update(&client, args).await? {
            UpdateOutcome::Applied { version } => {
                info!("Updated to {version}, relaunching");
                relaunch_main(&version)?;
                return Ok(());
            }
            UpdateOutcome::Elevating => return Ok(()),
            UpdateOutcome::UpToDate | UpdateOutcome::Skipped(_) => {}
        }
    }

    let launcher = Launcher::new(paths)?;
    launcher.run_launch_flow().await
}

fn write_crash_log(err: &nocturne::core::error::LauncherError) -> Option<std::path::PathBuf> {
    let paths = runtime_paths().ok()?;
    let log_dir = paths.crash_log_dir();
    std::fs::create_dir_all(&log_dir).ok()?;

    let stamp = chrono::Utc::now().format("%Y%m%d-%H%M%S");
    let path = log_dir.join(format!("crash_{stamp}.log"));
    std::fs::write(&path, format!("{err:#?}\n\n{err}")).ok()?;
    Some(path)
}
