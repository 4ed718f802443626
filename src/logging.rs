//! Tracing setup: stderr, a daily rolling file and os_log on macOS

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_PREFIX: &str = "k9-sync.log";
const LOG_DIR_ENV: &str = "K9_SYNC_LOG_PATH";
const LOG_RETENTION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[cfg(target_os = "macos")]
const OSLOG_SUBSYSTEM: &str = "dev.k9.dashboard";

/// Install the global subscriber. Hold the guard until exit so the file
/// writer flushes.
pub fn init_logging() -> Result<WorkerGuard> {
    let log_dir = log_dir(std::env::var_os(LOG_DIR_ENV).map(PathBuf::from))?;
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory: {:?}", log_dir))?;
    let pruned = prune_old_logs(&log_dir, LOG_RETENTION);

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&log_dir, LOG_FILE_PREFIX));

    #[cfg(target_os = "macos")]
    let oslog = Some(tracing_oslog::OsLogger::new(OSLOG_SUBSYSTEM, "default"));
    #[cfg(not(target_os = "macos"))]
    let oslog: Option<tracing_subscriber::layer::Identity> = None;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false),
        )
        .with(oslog)
        .init();

    if pruned > 0 {
        tracing::debug!("Removed {} expired log files from {:?}", pruned, log_dir);
    }
    Ok(guard)
}

/// Log directory: the override when given, else the platform location
fn log_dir(override_dir: Option<PathBuf>) -> Result<PathBuf> {
    match override_dir {
        Some(dir) => Ok(dir),
        None => platform_log_dir(),
    }
}

#[cfg(target_os = "macos")]
fn platform_log_dir() -> Result<PathBuf> {
    let home = std::env::var_os("HOME")
        .map(PathBuf::from)
        .context("Failed to determine home directory for log path")?;
    Ok(home.join("Library").join("Logs").join("k9-sync"))
}

#[cfg(not(target_os = "macos"))]
fn platform_log_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("dev", "k9", "dashboard")
        .context("Failed to determine project directories for log path")?;
    // state_dir is Linux only
    let base = dirs.state_dir().unwrap_or_else(|| dirs.data_local_dir());
    Ok(base.join("logs"))
}

/// Delete our rotated files older than `max_age`; returns how many went
fn prune_old_logs(log_dir: &Path, max_age: Duration) -> usize {
    let (Ok(entries), Some(cutoff)) = (
        std::fs::read_dir(log_dir),
        SystemTime::now().checked_sub(max_age),
    ) else {
        return 0;
    };

    entries
        .flatten()
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(LOG_FILE_PREFIX))
        })
        .filter(|entry| {
            entry
                .metadata()
                .ok()
                .filter(|meta| meta.is_file())
                .and_then(|meta| meta.modified().ok())
                .is_some_and(|modified| modified < cutoff)
        })
        .filter(|entry| std::fs::remove_file(entry.path()).is_ok())
        .count()
}
