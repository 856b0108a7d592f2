//! Logging setup for the client.
//!
//! Every launch gets its own log file under `<app root>/logs`, named after the
//! local start time so that file names sort chronologically. Stderr only shows
//! warnings unless `RUST_LOG` asks for more; stdout stays free for command output.

use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
    sync::OnceLock,
};

use time::{OffsetDateTime, UtcOffset, format_description::FormatItem, macros::format_description};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{EnvFilter, Layer, Registry, filter::LevelFilter, fmt, prelude::*};

use crate::app_dirs;

/// Log files kept after pruning, including the current one.
const KEEP_LOG_FILES: usize = 10;
const LOG_FILE_PREFIX: &str = "seqsubmit_";
const LOG_FILE_SUFFIX: &str = ".log";
const DEFAULT_FILE_LEVEL: &str = "info";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("No directory available for log files")]
    NoLogDir,
    #[error("Failed to prepare log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to list log directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to remove old log file {path}: {source}")]
    RemoveFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to format log file name: {0}")]
    FormatTime(time::error::Format),
    #[error("Failed to install global tracing subscriber: {0}")]
    SetGlobal(tracing::subscriber::SetGlobalDefaultError),
    #[error("Failed to create log file {path}: {source}")]
    CreateLogFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Install the global subscriber. Later calls are no-ops.
///
/// Errors are returned so the binary can run on without logging.
pub fn init() -> Result<(), LoggingError> {
    if LOG_GUARD.get().is_some() {
        return Ok(());
    }

    let log_dir = app_dirs::logs_dir().map_err(|err| match err {
        app_dirs::AppDirError::NoBaseDir => LoggingError::NoLogDir,
        app_dirs::AppDirError::CreateDir { path, source } => LoggingError::CreateDir { path, source },
    })?;
    let file_name = log_file_name(now_local_or_utc())?;
    let log_path = log_dir.join(&file_name);
    touch(&log_path)?;
    prune_old_logs(&log_dir, KEEP_LOG_FILES)?;

    let (file_writer, guard) = tracing_appender::non_blocking(rolling::never(&log_dir, file_name));
    let timer = local_timer();
    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_timer(timer.clone())
        .with_writer(file_writer)
        .with_filter(file_filter());
    let stderr_layer = fmt::layer()
        .with_timer(timer)
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(stderr_filter());

    let subscriber = Registry::default().with(file_layer).with(stderr_layer);
    tracing::subscriber::set_global_default(subscriber).map_err(LoggingError::SetGlobal)?;
    let _ = LOG_GUARD.set(guard);

    tracing::debug!("Writing log to {}", log_path.display());
    Ok(())
}

fn file_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILE_LEVEL))
}

/// Warnings only, unless `RUST_LOG` is set explicitly.
fn stderr_filter() -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(LevelFilter::WARN.into()))
}

fn local_timer() -> fmt::time::OffsetTime<time::format_description::BorrowedFormatItem<'static>> {
    const DISPLAY_FORMAT: &[FormatItem<'static>] =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    fmt::time::OffsetTime::new(offset, DISPLAY_FORMAT.into())
}

fn now_local_or_utc() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

fn log_file_name(started: OffsetDateTime) -> Result<String, LoggingError> {
    const NAME_FORMAT: &[FormatItem<'_>] =
        format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]");
    let stamp = started.format(NAME_FORMAT).map_err(LoggingError::FormatTime)?;
    Ok(format!("{LOG_FILE_PREFIX}{stamp}{LOG_FILE_SUFFIX}"))
}

fn touch(path: &Path) -> Result<(), LoggingError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map(drop)
        .map_err(|source| LoggingError::CreateLogFile {
            path: path.to_path_buf(),
            source,
        })
}

fn is_client_log(name: &str) -> bool {
    name.starts_with(LOG_FILE_PREFIX) && name.ends_with(LOG_FILE_SUFFIX)
}

/// Delete the oldest client logs beyond `keep`. Names carry the start time, so
/// lexical order is age order. Unrelated files are never touched.
fn prune_old_logs(dir: &Path, keep: usize) -> Result<(), LoggingError> {
    let listing = fs::read_dir(dir).map_err(|source| LoggingError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut logs: Vec<(String, PathBuf)> = listing
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|kind| kind.is_file()))
        .filter_map(|entry| {
            let name = entry.file_name().into_string().ok()?;
            is_client_log(&name).then(|| (name, entry.path()))
        })
        .collect();
    if logs.len() <= keep {
        return Ok(());
    }
    logs.sort();
    let excess = logs.len() - keep;
    for (_, path) in logs.drain(..excess) {
        fs::remove_file(&path).map_err(|source| LoggingError::RemoveFile { path, source })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn log_file_name_carries_start_time() {
        let started = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        assert_eq!(
            log_file_name(started).unwrap(),
            "seqsubmit_2023-11-14_22-13-20.log"
        );
    }

    #[test]
    fn prune_drops_oldest_client_logs_only() {
        let dir = tempdir().unwrap();
        for day in 1..=5 {
            touch(&dir.path().join(format!("seqsubmit_2024-03-0{day}_10-00-00.log"))).unwrap();
        }
        touch(&dir.path().join("notes.txt")).unwrap();
        touch(&dir.path().join("other_2024-01-01.log")).unwrap();

        prune_old_logs(dir.path(), 3).unwrap();

        assert!(!dir.path().join("seqsubmit_2024-03-01_10-00-00.log").exists());
        assert!(!dir.path().join("seqsubmit_2024-03-02_10-00-00.log").exists());
        assert!(dir.path().join("seqsubmit_2024-03-03_10-00-00.log").exists());
        assert!(dir.path().join("seqsubmit_2024-03-05_10-00-00.log").exists());
        assert!(dir.path().join("notes.txt").exists());
        assert!(dir.path().join("other_2024-01-01.log").exists());
    }

    #[test]
    fn prune_is_a_no_op_under_the_limit() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("seqsubmit_2024-03-01_10-00-00.log")).unwrap();
        prune_old_logs(dir.path(), 10).unwrap();
        assert!(dir.path().join("seqsubmit_2024-03-01_10-00-00.log").exists());
    }
}
