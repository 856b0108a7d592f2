//! Where the client keeps its files: one `.seqsubmit` folder holding the
//! settings file, per-launch logs and downloaded job artifacts.
//!
//! The folder sits under the OS config directory (`%APPDATA%` on Windows,
//! `~/.config` on Linux). `SEQSUBMIT_CONFIG_HOME` relocates the whole tree for
//! tests or portable setups.

use std::path::{Path, PathBuf};

use directories::BaseDirs;
use thiserror::Error;

/// Name of the application directory that lives under the config root.
pub const APP_DIR_NAME: &str = ".seqsubmit";
/// Environment variable that replaces the OS config root.
pub const CONFIG_HOME_ENV: &str = "SEQSUBMIT_CONFIG_HOME";

const LOGS_DIR: &str = "logs";
const DOWNLOADS_DIR: &str = "downloads";

#[derive(Debug, Error)]
pub enum AppDirError {
    /// Neither the override nor the OS could name a config directory.
    #[error("No suitable base config directory available for application files")]
    NoBaseDir,
    #[error("Failed to create application directory at {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// The `.seqsubmit` root, created if needed.
pub fn app_root_dir() -> Result<PathBuf, AppDirError> {
    let base = config_base_dir().ok_or(AppDirError::NoBaseDir)?;
    ensure_dir(root_under(&base))
}

/// `<root>/logs`, created if needed.
pub fn logs_dir() -> Result<PathBuf, AppDirError> {
    ensure_dir(app_root_dir()?.join(LOGS_DIR))
}

/// Default destination for a job's artifacts: `<root>/downloads/<job_id>`.
pub fn downloads_dir(job_id: &str) -> Result<PathBuf, AppDirError> {
    ensure_dir(job_downloads_under(&app_root_dir()?, job_id))
}

fn root_under(base: &Path) -> PathBuf {
    base.join(APP_DIR_NAME)
}

fn job_downloads_under(root: &Path, job_id: &str) -> PathBuf {
    root.join(DOWNLOADS_DIR).join(job_id)
}

fn ensure_dir(path: PathBuf) -> Result<PathBuf, AppDirError> {
    match std::fs::create_dir_all(&path) {
        Ok(()) => Ok(path),
        Err(source) => Err(AppDirError::CreateDir { path, source }),
    }
}

fn config_base_dir() -> Option<PathBuf> {
    match std::env::var_os(CONFIG_HOME_ENV) {
        Some(path) if !path.is_empty() => Some(PathBuf::from(path)),
        _ => BaseDirs::new().map(|dirs| dirs.config_dir().to_path_buf()),
    }
}
