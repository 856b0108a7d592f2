//! Client settings persisted as TOML inside the application root.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::app_dirs;
use crate::http_client::HttpTimeouts;
use crate::submission::SequencingMode;

/// Default filename used to store the client configuration.
pub const CONFIG_FILE_NAME: &str = "config.toml";
/// Environment variable overriding the configured API base URL.
pub const BASE_URL_ENV: &str = "SEQSUBMIT_API_BASE_URL";
/// Base URL used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No directory available for the settings file")]
    NoConfigDir,
    #[error("Cannot create settings directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Cannot read settings from {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Cannot save settings to {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Settings file {path} is not valid TOML: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Cannot encode settings for {path}: {source}")]
    SerializeToml {
        path: PathBuf,
        source: toml::ser::Error,
    },
    /// The API base URL is not an absolute http(s) URL.
    #[error("Invalid API base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

/// Everything the client reads from `config.toml`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    pub api: ApiSettings,
    pub polling: PollingSettings,
    pub defaults: SubmissionDefaults,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
    pub write_timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        let timeouts = HttpTimeouts::default();
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout_secs: timeouts.connect.as_secs(),
            read_timeout_secs: timeouts.read.as_secs(),
            write_timeout_secs: timeouts.write.as_secs(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingSettings {
    /// Seconds between job detail fetches while a job is pending or processing.
    pub interval_secs: u64,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self { interval_secs: 5 }
    }
}

/// Values pre-filled into a new submission form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmissionDefaults {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub notify_by_email: bool,
    pub sequencing_mode: SequencingMode,
}

impl Default for SubmissionDefaults {
    fn default() -> Self {
        Self {
            email: None,
            notify_by_email: true,
            sequencing_mode: SequencingMode::default(),
        }
    }
}

impl ClientSettings {
    /// Clamp values that would make the client misbehave.
    pub fn normalized(mut self) -> Self {
        self.api.base_url = self.api.base_url.trim().trim_end_matches('/').to_string();
        if self.api.base_url.is_empty() {
            self.api.base_url = DEFAULT_BASE_URL.to_string();
        }
        self.polling.interval_secs = self.polling.interval_secs.max(1);
        self.api.connect_timeout_secs = self.api.connect_timeout_secs.max(1);
        self.api.read_timeout_secs = self.api.read_timeout_secs.max(1);
        self.api.write_timeout_secs = self.api.write_timeout_secs.max(1);
        self.defaults.email = self
            .defaults
            .email
            .take()
            .map(|email| email.trim().to_string())
            .filter(|email| !email.is_empty());
        self
    }

    /// Parsed API base URL.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        parse_base_url(&self.api.base_url)
    }

    pub fn timeouts(&self) -> HttpTimeouts {
        HttpTimeouts {
            connect: Duration::from_secs(self.api.connect_timeout_secs),
            read: Duration::from_secs(self.api.read_timeout_secs),
            write: Duration::from_secs(self.api.write_timeout_secs),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.polling.interval_secs)
    }

    /// Replace the base URL when `SEQSUBMIT_API_BASE_URL` is set to a non-empty value.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var(BASE_URL_ENV) {
            if !value.trim().is_empty() {
                self.api.base_url = value.trim().trim_end_matches('/').to_string();
            }
        }
    }
}

/// Validate an absolute `http`/`https` base URL.
pub fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidBaseUrl {
        url: raw.to_string(),
        reason,
    };
    let url = Url::parse(raw.trim()).map_err(|err| invalid(err.to_string()))?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(format!("unsupported scheme '{other}'"))),
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    Ok(url)
}

/// `<app root>/config.toml`. The root directory is created if missing.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let dir = app_dirs::app_root_dir().map_err(map_app_dir_error)?;
    Ok(dir.join(CONFIG_FILE_NAME))
}

/// Load settings from disk with environment overrides applied, returning
/// defaults if the file is missing.
pub fn load_or_default() -> Result<ClientSettings, ConfigError> {
    let path = config_path()?;
    let mut settings = load_from(&path)?;
    settings.apply_env_overrides();
    let settings = settings.normalized();
    settings.base_url()?;
    Ok(settings)
}

/// Load settings from a specific file. A missing file yields defaults.
pub fn load_from(path: &Path) -> Result<ClientSettings, ConfigError> {
    if !path.exists() {
        return Ok(ClientSettings::default());
    }
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let settings: ClientSettings = toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(settings.normalized())
}

/// Persist settings to the default location.
pub fn save(settings: &ClientSettings) -> Result<PathBuf, ConfigError> {
    let path = config_path()?;
    save_to_path(settings, &path)?;
    Ok(path)
}

/// Serialise to TOML and replace the file in one rename.
pub fn save_to_path(settings: &ClientSettings, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let data = toml::to_string_pretty(settings).map_err(|source| ConfigError::SerializeToml {
        path: path.to_path_buf(),
        source,
    })?;
    atomic_write(path, data.as_bytes())
}

/// Write to a sibling temp file with a random suffix, then rename over `path`.
fn atomic_write(path: &Path, data: &[u8]) -> Result<(), ConfigError> {
    use rand::TryRngCore;
    let failed = |at: &Path, source: std::io::Error| ConfigError::Write {
        path: at.to_path_buf(),
        source,
    };
    let name = path
        .file_name()
        .ok_or_else(|| failed(path, std::io::Error::other("settings path has no file name")))?;

    let mut suffix = [0u8; 6];
    rand::rngs::OsRng
        .try_fill_bytes(&mut suffix)
        .map_err(|err| failed(path, std::io::Error::other(err.to_string())))?;
    let suffix: String = suffix.iter().map(|byte| format!("{byte:02x}")).collect();
    let staging = path.with_file_name(format!("{}.tmp-{suffix}", name.to_string_lossy()));

    let written = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&staging)
        .and_then(|mut file| {
            file.write_all(data)?;
            file.sync_all()
        });
    if let Err(err) = written {
        let _ = std::fs::remove_file(&staging);
        return Err(failed(&staging, err));
    }
    std::fs::rename(&staging, path).map_err(|err| {
        let _ = std::fs::remove_file(&staging);
        failed(path, err)
    })
}

fn map_app_dir_error(error: app_dirs::AppDirError) -> ConfigError {
    match error {
        app_dirs::AppDirError::NoBaseDir => ConfigError::NoConfigDir,
        app_dirs::AppDirError::CreateDir { path, source } => ConfigError::CreateDir { path, source },
    }
}
