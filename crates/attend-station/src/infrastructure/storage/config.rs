//! TOML-based configuration for the attendance station.
//!
//! Reads and writes `StationConfig` to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\AttendanceStation\config.toml`
//! - Linux:    `~/.config/attendance-station/config.toml`
//! - macOS:    `~/Library/Application Support/AttendanceStation/config.toml`
//!
//! Example:
//!
//! ```toml
//! [station]
//! app_name = "USCC ATTENDANCE SYSTEM"
//! log_level = "info"
//!
//! [ui]
//! ws_port = 47800
//!
//! [nfc]
//! poll_interval_ms = 500
//! ```
//!
//! Every field has a `#[serde(default = "...")]`, so a file that only sets
//! one value is valid and older files keep working when fields are added.
//!
//! # Runtime environment
//!
//! Whether the station runs in development mode is not a config file setting:
//! it comes from the environment ([`RuntimeEnv`]), the way build tooling sets
//! it when the frontend dev server is running.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level station configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StationConfig {
    #[serde(default)]
    pub station: StationSection,
    #[serde(default)]
    pub window: WindowSection,
    #[serde(default)]
    pub ui: UiSection,
    #[serde(default)]
    pub database: DatabaseSection,
    #[serde(default)]
    pub instance: InstanceSection,
    #[serde(default)]
    pub nfc: NfcSection,
}

/// General station settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StationSection {
    /// Name shown in privilege prompts and logs.
    #[serde(default = "default_app_name")]
    pub app_name: String,
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Title of the operator error dialog.
    #[serde(default = "default_error_dialog_title")]
    pub error_dialog_title: String,
}

/// Main window settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WindowSection {
    #[serde(default = "default_window_width")]
    pub width: u32,
    #[serde(default = "default_window_height")]
    pub height: u32,
    /// No native frame or title bar.
    #[serde(default = "default_true")]
    pub frameless: bool,
    /// Directory holding the packaged frontend (`index.html`).
    #[serde(default = "default_resources_dir")]
    pub resources_dir: PathBuf,
    /// Command that opens the frontend, e.g. `"chromium --app={url}"`.
    /// `{url}` is replaced by the content URL.  Unset: the frontend is
    /// started by other means and simply connects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launcher: Option<String>,
}

/// Frontend bridge settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UiSection {
    /// Address the WebSocket server binds to.  Keep it on loopback.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_ws_port")]
    pub ws_port: u16,
}

/// Attendance database settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DatabaseSection {
    /// SQLite file.  Unset: `attendance.db` next to the config file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Single-instance lock settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstanceSection {
    /// Loopback TCP port held by the running station.
    #[serde(default = "default_lock_port")]
    pub lock_port: u16,
}

/// PC/SC driver timing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NfcSection {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_app_name() -> String {
    "USCC ATTENDANCE SYSTEM".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_error_dialog_title() -> String {
    crate::application::report_errors::DEFAULT_ERROR_TITLE.to_string()
}
fn default_window_width() -> u32 {
    800
}
fn default_window_height() -> u32 {
    600
}
fn default_true() -> bool {
    true
}
fn default_resources_dir() -> PathBuf {
    PathBuf::from("dist")
}
fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}
fn default_ws_port() -> u16 {
    47800
}
fn default_lock_port() -> u16 {
    47801
}
fn default_poll_interval_ms() -> u64 {
    500
}
fn default_retry_delay_ms() -> u64 {
    2000
}

impl Default for StationSection {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            log_level: default_log_level(),
            error_dialog_title: default_error_dialog_title(),
        }
    }
}

impl Default for WindowSection {
    fn default() -> Self {
        Self {
            width: default_window_width(),
            height: default_window_height(),
            frameless: default_true(),
            resources_dir: default_resources_dir(),
            launcher: None,
        }
    }
}

impl Default for UiSection {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            ws_port: default_ws_port(),
        }
    }
}

impl Default for InstanceSection {
    fn default() -> Self {
        Self {
            lock_port: default_lock_port(),
        }
    }
}

impl Default for NfcSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl StationConfig {
    /// The database file: the configured path, or `attendance.db` in `base_dir`.
    pub fn database_path(&self, base_dir: &Path) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| base_dir.join("attendance.db"))
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the default config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `StationConfig` from `path`, returning `StationConfig::default()` if
/// the file does not yet exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<StationConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StationConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Persists `config` to `path`, creating the directory if needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(path: &Path, config: &StationConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves the platform config directory, including the app subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("AttendanceStation"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("attendance-station"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("AttendanceStation")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Runtime environment ───────────────────────────────────────────────────────

/// Process environment flags that are not part of the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeEnv {
    /// Development mode: load the dev server, open the inspection panel.
    pub is_development: bool,
    /// Frontend dev server URL, if one is running.
    pub dev_server_url: Option<String>,
    /// Running under an automated test harness.
    pub is_test: bool,
}

impl RuntimeEnv {
    /// Reads `ATTEND_ENV`, `ATTEND_DEV_SERVER_URL` and `ATTEND_IS_TEST`.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Same as [`RuntimeEnv::from_env`] with an injectable lookup.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let is_development = lookup("ATTEND_ENV").map_or(true, |v| v != "production");
        let dev_server_url = lookup("ATTEND_DEV_SERVER_URL").filter(|v| !v.is_empty());
        let is_test = lookup("ATTEND_IS_TEST").is_some_and(|v| !v.is_empty() && v != "0");
        Self {
            is_development,
            dev_server_url,
            is_test,
        }
    }

    /// Whether the developer inspection panel opens with the window.
    pub fn dev_tools(&self) -> bool {
        self.is_development && !self.is_test
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
