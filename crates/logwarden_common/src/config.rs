//! Configuration for logwarden.
//!
//! Loaded from a TOML file; every field has a default so a missing file and
//! a partial file both work. The loaded value is passed explicitly to the
//! components that need it — there is no process-wide mutable state.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::timeparse;

/// Default config file path
pub const CONFIG_PATH: &str = "/etc/logwarden/config.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logs: LogsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub time: TimeConfig,
}

/// Where to look for the monitored log families
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsConfig {
    /// Directory scanned for authentication logs
    #[serde(default = "default_auth_dir")]
    pub auth_dir: PathBuf,
    /// Filename fragment matching auth logs, rotated copies included
    #[serde(default = "default_auth_name")]
    pub auth_name: String,
    /// Directory scanned for apt history logs
    #[serde(default = "default_apt_dir")]
    pub apt_dir: PathBuf,
    /// Filename fragment matching apt history logs
    #[serde(default = "default_apt_name")]
    pub apt_name: String,
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            auth_dir: default_auth_dir(),
            auth_name: default_auth_name(),
            apt_dir: default_apt_dir(),
            apt_name: default_apt_name(),
        }
    }
}

fn default_auth_dir() -> PathBuf {
    PathBuf::from("/var/log")
}

fn default_auth_name() -> String {
    "auth.log".to_string()
}

fn default_apt_dir() -> PathBuf {
    PathBuf::from("/var/log/apt")
}

fn default_apt_name() -> String {
    "history.log".to_string()
}

/// Storage backend selector. Both backends expose identical behavior and
/// differ only in how the time axis is represented on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// `event_time` stored as timezone-aware RFC 3339 text
    Datetime,
    /// `event_time` stored as integer epoch seconds
    Epoch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_backend")]
    pub backend: Backend,
    /// SQLite database file
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: default_db_path(),
        }
    }
}

fn default_backend() -> Backend {
    Backend::Datetime
}

fn default_db_path() -> PathBuf {
    PathBuf::from("system_events.sqlite")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeConfig {
    /// UTC offset the logs were written in, e.g. "+03:00"; host-local when
    /// unset
    #[serde(default)]
    pub source_offset: Option<String>,
    /// UTC offset reports are rendered in; host-local when unset
    #[serde(default)]
    pub display_offset: Option<String>,
}

impl Config {
    /// Load from `path`, falling back to defaults when the file is missing.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("config {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        Ok(config)
    }

    /// Source timezone assumed for naive log timestamps.
    pub fn source_offset(&self) -> Result<FixedOffset> {
        parse_offset(self.time.source_offset.as_deref())
    }

    /// Timezone reports are rendered in.
    pub fn display_offset(&self) -> Result<FixedOffset> {
        parse_offset(self.time.display_offset.as_deref())
    }
}

fn parse_offset(raw: Option<&str>) -> Result<FixedOffset> {
    match raw {
        Some(text) => text
            .parse()
            .with_context(|| format!("invalid UTC offset {text:?} (expected e.g. \"+03:00\")")),
        None => Ok(timeparse::local_offset()),
    }
}
