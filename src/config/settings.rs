//! Application settings and paths.
//!
//! Preferences of the CLI shell, stored as JSON under the XDG configuration
//! directory.

use crate::error::{ConfigError, ConfigResult};
use crate::scanner::{number_of_logical_processors, EngineConfig};
use crate::types::{CidrPolicy, TargetSpec};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Application directory paths following the XDG Base Directory Specification.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Configuration directory (~/.config/portchecker)
    pub config_dir: PathBuf,
}

impl Paths {
    /// Locate the configuration directory without creating it.
    pub fn discover() -> ConfigResult<Self> {
        let project = ProjectDirs::from("com", "portchecker", "portchecker")
            .ok_or(ConfigError::DirectoryNotFound)?;

        Ok(Self {
            config_dir: project.config_dir().to_path_buf(),
        })
    }

    /// Get the path to the settings file.
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }
}

/// User preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Default worker count.
    pub workers: usize,
    /// Default per-probe timeout in milliseconds.
    pub timeout_ms: u64,
    /// Sort results by address then port.
    pub sort: bool,
    /// Show closed ports in results.
    pub show_closed: bool,
    /// Show ports with an unknown status in results.
    pub show_unknown: bool,
    /// Look up host names of probed addresses.
    pub reverse_dns: bool,
    /// Which addresses of a CIDR block are probed.
    pub cidr_policy: CidrPolicy,
    /// Largest CIDR block accepted, in addresses.
    pub max_cidr_hosts: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            workers: number_of_logical_processors(),
            timeout_ms: 300,
            sort: true,
            show_closed: true,
            show_unknown: true,
            reverse_dns: true,
            cidr_policy: CidrPolicy::AllAddresses,
            max_cidr_hosts: TargetSpec::MAX_CIDR_HOSTS as u64,
        }
    }
}

impl AppSettings {
    /// Keys accepted by [`AppSettings::set`].
    pub const KEYS: &'static [&'static str] = &[
        "workers",
        "timeout",
        "sort",
        "show-closed",
        "show-unknown",
        "reverse-dns",
        "cidr-policy",
        "max-cidr-hosts",
    ];

    /// Load settings from `path`, or the default location when `None`.
    ///
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let file = resolve_path(path)?;
        if !file.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&file).map_err(|e| ConfigError::ReadFailed {
            path: file.clone(),
            reason: e.to_string(),
        })?;

        serde_json::from_str(&content).map_err(|e| ConfigError::InvalidFormat(e.to_string()))
    }

    /// Save settings to `path`, or the default location when `None`.
    pub fn save(&self, path: Option<&Path>) -> ConfigResult<PathBuf> {
        let file = resolve_path(path)?;
        if let Some(dir) = file.parent() {
            fs::create_dir_all(dir)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(&file, content).map_err(|e| ConfigError::WriteFailed {
            path: file.clone(),
            reason: e.to_string(),
        })?;
        Ok(file)
    }

    /// Update one setting from its textual form.
    pub fn set(&mut self, key: &str, value: &str) -> ConfigResult<()> {
        let invalid = || ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };

        match key {
            "workers" => {
                self.workers = value.parse::<usize>().ok().filter(|&n| n > 0).ok_or_else(invalid)?;
            }
            "timeout" => {
                self.timeout_ms = value.parse::<u64>().ok().filter(|&n| n > 0).ok_or_else(invalid)?;
            }
            "sort" => self.sort = parse_bool(value).ok_or_else(invalid)?,
            "show-closed" => self.show_closed = parse_bool(value).ok_or_else(invalid)?,
            "show-unknown" => self.show_unknown = parse_bool(value).ok_or_else(invalid)?,
            "reverse-dns" => self.reverse_dns = parse_bool(value).ok_or_else(invalid)?,
            "cidr-policy" => self.cidr_policy = value.parse::<CidrPolicy>().map_err(|_| invalid())?,
            "max-cidr-hosts" => {
                self.max_cidr_hosts = value.parse::<u64>().ok().filter(|&n| n > 0).ok_or_else(invalid)?;
            }
            _ => {
                return Err(ConfigError::UnknownKey {
                    key: key.to_string(),
                    expected: Self::KEYS.join(", "),
                })
            }
        }
        Ok(())
    }

    /// Engine configuration derived from these settings.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::default()
            .with_cidr_policy(self.cidr_policy)
            .with_max_cidr_hosts(self.max_cidr_hosts as u128)
            .with_reverse_dns(self.reverse_dns)
    }
}

fn resolve_path(path: Option<&Path>) -> ConfigResult<PathBuf> {
    match path {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(Paths::discover()?.settings_file()),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}
