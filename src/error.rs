//! Error types for portchecker.
//!
//! Uses `thiserror` for ergonomic error definitions.

use crate::types::{PortError, TargetError};
use std::path::PathBuf;
use thiserror::Error;

/// Reasons a scan request is refused before any probing starts.
#[derive(Error, Debug, Clone)]
pub enum RequestError {
    #[error("invalid address '{entry}': {source}")]
    InvalidAddress {
        entry: String,
        #[source]
        source: TargetError,
    },

    #[error("invalid port range: {0}")]
    InvalidPortRange(#[from] PortError),

    #[error("timeout must be greater than zero")]
    ZeroTimeout,

    #[error("worker count must be at least 1")]
    ZeroWorkers,

    #[error("no addresses given")]
    NoAddresses,
}

/// Main error type for the scan engine.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] RequestError),

    #[error("a scan is already running")]
    JobAlreadyActive,

    #[error("no scan is currently running")]
    NoActiveJob,

    #[error("scan worker {worker} failed: {reason}")]
    WorkerFailed { worker: usize, reason: String },
}

impl ScanError {
    /// Whether this error was raised by request validation.
    pub fn is_invalid_request(&self) -> bool {
        matches!(self, Self::InvalidRequest(_))
    }
}

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, ScanError>;

/// Errors raised while loading or saving settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine a configuration directory")]
    DirectoryNotFound,

    #[error("failed to read {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("failed to write {path}: {reason}")]
    WriteFailed { path: PathBuf, reason: String },

    #[error("invalid settings file: {0}")]
    InvalidFormat(String),

    #[error("unknown setting '{key}', expected one of: {expected}")]
    UnknownKey { key: String, expected: String },

    #[error("invalid value '{value}' for setting '{key}'")]
    InvalidValue { key: String, value: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors surfaced by CLI subcommands.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("output error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for CLI operations.
pub type CliResult<T> = Result<T, CliError>;
