//! # portchecker - A Concurrent TCP Port Checker
//!
//! portchecker probes a range of TCP ports on a set of addresses with a
//! pool of workers and reports every port as open, closed or unknown.
//!
//! ## Features
//!
//! - **Flexible Targeting**: Single IPs, hostnames, and IPv4/IPv6 CIDR blocks
//! - **Worker Pool**: The (host, port) sequence is split into one contiguous
//!   share per worker
//! - **Cooperative Cancellation**: Stop a running scan and keep the units
//!   already probed
//! - **Reverse DNS**: Host names are resolved once per distinct address
//! - **Progress Reporting**: Job-wide counter and observer callbacks
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use portchecker::{EngineConfig, ScanEngine, ScanRequest};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let engine = ScanEngine::new(EngineConfig::default());
//!     let request = ScanRequest::new(["127.0.0.1"], 20, 25, 300, 4, true)?;
//!
//!     for result in engine.scan(&request).await? {
//!         println!("{}:{} is {}", result.address, result.port, result.port_status);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`types`] - Port ranges, address specifications and job identifiers
//! - [`scanner`] - The scan engine, probing and result aggregation
//! - [`resolver`] - Forward and reverse DNS
//! - [`config`] - Persisted user settings
//! - [`error`] - Error types
//! - [`cli`] and [`output`] - The command-line shell

pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod resolver;
pub mod scanner;
pub mod types;

// Re-export commonly used types
pub use error::{CliError, ConfigError, RequestError, ScanError};
pub use scanner::{
    number_of_logical_processors, EngineConfig, JobProgress, JobState, PortProber, PortStatus,
    ProgressObserver, ScanEngine, ScanReport, ScanRequest, ScanResult,
};
pub use types::{CidrPolicy, JobId, PortRange, TargetSpec};
