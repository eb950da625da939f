//! Scanner trait abstractions and result records.
//!
//! The probing mechanism and the progress sink are traits so the coordinator
//! can be driven by fakes in tests and by a progress bar in the CLI.

use crate::scanner::job::JobState;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Status of a probed port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortStatus {
    /// The TCP handshake completed.
    Open,
    /// The connection was actively refused.
    Closed,
    /// No definitive answer within the timeout (commonly filtered).
    Unknown,
}

impl fmt::Display for PortStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "Open"),
            Self::Closed => write!(f, "Closed"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Result of probing a single (host, port) unit.
///
/// Serializes to the record shape consumed by the shell:
/// `{ address, port, hostName, portStatus, scanDate }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    /// The probed address.
    pub address: IpAddr,
    /// The probed port.
    pub port: u16,
    /// Reverse-DNS name of the address, empty when unknown.
    pub host_name: String,
    /// Classification of the port.
    pub port_status: PortStatus,
    /// When the probe finished.
    pub scan_date: DateTime<Utc>,
}

impl ScanResult {
    /// Create a result stamped with the current time and no host name.
    pub fn new(address: IpAddr, port: u16, port_status: PortStatus) -> Self {
        Self {
            address,
            port,
            host_name: String::new(),
            port_status,
            scan_date: Utc::now(),
        }
    }

    /// Set the host name.
    pub fn with_host_name(mut self, host_name: impl Into<String>) -> Self {
        self.host_name = host_name.into();
        self
    }

    /// Check if the port is open.
    pub fn is_open(&self) -> bool {
        self.port_status == PortStatus::Open
    }
}

/// Classifies one socket address.
///
/// Implementations never fail: every ambiguous outcome maps to
/// [`PortStatus::Unknown`].
#[async_trait]
pub trait PortProber: Send + Sync {
    /// Probe `addr`, giving up after `timeout`.
    async fn probe(&self, addr: SocketAddr, timeout: Duration) -> PortStatus;
}

/// Receives progress notifications from scan workers.
///
/// Called concurrently from every worker, so implementations must be cheap
/// and thread-safe.
pub trait ProgressObserver: Send + Sync {
    /// A job is about to start probing `total_units` units.
    fn on_start(&self, _total_units: u64) {}

    /// A unit finished; `completed` is the job-wide count including it.
    fn on_unit(&self, _result: &ScanResult, _completed: u64) {}

    /// The job reached its final state.
    fn on_finish(&self, _state: JobState) {}
}

/// Observer that ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_port_status_display() {
        assert_eq!(PortStatus::Open.to_string(), "Open");
        assert_eq!(PortStatus::Closed.to_string(), "Closed");
        assert_eq!(PortStatus::Unknown.to_string(), "Unknown");
    }

    #[test]
    fn test_result_record_shape() {
        let result = ScanResult::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 80, PortStatus::Open)
            .with_host_name("localhost");
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["address"], "127.0.0.1");
        assert_eq!(json["port"], 80);
        assert_eq!(json["hostName"], "localhost");
        assert_eq!(json["portStatus"], "Open");
        let date = json["scanDate"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(date).is_ok());
    }

    #[test]
    fn test_result_is_open() {
        let ip = IpAddr::V4(Ipv4Addr::LOCALHOST);
        assert!(ScanResult::new(ip, 22, PortStatus::Open).is_open());
        assert!(!ScanResult::new(ip, 23, PortStatus::Unknown).is_open());
    }
}
