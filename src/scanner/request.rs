//! Validated scan requests.

use crate::error::RequestError;
use crate::types::PortRange;
use serde::Serialize;
use std::time::Duration;

/// An accepted scan request. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanRequest {
    addresses: Vec<String>,
    ports: PortRange,
    #[serde(rename = "timeout_ms", serialize_with = "serialize_millis")]
    timeout: Duration,
    workers: usize,
    sort: bool,
}

impl ScanRequest {
    /// Validate the raw request parameters.
    ///
    /// Address entries are only checked for presence here; parsing and
    /// resolution happen when the engine expands them.
    pub fn new<I, S>(
        addresses: I,
        start_port: u32,
        end_port: u32,
        timeout_ms: u64,
        worker_count: usize,
        sort: bool,
    ) -> Result<Self, RequestError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let addresses: Vec<String> = addresses.into_iter().map(Into::into).collect();
        if addresses.is_empty() {
            return Err(RequestError::NoAddresses);
        }
        let ports = PortRange::new(start_port, end_port)?;
        if timeout_ms == 0 {
            return Err(RequestError::ZeroTimeout);
        }
        if worker_count == 0 {
            return Err(RequestError::ZeroWorkers);
        }

        Ok(Self {
            addresses,
            ports,
            timeout: Duration::from_millis(timeout_ms),
            workers: worker_count,
            sort,
        })
    }

    /// Address entries in submission order.
    pub fn addresses(&self) -> &[String] {
        &self.addresses
    }

    /// Inclusive port range.
    pub fn ports(&self) -> PortRange {
        self.ports
    }

    /// Per-probe deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Requested worker count.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Whether results are sorted by address then port.
    pub fn sort(&self) -> bool {
        self.sort
    }
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}
