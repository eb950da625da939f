//! Static work partitioning.
//!
//! The global unit sequence (hosts in expansion order, ports ascending within
//! each host) is cut into contiguous shares, one per worker. Share sizes
//! differ by at most one unit and no worker is ever left without work.

use crate::types::{PortRange, TargetHost};
use std::net::SocketAddr;
use std::ops::Range;
use std::sync::Arc;

/// A contiguous slice of the unit sequence assigned to one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Share {
    /// Index of the worker owning this share.
    pub worker: usize,
    /// Global index of the first unit.
    pub offset: u64,
    /// Number of units in the share.
    pub len: u64,
}

impl Share {
    /// Global unit indices covered by this share.
    pub fn range(&self) -> Range<u64> {
        self.offset..self.offset + self.len
    }
}

/// Split `total_units` among at most `worker_count` workers.
///
/// The effective worker count is `min(worker_count, total_units)`. The first
/// `total % effective` workers receive one extra unit.
pub fn partition(total_units: u64, worker_count: usize) -> Vec<Share> {
    let effective = (worker_count as u64).min(total_units);
    if effective == 0 {
        return Vec::new();
    }

    let base = total_units / effective;
    let remainder = total_units - base * effective;

    let mut shares = Vec::with_capacity(effective as usize);
    let mut offset = 0;
    for worker in 0..effective {
        let len = if worker < remainder { base + 1 } else { base };
        shares.push(Share {
            worker: worker as usize,
            offset,
            len,
        });
        offset += len;
    }
    shares
}

/// One (host, port) pair to probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanUnit<'a> {
    /// Host to probe.
    pub host: &'a TargetHost,
    /// Port to probe.
    pub port: u16,
}

impl ScanUnit<'_> {
    /// Socket address of this unit.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host.ip, self.port)
    }
}

/// The ordered unit sequence of a job, computed by index rather than stored.
#[derive(Debug, Clone)]
pub struct UnitSequence {
    hosts: Arc<[TargetHost]>,
    ports: PortRange,
}

impl UnitSequence {
    /// Create the sequence for `hosts` × `ports`.
    pub fn new(hosts: Vec<TargetHost>, ports: PortRange) -> Self {
        Self {
            hosts: hosts.into(),
            ports,
        }
    }

    /// Total number of units.
    pub fn len(&self) -> u64 {
        self.hosts.len() as u64 * self.ports.len() as u64
    }

    /// Whether there is nothing to probe.
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Unit at global `index`.
    pub fn get(&self, index: u64) -> Option<ScanUnit<'_>> {
        let per_host = self.ports.len() as u64;
        let host = self.hosts.get(usize::try_from(index / per_host).ok()?)?;
        let port = self.ports.nth((index % per_host) as u32)?;
        Some(ScanUnit { host, port })
    }

    /// Units covered by `share`, in sequence order.
    pub fn units(&self, share: Share) -> impl Iterator<Item = ScanUnit<'_>> + '_ {
        share.range().filter_map(move |index| self.get(index))
    }
}
