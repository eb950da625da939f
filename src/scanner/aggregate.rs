//! Result aggregation.
//!
//! Merges per-worker buffers in partition order, attaches reverse-DNS names
//! from a per-job cache and optionally sorts by address value then port.

use crate::resolver::HostnameResolver;
use crate::scanner::traits::ScanResult;
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use tracing::debug;

/// Maximum number of reverse lookups in flight at once.
const REVERSE_LOOKUP_CONCURRENCY: usize = 32;

/// Reverse-DNS names of one job, keyed by address.
///
/// Each distinct address is looked up at most once; failures are cached as
/// empty names.
#[derive(Debug, Default)]
pub struct HostnameCache {
    names: HashMap<IpAddr, String>,
}

impl HostnameCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up every address of `results` not already cached.
    pub async fn populate(&mut self, results: &[ScanResult], resolver: &dyn HostnameResolver) {
        let mut queued: HashSet<IpAddr> = HashSet::new();
        let pending: Vec<IpAddr> = results
            .iter()
            .map(|result| result.address)
            .filter(|ip| !self.names.contains_key(ip) && queued.insert(*ip))
            .collect();
        if pending.is_empty() {
            return;
        }

        debug!(hosts = pending.len(), "resolving host names");
        let resolved: Vec<(IpAddr, Option<String>)> = stream::iter(pending)
            .map(|ip| async move { (ip, resolver.reverse(ip).await) })
            .buffer_unordered(REVERSE_LOOKUP_CONCURRENCY)
            .collect()
            .await;

        for (ip, name) in resolved {
            self.names.insert(ip, name.unwrap_or_default());
        }
    }

    /// Cached name for `ip`, empty when unknown.
    pub fn get(&self, ip: &IpAddr) -> &str {
        self.names.get(ip).map(String::as_str).unwrap_or("")
    }

    /// Number of distinct addresses looked up so far.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether no lookup has been made.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Merges worker buffers into the final result list.
pub struct ResultAggregator<'a> {
    resolver: Option<&'a dyn HostnameResolver>,
    sort: bool,
}

impl<'a> ResultAggregator<'a> {
    /// Create an aggregator; `resolver` is `None` when host names are not wanted.
    pub fn new(resolver: Option<&'a dyn HostnameResolver>, sort: bool) -> Self {
        Self { resolver, sort }
    }

    /// Concatenate `buffers` in order, attach host names and sort if requested.
    pub async fn aggregate(&self, buffers: Vec<Vec<ScanResult>>) -> Vec<ScanResult> {
        let mut results: Vec<ScanResult> = buffers.into_iter().flatten().collect();

        if let Some(resolver) = self.resolver {
            let mut cache = HostnameCache::new();
            cache.populate(&results, resolver).await;
            for result in &mut results {
                result.host_name = cache.get(&result.address).to_string();
            }
        }

        if self.sort {
            sort_results(&mut results);
        }
        results
    }
}

/// Order by address value (IPv4 before IPv6, numeric within a family), then port.
pub fn sort_results(results: &mut [ScanResult]) {
    results.sort_by(|a, b| a.address.cmp(&b.address).then(a.port.cmp(&b.port)));
}
