//! Forward and reverse name resolution.
//!
//! The engine resolves hostnames before a job starts and looks up one
//! reverse-DNS name per distinct host after probing. Both go through the
//! [`HostnameResolver`] trait so tests can count and script lookups.

use crate::types::TargetError;
use async_trait::async_trait;
use std::net::IpAddr;
use std::time::Duration;
use tracing::{debug, warn};
use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};
use trust_dns_resolver::TokioAsyncResolver;

/// Name resolution used by the scan engine.
#[async_trait]
pub trait HostnameResolver: Send + Sync {
    /// Resolve `hostname` to its addresses.
    async fn lookup(&self, hostname: &str) -> Result<Vec<IpAddr>, TargetError>;

    /// Reverse-resolve `ip`; `None` when no name is found.
    async fn reverse(&self, ip: IpAddr) -> Option<String>;
}

/// [`HostnameResolver`] backed by `trust-dns-resolver`.
pub struct DnsResolver {
    resolver: TokioAsyncResolver,
}

impl DnsResolver {
    /// Per-query timeout; lookups are never retried.
    pub const QUERY_TIMEOUT: Duration = Duration::from_secs(2);

    /// Build a resolver from the system configuration, falling back to the
    /// library defaults when it cannot be read.
    pub fn from_system_conf() -> Self {
        let (config, opts) = match trust_dns_resolver::system_conf::read_system_conf() {
            Ok(conf) => conf,
            Err(e) => {
                warn!(error = %e, "could not read system resolver configuration, using defaults");
                (ResolverConfig::default(), ResolverOpts::default())
            }
        };
        Self::with_config(config, opts)
    }

    /// Build a resolver with an explicit configuration.
    pub fn with_config(config: ResolverConfig, mut opts: ResolverOpts) -> Self {
        opts.timeout = Self::QUERY_TIMEOUT;
        opts.attempts = 1;
        Self {
            resolver: TokioAsyncResolver::tokio(config, opts),
        }
    }
}

impl std::fmt::Debug for DnsResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DnsResolver").finish_non_exhaustive()
    }
}

#[async_trait]
impl HostnameResolver for DnsResolver {
    async fn lookup(&self, hostname: &str) -> Result<Vec<IpAddr>, TargetError> {
        let response = self
            .resolver
            .lookup_ip(hostname)
            .await
            .map_err(|e| TargetError::DnsResolutionFailed(hostname.to_string(), e.to_string()))?;

        let ips: Vec<IpAddr> = response.iter().collect();
        if ips.is_empty() {
            return Err(TargetError::NoAddressesFound(hostname.to_string()));
        }
        Ok(ips)
    }

    async fn reverse(&self, ip: IpAddr) -> Option<String> {
        match self.resolver.reverse_lookup(ip).await {
            Ok(names) => names
                .iter()
                .next()
                .map(|name| name.to_string().trim_end_matches('.').to_string()),
            Err(e) => {
                debug!(%ip, error = %e, "reverse lookup failed");
                None
            }
        }
    }
}
