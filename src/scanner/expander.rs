//! Address expansion.
//!
//! Turns the raw address entries of a request into the ordered, deduplicated
//! list of hosts to probe. Every entry is validated before any name is
//! resolved, and a single bad entry fails the whole request.

use crate::error::RequestError;
use crate::resolver::HostnameResolver;
use crate::types::{CidrPolicy, TargetHost, TargetSpec};
use std::collections::HashSet;
use std::net::IpAddr;
use tracing::debug;

/// Expands address entries into target hosts.
#[derive(Debug, Clone, Copy)]
pub struct AddressExpander {
    policy: CidrPolicy,
    max_cidr_hosts: u128,
}

impl Default for AddressExpander {
    fn default() -> Self {
        Self::new(CidrPolicy::default(), TargetSpec::MAX_CIDR_HOSTS)
    }
}

impl AddressExpander {
    /// Create an expander with the given CIDR policy and block size cap.
    pub fn new(policy: CidrPolicy, max_cidr_hosts: u128) -> Self {
        Self {
            policy,
            max_cidr_hosts,
        }
    }

    /// Parse every entry without resolving anything.
    pub fn parse_all<S: AsRef<str>>(
        &self,
        entries: &[S],
    ) -> Result<Vec<(String, TargetSpec)>, RequestError> {
        if entries.is_empty() {
            return Err(RequestError::NoAddresses);
        }

        entries
            .iter()
            .map(|entry| {
                let entry = entry.as_ref().trim().to_string();
                TargetSpec::parse(&entry, self.max_cidr_hosts)
                    .map(|spec| (entry.clone(), spec))
                    .map_err(|source| RequestError::InvalidAddress { entry, source })
            })
            .collect()
    }

    /// Expand `entries` into hosts, resolving hostnames through `resolver`.
    ///
    /// Hosts keep the order of their first appearance.
    pub async fn expand<S: AsRef<str>>(
        &self,
        entries: &[S],
        resolver: &dyn HostnameResolver,
    ) -> Result<Vec<TargetHost>, RequestError> {
        let specs = self.parse_all(entries)?;

        let mut seen: HashSet<IpAddr> = HashSet::new();
        let mut hosts = Vec::new();

        for (entry, spec) in specs {
            let addresses = match spec.literal_addresses(self.policy) {
                Some(addresses) => addresses,
                None => {
                    let resolved = resolver.lookup(&entry).await.map_err(|source| {
                        RequestError::InvalidAddress {
                            entry: entry.clone(),
                            source,
                        }
                    })?;
                    debug!(%entry, addresses = ?resolved, "resolved hostname");
                    // Only the first address of a hostname is probed.
                    resolved.into_iter().take(1).collect()
                }
            };

            for ip in addresses {
                if seen.insert(ip) {
                    hosts.push(TargetHost::new(entry.clone(), ip));
                }
            }
        }

        Ok(hosts)
    }
}
