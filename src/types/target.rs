//! Address entry types with CIDR and hostname support.
//!
//! An address entry may be:
//! - a single IP address (IPv4 or IPv6)
//! - a CIDR block (192.168.1.0/24, 2001:db8::/120)
//! - a hostname (example.com) that needs forward resolution

use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// A concrete host that will be probed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetHost {
    /// The address entry this host was expanded from.
    pub entry: String,
    /// The concrete IP address.
    pub ip: IpAddr,
}

impl TargetHost {
    /// Create a new target host.
    pub fn new(entry: impl Into<String>, ip: IpAddr) -> Self {
        Self {
            entry: entry.into(),
            ip,
        }
    }
}

impl fmt::Display for TargetHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.entry == self.ip.to_string() {
            write!(f, "{}", self.ip)
        } else {
            write!(f, "{} ({})", self.entry, self.ip)
        }
    }
}

/// Error type for address entry parsing and resolution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    #[error("not an IP address, CIDR block or hostname: {0}")]
    InvalidFormat(String),
    #[error("invalid CIDR notation: {0}")]
    InvalidCidr(String),
    #[error("a /0 prefix is not allowed")]
    ZeroPrefix,
    #[error("CIDR range too large: {0} addresses (max: {1})")]
    CidrTooLarge(u128, u128),
    #[error("failed to resolve hostname '{0}': {1}")]
    DnsResolutionFailed(String, String),
    #[error("no IP addresses found for hostname '{0}'")]
    NoAddressesFound(String),
}

/// Which addresses of a CIDR block are expanded into hosts.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum CidrPolicy {
    /// Every address in the block, network and broadcast included.
    #[default]
    #[value(name = "all")]
    AllAddresses,
    /// Skip the IPv4 network and broadcast addresses (prefixes shorter than /31).
    #[value(name = "hosts")]
    HostsOnly,
}

impl fmt::Display for CidrPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllAddresses => write!(f, "all"),
            Self::HostsOnly => write!(f, "hosts"),
        }
    }
}

impl FromStr for CidrPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" | "all-addresses" => Ok(Self::AllAddresses),
            "hosts" | "hosts-only" => Ok(Self::HostsOnly),
            _ => Err(format!("unknown CIDR policy: {}", s)),
        }
    }
}

/// A parsed address entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSpec {
    /// A single IP address.
    Single(IpAddr),
    /// A CIDR network range.
    Cidr(IpNetwork),
    /// A hostname to be resolved.
    Hostname(String),
}

impl TargetSpec {
    /// Default maximum number of addresses accepted from one CIDR block.
    pub const MAX_CIDR_HOSTS: u128 = 65536; // /16 for IPv4

    /// Parse an address entry, rejecting blocks with more than `max_hosts` addresses.
    pub fn parse(s: &str, max_hosts: u128) -> Result<Self, TargetError> {
        let s = s.trim();

        if let Ok(ip) = s.parse::<IpAddr>() {
            return Ok(Self::Single(ip));
        }

        if s.contains('/') {
            let network: IpNetwork = s
                .parse()
                .map_err(|_| TargetError::InvalidCidr(s.to_string()))?;
            if network.prefix() == 0 {
                return Err(TargetError::ZeroPrefix);
            }

            let host_count = address_count(&network);
            if host_count > max_hosts {
                return Err(TargetError::CidrTooLarge(host_count, max_hosts));
            }

            return Ok(Self::Cidr(network));
        }

        if is_valid_hostname(s) {
            return Ok(Self::Hostname(s.to_string()));
        }

        Err(TargetError::InvalidFormat(s.to_string()))
    }

    /// Addresses this entry stands for without any lookup, in ascending order.
    ///
    /// Returns `None` for hostnames, which need forward resolution.
    pub fn literal_addresses(&self, policy: CidrPolicy) -> Option<Vec<IpAddr>> {
        match self {
            Self::Single(ip) => Some(vec![*ip]),
            Self::Cidr(network) => Some(
                network
                    .iter()
                    .filter(|ip| policy == CidrPolicy::AllAddresses || !is_edge_address(network, ip))
                    .collect(),
            ),
            Self::Hostname(_) => None,
        }
    }

}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(ip) => write!(f, "{}", ip),
            Self::Cidr(network) => write!(f, "{}", network),
            Self::Hostname(hostname) => write!(f, "{}", hostname),
        }
    }
}

fn address_count(network: &IpNetwork) -> u128 {
    let bits: u32 = if network.is_ipv4() { 32 } else { 128 };
    let host_bits = bits - network.prefix() as u32;
    1u128.checked_shl(host_bits).unwrap_or(u128::MAX)
}

/// Network or broadcast address of an IPv4 block with a prefix shorter than /31.
fn is_edge_address(network: &IpNetwork, ip: &IpAddr) -> bool {
    match (network, ip) {
        (IpNetwork::V4(net), IpAddr::V4(addr)) if net.prefix() < 31 => {
            *addr == net.network() || *addr == net.broadcast()
        }
        _ => false,
    }
}

/// Check if a string is a valid hostname.
fn is_valid_hostname(s: &str) -> bool {
    if s.is_empty() || s.len() > 253 {
        return false;
    }

    for label in s.split('.') {
        if label.is_empty() || label.len() > 63 {
            return false;
        }
        if !label.chars().next().is_some_and(|c| c.is_ascii_alphanumeric()) {
            return false;
        }
        if !label.chars().last().is_some_and(|c| c.is_ascii_alphanumeric()) {
            return false;
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return false;
        }
    }

    true
}
