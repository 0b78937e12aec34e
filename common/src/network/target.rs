//! # Probe Target Model
//!
//! Candidate addresses arrive as `(ip, domain)` pairs from several sources
//! (remote hosts lists, direct resolution, manual input). Each distinct IP is
//! probed exactly once, so the pairs are grouped into [`ProbeTarget`]s.
//!
//! A [`HostEntry`] can be parsed from text in either of these forms:
//! * **Assignment**: `192.30.255.113=github.com`
//! * **Hosts line**: `192.30.255.113 github.com`

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// A single `(ip, domain)` pair, the unit that ends up as one hosts line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostEntry {
    pub ip: IpAddr,
    pub domain: String,
}

impl HostEntry {
    pub fn new(ip: IpAddr, domain: impl Into<String>) -> Self {
        Self {
            ip,
            domain: domain.into(),
        }
    }

    /// Renders the entry the way it is written inside the managed block.
    pub fn hosts_line(&self) -> String {
        format!("{} {}", self.ip, self.domain)
    }
}

impl fmt::Display for HostEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.ip, self.domain)
    }
}

impl FromStr for HostEntry {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (ip_str, domain) = s
            .split_once('=')
            .or_else(|| s.split_once(char::is_whitespace))
            .ok_or_else(|| format!("expected '<ip>=<domain>', got '{s}'"))?;

        let ip = ip_str
            .trim()
            .parse::<IpAddr>()
            .map_err(|e| format!("invalid IP '{}': {e}", ip_str.trim()))?;

        let domain = domain.trim();
        if domain.is_empty() || domain.contains(char::is_whitespace) {
            return Err(format!("invalid domain in '{s}'"));
        }

        Ok(HostEntry::new(ip, domain))
    }
}

/// One unique IP together with every domain that pointed at it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    pub ip: IpAddr,
    /// First-seen order, no duplicates.
    pub domains: Vec<String>,
}

/// Merges candidate pairs into one [`ProbeTarget`] per unique IP.
///
/// Exact duplicate pairs are dropped (first occurrence wins). IPs keep the
/// order in which they were first seen, and so do the domains inside a target.
/// Domains are trimmed; pairs left with an empty domain are skipped.
pub fn deduplicate<I>(pairs: I) -> Vec<ProbeTarget>
where
    I: IntoIterator<Item = HostEntry>,
{
    let mut seen: HashSet<(IpAddr, String)> = HashSet::new();
    let mut index_by_ip: HashMap<IpAddr, usize> = HashMap::new();
    let mut targets: Vec<ProbeTarget> = Vec::new();

    for entry in pairs {
        let domain = entry.domain.trim();
        if domain.is_empty() || !seen.insert((entry.ip, domain.to_string())) {
            continue;
        }

        let idx = *index_by_ip.entry(entry.ip).or_insert_with(|| {
            targets.push(ProbeTarget {
                ip: entry.ip,
                domains: Vec::new(),
            });
            targets.len() - 1
        });
        targets[idx].domains.push(domain.to_string());
    }

    targets
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
