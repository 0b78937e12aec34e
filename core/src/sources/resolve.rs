//! Direct resolution of domains through the system resolver.
//!
//! Only IPv4 answers are kept, since the managed block pins IPv4 addresses.
//! Lookups run concurrently; results come back grouped by domain in input
//! order regardless of completion order.

use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;

use hostpin_common::network::target::HostEntry;
use tokio::net::lookup_host;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

pub async fn resolve_domains(domains: &[String], concurrency: usize) -> Vec<HostEntry> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();

    for (index, domain) in domains.iter().enumerate() {
        let domain = domain.trim().to_string();
        if domain.is_empty() {
            continue;
        }
        let semaphore = semaphore.clone();
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            (index, domain.clone(), resolve_v4(&domain).await)
        });
    }

    let mut per_domain: Vec<Option<(String, Vec<IpAddr>)>> = vec![None; domains.len()];
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, domain, ips)) => per_domain[index] = Some((domain, ips)),
            Err(err) => warn!("resolver task ended abnormally: {err}"),
        }
    }

    per_domain
        .into_iter()
        .flatten()
        .flat_map(|(domain, ips)| {
            ips.into_iter()
                .map(move |ip| HostEntry::new(ip, domain.clone()))
        })
        .collect()
}

async fn resolve_v4(domain: &str) -> Vec<IpAddr> {
    match lookup_host((domain, 0)).await {
        Ok(addrs) => {
            let mut seen = HashSet::new();
            addrs
                .map(|a| a.ip())
                .filter(|ip| ip.is_ipv4() && seen.insert(*ip))
                .collect()
        }
        Err(err) => {
            debug!("resolving {domain} failed: {err}");
            Vec::new()
        }
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[tokio::test]
    async fn localhost_resolves_to_loopback_v4_only() {
        let entries = resolve_domains(&["localhost".to_string(), "  ".to_string()], 4).await;

        assert!(!entries.is_empty());
        assert!(entries.iter().all(|e| e.domain == "localhost" && e.ip.is_ipv4()));
        assert!(entries.iter().any(|e| e.ip == IpAddr::V4(Ipv4Addr::LOCALHOST)));
    }

    #[tokio::test]
    async fn empty_input_resolves_nothing() {
        assert!(resolve_domains(&[], 20).await.is_empty());
    }

    #[tokio::test]
    #[ignore = "requires internet access"]
    async fn resolves_public_domains_in_input_order() {
        let domains = vec!["github.com".to_string(), "example.com".to_string()];
        let entries = resolve_domains(&domains, 20).await;
        let first_example = entries.iter().position(|e| e.domain == "example.com").unwrap();
        assert!(entries[..first_example].iter().all(|e| e.domain == "github.com"));
    }
}
