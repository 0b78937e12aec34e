//! Remote hosts lists.
//!
//! Sources are tried in priority order; the first body that looks like a
//! hosts list wins. A body is plausible if its first 200 characters contain
//! a `#` or the configured keyword. Pairs are extracted with a loose
//! `address hostname` pattern and kept only when the domain contains the
//! keyword.

use std::net::Ipv4Addr;
use std::sync::LazyLock;
use std::time::Duration;

use hostpin_common::config::RemoteConfig;
use hostpin_common::network::target::HostEntry;
use regex::Regex;
use reqwest::Client;
use tracing::{debug, info, warn};

use super::SourceError;

const PLAUSIBILITY_WINDOW: usize = 200;
const INITIAL_BACKOFF: Duration = Duration::from_millis(500);

static PAIR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([\d.]+)\s+([A-Za-z0-9.-]+)").expect("valid hosts pair pattern"));

#[derive(Debug, Clone)]
pub struct RemoteHosts {
    pub url: String,
    pub entries: Vec<HostEntry>,
}

pub struct RemoteSource {
    client: Client,
    urls: Vec<String>,
    keyword: String,
    retries: u32,
}

impl RemoteSource {
    pub fn from_config(cfg: &RemoteConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .connect_timeout(cfg.connect_timeout())
            .timeout(cfg.request_timeout())
            .build()?;

        Ok(Self {
            client,
            urls: cfg.urls.clone(),
            keyword: cfg.keyword.clone(),
            retries: cfg.retries,
        })
    }

    /// Restricts fetching to one URL.
    pub fn pinned(mut self, url: impl Into<String>) -> Self {
        self.urls = vec![url.into()];
        self
    }

    /// Restricts fetching to the 1-based `index` of the configured list.
    pub fn pinned_index(self, index: usize) -> Result<Self, SourceError> {
        let available = self.urls.len();
        match index.checked_sub(1).and_then(|i| self.urls.get(i)).cloned() {
            Some(url) => Ok(self.pinned(url)),
            None => Err(SourceError::UnknownSource { index, available }),
        }
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub async fn fetch(&self) -> Result<RemoteHosts, SourceError> {
        for url in &self.urls {
            let Some(body) = self.get_with_retries(url).await else {
                continue;
            };
            if !looks_plausible(&body, &self.keyword) {
                warn!("{url} did not return a hosts list, trying next source");
                continue;
            }

            let entries = parse_pairs(&body, &self.keyword);
            info!("fetched {} entries from {url}", entries.len());
            return Ok(RemoteHosts {
                url: url.clone(),
                entries,
            });
        }

        Err(SourceError::NoUsableSource {
            tried: self.urls.len(),
        })
    }

    async fn get_with_retries(&self, url: &str) -> Option<String> {
        let mut backoff = INITIAL_BACKOFF;

        for attempt in 0..=self.retries {
            if attempt > 0 {
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }

            match self.client.get(url).send().await {
                Ok(resp) if resp.status().is_success() => match resp.text().await {
                    Ok(body) => return Some(body),
                    Err(err) => debug!("{url}: reading body failed: {err}"),
                },
                Ok(resp) if resp.status().is_server_error() => {
                    debug!("{url}: server error {}", resp.status());
                }
                Ok(resp) => {
                    warn!("{url}: http {}", resp.status());
                    return None;
                }
                Err(err) => debug!("{url}: request failed: {err}"),
            }
        }

        warn!("{url}: giving up after {} attempts", self.retries + 1);
        None
    }
}

pub fn looks_plausible(body: &str, keyword: &str) -> bool {
    let head: String = body.chars().take(PLAUSIBILITY_WINDOW).collect();
    head.contains('#') || (!keyword.is_empty() && head.to_lowercase().contains(&keyword.to_lowercase()))
}

/// Extracts IPv4 pairs whose domain contains `keyword` (case-insensitive).
///
/// An empty keyword keeps everything.
pub fn parse_pairs(body: &str, keyword: &str) -> Vec<HostEntry> {
    let keyword = keyword.to_lowercase();

    PAIR_PATTERN
        .captures_iter(body)
        .filter_map(|caps| {
            let ip = caps[1].parse::<Ipv4Addr>().ok()?;
            let domain = &caps[2];
            if !keyword.is_empty() && !domain.to_lowercase().contains(&keyword) {
                return None;
            }
            Some(HostEntry::new(ip.into(), domain))
        })
        .collect()
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
