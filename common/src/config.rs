//! # Configuration
//!
//! A single [`Config`] value is loaded once by the binary and handed to every
//! component explicitly. It is stored as camelCase JSON; every field has a
//! default so a partial (or missing) file still loads.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::markers::Markers;

pub const APP_NAME: &str = "HostPin";
pub const DEFAULT_MARKER_LABEL: &str = "HostPin";
const CONFIG_DIR_NAME: &str = "hostpin";
const CONFIG_FILE_NAME: &str = "config.json";

pub const DEFAULT_REMOTE_URLS: &[&str] = &[
    "https://github-hosts.tinsfox.com/hosts",
    "https://raw.hellogithub.com/hosts",
    "https://raw.githubusercontent.com/521xueweihan/GitHub520/main/hosts",
    "https://fastly.jsdelivr.net/gh/521xueweihan/GitHub520@main/hosts",
    "https://cdn.jsdelivr.net/gh/521xueweihan/GitHub520@main/hosts",
    "https://ghproxy.com/https://raw.githubusercontent.com/521xueweihan/GitHub520/main/hosts",
    "https://gitlab.com/ineo6/hosts/-/raw/master/hosts",
];

pub const DEFAULT_PRESETS: &[&str] = &["github.com", "bitbucket.org", "bilibili.com", "baidu.com"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// The live hosts file.
    pub hosts_path: PathBuf,
    /// Where timestamped snapshots are written before every commit.
    pub backup_dir: PathBuf,
    /// Text embedded into the start/end marker lines.
    pub marker_label: String,
    pub remote: RemoteConfig,
    pub probe: ProbeConfig,
    /// Minimum delay between two re-sorts of the result view.
    pub sort_interval_ms: u64,
    /// How many domains are resolved concurrently.
    pub resolve_concurrency: usize,
    pub presets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RemoteConfig {
    /// Tried in order; the first plausible body wins.
    pub urls: Vec<String>,
    /// Only pairs whose domain contains this keyword are kept.
    pub keyword: String,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub retries: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProbeConfig {
    pub port: u16,
    pub attempts: u32,
    pub connect_timeout_ms: u64,
    pub attempt_pause_ms: u64,
    /// Ping the IP when every TCP attempt failed.
    pub fallback: bool,
    pub fallback_timeout_ms: u64,
    pub max_concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hosts_path: default_hosts_path(),
            backup_dir: default_backup_dir(),
            marker_label: DEFAULT_MARKER_LABEL.to_string(),
            remote: RemoteConfig::default(),
            probe: ProbeConfig::default(),
            sort_interval_ms: 200,
            resolve_concurrency: 20,
            presets: DEFAULT_PRESETS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            urls: DEFAULT_REMOTE_URLS.iter().map(|s| s.to_string()).collect(),
            keyword: "github".to_string(),
            connect_timeout_ms: 5_000,
            request_timeout_ms: 15_000,
            retries: 2,
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            port: 443,
            attempts: 3,
            connect_timeout_ms: 2_000,
            attempt_pause_ms: 10,
            fallback: true,
            fallback_timeout_ms: 2_000,
            max_concurrency: 60,
        }
    }
}

impl Config {
    /// Loads the config from `path`, or from the default location when `None`.
    ///
    /// A missing file is not an error and yields the defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => default_config_path(),
        };

        if !path.exists() {
            debug!("no config at {}, using defaults", path.display());
            return Ok(Config::default());
        }

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let cfg: Config = serde_json::from_str(&raw)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(cfg)
    }

    pub fn save(&self, path: Option<&Path>) -> anyhow::Result<PathBuf> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => default_config_path(),
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating config dir {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json).with_context(|| format!("writing config {}", path.display()))?;
        Ok(path)
    }

    pub fn markers(&self) -> Markers {
        Markers::for_label(&self.marker_label)
    }

    pub fn sort_interval(&self) -> Duration {
        Duration::from_millis(self.sort_interval_ms)
    }

    /// Adds a preset domain (trimmed, lowercased). Returns `false` if it was
    /// empty or already present.
    pub fn add_preset(&mut self, domain: &str) -> bool {
        let domain = domain.trim().to_lowercase();
        if domain.is_empty() || self.presets.contains(&domain) {
            return false;
        }
        self.presets.push(domain);
        true
    }

    pub fn remove_preset(&mut self, domain: &str) -> bool {
        let domain = domain.trim().to_lowercase();
        let before = self.presets.len();
        self.presets.retain(|p| *p != domain);
        before != self.presets.len()
    }
}

impl RemoteConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl ProbeConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn attempt_pause(&self) -> Duration {
        Duration::from_millis(self.attempt_pause_ms)
    }

    pub fn fallback_timeout(&self) -> Duration {
        Duration::from_millis(self.fallback_timeout_ms)
    }
}

pub fn default_config_path() -> PathBuf {
    let mut dir = dirs_next::config_dir().unwrap_or_else(|| PathBuf::from("."));
    dir.push(CONFIG_DIR_NAME);
    dir.push(CONFIG_FILE_NAME);
    dir
}

pub fn default_hosts_path() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from(r"C:\Windows\System32\drivers\etc\hosts")
    } else {
        PathBuf::from("/etc/hosts")
    }
}

/// `<local data dir>/HostPin/hosts_backups`, falling back to the home directory.
pub fn default_backup_dir() -> PathBuf {
    let mut dir = dirs_next::data_local_dir()
        .or_else(dirs_next::home_dir)
        .unwrap_or_else(|| PathBuf::from("."));
    dir.push(APP_NAME);
    dir.push("hosts_backups");
    dir
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

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "markerLabel": "Pinned", "probe": { "attempts": 5 } }"#).unwrap();

        let cfg = Config::load(Some(&path)).unwrap();

        assert_eq!(cfg.marker_label, "Pinned");
        assert_eq!(cfg.probe.attempts, 5);
        assert_eq!(cfg.probe.port, 443);
        assert_eq!(cfg.remote.urls.len(), DEFAULT_REMOTE_URLS.len());
        assert_eq!(cfg.markers().start, "# === Pinned Start ===");
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load(Some(&dir.path().join("absent.json"))).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn saved_presets_survive_a_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut cfg = Config::default();
        assert!(cfg.add_preset("  Example.ORG "));
        assert!(!cfg.add_preset("example.org"));
        assert!(cfg.remove_preset("baidu.com"));
        cfg.save(Some(&path)).unwrap();

        let reloaded = Config::load(Some(&path)).unwrap();
        assert!(reloaded.presets.contains(&"example.org".to_string()));
        assert!(!reloaded.presets.contains(&"baidu.com".to_string()));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(Config::load(Some(&path)).is_err());
    }
}
