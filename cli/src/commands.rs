pub mod hosts;
pub mod presets;
pub mod probe;
pub mod write;

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use hostpin_common::config::Config;
use hostpin_common::network::target::HostEntry;

#[derive(Parser)]
#[command(name = "hostpin", version)]
#[command(about = "Probe candidate IPs for your domains and pin the fastest ones in the hosts file.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config file to use instead of the per-user default
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Hosts file to operate on instead of the configured one
    #[arg(long, global = true, value_name = "PATH")]
    pub hosts: Option<PathBuf>,

    /// Less output (-q hides headers, -qq also hides info messages)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub quiet: u8,

    /// More output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Do not listen for 'q' to stop probing early
    #[arg(long, global = true)]
    pub no_input: bool,

    /// Privileged re-invocation: write this pre-built content and exit
    #[arg(long, hide = true, value_name = "PATH")]
    pub write_content: Option<PathBuf>,

    /// Encoding of the --write-content file
    #[arg(long, hide = true, default_value = "utf-8")]
    pub encoding: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Probe candidate IPs and optionally pin the results
    #[command(alias = "p")]
    Probe(ProbeArgs),
    /// Restore the hosts file from a backup snapshot
    #[command(alias = "rb")]
    Rollback {
        /// Snapshot file to restore (defaults to the newest)
        #[arg(value_name = "SNAPSHOT")]
        snapshot: Option<PathBuf>,
        /// Restore the newest snapshot
        #[arg(long, conflicts_with = "snapshot")]
        latest: bool,
    },
    /// List backup snapshots, newest first
    #[command(alias = "b")]
    Backups,
    /// Show the managed block of the hosts file
    #[command(alias = "s")]
    Show,
    /// Flush the operating system DNS cache
    FlushDns,
    /// Manage the preset domain list
    Presets {
        #[command(subcommand)]
        action: Option<PresetAction>,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct ProbeArgs {
    /// Resolve a domain and probe its current addresses (repeatable)
    #[arg(short, long = "domain", value_name = "DOMAIN")]
    pub domains: Vec<String>,

    /// Resolve every preset domain
    #[arg(long)]
    pub presets: bool,

    /// Fetch candidates from the remote hosts lists
    #[arg(short, long)]
    pub remote: bool,

    /// Use a single remote source, by 1-based index or URL (implies --remote)
    #[arg(long, value_name = "N|URL")]
    pub source: Option<String>,

    /// Add a candidate pair directly (repeatable)
    #[arg(long = "pair", value_name = "IP=DOMAIN")]
    pub pairs: Vec<HostEntry>,

    /// TCP port to handshake with
    #[arg(long)]
    pub port: Option<u16>,

    /// Skip the ping fallback for IPs that refuse TCP
    #[arg(long)]
    pub no_fallback: bool,

    /// What to pin once probing ends
    #[arg(short, long, value_enum, default_value_t = WriteMode::None)]
    pub write: WriteMode,

    /// Select a result row for `--write selected` (repeatable, implies it)
    #[arg(long = "pick", value_name = "IP=DOMAIN")]
    pub picks: Vec<HostEntry>,
}

#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteMode {
    #[default]
    None,
    /// Fastest successful IP per domain
    Best,
    /// Rows chosen with --pick
    Selected,
}

#[derive(Subcommand, Debug, Clone)]
pub enum PresetAction {
    /// Show the preset domains
    List,
    /// Add domains to the presets
    Add {
        #[arg(required = true)]
        domains: Vec<String>,
    },
    /// Remove domains from the presets
    Remove {
        #[arg(required = true)]
        domains: Vec<String>,
    },
}

/// Which snapshot `rollback` restores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotChoice {
    Latest,
    At(PathBuf),
}

impl SnapshotChoice {
    /// No path means the newest snapshot, with or without `--latest`.
    pub fn from_args(snapshot: Option<PathBuf>, latest: bool) -> Self {
        match snapshot {
            Some(path) if !latest => SnapshotChoice::At(path),
            _ => SnapshotChoice::Latest,
        }
    }
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// `saved` with this invocation's overrides applied. Never persisted.
    pub fn runtime_config(&self, saved: &Config) -> Config {
        let mut cfg = saved.clone();
        if let Some(hosts) = &self.hosts {
            cfg.hosts_path = hosts.clone();
        }
        cfg
    }
}

impl ProbeArgs {
    pub fn write_mode(&self) -> WriteMode {
        if !self.picks.is_empty() && self.write == WriteMode::None {
            WriteMode::Selected
        } else {
            self.write
        }
    }

    pub fn wants_remote(&self) -> bool {
        self.remote || self.source.is_some()
    }
}
