//! # Backup & Rollback
//!
//! A snapshot of the hosts file is copied into the backup directory before
//! every commit, named `hosts_YYYYMMDD_HHMMSS.bak` after its local creation
//! time. Snapshots are never deleted automatically.
//!
//! Two snapshots taken within the same second share a name; the later one
//! wins.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::SystemTime;

use chrono::{DateTime, Local, NaiveDateTime};
use hostpin_common::config::Config;
use regex::Regex;
use tracing::{debug, info};

use crate::hosts::encoding::read_text;
use crate::hosts::write::WriteStrategy;
use crate::hosts::{HostsError, HostsWriter};

const NAME_FORMAT: &str = "hosts_%Y%m%d_%H%M%S.bak";

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^hosts_\d{8}_\d{6}\.bak$").expect("valid snapshot pattern"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupSnapshot {
    pub path: PathBuf,
    pub created_at: DateTime<Local>,
    modified: SystemTime,
}

impl BackupSnapshot {
    fn from_path(path: PathBuf) -> io::Result<Self> {
        let modified = fs::metadata(&path)?.modified()?;
        let created_at = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| NaiveDateTime::parse_from_str(n, NAME_FORMAT).ok())
            .and_then(|naive| naive.and_local_timezone(Local).single())
            .unwrap_or_else(|| DateTime::<Local>::from(modified));

        Ok(Self {
            path,
            created_at,
            modified,
        })
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

pub fn is_snapshot_name(name: &str) -> bool {
    NAME_PATTERN.is_match(name)
}

#[derive(Debug, Clone)]
pub struct BackupManager {
    dir: PathBuf,
    source: PathBuf,
}

impl BackupManager {
    pub fn new(dir: impl Into<PathBuf>, source: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            source: source.into(),
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(&cfg.backup_dir, &cfg.hosts_path)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copies the live file into a new snapshot.
    pub fn backup(&self) -> Result<BackupSnapshot, HostsError> {
        let fail = |source| HostsError::Backup {
            dir: self.dir.clone(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(fail)?;
        let name = Local::now().format(NAME_FORMAT).to_string();
        let path = self.dir.join(name);
        fs::copy(&self.source, &path).map_err(fail)?;

        debug!("backed up {} to {}", self.source.display(), path.display());
        BackupSnapshot::from_path(path).map_err(fail)
    }

    /// Snapshots in the backup directory, newest modification first.
    ///
    /// Only exact `hosts_YYYYMMDD_HHMMSS.bak` names are considered. A missing
    /// directory just means there are none yet.
    pub fn list_snapshots(&self) -> io::Result<Vec<BackupSnapshot>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };

        let mut snapshots = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !is_snapshot_name(name) || !entry.file_type()?.is_file() {
                continue;
            }
            snapshots.push(BackupSnapshot::from_path(entry.path())?);
        }

        snapshots.sort_by(|a, b| b.modified.cmp(&a.modified));
        Ok(snapshots)
    }

    pub fn latest(&self) -> io::Result<Option<BackupSnapshot>> {
        Ok(self.list_snapshots()?.into_iter().next())
    }

    /// Accepts an explicit snapshot path as long as it carries a snapshot name.
    pub fn snapshot_at(&self, path: &Path) -> Result<BackupSnapshot, HostsError> {
        let named = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(is_snapshot_name);
        if !named || !path.is_file() {
            return Err(HostsError::Snapshot {
                path: path.to_path_buf(),
            });
        }
        BackupSnapshot::from_path(path.to_path_buf()).map_err(|source| HostsError::Read {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Restores `snapshot` as the live hosts file.
///
/// Refuses without touching anything unless `privileged` is set.
pub fn rollback(
    snapshot: &BackupSnapshot,
    writer: &HostsWriter,
    privileged: bool,
) -> Result<WriteStrategy, HostsError> {
    if !privileged {
        return Err(HostsError::Unauthorized);
    }

    let decoded = read_text(&snapshot.path).map_err(|source| HostsError::Read {
        path: snapshot.path.clone(),
        source,
    })?;

    let used = writer.restore(&decoded.text, decoded.encoding)?;
    info!("restored {} via {used}", snapshot.path.display());
    Ok(used)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
