use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::write::WriteFailure;

#[derive(Debug, Error)]
pub enum HostsError {
    #[error("nothing to write")]
    NothingToWrite,

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("backup into {dir} failed, hosts file left untouched: {source}")]
    Backup {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Write(#[from] WriteFailure),

    #[error("privileged write did not complete: {0}")]
    Elevation(String),

    #[error("restoring a backup requires elevated privileges")]
    Unauthorized,

    #[error("{path} is not a hosts backup snapshot")]
    Snapshot { path: PathBuf },

    #[error("handoff content {path} unavailable: {source}")]
    Handoff {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl HostsError {
    /// A short suggestion for the user, when there is an obvious one.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            HostsError::Write(failure) if failure.is_permission_denied() => {
                Some("run hostpin with administrator or root privileges")
            }
            HostsError::Elevation(_) | HostsError::Unauthorized => {
                Some("run hostpin with administrator or root privileges")
            }
            HostsError::Read { .. } => Some("check the hostsPath setting in the config file"),
            HostsError::Backup { .. } => Some("check that backupDir exists and is writable"),
            HostsError::Snapshot { .. } => Some("list valid snapshots with `hostpin backups`"),
            _ => None,
        }
    }
}
