//! The three-step write chain.
//!
//! Each strategy is only tried if the previous one failed:
//! 1. **Direct**: overwrite the target in place.
//! 2. **TempCopy**: write a file in the system temp directory, then copy its
//!    bytes into the target. The temp file is always removed.
//! 3. **SiblingRename**: write `<target>.hostpintmp` next to the target, give
//!    it the target's permissions and rename it over the target, which is
//!    atomic on the same filesystem.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

const SIBLING_SUFFIX: &str = "hostpintmp";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStrategy {
    Direct,
    TempCopy,
    SiblingRename,
}

impl WriteStrategy {
    pub const CHAIN: [WriteStrategy; 3] = [
        WriteStrategy::Direct,
        WriteStrategy::TempCopy,
        WriteStrategy::SiblingRename,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            WriteStrategy::Direct => "direct write",
            WriteStrategy::TempCopy => "temp file copy",
            WriteStrategy::SiblingRename => "sibling rename",
        }
    }

    fn apply(&self, target: &Path, bytes: &[u8]) -> io::Result<()> {
        match self {
            WriteStrategy::Direct => fs::write(target, bytes),
            WriteStrategy::TempCopy => write_via_temp_copy(target, bytes),
            WriteStrategy::SiblingRename => write_via_sibling_rename(target, bytes),
        }
    }
}

impl fmt::Display for WriteStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Every strategy failed. Holds each strategy's error in chain order.
#[derive(Debug)]
pub struct WriteFailure {
    pub target: PathBuf,
    pub attempts: Vec<(WriteStrategy, io::Error)>,
}

impl WriteFailure {
    /// `true` if any attempt was refused for lack of permission.
    pub fn is_permission_denied(&self) -> bool {
        self.attempts
            .iter()
            .any(|(_, err)| err.kind() == io::ErrorKind::PermissionDenied)
    }
}

impl fmt::Display for WriteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "could not write {}", self.target.display())?;
        for (strategy, err) in &self.attempts {
            write!(f, "; {strategy}: {err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for WriteFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.attempts
            .last()
            .map(|(_, err)| err as &(dyn std::error::Error + 'static))
    }
}

/// Runs the chain and reports which strategy landed the bytes.
pub fn write_with_fallback(target: &Path, bytes: &[u8]) -> Result<WriteStrategy, WriteFailure> {
    let mut attempts = Vec::new();

    for strategy in WriteStrategy::CHAIN {
        match strategy.apply(target, bytes) {
            Ok(()) => {
                debug!("wrote {} via {strategy}", target.display());
                return Ok(strategy);
            }
            Err(err) => {
                warn!("{strategy} of {} failed: {err}", target.display());
                attempts.push((strategy, err));
            }
        }
    }

    Err(WriteFailure {
        target: target.to_path_buf(),
        attempts,
    })
}

fn write_via_temp_copy(target: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut tmp = tempfile::Builder::new()
        .prefix("hostpin-")
        .suffix(".tmp")
        .tempfile()?;
    tmp.write_all(bytes)?;
    tmp.flush()?;

    // Copy into the existing file so its mode and owner stay as they were.
    let mut source = tmp.reopen()?;
    let mut dest = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(target)?;
    io::copy(&mut source, &mut dest)?;
    dest.sync_all()
}

fn write_via_sibling_rename(target: &Path, bytes: &[u8]) -> io::Result<()> {
    let sibling = sibling_path(target);
    let permissions = fs::metadata(target).ok().map(|m| m.permissions());

    let result = fs::File::create(&sibling)
        .and_then(|mut file| {
            file.write_all(bytes)?;
            file.sync_all()
        })
        .and_then(|()| match permissions {
            Some(perms) => fs::set_permissions(&sibling, perms),
            None => Ok(()),
        })
        .and_then(|()| fs::rename(&sibling, target));

    if result.is_err() && sibling.exists() {
        let _ = fs::remove_file(&sibling);
    }
    result
}

pub fn sibling_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "hosts".to_string());
    target.with_file_name(format!("{name}.{SIBLING_SUFFIX}"))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
