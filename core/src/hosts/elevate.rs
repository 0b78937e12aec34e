//! Privileged re-invocation.
//!
//! When every write strategy is refused for lack of permission, the fully
//! built text is persisted to a `.hostscontent` temp file and the program is
//! started again with elevated rights and
//! `--write-content=<path> --encoding=<name>`. That process runs only
//! [`apply_handoff`] and exits; its exit status is the result.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use tracing::{debug, info, warn};

use super::HostsError;
use super::encoding::{TextEncoding, read_text_as};
use super::write::{WriteStrategy, write_with_fallback};
use crate::system::DnsFlusher;

pub const WRITE_CONTENT_FLAG: &str = "--write-content";
pub const ENCODING_FLAG: &str = "--encoding";

/// The content file and encoding handed to the privileged process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handoff {
    pub content_path: PathBuf,
    pub encoding: TextEncoding,
}

impl Handoff {
    /// Writes `text` to a temp file that outlives this process.
    pub fn persist(text: &str, encoding: TextEncoding) -> io::Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("hostpin-")
            .suffix(".hostscontent")
            .tempfile()?;
        file.write_all(&encoding.encode(text))?;
        file.flush()?;
        let (_, content_path) = file.keep().map_err(|e| e.error)?;

        Ok(Self {
            content_path,
            encoding,
        })
    }

    pub fn args(&self) -> Vec<String> {
        vec![
            format!("{WRITE_CONTENT_FLAG}={}", self.content_path.display()),
            format!("{ENCODING_FLAG}={}", self.encoding.name()),
        ]
    }

    pub fn discard(&self) {
        if let Err(err) = std::fs::remove_file(&self.content_path) {
            debug!("could not remove {}: {err}", self.content_path.display());
        }
    }
}

/// Starts the privileged process and waits for it.
pub trait Elevator: Send + Sync {
    fn relaunch(&self, handoff: &Handoff) -> io::Result<ExitStatus>;
}

/// Re-runs the current executable through `sudo`, or through a UAC prompt
/// on Windows.
pub struct SudoElevator {
    program: PathBuf,
    forwarded: Vec<String>,
}

impl SudoElevator {
    pub fn current() -> io::Result<Self> {
        Ok(Self {
            program: std::env::current_exe()?,
            forwarded: Vec::new(),
        })
    }

    /// Arguments passed through unchanged, e.g. `--config <path>`.
    pub fn with_forwarded_args(mut self, args: Vec<String>) -> Self {
        self.forwarded = args;
        self
    }

    fn all_args(&self, handoff: &Handoff) -> Vec<String> {
        let mut args = self.forwarded.clone();
        args.extend(handoff.args());
        args
    }
}

impl Elevator for SudoElevator {
    #[cfg(not(windows))]
    fn relaunch(&self, handoff: &Handoff) -> io::Result<ExitStatus> {
        info!("requesting elevated privileges through sudo");
        Command::new("sudo")
            .arg(&self.program)
            .args(self.all_args(handoff))
            .status()
    }

    #[cfg(windows)]
    fn relaunch(&self, handoff: &Handoff) -> io::Result<ExitStatus> {
        info!("requesting elevated privileges through UAC");
        let quote = |s: &str| format!("'{}'", s.replace('\'', "''"));
        let arg_list = self
            .all_args(handoff)
            .iter()
            .map(|a| quote(&format!("\"{a}\"")))
            .collect::<Vec<_>>()
            .join(",");
        let script = format!(
            "$p = Start-Process -FilePath {} -ArgumentList {} -Verb RunAs -Wait -PassThru; exit $p.ExitCode",
            quote(&self.program.to_string_lossy()),
            arg_list
        );
        Command::new("powershell")
            .args(["-NoProfile", "-NonInteractive", "-Command", &script])
            .status()
    }
}

/// Hands the write to a privileged process and waits for its verdict.
///
/// The content file is removed here only if the process could not be
/// started; otherwise the privileged side owns it.
pub(crate) fn hand_off(
    elevator: &dyn Elevator,
    text: &str,
    encoding: TextEncoding,
) -> Result<(), HostsError> {
    let handoff = Handoff::persist(text, encoding).map_err(|err| {
        HostsError::Elevation(format!("could not stage content for the privileged write: {err}"))
    })?;

    match elevator.relaunch(&handoff) {
        Ok(status) if status.success() => Ok(()),
        Ok(status) => {
            handoff.discard();
            Err(HostsError::Elevation(format!("privileged process exited with {status}")))
        }
        Err(err) => {
            handoff.discard();
            Err(HostsError::Elevation(format!("could not start privileged process: {err}")))
        }
    }
}

/// The privileged side: write `handoff`'s content to `target`.
///
/// The content file is removed whatever the outcome. DNS is flushed after a
/// successful write.
pub fn apply_handoff(
    handoff: &Handoff,
    target: &Path,
    flusher: &dyn DnsFlusher,
) -> Result<WriteStrategy, HostsError> {
    let result = read_text_as(&handoff.content_path, handoff.encoding)
        .map_err(|source| HostsError::Handoff {
            path: handoff.content_path.clone(),
            source,
        })
        .and_then(|text| {
            let bytes = handoff.encoding.encode(&text);
            write_with_fallback(target, &bytes).map_err(HostsError::from)
        });

    handoff.discard();

    match &result {
        Ok(strategy) => {
            debug!("privileged write landed via {strategy}");
            flusher.flush();
        }
        Err(err) => warn!("privileged write failed: {err}"),
    }
    result
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
