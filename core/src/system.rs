//! Host-level side effects: DNS cache invalidation and privilege checks.

use std::io;
use std::process::{Command, Stdio};

use tracing::debug;

/// Invalidates the OS resolver cache. Must return without waiting.
pub trait DnsFlusher: Send + Sync {
    fn flush(&self);
}

/// Spawns the platform's flush command and lets it run detached.
pub struct SystemDnsFlusher;

impl SystemDnsFlusher {
    fn command() -> Command {
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            let mut cmd = Command::new("ipconfig");
            cmd.arg("/flushdns");
            cmd.creation_flags(0x0800_0000); // CREATE_NO_WINDOW
            cmd
        }
        #[cfg(target_os = "macos")]
        {
            let mut cmd = Command::new("sh");
            cmd.args(["-c", "dscacheutil -flushcache; killall -HUP mDNSResponder"]);
            cmd
        }
        #[cfg(not(any(windows, target_os = "macos")))]
        {
            let mut cmd = Command::new("resolvectl");
            cmd.arg("flush-caches");
            cmd
        }
    }

    fn spawn() -> io::Result<()> {
        Self::command()
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(drop)
    }
}

impl DnsFlusher for SystemDnsFlusher {
    fn flush(&self) {
        match Self::spawn() {
            Ok(()) => debug!("dns cache flush requested"),
            Err(err) => debug!("dns cache flush unavailable: {err}"),
        }
    }
}

/// Does nothing. For runs that must not touch the resolver.
pub struct NoopFlusher;

impl DnsFlusher for NoopFlusher {
    fn flush(&self) {}
}

/// Whether the process runs as root / an elevated administrator.
pub fn is_elevated() -> bool {
    is_root::is_root()
}
