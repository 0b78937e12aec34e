//! # Hosts Transactional Writer
//!
//! [`HostsWriter::commit`] replaces the managed block in the live hosts file:
//!
//! 1. Read the file, remembering which encoding decoded it.
//! 2. Back it up. No backup, no write.
//! 3. Strip the previous well-formed block. Unpaired or misordered markers
//!    are left alone and reported as a [`MarkerAnomaly`].
//! 4. Append a fresh block, one `<ip> <domain>` line per entry.
//! 5. Write through the [`write`] chain in the original encoding. If every
//!    strategy is refused for lack of permission, hand the finished text to a
//!    privileged process through an [`Elevator`].
//! 6. Ask the [`DnsFlusher`] to drop cached lookups.

pub mod block;
pub mod elevate;
pub mod encoding;
pub mod error;
pub mod write;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use hostpin_common::config::Config;
use hostpin_common::markers::Markers;
use hostpin_common::network::target::HostEntry;
use tracing::{debug, info, warn};

use crate::backup::{BackupManager, BackupSnapshot};
use crate::system::{self, DnsFlusher, SystemDnsFlusher};

pub use block::MarkerAnomaly;
pub use elevate::{Elevator, Handoff, SudoElevator};
pub use encoding::TextEncoding;
pub use error::HostsError;
pub use write::{WriteFailure, WriteStrategy};

/// How the new content reached the disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written(WriteStrategy),
    /// A privileged process wrote it; the caller should exit.
    Elevated,
}

#[derive(Debug, Clone)]
pub struct CommitReport {
    pub entries: usize,
    pub backup: BackupSnapshot,
    pub encoding: TextEncoding,
    /// A previous managed block was replaced.
    pub replaced_block: bool,
    pub anomaly: Option<MarkerAnomaly>,
    pub outcome: WriteOutcome,
}

pub struct HostsWriter {
    hosts_path: PathBuf,
    markers: Markers,
    backups: BackupManager,
    flusher: Arc<dyn DnsFlusher>,
    elevator: Option<Arc<dyn Elevator>>,
}

impl HostsWriter {
    pub fn new(hosts_path: impl Into<PathBuf>, markers: Markers, backups: BackupManager) -> Self {
        Self {
            hosts_path: hosts_path.into(),
            markers,
            backups,
            flusher: Arc::new(SystemDnsFlusher),
            elevator: None,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(&cfg.hosts_path, cfg.markers(), BackupManager::from_config(cfg))
    }

    pub fn with_flusher(mut self, flusher: Arc<dyn DnsFlusher>) -> Self {
        self.flusher = flusher;
        self
    }

    pub fn with_elevator(mut self, elevator: Option<Arc<dyn Elevator>>) -> Self {
        self.elevator = elevator;
        self
    }

    pub fn hosts_path(&self) -> &Path {
        &self.hosts_path
    }

    pub fn markers(&self) -> &Markers {
        &self.markers
    }

    pub fn backups(&self) -> &BackupManager {
        &self.backups
    }

    /// Current decoded content of the live file.
    pub fn read(&self) -> Result<encoding::DecodedText, HostsError> {
        encoding::read_text(&self.hosts_path).map_err(|source| HostsError::Read {
            path: self.hosts_path.clone(),
            source,
        })
    }

    /// Replaces the managed block with `entries`, in order.
    pub fn commit(&self, entries: &[HostEntry]) -> Result<CommitReport, HostsError> {
        if entries.is_empty() {
            return Err(HostsError::NothingToWrite);
        }

        let current = self.read()?;
        let backup = self.backups.backup()?;
        debug!("hosts decoded as {}, backup at {}", current.encoding, backup.path.display());

        let stripped = block::strip_block(&current.text, &self.markers);
        if let Some(anomaly) = stripped.anomaly {
            warn!(
                "hosts markers look damaged ({}); unpaired markers are left in place",
                anomaly.describe()
            );
        }

        let text = block::compose(&stripped.content, &self.markers, entries);
        let outcome = self.write(&text, current.encoding)?;

        if let WriteOutcome::Written(strategy) = outcome {
            info!("wrote {} entries to {} via {strategy}", entries.len(), self.hosts_path.display());
            self.flusher.flush();
        }

        Ok(CommitReport {
            entries: entries.len(),
            backup,
            encoding: current.encoding,
            replaced_block: stripped.removed,
            anomaly: stripped.anomaly,
            outcome,
        })
    }

    /// Writes `text` verbatim through the chain, without elevation, then
    /// flushes DNS.
    pub fn restore(&self, text: &str, encoding: TextEncoding) -> Result<WriteStrategy, HostsError> {
        let used = write::write_with_fallback(&self.hosts_path, &encoding.encode(text))?;
        self.flusher.flush();
        Ok(used)
    }

    fn write(&self, text: &str, encoding: TextEncoding) -> Result<WriteOutcome, HostsError> {
        let failure = match write::write_with_fallback(&self.hosts_path, &encoding.encode(text)) {
            Ok(strategy) => return Ok(WriteOutcome::Written(strategy)),
            Err(failure) => failure,
        };

        let elevator = match &self.elevator {
            Some(elevator) if failure.is_permission_denied() && !system::is_elevated() => elevator,
            _ => return Err(failure.into()),
        };

        warn!("hosts file is not writable by this user, retrying with elevated privileges");
        elevate::hand_off(elevator.as_ref(), text, encoding)?;
        Ok(WriteOutcome::Elevated)
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
    use crate::system::tests::CountingFlusher;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        hosts: PathBuf,
        flusher: Arc<CountingFlusher>,
        writer: HostsWriter,
    }

    fn fixture(initial: &[u8]) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let hosts = dir.path().join("hosts");
        fs::write(&hosts, initial).unwrap();

        let flusher = Arc::new(CountingFlusher::default());
        let backups = BackupManager::new(dir.path().join("backups"), &hosts);
        let writer = HostsWriter::new(&hosts, Markers::for_label("T"), backups)
            .with_flusher(flusher.clone());

        Fixture {
            _dir: dir,
            hosts,
            flusher,
            writer,
        }
    }

    fn entries(lines: &[&str]) -> Vec<HostEntry> {
        lines.iter().map(|l| l.parse().unwrap()).collect()
    }

    #[test]
    fn commit_appends_block_and_backs_up_first() {
        let fx = fixture(b"127.0.0.1 localhost\n");

        let report = fx.writer.commit(&entries(&["1.1.1.1 a.test", "2.2.2.2 b.test"])).unwrap();

        assert_eq!(report.outcome, WriteOutcome::Written(WriteStrategy::Direct));
        assert!(!report.replaced_block);
        assert_eq!(
            fs::read_to_string(&fx.hosts).unwrap(),
            "127.0.0.1 localhost\n# === T Start ===\n1.1.1.1 a.test\n2.2.2.2 b.test\n# === T End ===\n"
        );
        assert_eq!(fs::read_to_string(&report.backup.path).unwrap(), "127.0.0.1 localhost\n");
        assert_eq!(fx.flusher.count(), 1);
    }

    #[test]
    fn committing_twice_leaves_one_identical_block() {
        let fx = fixture(b"127.0.0.1 localhost\n");
        let pairs = entries(&["192.30.255.113 github.com"]);

        fx.writer.commit(&pairs).unwrap();
        let first = fs::read_to_string(&fx.hosts).unwrap();
        let report = fx.writer.commit(&pairs).unwrap();
        let second = fs::read_to_string(&fx.hosts).unwrap();

        assert!(report.replaced_block);
        assert_eq!(first, second);
        assert_eq!(second.matches("# === T Start ===").count(), 1);
    }

    #[test]
    fn lone_start_marker_survives_and_block_is_appended() {
        let original = "127.0.0.1 localhost\n# === T Start ===\n9.9.9.9 old.test\n";
        let fx = fixture(original.as_bytes());

        let report = fx.writer.commit(&entries(&["1.1.1.1 a.test"])).unwrap();
        let after = fs::read_to_string(&fx.hosts).unwrap();

        assert_eq!(report.anomaly, Some(MarkerAnomaly::StartOnly));
        assert!(after.starts_with(original.trim_end()));
        assert!(after.contains("9.9.9.9 old.test"));
        assert!(after.ends_with("# === T Start ===\n1.1.1.1 a.test\n# === T End ===\n"));
        assert_eq!(after.matches("# === T Start ===").count(), 2);
    }

    #[test]
    fn second_commit_keeps_lines_under_an_orphan_start_marker() {
        let original = "127.0.0.1 localhost\n# === T Start ===\n9.9.9.9 old.test\n";
        let fx = fixture(original.as_bytes());
        let pairs = entries(&["1.1.1.1 a.test"]);

        fx.writer.commit(&pairs).unwrap();
        let first = fs::read_to_string(&fx.hosts).unwrap();
        let report = fx.writer.commit(&pairs).unwrap();
        let second = fs::read_to_string(&fx.hosts).unwrap();

        assert!(report.replaced_block);
        assert_eq!(report.anomaly, Some(MarkerAnomaly::StartOnly));
        assert!(second.contains("9.9.9.9 old.test"));
        assert_eq!(first, second);
    }

    #[test]
    fn original_encoding_is_kept() {
        let fx = fixture(b"\xEF\xBB\xBF127.0.0.1 localhost\r\n");

        let report = fx.writer.commit(&entries(&["1.1.1.1 a.test"])).unwrap();

        assert_eq!(report.encoding, TextEncoding::Utf8Sig);
        assert!(fs::read(&fx.hosts).unwrap().starts_with(b"\xEF\xBB\xBF127.0.0.1 localhost\n#"));
    }

    #[test]
    fn failed_backup_aborts_before_mutation() {
        let fx = fixture(b"127.0.0.1 localhost\n");
        // A file where the backup directory should be.
        let blocker = fx.hosts.with_file_name("blocked");
        fs::write(&blocker, "").unwrap();
        let writer = HostsWriter::new(&fx.hosts, Markers::for_label("T"), BackupManager::new(&blocker, &fx.hosts))
            .with_flusher(fx.flusher.clone());

        let err = writer.commit(&entries(&["1.1.1.1 a.test"])).unwrap_err();

        assert!(matches!(err, HostsError::Backup { .. }));
        assert_eq!(fs::read_to_string(&fx.hosts).unwrap(), "127.0.0.1 localhost\n");
        assert_eq!(fx.flusher.count(), 0);
    }

    #[test]
    fn empty_selection_is_rejected() {
        let fx = fixture(b"");
        assert!(matches!(fx.writer.commit(&[]), Err(HostsError::NothingToWrite)));
    }

    #[test]
    fn unreadable_hosts_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let hosts = dir.path().join("absent");
        let writer = HostsWriter::new(&hosts, Markers::default(), BackupManager::new(dir.path(), &hosts));
        assert!(matches!(
            writer.commit(&entries(&["1.1.1.1 a.test"])),
            Err(HostsError::Read { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn permission_denied_hands_the_text_to_the_elevator() {
        use std::os::unix::fs::PermissionsExt;
        use std::os::unix::process::ExitStatusExt;
        use std::process::ExitStatus;
        use std::sync::Mutex;

        if is_root::is_root() {
            return;
        }

        #[derive(Default)]
        struct Recording(Mutex<Option<String>>);

        impl Elevator for Recording {
            fn relaunch(&self, handoff: &Handoff) -> std::io::Result<ExitStatus> {
                let text = fs::read_to_string(&handoff.content_path)?;
                *self.0.lock().unwrap() = Some(text);
                handoff.discard();
                Ok(ExitStatus::from_raw(0))
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let etc = dir.path().join("etc");
        fs::create_dir(&etc).unwrap();
        let hosts = etc.join("hosts");
        fs::write(&hosts, "127.0.0.1 localhost\n").unwrap();
        fs::set_permissions(&hosts, fs::Permissions::from_mode(0o444)).unwrap();
        fs::set_permissions(&etc, fs::Permissions::from_mode(0o555)).unwrap();

        let elevator = Arc::new(Recording::default());
        let writer = HostsWriter::new(&hosts, Markers::for_label("T"), BackupManager::new(dir.path().join("b"), &hosts))
            .with_flusher(Arc::new(CountingFlusher::default()))
            .with_elevator(Some(elevator.clone() as Arc<dyn Elevator>));

        let report = writer.commit(&entries(&["1.1.1.1 a.test"]));
        fs::set_permissions(&etc, fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(report.unwrap().outcome, WriteOutcome::Elevated);
        let handed = elevator.0.lock().unwrap().clone().unwrap();
        assert!(handed.ends_with("# === T Start ===\n1.1.1.1 a.test\n# === T End ===\n"));
        assert_eq!(fs::read_to_string(&hosts).unwrap(), "127.0.0.1 localhost\n");
    }
}
