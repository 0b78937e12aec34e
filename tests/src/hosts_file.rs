#![cfg(test)]
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use hostpin_common::markers::Markers;
use hostpin_common::network::target::HostEntry;
use hostpin_core::backup::{self, BackupManager};
use hostpin_core::hosts::{HostsWriter, MarkerAnomaly, WriteOutcome, WriteStrategy};
use hostpin_core::system::NoopFlusher;
use tempfile::TempDir;

const ORIGINAL: &str = "# static table\r\n127.0.0.1 localhost\r\n::1 localhost\r\n";

fn setup(content: &str) -> (TempDir, PathBuf, HostsWriter) {
    let dir = tempfile::tempdir().unwrap();
    let hosts = dir.path().join("hosts");
    fs::write(&hosts, content).unwrap();
    let writer = HostsWriter::new(
        &hosts,
        Markers::for_label("HostPin"),
        BackupManager::new(dir.path().join("backups"), &hosts),
    )
    .with_flusher(Arc::new(NoopFlusher));
    (dir, hosts, writer)
}

fn entries(lines: &[&str]) -> Vec<HostEntry> {
    lines.iter().map(|l| l.parse().unwrap()).collect()
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

#[test]
fn repeated_commits_keep_a_single_block() {
    let (_dir, hosts, writer) = setup(ORIGINAL);
    let pairs = entries(&["192.30.255.113=github.com", "185.199.108.133=raw.githubusercontent.com"]);

    writer.commit(&pairs).unwrap();
    let once = read(&hosts);
    writer.commit(&pairs).unwrap();
    writer.commit(&pairs).unwrap();
    let thrice = read(&hosts);

    assert_eq!(once, thrice);
    assert_eq!(thrice.matches("# === HostPin Start ===").count(), 1);
    assert_eq!(thrice.matches("# === HostPin End ===").count(), 1);
    assert!(!writer.backups().list_snapshots().unwrap().is_empty());
}

#[test]
fn new_entries_replace_the_old_block() {
    let (_dir, hosts, writer) = setup(ORIGINAL);

    writer.commit(&entries(&["1.1.1.1=a.test"])).unwrap();
    let report = writer.commit(&entries(&["2.2.2.2=b.test"])).unwrap();
    let text = read(&hosts);

    assert!(report.replaced_block);
    assert!(!text.contains("1.1.1.1 a.test"));
    assert!(text.ends_with("# === HostPin Start ===\n2.2.2.2 b.test\n# === HostPin End ===\n"));
    assert!(text.starts_with("# static table\n127.0.0.1 localhost\n::1 localhost\n"));
}

#[test]
fn unpaired_end_marker_is_preserved() {
    let damaged = "127.0.0.1 localhost\n# === HostPin End ===\n";
    let (_dir, hosts, writer) = setup(damaged);

    let report = writer.commit(&entries(&["1.1.1.1=a.test"])).unwrap();
    let text = read(&hosts);

    assert_eq!(report.anomaly, Some(MarkerAnomaly::EndOnly));
    assert!(text.starts_with(damaged));
    assert_eq!(text.matches("# === HostPin End ===").count(), 2);
}

#[test]
fn rollback_restores_the_pre_commit_file() {
    let (_dir, hosts, writer) = setup(ORIGINAL);

    let report = writer.commit(&entries(&["192.30.255.113=github.com"])).unwrap();
    assert_eq!(report.outcome, WriteOutcome::Written(WriteStrategy::Direct));
    assert_ne!(read(&hosts), ORIGINAL.replace("\r\n", "\n"));

    let snapshot = writer.backups().latest().unwrap().unwrap();
    assert_eq!(snapshot.path, report.backup.path);

    backup::rollback(&snapshot, &writer, true).unwrap();

    assert_eq!(read(&hosts), ORIGINAL.replace("\r\n", "\n"));
}

#[test]
fn github_pick_produces_exactly_one_line() {
    let (_dir, hosts, writer) = setup("127.0.0.1 localhost\n");

    writer.commit(&entries(&["192.30.255.113 github.com"])).unwrap();

    let text = read(&hosts);
    let lines = hostpin_core::hosts::block::block_lines(&text, writer.markers()).unwrap();
    assert_eq!(lines, vec!["192.30.255.113 github.com"]);
}
