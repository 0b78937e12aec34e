use std::path::PathBuf;

use anyhow::{Context, anyhow};
use colored::*;
use hostpin_common::config::Config;
use hostpin_common::success;
use hostpin_core::backup::{self, BackupManager};
use hostpin_core::hosts::block;
use hostpin_core::hosts::elevate::{self, Handoff};
use hostpin_core::hosts::TextEncoding;
use hostpin_core::system::{self, DnsFlusher, SystemDnsFlusher};
use tracing::{error, info, warn};

use crate::commands::SnapshotChoice;
use crate::commands::write::{fail, writer_for};
use crate::hprint;
use crate::terminal::{colors, print};

pub fn rollback(choice: SnapshotChoice, cfg: &Config, quiet: u8) -> anyhow::Result<()> {
    let manager = BackupManager::from_config(cfg);
    let snapshot = match choice {
        SnapshotChoice::At(path) => manager.snapshot_at(&path).map_err(fail)?,
        SnapshotChoice::Latest => manager
            .latest()
            .with_context(|| format!("listing {}", manager.dir().display()))?
            .ok_or_else(|| anyhow!("no backups found in {}", manager.dir().display()))?,
    };

    print::header("rollback", quiet);
    if quiet == 0 {
        print::aligned_line("Snapshot", snapshot.path.display().to_string());
        print::aligned_line("Taken", snapshot.created_at.format("%Y-%m-%d %H:%M:%S").to_string());
        print::aligned_line("Target", cfg.hosts_path.display().to_string());
    }

    let writer = writer_for(cfg, quiet);
    let used = backup::rollback(&snapshot, &writer, system::is_elevated()).map_err(fail)?;

    success!("hosts file restored via {used}");
    Ok(())
}

pub fn backups(cfg: &Config, quiet: u8) -> anyhow::Result<()> {
    let manager = BackupManager::from_config(cfg);
    let snapshots = manager
        .list_snapshots()
        .with_context(|| format!("listing {}", manager.dir().display()))?;

    print::header("backups", quiet);
    if snapshots.is_empty() {
        print::no_results("no snapshots yet");
        return Ok(());
    }

    for (idx, snapshot) in snapshots.iter().enumerate() {
        print::tree_head(idx + 1, &snapshot.file_name());
        let size = std::fs::metadata(&snapshot.path)
            .map(|m| format!("{} bytes", m.len()))
            .unwrap_or_else(|_| "?".to_string());
        print::as_tree_one_level(vec![
            (
                "Taken".to_string(),
                snapshot
                    .created_at
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string()
                    .color(colors::TEXT_DEFAULT),
            ),
            ("Size".to_string(), size.normal()),
        ]);
    }

    hprint!();
    info!("{} snapshots in {}", snapshots.len(), manager.dir().display());
    Ok(())
}

pub fn show(cfg: &Config, quiet: u8) -> anyhow::Result<()> {
    let writer = writer_for(cfg, quiet);
    let decoded = writer.read().map_err(fail)?;
    let markers = writer.markers();

    print::header("managed block", quiet);
    if quiet == 0 {
        print::aligned_line("File", cfg.hosts_path.display().to_string());
        print::aligned_line("Encoding", decoded.encoding.name());
    }

    if let Some(anomaly) = block::strip_block(&decoded.text, markers).anomaly {
        warn!("markers look damaged: {}", anomaly.describe());
    }

    match block::block_lines(&decoded.text, markers) {
        Some(lines) if !lines.is_empty() => {
            for line in lines {
                print::print(&format!("  {}", line.color(colors::IPV4_ADDR)));
            }
        }
        Some(_) => info!("managed block is empty"),
        None => print::no_results("no managed block"),
    }
    Ok(())
}

pub fn flush_dns() {
    SystemDnsFlusher.flush();
    success!("dns cache flush requested");
}

/// Runs the privileged side of an elevation handoff. Returns the exit code.
pub fn handoff(content: PathBuf, encoding: &str, target: anyhow::Result<PathBuf>) -> i32 {
    let target = match target {
        Ok(target) => target,
        Err(err) => {
            error!("{err:#}");
            let _ = std::fs::remove_file(&content);
            return 2;
        }
    };
    let encoding = match encoding.parse::<TextEncoding>() {
        Ok(encoding) => encoding,
        Err(err) => {
            error!("{err}");
            let _ = std::fs::remove_file(&content);
            return 2;
        }
    };

    let handoff = Handoff {
        content_path: content,
        encoding,
    };

    match elevate::apply_handoff(&handoff, &target, &SystemDnsFlusher) {
        Ok(used) => {
            success!("wrote {} via {used}", target.display());
            0
        }
        Err(err) => {
            let _ = fail(err);
            1
        }
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
