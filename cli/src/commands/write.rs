use std::sync::Arc;

use colored::*;
use hostpin_common::config::Config;
use hostpin_common::network::target::HostEntry;
use hostpin_common::success;
use hostpin_core::hosts::{CommitReport, Elevator, HostsError, HostsWriter, SudoElevator, WriteOutcome};
use tracing::{debug, error, warn};

use crate::terminal::print;

/// The live writer, able to re-run itself elevated with the same target.
pub fn writer_for(cfg: &Config, quiet: u8) -> HostsWriter {
    let elevator = match SudoElevator::current() {
        Ok(elevator) => {
            let mut forwarded = vec![format!("--hosts={}", cfg.hosts_path.display())];
            forwarded.extend((0..quiet).map(|_| "-q".to_string()));
            Some(Arc::new(elevator.with_forwarded_args(forwarded)) as Arc<dyn Elevator>)
        }
        Err(err) => {
            debug!("cannot locate own executable, elevation disabled: {err}");
            None
        }
    };

    HostsWriter::from_config(cfg).with_elevator(elevator)
}

/// Logs the error with its remedy and hands it to anyhow.
pub fn fail(err: HostsError) -> anyhow::Error {
    error!("{err}");
    if let Some(hint) = err.hint() {
        warn!("{hint}");
    }
    anyhow::Error::new(err)
}

pub fn commit(entries: &[HostEntry], cfg: &Config, quiet: u8) -> anyhow::Result<()> {
    if entries.is_empty() {
        warn!("nothing to write: no rows qualify");
        return Ok(());
    }

    let writer = writer_for(cfg, quiet);
    let report = writer.commit(entries).map_err(fail)?;
    report_commit(&report, &writer, quiet);
    Ok(())
}

fn report_commit(report: &CommitReport, writer: &HostsWriter, quiet: u8) {
    print::header("hosts updated", quiet);
    if quiet == 0 {
        print::aligned_line("File", writer.hosts_path().display().to_string());
        print::aligned_line("Entries", report.entries.to_string());
        print::aligned_line("Encoding", report.encoding.name());
        print::aligned_line("Backup", report.backup.path.display().to_string());
        let method = match report.outcome {
            WriteOutcome::Written(strategy) => strategy.label().to_string(),
            WriteOutcome::Elevated => "elevated re-invocation".to_string(),
        };
        print::aligned_line("Method", method);
        if report.replaced_block {
            print::aligned_line("Block", "replaced previous block".yellow());
        }
    }

    if let Some(anomaly) = report.anomaly {
        warn!(
            "left a damaged marker in place ({}); `hostpin rollback` restores the backup",
            anomaly.describe()
        );
    }

    success!(
        "pinned {} entries, backup kept at {}",
        report.entries,
        report.backup.path.display()
    );
}
