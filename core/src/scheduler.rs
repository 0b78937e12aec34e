//! # Probe Scheduler
//!
//! Runs the [`Prober`] over every unique IP with bounded concurrency and
//! streams each [`ProbeOutcome`] back as soon as it completes, so a consumer
//! can render progress continuously.
//!
//! Cancellation is cooperative: one shared [`CancellationToken`] is checked by
//! the dispatcher before starting each task, by each task on start, and by
//! the prober between handshake attempts. Targets that never got dispatched
//! are reported as [`ProbeStatus::Cancelled`](hostpin_common::network::probe::ProbeStatus::Cancelled)
//! without any measurement.

use std::sync::Arc;

use hostpin_common::network::probe::ProbeOutcome;
use hostpin_common::network::target::ProbeTarget;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::probe::Prober;

pub const MAX_CONCURRENT_PROBES: usize = 60;

/// `min(60, cap, max(1, targets))`, never below one.
pub fn concurrency_for(targets: usize, cap: usize) -> usize {
    targets.max(1).min(cap.clamp(1, MAX_CONCURRENT_PROBES))
}

/// A running probe session.
pub struct ProbeStream {
    outcomes: mpsc::Receiver<ProbeOutcome>,
    cancel: CancellationToken,
    total: usize,
}

impl ProbeStream {
    /// Next completed outcome, or `None` once every target has been reported.
    pub async fn next(&mut self) -> Option<ProbeOutcome> {
        self.outcomes.recv().await
    }

    /// Requests a stop. Pending targets come back as cancelled.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Number of unique IPs in this session.
    pub fn total(&self) -> usize {
        self.total
    }
}

/// Starts probing `targets` in the background. Must be called inside a tokio runtime.
///
/// One task per unique IP, never per `(ip, domain)` pair.
pub fn run(
    prober: Arc<Prober>,
    targets: &[ProbeTarget],
    max_concurrency: usize,
    cancel: CancellationToken,
) -> ProbeStream {
    let total = targets.len();
    let ips: Vec<_> = targets.iter().map(|t| t.ip).collect();
    let workers = concurrency_for(total, max_concurrency);
    let (tx, rx) = mpsc::channel(total.max(1));

    debug!("probing {total} IPs with {workers} workers");
    tokio::spawn(dispatch(prober, ips, workers, cancel.clone(), tx));

    ProbeStream {
        outcomes: rx,
        cancel,
        total,
    }
}

async fn dispatch(
    prober: Arc<Prober>,
    ips: Vec<std::net::IpAddr>,
    workers: usize,
    cancel: CancellationToken,
    tx: mpsc::Sender<ProbeOutcome>,
) {
    let semaphore = Arc::new(Semaphore::new(workers));
    let mut tasks: JoinSet<()> = JoinSet::new();
    let mut pending = ips.into_iter();

    while let Some(ip) = pending.next() {
        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                let _ = tx.send(ProbeOutcome::cancelled(ip)).await;
                break;
            }
            permit = semaphore.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_closed) => break,
            },
        };

        let prober = prober.clone();
        let cancel = cancel.clone();
        let tx = tx.clone();
        tasks.spawn(async move {
            let _permit = permit;
            let outcome = if cancel.is_cancelled() {
                ProbeOutcome::cancelled(ip)
            } else {
                prober.probe(ip, &cancel).await
            };
            let _ = tx.send(outcome).await;
        });
    }

    // Never started: report without measuring.
    for ip in pending {
        if tx.send(ProbeOutcome::cancelled(ip)).await.is_err() {
            break;
        }
    }

    while let Some(joined) = tasks.join_next().await {
        if let Err(err) = joined {
            warn!("probe task ended abnormally: {err}");
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
