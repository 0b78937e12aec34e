#![cfg(test)]
use std::sync::Arc;
use std::time::Duration;

use hostpin_common::config::ProbeConfig;
use hostpin_common::network::probe::{Latency, ProbeStatus};
use hostpin_common::network::target::{HostEntry, deduplicate};
use hostpin_core::aggregate::ResultSet;
use hostpin_core::probe::Prober;
use hostpin_core::scheduler;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

fn loopback_config(port: u16) -> ProbeConfig {
    ProbeConfig {
        port,
        attempts: 3,
        connect_timeout_ms: 1_000,
        attempt_pause_ms: 0,
        fallback: false,
        ..ProbeConfig::default()
    }
}

/// A listening loopback socket is measured once and expanded to every
/// domain that pointed at it.
#[tokio::test]
async fn loopback_listener_is_available_for_every_domain() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        loop {
            if listener.accept().await.is_err() {
                break;
            }
        }
    });

    let targets = deduplicate(vec![
        "127.0.0.1=one.test".parse::<HostEntry>().unwrap(),
        "127.0.0.1=two.test".parse::<HostEntry>().unwrap(),
        "127.0.0.1=one.test".parse::<HostEntry>().unwrap(),
    ]);
    assert_eq!(targets.len(), 1);

    let prober = Arc::new(Prober::from_config(&loopback_config(port)));
    let mut stream = scheduler::run(prober, &targets, 60, CancellationToken::new());
    let mut results = ResultSet::new(&targets, Duration::ZERO);

    while let Some(outcome) = stream.next().await {
        results.record(&outcome);
    }
    results.finish();

    assert_eq!(results.progress(), (1, 1));
    let rows: Vec<_> = results.sorted_rows().collect();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.status == ProbeStatus::Available));
    assert!(rows.iter().all(|r| matches!(r.latency, Latency::Measured(ms) if ms >= 1)));

    let best = results.best_per_domain();
    assert_eq!(best.len(), 2);
    assert_eq!(best[0].domain, "one.test");
}

/// A closed port ranks after a listening one and is never picked.
#[tokio::test]
async fn closed_port_ranks_last() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        while listener.accept().await.is_ok() {}
    });

    // Same port on a second loopback address nobody listens on.
    let targets = deduplicate(vec![
        "127.0.0.2=a.test".parse::<HostEntry>().unwrap(),
        "127.0.0.1=a.test".parse::<HostEntry>().unwrap(),
    ]);

    let prober = Arc::new(Prober::from_config(&loopback_config(port)));
    let mut stream = scheduler::run(prober, &targets, 60, CancellationToken::new());
    let mut results = ResultSet::new(&targets, Duration::ZERO);
    while let Some(outcome) = stream.next().await {
        results.record(&outcome);
    }
    results.finish();

    let rows: Vec<_> = results.sorted_rows().collect();
    assert_eq!(rows[0].ip.to_string(), "127.0.0.1");
    assert_eq!(rows[1].latency, Latency::Unmeasured);
    assert!(!rows[1].status.is_success());

    let best = results.best_per_domain();
    assert_eq!(best.len(), 1);
    assert_eq!(best[0].ip.to_string(), "127.0.0.1");
}

#[tokio::test]
async fn stopping_marks_every_unfinished_ip_cancelled() {
    let targets = deduplicate(
        (1..=20u8)
            .map(|i| HostEntry::new(format!("10.255.255.{i}").parse().unwrap(), "slow.test"))
            .collect::<Vec<_>>(),
    );

    let prober = Arc::new(Prober::from_config(&loopback_config(9)));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let mut stream = scheduler::run(prober, &targets, 4, cancel);
    let mut results = ResultSet::new(&targets, Duration::ZERO);
    while let Some(outcome) = stream.next().await {
        results.record(&outcome);
    }

    assert_eq!(results.progress(), (20, 20));
    assert!(results
        .rows()
        .iter()
        .all(|r| r.status == ProbeStatus::Cancelled && r.latency == Latency::Unmeasured));
    assert!(results.best_per_domain().is_empty());
}
