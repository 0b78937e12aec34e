//! # Probe Strategy
//!
//! Measures one IP's reachability. The primary method is a series of TCP
//! handshakes whose **median** latency is reported; when every handshake
//! fails, an optional secondary [`FallbackProbe`] (an ICMP echo through the
//! platform `ping` utility) gets a chance before the IP is classified as
//! failed.
//!
//! Both methods sit behind traits so the scheduler and the tests can swap the
//! network out:
//! * [`Connector`]: one bounded connection attempt.
//! * [`FallbackProbe`]: one bounded echo round trip that never errors.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hostpin_common::config::ProbeConfig;
use hostpin_common::network::probe::{Latency, ProbeOutcome, ProbeStatus};
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub mod ping;
pub mod tcp;

use ping::PingProbe;
use tcp::TcpConnector;

/// Why a single connection attempt failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectError {
    Timeout,
    /// Refused, or no route to the host/network.
    Unreachable(String),
    Other(String),
}

#[async_trait]
pub trait Connector: Send + Sync {
    /// Attempts one connection and returns the time it took to establish.
    ///
    /// Implementations must give up after `timeout`.
    async fn connect(&self, addr: SocketAddr, timeout: Duration) -> Result<Duration, ConnectError>;
}

#[async_trait]
pub trait FallbackProbe: Send + Sync {
    /// Round-trip latency in milliseconds, or `None` for any kind of failure.
    async fn probe(&self, ip: IpAddr, timeout: Duration) -> Option<u32>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeSettings {
    pub port: u16,
    pub attempts: u32,
    pub connect_timeout: Duration,
    pub attempt_pause: Duration,
    pub fallback_timeout: Duration,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self::from(&ProbeConfig::default())
    }
}

impl From<&ProbeConfig> for ProbeSettings {
    fn from(cfg: &ProbeConfig) -> Self {
        Self {
            port: cfg.port,
            attempts: cfg.attempts,
            connect_timeout: cfg.connect_timeout(),
            attempt_pause: cfg.attempt_pause(),
            fallback_timeout: cfg.fallback_timeout(),
        }
    }
}

/// Outcome of the TCP phase for one IP.
#[derive(Debug, Clone, PartialEq)]
pub struct TcpSample {
    /// Median of the successful attempts, in fractional milliseconds.
    pub median_ms: Option<f64>,
    pub succeeded: bool,
    /// Classification of the last failed attempt (only set when nothing succeeded).
    pub last_error: Option<ConnectError>,
    /// Attempts that ran to completion, successful or not.
    pub completed_attempts: u32,
}

pub struct Prober {
    connector: Arc<dyn Connector>,
    fallback: Option<Arc<dyn FallbackProbe>>,
    settings: ProbeSettings,
}

impl Prober {
    /// TCP-only prober with the real network connector.
    pub fn new(settings: ProbeSettings) -> Self {
        Self {
            connector: Arc::new(TcpConnector),
            fallback: None,
            settings,
        }
    }

    /// Real connector, plus the ping fallback when `cfg.fallback` is set.
    pub fn from_config(cfg: &ProbeConfig) -> Self {
        let fallback: Option<Arc<dyn FallbackProbe>> = if cfg.fallback {
            Some(Arc::new(PingProbe))
        } else {
            None
        };
        Self::new(ProbeSettings::from(cfg)).with_fallback(fallback)
    }

    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = connector;
        self
    }

    pub fn with_fallback(mut self, fallback: Option<Arc<dyn FallbackProbe>>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn settings(&self) -> &ProbeSettings {
        &self.settings
    }

    /// Runs up to `attempts` sequential handshakes against `ip:port`.
    ///
    /// Cancellation is checked before every attempt and interrupts an attempt
    /// in flight; interrupted attempts do not count as completed.
    pub async fn tcp_median_rtt(&self, ip: IpAddr, cancel: &CancellationToken) -> TcpSample {
        let addr = SocketAddr::new(ip, self.settings.port);
        let attempts = self.settings.attempts.max(1);
        let mut latencies: Vec<f64> = Vec::with_capacity(attempts as usize);
        let mut last_error: Option<ConnectError> = None;
        let mut completed: u32 = 0;

        for attempt in 0..attempts {
            if cancel.is_cancelled() {
                break;
            }

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                res = self.connector.connect(addr, self.settings.connect_timeout) => res,
            };
            completed += 1;

            match result {
                Ok(elapsed) => latencies.push(elapsed.as_secs_f64() * 1000.0),
                Err(err) => {
                    debug!("{addr} attempt {} failed: {err:?}", attempt + 1);
                    last_error = Some(err);
                }
            }

            if attempt + 1 < attempts && !self.settings.attempt_pause.is_zero() {
                tokio::time::sleep(self.settings.attempt_pause).await;
            }
        }

        match median(&mut latencies) {
            Some(med) => TcpSample {
                median_ms: Some(med),
                succeeded: true,
                last_error: None,
                completed_attempts: completed,
            },
            None => TcpSample {
                median_ms: None,
                succeeded: false,
                last_error,
                completed_attempts: completed,
            },
        }
    }

    /// Full strategy for one IP: TCP median, optional fallback, classification.
    pub async fn probe(&self, ip: IpAddr, cancel: &CancellationToken) -> ProbeOutcome {
        if cancel.is_cancelled() {
            return ProbeOutcome::cancelled(ip);
        }

        let sample = self.tcp_median_rtt(ip, cancel).await;

        if let Some(med) = sample.median_ms {
            return ProbeOutcome::available(ip, Latency::from_millis_f64(med), ProbeStatus::Available);
        }

        if sample.completed_attempts == 0 {
            return ProbeOutcome::cancelled(ip);
        }

        if let Some(fallback) = &self.fallback {
            if !cancel.is_cancelled() {
                if let Some(ms) = fallback.probe(ip, self.settings.fallback_timeout).await {
                    debug!("{ip} answered the fallback probe in {ms} ms");
                    return ProbeOutcome::available(
                        ip,
                        Latency::Measured(ms.max(1)),
                        ProbeStatus::AvailableViaFallback,
                    );
                }
            }
        }

        let status = match sample.last_error {
            Some(ConnectError::Timeout) => ProbeStatus::TimedOut,
            Some(ConnectError::Unreachable(_)) => ProbeStatus::Unreachable,
            Some(ConnectError::Other(_)) | None => ProbeStatus::Failed,
        };
        ProbeOutcome::unmeasured(ip, status)
    }
}

/// Median of the samples; the mean of the two middle values for even counts.
pub fn median(samples: &mut [f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    samples.sort_by(|a, b| a.total_cmp(b));
    let mid = samples.len() / 2;
    if samples.len() % 2 == 1 {
        Some(samples[mid])
    } else {
        Some((samples[mid - 1] + samples[mid]) / 2.0)
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
