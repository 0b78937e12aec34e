use std::cmp::Ordering;
use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

/// A probe latency in whole milliseconds, or the "unmeasured" sentinel.
///
/// Ordering puts every measured value before `Unmeasured`, so a plain
/// ascending sort ranks failures last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Latency {
    Measured(u32),
    Unmeasured,
}

impl Latency {
    /// Rounds a measured duration to milliseconds, floored at 1.
    pub fn from_duration(elapsed: Duration) -> Self {
        Self::from_millis_f64(elapsed.as_secs_f64() * 1000.0)
    }

    pub fn from_millis_f64(ms: f64) -> Self {
        if !ms.is_finite() || ms < 0.0 {
            return Latency::Unmeasured;
        }
        let rounded = ms.round().min(f64::from(u32::MAX)) as u32;
        Latency::Measured(rounded.max(1))
    }

    pub fn as_millis(&self) -> Option<u32> {
        match self {
            Latency::Measured(ms) => Some(*ms),
            Latency::Unmeasured => None,
        }
    }

    pub fn is_measured(&self) -> bool {
        matches!(self, Latency::Measured(_))
    }
}

impl Ord for Latency {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Latency::Measured(a), Latency::Measured(b)) => a.cmp(b),
            (Latency::Measured(_), Latency::Unmeasured) => Ordering::Less,
            (Latency::Unmeasured, Latency::Measured(_)) => Ordering::Greater,
            (Latency::Unmeasured, Latency::Unmeasured) => Ordering::Equal,
        }
    }
}

impl PartialOrd for Latency {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Latency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Latency::Measured(ms) => write!(f, "{ms} ms"),
            Latency::Unmeasured => f.write_str("-"),
        }
    }
}

/// Terminal classification of one IP's probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeStatus {
    /// TCP handshake succeeded.
    Available,
    /// TCP failed, the ping fallback answered.
    AvailableViaFallback,
    TimedOut,
    /// Connection actively refused or the network was unreachable.
    Unreachable,
    Failed,
    Cancelled,
}

impl ProbeStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, ProbeStatus::Available | ProbeStatus::AvailableViaFallback)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProbeStatus::Available => "available",
            ProbeStatus::AvailableViaFallback => "available (icmp)",
            ProbeStatus::TimedOut => "timed out",
            ProbeStatus::Unreachable => "unreachable",
            ProbeStatus::Failed => "failed",
            ProbeStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The result of probing one unique IP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub ip: IpAddr,
    pub latency: Latency,
    pub status: ProbeStatus,
}

impl ProbeOutcome {
    pub fn available(ip: IpAddr, latency: Latency, status: ProbeStatus) -> Self {
        Self { ip, latency, status }
    }

    /// An outcome without a measurement; latency is forced to the sentinel.
    pub fn unmeasured(ip: IpAddr, status: ProbeStatus) -> Self {
        Self {
            ip,
            latency: Latency::Unmeasured,
            status,
        }
    }

    pub fn cancelled(ip: IpAddr) -> Self {
        Self::unmeasured(ip, ProbeStatus::Cancelled)
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
