//! ICMP fallback through the platform `ping` utility.
//!
//! ICMP is often filtered, so this only ever supplements the TCP probe.
//! Any failure (missing binary, non-zero exit, unparsable output, timeout)
//! collapses into `None`.

use std::net::IpAddr;
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;
use tracing::debug;

use super::FallbackProbe;

/// Slack on top of the ping timeout before the child is killed.
const PROCESS_GRACE: Duration = Duration::from_millis(500);

static TIME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:time|时间)\s*[=<]\s*(\d+(?:\.\d+)?)\s*ms").expect("valid ping time pattern")
});

pub struct PingProbe;

#[async_trait]
impl FallbackProbe for PingProbe {
    async fn probe(&self, ip: IpAddr, timeout: Duration) -> Option<u32> {
        let mut cmd = Command::new("ping");
        cmd.args(ping_args(ip, timeout))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(windows)]
        cmd.creation_flags(0x0800_0000); // CREATE_NO_WINDOW

        let output = match tokio::time::timeout(timeout + PROCESS_GRACE, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                debug!("ping {ip} could not run: {err}");
                return None;
            }
            Err(_elapsed) => {
                debug!("ping {ip} exceeded {timeout:?}");
                return None;
            }
        };

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push('\n');
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        parse_ping_millis(&text)
    }
}

/// Extracts the round-trip time from `ping` output.
///
/// Understands `time=12ms`, `time=12.3 ms`, `时间=12ms` and `time<1ms`.
pub fn parse_ping_millis(output: &str) -> Option<u32> {
    let caps = TIME_PATTERN.captures(output)?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    Some((value.round() as u32).max(1))
}

fn ping_args(ip: IpAddr, timeout: Duration) -> Vec<String> {
    let ip = ip.to_string();
    if cfg!(windows) {
        vec!["-n".into(), "1".into(), "-w".into(), timeout.as_millis().to_string(), ip]
    } else if cfg!(target_os = "macos") {
        vec!["-c".into(), "1".into(), "-W".into(), timeout.as_millis().to_string(), ip]
    } else {
        // Linux ping takes whole seconds.
        let secs = timeout.as_secs_f64().ceil().max(1.0) as u64;
        vec!["-c".into(), "1".into(), "-W".into(), secs.to_string(), ip]
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
