use colored::*;
use hostpin_common::network::probe::{Latency, ProbeStatus};
use hostpin_core::aggregate::ResultRow;

use crate::terminal::colors;
use crate::terminal::print;

const FAST_MS: u32 = 100;
const SLOW_MS: u32 = 200;

pub fn latency(latency: Latency) -> ColoredString {
    match latency {
        Latency::Measured(ms) if ms < FAST_MS => format!("{ms} ms").color(colors::LATENCY_FAST),
        Latency::Measured(ms) if ms < SLOW_MS => format!("{ms} ms").color(colors::LATENCY_OK),
        Latency::Measured(ms) => format!("{ms} ms").color(colors::LATENCY_SLOW),
        Latency::Unmeasured => "-".bright_black(),
    }
}

pub fn status(status: ProbeStatus) -> ColoredString {
    match status {
        ProbeStatus::Available => status.label().green(),
        ProbeStatus::AvailableViaFallback => status.label().cyan(),
        ProbeStatus::TimedOut => status.label().yellow(),
        ProbeStatus::Cancelled => status.label().bright_black(),
        ProbeStatus::Unreachable | ProbeStatus::Failed => status.label().red(),
    }
}

/// One row per `(ip, domain)`, in the order given.
pub fn results_table<'a>(rows: impl Iterator<Item = &'a ResultRow>) {
    let head = format!(
        "  {:>4}  {:<16} {:<32} {:>9}  {}",
        "#", "IP", "DOMAIN", "LATENCY", "STATUS"
    );
    print::print(&head.bold().to_string());

    for (idx, row) in rows.enumerate() {
        let marker = if row.selected { "*" } else { " " };
        let lat = console::pad_str(
            &latency(row.latency).to_string(),
            9,
            console::Alignment::Right,
            None,
        )
        .into_owned();

        print::print(&format!(
            "{} {:>4}  {} {} {}  {}",
            marker.color(colors::ACCENT),
            (idx + 1).to_string().color(colors::SEPARATOR),
            format!("{:<16}", row.ip).color(colors::IPV4_ADDR),
            format!("{:<32}", row.domain).color(colors::TEXT_DEFAULT),
            lat,
            status(row.status)
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latency_colors_follow_thresholds() {
        colored::control::set_override(true);
        assert_eq!(
            latency(Latency::Measured(45)).to_string(),
            "45 ms".color(colors::LATENCY_FAST).to_string()
        );
        assert_eq!(
            latency(Latency::Measured(150)).to_string(),
            "150 ms".color(colors::LATENCY_OK).to_string()
        );
        assert_eq!(
            latency(Latency::Measured(200)).to_string(),
            "200 ms".color(colors::LATENCY_SLOW).to_string()
        );
        assert!(latency(Latency::Unmeasured).to_string().contains('-'));
    }
}
