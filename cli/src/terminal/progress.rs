use colored::*;
use hostpin_common::network::probe::ProbeOutcome;
use indicatif::ProgressStyle;
use tracing::Span;
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::terminal::format;

const STOP_TIP: &str = "press 'q' to stop early";

/// Progress bar attached to the probing span, counted in unique IPs.
pub struct ProbeProgress {
    span: Span,
    show_tip: bool,
}

impl ProbeProgress {
    pub fn start(span: Span, total: usize, show_tip: bool) -> Self {
        let style = ProgressStyle::with_template(
            "{spinner:.blue} [{elapsed_precise}] {bar:30.cyan/blue} {pos}/{len} IPs {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .tick_strings(&[
            "▁▁▁▁▁", "▁▂▂▂▁", "▁▄▂▄▁", "▂▄▆▄▂", "▄▆█▆▄", "▂▄▆▄▂", "▁▄▂▄▁", "▁▂▂▂▁",
        ]);

        span.pb_set_style(&style);
        span.pb_set_length(total as u64);
        span.pb_start();

        let progress = Self { span, show_tip };
        progress.set_message(None);
        progress
    }

    pub fn advance(&self, completed: usize) {
        self.span.pb_set_position(completed as u64);
    }

    /// Shows the current front-runner of the sorted view.
    pub fn set_leader(&self, leader: Option<(&str, &ProbeOutcome)>) {
        let text = leader.map(|(domain, outcome)| {
            format!(
                "fastest so far: {} {} ({})",
                outcome.ip,
                domain,
                format::latency(outcome.latency)
            )
        });
        self.set_message(text);
    }

    pub fn stopping(&self) {
        self.span
            .pb_set_message(&format!("{}", "stopping, waiting for running probes...".yellow()));
    }

    fn set_message(&self, text: Option<String>) {
        let tip = if self.show_tip {
            format!("{}", STOP_TIP.italic().bright_black())
        } else {
            String::new()
        };
        let msg = match text {
            Some(text) if tip.is_empty() => text,
            Some(text) => format!("{text}  {tip}"),
            None => tip,
        };
        self.span.pb_set_message(&msg);
    }
}

/// Spinner for steps without a known length, e.g. fetching remote lists.
pub fn spinner(span: &Span, message: &str) {
    if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        span.pb_set_style(&style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "✓"]));
    }
    span.pb_set_message(message);
    span.pb_start();
}
