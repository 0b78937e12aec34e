//! # Result Aggregation
//!
//! Turns the completion-ordered [`ProbeOutcome`] stream into one
//! [`ResultRow`] per `(ip, domain)` pair and keeps a latency-sorted view of
//! them.
//!
//! - Progress is counted in unique IPs, not rows.
//! - Re-sorting is debounced by a [`SortThrottle`]: bursts of outcomes only
//!   mark the view dirty, and the view is recomputed at most once per
//!   interval. Underlying rows are never dropped or reordered.
//! - The sort is stable, so ties keep insertion order.

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use hostpin_common::network::probe::{Latency, ProbeOutcome, ProbeStatus};
use hostpin_common::network::target::{HostEntry, ProbeTarget};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    pub ip: IpAddr,
    pub domain: String,
    pub latency: Latency,
    pub status: ProbeStatus,
    pub selected: bool,
}

impl ResultRow {
    pub fn entry(&self) -> HostEntry {
        HostEntry::new(self.ip, self.domain.clone())
    }
}

/// The fastest successful row for one domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BestPick {
    pub domain: String,
    pub ip: IpAddr,
    pub latency: Latency,
    pub status: ProbeStatus,
}

impl BestPick {
    pub fn entry(&self) -> HostEntry {
        HostEntry::new(self.ip, self.domain.clone())
    }
}

/// Coalesces re-sort requests: at most one pending re-sort, applied no more
/// often than `interval`.
#[derive(Debug)]
pub struct SortThrottle {
    interval: Duration,
    last: Option<Instant>,
    dirty: bool,
}

impl SortThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
            dirty: false,
        }
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns `true` when a pending re-sort is due at `now`, consuming it.
    pub fn ready(&mut self, now: Instant) -> bool {
        if !self.dirty {
            return false;
        }
        let due = match self.last {
            Some(last) => now.saturating_duration_since(last) >= self.interval,
            None => true,
        };
        if due {
            self.dirty = false;
            self.last = Some(now);
        }
        due
    }

    /// Consumes any pending re-sort regardless of the interval.
    pub fn flush(&mut self, now: Instant) -> bool {
        let pending = self.dirty;
        self.dirty = false;
        if pending {
            self.last = Some(now);
        }
        pending
    }
}

pub struct ResultSet {
    domains_by_ip: HashMap<IpAddr, Vec<String>>,
    rows: Vec<ResultRow>,
    /// Indices into `rows`, in display order.
    view: Vec<usize>,
    completed: usize,
    total: usize,
    throttle: SortThrottle,
}

impl ResultSet {
    pub fn new(targets: &[ProbeTarget], sort_interval: Duration) -> Self {
        let domains_by_ip = targets
            .iter()
            .map(|t| (t.ip, t.domains.clone()))
            .collect::<HashMap<_, _>>();

        Self {
            total: domains_by_ip.len(),
            domains_by_ip,
            rows: Vec::new(),
            view: Vec::new(),
            completed: 0,
            throttle: SortThrottle::new(sort_interval),
        }
    }

    /// Expands one IP outcome across all of its domains.
    ///
    /// Outcomes for IPs that were not part of the session are ignored.
    pub fn record(&mut self, outcome: &ProbeOutcome) {
        let Some(domains) = self.domains_by_ip.get(&outcome.ip) else {
            debug!("ignoring outcome for unknown ip {}", outcome.ip);
            return;
        };

        for domain in domains {
            self.view.push(self.rows.len());
            self.rows.push(ResultRow {
                ip: outcome.ip,
                domain: domain.clone(),
                latency: outcome.latency,
                status: outcome.status,
                selected: false,
            });
        }
        self.completed += 1;
        self.throttle.mark_dirty();
    }

    /// `(completed, total)` in unique IPs.
    pub fn progress(&self) -> (usize, usize) {
        (self.completed, self.total)
    }

    /// Re-sorts if a pending request is due. Returns whether the view changed.
    pub fn refresh(&mut self, now: Instant) -> bool {
        if self.throttle.ready(now) {
            self.resort();
            true
        } else {
            false
        }
    }

    /// Applies any pending re-sort immediately, e.g. once the stream ends.
    pub fn finish(&mut self) {
        if self.throttle.flush(Instant::now()) {
            self.resort();
        }
    }

    fn resort(&mut self) {
        let rows = &self.rows;
        self.view.sort_by_key(|&i| rows[i].latency);
    }

    /// Rows in the current display order.
    pub fn sorted_rows(&self) -> impl Iterator<Item = &ResultRow> {
        self.view.iter().map(|&i| &self.rows[i])
    }

    /// Rows in completion order.
    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    /// Flips `selected` on the `(ip, domain)` row. Returns the new state, or
    /// `None` if no such row exists.
    pub fn toggle(&mut self, ip: IpAddr, domain: &str) -> Option<bool> {
        let row = self.row_mut(ip, domain)?;
        row.selected = !row.selected;
        Some(row.selected)
    }

    /// Marks the `(ip, domain)` row selected. Returns `false` if no such row
    /// exists. Selecting twice keeps it selected.
    pub fn select(&mut self, ip: IpAddr, domain: &str) -> bool {
        match self.row_mut(ip, domain) {
            Some(row) => {
                row.selected = true;
                true
            }
            None => false,
        }
    }

    fn row_mut(&mut self, ip: IpAddr, domain: &str) -> Option<&mut ResultRow> {
        self.rows.iter_mut().find(|r| r.ip == ip && r.domain == domain)
    }

    pub fn selected(&self) -> Vec<HostEntry> {
        self.sorted_rows()
            .filter(|r| r.selected)
            .map(ResultRow::entry)
            .collect()
    }

    /// Fastest successful row per domain, in first-seen domain order.
    ///
    /// Fallback latencies compete with TCP latencies on equal terms. Domains
    /// without any successful row are left out.
    pub fn best_per_domain(&self) -> Vec<BestPick> {
        let mut order: Vec<&str> = Vec::new();
        let mut best: HashMap<&str, &ResultRow> = HashMap::new();

        for row in self.rows.iter().filter(|r| r.status.is_success()) {
            match best.get(row.domain.as_str()) {
                Some(current) if current.latency <= row.latency => {}
                Some(_) => {
                    best.insert(&row.domain, row);
                }
                None => {
                    order.push(&row.domain);
                    best.insert(&row.domain, row);
                }
            }
        }

        order
            .into_iter()
            .filter_map(|domain| best.get(domain))
            .map(|row| BestPick {
                domain: row.domain.clone(),
                ip: row.ip,
                latency: row.latency,
                status: row.status,
            })
            .collect()
    }

    pub fn successes(&self) -> usize {
        self.rows.iter().filter(|r| r.status.is_success()).count()
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

#[cfg(test)]
mod tests {
    use super::*;
    use hostpin_common::network::target::deduplicate;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn target(addr: &str, domains: &[&str]) -> ProbeTarget {
        ProbeTarget {
            ip: ip(addr),
            domains: domains.iter().map(|d| d.to_string()).collect(),
        }
    }

    fn ok(addr: &str, ms: u32) -> ProbeOutcome {
        ProbeOutcome::available(ip(addr), Latency::Measured(ms), ProbeStatus::Available)
    }

    #[test]
    fn outcomes_expand_to_one_row_per_domain() {
        let targets = vec![target("10.0.0.1", &["a.test", "b.test"]), target("10.0.0.2", &["a.test"])];
        let mut set = ResultSet::new(&targets, Duration::ZERO);

        set.record(&ok("10.0.0.1", 30));

        assert_eq!(set.rows().len(), 2);
        assert_eq!(set.progress(), (1, 2));
    }

    #[test]
    fn unmeasured_rows_rank_last_and_ties_keep_insertion_order() {
        let targets = vec![
            target("10.0.0.1", &["a.test"]),
            target("10.0.0.2", &["a.test"]),
            target("10.0.0.3", &["a.test"]),
            target("10.0.0.4", &["a.test"]),
        ];
        let mut set = ResultSet::new(&targets, Duration::ZERO);

        set.record(&ProbeOutcome::unmeasured(ip("10.0.0.1"), ProbeStatus::TimedOut));
        set.record(&ok("10.0.0.2", 80));
        set.record(&ok("10.0.0.3", 20));
        set.record(&ok("10.0.0.4", 80));
        set.finish();

        let order: Vec<_> = set.sorted_rows().map(|r| r.ip).collect();
        assert_eq!(
            order,
            vec![ip("10.0.0.3"), ip("10.0.0.2"), ip("10.0.0.4"), ip("10.0.0.1")]
        );
    }

    #[test]
    fn throttle_coalesces_bursts() {
        let start = Instant::now();
        let mut throttle = SortThrottle::new(Duration::from_millis(200));

        throttle.mark_dirty();
        assert!(throttle.ready(start));

        throttle.mark_dirty();
        throttle.mark_dirty();
        assert!(!throttle.ready(start + Duration::from_millis(50)));
        assert!(throttle.is_dirty());
        assert!(throttle.ready(start + Duration::from_millis(250)));
        assert!(!throttle.ready(start + Duration::from_millis(900)));
    }

    #[test]
    fn refresh_waits_for_the_interval_but_keeps_rows() {
        let targets = vec![target("10.0.0.1", &["a.test"]), target("10.0.0.2", &["a.test"])];
        let mut set = ResultSet::new(&targets, Duration::from_secs(3600));
        let now = Instant::now();

        set.record(&ok("10.0.0.1", 90));
        assert!(set.refresh(now));

        set.record(&ok("10.0.0.2", 10));
        assert!(!set.refresh(now));
        assert_eq!(set.rows().len(), 2);
        assert_eq!(set.sorted_rows().next().unwrap().ip, ip("10.0.0.1"));

        set.finish();
        assert_eq!(set.sorted_rows().next().unwrap().ip, ip("10.0.0.2"));
    }

    #[test]
    fn toggle_does_not_touch_progress_or_order() {
        let targets = vec![target("10.0.0.1", &["a.test", "b.test"])];
        let mut set = ResultSet::new(&targets, Duration::ZERO);
        set.record(&ok("10.0.0.1", 12));
        set.finish();

        assert_eq!(set.toggle(ip("10.0.0.1"), "b.test"), Some(true));
        assert_eq!(set.toggle(ip("10.0.0.9"), "b.test"), None);
        assert_eq!(set.progress(), (1, 1));
        assert_eq!(set.selected(), vec![HostEntry::new(ip("10.0.0.1"), "b.test")]);

        assert_eq!(set.toggle(ip("10.0.0.1"), "b.test"), Some(false));
        assert!(set.selected().is_empty());
    }

    #[test]
    fn selecting_twice_keeps_the_row_selected() {
        let targets = vec![target("10.0.0.1", &["a.test"])];
        let mut set = ResultSet::new(&targets, Duration::ZERO);
        set.record(&ok("10.0.0.1", 12));
        set.finish();

        assert!(set.select(ip("10.0.0.1"), "a.test"));
        assert!(set.select(ip("10.0.0.1"), "a.test"));
        assert!(!set.select(ip("10.0.0.2"), "a.test"));
        assert_eq!(set.selected(), vec![HostEntry::new(ip("10.0.0.1"), "a.test")]);
    }

    #[test]
    fn best_per_domain_skips_failures_and_prefers_first_on_ties() {
        let targets = vec![
            target("10.0.0.1", &["a.test", "b.test"]),
            target("10.0.0.2", &["a.test"]),
            target("10.0.0.3", &["c.test"]),
            target("10.0.0.4", &["a.test"]),
        ];
        let mut set = ResultSet::new(&targets, Duration::ZERO);
        set.record(&ok("10.0.0.1", 40));
        set.record(&ProbeOutcome::available(
            ip("10.0.0.2"),
            Latency::Measured(25),
            ProbeStatus::AvailableViaFallback,
        ));
        set.record(&ProbeOutcome::unmeasured(ip("10.0.0.3"), ProbeStatus::Failed));
        set.record(&ok("10.0.0.4", 25));

        let best = set.best_per_domain();

        assert_eq!(best.len(), 2);
        assert_eq!(best[0].domain, "a.test");
        assert_eq!(best[0].ip, ip("10.0.0.2"));
        assert_eq!(best[1].domain, "b.test");
        assert_eq!(best[1].ip, ip("10.0.0.1"));
    }

    #[test]
    fn github_scenario_picks_the_reachable_address() {
        let targets = deduplicate(vec![
            HostEntry::new(ip("192.30.255.113"), "github.com"),
            HostEntry::new(ip("140.82.112.3"), "github.com"),
        ]);
        let mut set = ResultSet::new(&targets, Duration::ZERO);

        set.record(&ProbeOutcome::unmeasured(ip("140.82.112.3"), ProbeStatus::TimedOut));
        set.record(&ok("192.30.255.113", 45));

        let best = set.best_per_domain();
        assert_eq!(best.len(), 1);
        assert_eq!(best[0].domain, "github.com");
        assert_eq!(best[0].ip, ip("192.30.255.113"));
        assert_eq!(best[0].latency, Latency::Measured(45));
        assert_eq!(best[0].entry().hosts_line(), "192.30.255.113 github.com");
    }
}
