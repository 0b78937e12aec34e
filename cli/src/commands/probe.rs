use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use colored::*;
use hostpin_common::config::Config;
use hostpin_common::network::probe::ProbeOutcome;
use hostpin_common::network::target::{HostEntry, deduplicate};
use hostpin_common::success;
use hostpin_core::aggregate::ResultSet;
use hostpin_core::probe::{ProbeSettings, Prober};
use hostpin_core::scheduler;
use hostpin_core::sources::remote::RemoteSource;
use hostpin_core::sources::resolve::resolve_domains;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::commands::{ProbeArgs, WriteMode, write};
use crate::hprint;
use crate::terminal::input::InputHandle;
use crate::terminal::progress::{self, ProbeProgress};
use crate::terminal::{colors, format, print};

const MIN_REFRESH: Duration = Duration::from_millis(50);

pub async fn probe(args: ProbeArgs, cfg: &Config, quiet: u8, no_input: bool) -> anyhow::Result<()> {
    let candidates = gather_candidates(&args, cfg, quiet).await?;
    let targets = deduplicate(candidates);

    if targets.is_empty() {
        warn!("nothing to probe: pass --domain, --presets, --remote or --pair");
        return Ok(());
    }

    let prober = Arc::new(build_prober(&args, cfg));
    let cancel = CancellationToken::new();
    let input = if no_input {
        None
    } else {
        InputHandle::start(cancel.clone())
    };

    print::header("probing", quiet);
    info!(
        "{} unique IPs on port {}",
        targets.len(),
        prober.settings().port
    );

    let start_time = Instant::now();
    let mut results = ResultSet::new(&targets, cfg.sort_interval());
    let span = info_span!("probe", indicatif.pb_show = true);
    let bar = ProbeProgress::start(span.clone(), targets.len(), input.is_some());

    let mut stream = scheduler::run(prober, &targets, cfg.probe.max_concurrency, cancel.clone());
    let mut ticker = tokio::time::interval(cfg.sort_interval().max(MIN_REFRESH));
    let mut stopping = false;

    async {
        loop {
            tokio::select! {
                next = stream.next() => match next {
                    Some(outcome) => {
                        debug!("{} -> {} ({})", outcome.ip, outcome.status, outcome.latency);
                        results.record(&outcome);
                        bar.advance(results.progress().0);
                    }
                    None => break,
                },
                _ = ticker.tick() => {
                    if results.refresh(Instant::now()) {
                        bar.set_leader(leader(&results).as_ref().map(|(d, o)| (d.as_str(), o)));
                    }
                    if cancel.is_cancelled() && !stopping {
                        stopping = true;
                        bar.stopping();
                    }
                }
                _ = tokio::signal::ctrl_c(), if !stopping => {
                    stream.stop();
                }
            }
        }
    }
    .instrument(span.clone())
    .await;

    results.finish();
    drop(bar);
    drop(span);
    drop(input);

    report(&results, start_time.elapsed(), cancel.is_cancelled(), quiet);
    write_results(&args, &mut results, cfg, quiet)
}

async fn gather_candidates(args: &ProbeArgs, cfg: &Config, quiet: u8) -> anyhow::Result<Vec<HostEntry>> {
    let mut candidates: Vec<HostEntry> = args.pairs.clone();

    if args.wants_remote() {
        let span = info_span!("remote", indicatif.pb_show = true);
        progress::spinner(&span, "fetching remote hosts lists...");

        let mut source = RemoteSource::from_config(&cfg.remote)?;
        if let Some(choice) = &args.source {
            source = match choice.parse::<usize>() {
                Ok(index) => source.pinned_index(index)?,
                Err(_) => source.pinned(choice.as_str()),
            };
        }

        let fetched = source.fetch().instrument(span.clone()).await;
        drop(span);
        match fetched {
            Ok(remote) => {
                if quiet == 0 {
                    print::aligned_line("Source", remote.url.as_str());
                    print::aligned_line("Entries", remote.entries.len().to_string());
                }
                candidates.extend(remote.entries);
            }
            Err(err) => warn!("{err}"),
        }
    }

    let mut domains = args.domains.clone();
    if args.presets {
        domains.extend(cfg.presets.iter().cloned());
    }
    if !domains.is_empty() {
        let resolved = resolve_domains(&domains, cfg.resolve_concurrency).await;
        info!("resolved {} addresses for {} domains", resolved.len(), domains.len());
        candidates.extend(resolved);
    }

    Ok(candidates)
}

fn build_prober(args: &ProbeArgs, cfg: &Config) -> Prober {
    let mut probe_cfg = cfg.probe.clone();
    if args.no_fallback {
        probe_cfg.fallback = false;
    }
    if let Some(port) = args.port {
        probe_cfg.port = port;
    }

    let prober = Prober::from_config(&probe_cfg);
    debug!("probe settings: {:?}", ProbeSettings::from(&probe_cfg));
    prober
}

fn leader(results: &ResultSet) -> Option<(String, ProbeOutcome)> {
    results
        .sorted_rows()
        .next()
        .filter(|row| row.status.is_success())
        .map(|row| {
            (
                row.domain.clone(),
                ProbeOutcome::available(row.ip, row.latency, row.status),
            )
        })
}

fn report(results: &ResultSet, elapsed: Duration, cancelled: bool, quiet: u8) {
    let (completed, total) = results.progress();

    if quiet < 2 {
        print::header("results", quiet);
        format::results_table(results.sorted_rows());
        hprint!();
    }

    if cancelled {
        warn!("stopped early; unprobed IPs are listed as cancelled");
    }

    let reachable = results.successes();
    let summary = format!(
        "{} of {} IPs probed, {} reachable rows, in {}",
        completed.to_string().bold(),
        total,
        reachable.to_string().green().bold(),
        format!("{:.2}s", elapsed.as_secs_f64()).yellow().bold()
    );

    if quiet == 0 {
        print::fat_separator();
        print::centerln(&summary.color(colors::TEXT_DEFAULT).to_string());
    } else {
        success!("{summary}");
    }
}

fn write_results(args: &ProbeArgs, results: &mut ResultSet, cfg: &Config, quiet: u8) -> anyhow::Result<()> {
    let entries = match args.write_mode() {
        WriteMode::None => return Ok(()),
        WriteMode::Best => {
            let best = results.best_per_domain();
            if best.is_empty() {
                warn!("no domain has a reachable IP, hosts file left unchanged");
                return Ok(());
            }
            if quiet == 0 {
                print::header("fastest per domain", quiet);
                for pick in &best {
                    print::aligned_line(&pick.domain, format!("{} ({})", pick.ip, format::latency(pick.latency)));
                }
            }
            best.iter().map(|p| p.entry()).collect::<Vec<_>>()
        }
        WriteMode::Selected => {
            for pick in &args.picks {
                if !results.select(pick.ip, &pick.domain) {
                    warn!("{pick} is not among the results, skipped");
                }
            }
            let selected = results.selected();
            if selected.is_empty() {
                warn!("no rows selected, hosts file left unchanged");
                return Ok(());
            }
            selected
        }
    };

    write::commit(&entries, cfg, quiet).context("writing hosts file")
}
