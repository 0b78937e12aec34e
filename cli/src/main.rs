mod commands;
mod terminal;

use clap::CommandFactory;
use commands::{CommandLine, Commands, PresetAction, SnapshotChoice, hosts, presets, probe};
use hostpin_common::config::Config;
use terminal::{logging, print};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CommandLine::parse_args();

    logging::init_logging(cli.verbose, cli.quiet);

    // The elevated child only needs its target; a bad config must not stop it
    // from consuming the content file.
    if let Some(content) = cli.write_content.clone() {
        let target = match &cli.hosts {
            Some(path) => Ok(path.clone()),
            None => Config::load(cli.config.as_deref()).map(|cfg| cfg.hosts_path),
        };
        let code = hosts::handoff(content, &cli.encoding, target);
        std::process::exit(code);
    }

    run(cli).await
}

async fn run(mut cli: CommandLine) -> anyhow::Result<()> {
    let Some(command) = cli.command.take() else {
        CommandLine::command().print_help()?;
        return Ok(());
    };

    let mut saved = Config::load(cli.config.as_deref())?;
    let cfg = cli.runtime_config(&saved);

    match command {
        Commands::Probe(args) => probe::probe(args, &cfg, cli.quiet, cli.no_input).await,
        Commands::Rollback { snapshot, latest } => {
            hosts::rollback(SnapshotChoice::from_args(snapshot, latest), &cfg, cli.quiet)
        }
        Commands::Backups => hosts::backups(&cfg, cli.quiet),
        Commands::Show => hosts::show(&cfg, cli.quiet),
        Commands::FlushDns => {
            print::header("dns", cli.quiet);
            hosts::flush_dns();
            Ok(())
        }
        // Edits the on-disk config, never the per-invocation overrides.
        Commands::Presets { action } => presets::presets(
            action.unwrap_or(PresetAction::List),
            &mut saved,
            cli.config.as_deref(),
            cli.quiet,
        ),
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
