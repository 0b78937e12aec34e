use std::path::Path;

use hostpin_common::config::Config;
use hostpin_common::success;
use tracing::{info, warn};

use crate::commands::PresetAction;
use crate::terminal::print;

pub fn presets(action: PresetAction, cfg: &mut Config, config_path: Option<&Path>, quiet: u8) -> anyhow::Result<()> {
    match action {
        PresetAction::List => {
            print::header("presets", quiet);
            if cfg.presets.is_empty() {
                print::no_results("no presets configured");
            }
            for (idx, domain) in cfg.presets.iter().enumerate() {
                print::tree_head(idx + 1, domain);
            }
            Ok(())
        }
        PresetAction::Add { domains } => {
            let added = domains.iter().filter(|d| cfg.add_preset(d)).count();
            if added == 0 {
                warn!("no new presets to add");
                return Ok(());
            }
            let path = cfg.save(config_path)?;
            success!("added {added} presets, saved to {}", path.display());
            Ok(())
        }
        PresetAction::Remove { domains } => {
            let removed = domains.iter().filter(|d| cfg.remove_preset(d)).count();
            if removed == 0 {
                info!("none of those domains were presets");
                return Ok(());
            }
            let path = cfg.save(config_path)?;
            success!("removed {removed} presets, saved to {}", path.display());
            Ok(())
        }
    }
}
