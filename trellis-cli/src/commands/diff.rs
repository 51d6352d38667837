//! `trellis diff` — show unified diffs between templates and the target,
//! each headed by what `trellis sync` with the same flags would do.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use trellis_sync::diff_target;

use super::TemplateArgs;

/// Arguments for `trellis diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    #[command(flatten)]
    pub common: TemplateArgs,
}

impl DiffArgs {
    pub fn run(self) -> Result<()> {
        let options = self.common.run_options()?;
        let result = diff_target(&options)
            .with_context(|| format!("diff failed for {}", options.target_root.display()))?;

        if result.diffs.is_empty() {
            println!("No differences for {}.", options.target_root.display());
            return Ok(());
        }

        for diff in result.diffs {
            log::debug!("{}: {:?}", diff.destination, diff.decision);
            println!(
                "{} {} ({})",
                "#".bright_black(),
                diff.destination,
                diff.decision.kind()
            );
            print!("{}", diff.unified_diff);
            if !diff.unified_diff.ends_with('\n') {
                println!();
            }
        }

        Ok(())
    }
}
