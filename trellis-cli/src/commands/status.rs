//! `trellis status` — is the target still in step with its last sync?

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use trellis_core::config;
use trellis_sync::{
    status::{self, format_datetime_age, preview_files},
    ExcludeMatcher, TargetStatus,
};

use super::{current_dir, TargetArgs};

/// Arguments for `trellis status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let target_root = self.target.resolve(&current_dir()?);
        let config = config::load_layered(&target_root)
            .with_context(|| format!("failed to load config for {}", target_root.display()))?;
        let excludes = ExcludeMatcher::with_defaults(&config.exclude);

        let signal = status::check(&target_root, &excludes)
            .with_context(|| format!("status check failed for {}", target_root.display()))?;
        let last_synced: Option<DateTime<Utc>> = status::last_synced(&target_root);

        let report = StatusReport {
            target: target_root,
            last_sync_at: last_synced.map(|t| t.to_rfc3339()),
            last_sync_age: last_synced
                .map(format_datetime_age)
                .unwrap_or_else(|| "never".to_string()),
            signal,
        };

        if self.json {
            print_json(report)?;
        } else {
            print_table(report);
        }
        Ok(())
    }
}

#[derive(Debug)]
struct StatusReport {
    target: PathBuf,
    signal: TargetStatus,
    last_sync_at: Option<String>,
    last_sync_age: String,
}

#[derive(Serialize)]
struct StatusReportJson {
    target: String,
    status: String,
    detail: String,
    files: Vec<String>,
    last_sync_age: String,
    last_sync_at: Option<String>,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "file")]
    file: String,
    #[tabled(rename = "state")]
    state: String,
}

fn print_json(report: StatusReport) -> Result<()> {
    let payload = StatusReportJson {
        target: report.target.display().to_string(),
        status: report.signal.label().to_string(),
        detail: signal_detail(&report.signal),
        files: report.signal.files().iter().map(|f| f.to_string()).collect(),
        last_sync_age: report.last_sync_age,
        last_sync_at: report.last_sync_at,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
    );
    Ok(())
}

fn print_table(report: StatusReport) {
    println!(
        "Trellis v{} | {} | {} {} | last sync {}",
        env!("CARGO_PKG_VERSION"),
        report.target.display(),
        signal_indicator(&report.signal),
        signal_label(&report.signal),
        report.last_sync_age,
    );
    println!("{}", signal_detail(&report.signal));

    let files = report.signal.files();
    if !files.is_empty() {
        let rows: Vec<StatusTableRow> = files
            .iter()
            .map(|f| StatusTableRow {
                file: f.to_string(),
                state: report.signal.label().to_string(),
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
    }

    match report.signal {
        TargetStatus::NeverSynced => println!("Run 'trellis sync <templates>' to install."),
        TargetStatus::Conflicted { .. } => {
            println!("Merge each .trellis-new file into its original, then delete it.")
        }
        TargetStatus::Missing { .. } => println!("Run 'trellis sync <templates>' to restore."),
        _ => {}
    }
}

fn signal_label(signal: &TargetStatus) -> &'static str {
    match signal {
        TargetStatus::NeverSynced => "NEVER SYNCED",
        TargetStatus::Current => "CURRENT",
        TargetStatus::Conflicted { .. } => "CONFLICTED",
        TargetStatus::Missing { .. } => "MISSING",
        TargetStatus::Modified { .. } => "MODIFIED",
    }
}

fn signal_indicator(signal: &TargetStatus) -> String {
    match signal {
        TargetStatus::NeverSynced => "■".bright_black().bold().to_string(),
        TargetStatus::Current => "■".green().bold().to_string(),
        TargetStatus::Conflicted { .. } => "■".red().bold().to_string(),
        TargetStatus::Missing { .. } => "■".yellow().bold().to_string(),
        TargetStatus::Modified { .. } => "■".magenta().bold().to_string(),
    }
}

fn signal_detail(signal: &TargetStatus) -> String {
    match signal {
        TargetStatus::NeverSynced => "no manifest entries".to_string(),
        TargetStatus::Current => "up to date".to_string(),
        TargetStatus::Conflicted { files } => {
            format!("{} awaiting merge", preview_files(files))
        }
        TargetStatus::Missing { files } => format!("{} deleted", preview_files(files)),
        TargetStatus::Modified { files } => format!("{} edited", preview_files(files)),
    }
}
