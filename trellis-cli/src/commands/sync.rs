//! `trellis sync` — reconcile a template tree into the target.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use trellis_core::{Decision, DecisionKind, PathSuffixes};
use trellis_sync::{pipeline, CommitStatus, FileOutcome, RunStatus, SyncReport};

use super::TemplateArgs;

/// Arguments for `trellis sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    #[command(flatten)]
    pub common: TemplateArgs,

    /// Destination suffix whose write failures only warn (repeatable).
    #[arg(long, value_name = "SUFFIX")]
    pub optional: Vec<String>,

    /// Show what would happen without writing any files.
    #[arg(long)]
    pub dry_run: bool,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let mut options = self.common.run_options()?;
        options.optional =
            PathSuffixes::new(options.optional.iter().chain(self.optional.iter().map(String::as_str)));
        options.dry_run = self.dry_run;

        let report = pipeline::run(&options).with_context(|| {
            format!(
                "sync of {} into {} failed",
                options.template_root.display(),
                options.target_root.display()
            )
        })?;

        print_report(&report);

        if report.status() == RunStatus::Failed {
            bail!(
                "{} required file(s) could not be synced",
                report.critical.len()
            );
        }
        Ok(())
    }
}

fn print_report(report: &SyncReport) {
    let prefix = if report.dry_run { "[dry-run] " } else { "" };

    if report.safe_upgrade {
        println!(
            "{prefix}{} no manifest found for existing files; edited files get .trellis-new siblings",
            "!".yellow().bold()
        );
    }

    let summary: Vec<String> = DecisionKind::all()
        .iter()
        .filter_map(|kind| match report.count(*kind) {
            0 => None,
            n => Some(format!("{n} {kind}")),
        })
        .collect();
    let (glyph, verb) = headline(report);
    if summary.is_empty() {
        println!("{prefix}{glyph} {} — no templates", report.target_root.display());
    } else {
        println!(
            "{prefix}{glyph} {} {verb} ({})",
            report.target_root.display(),
            summary.join(", ")
        );
    }

    for (kind, outcomes) in report.grouped() {
        if kind == DecisionKind::Unchanged {
            continue;
        }
        for outcome in outcomes {
            println!("  {} {}", marker(kind), describe(outcome));
        }
    }

    for failure in &report.critical {
        println!("  {} {failure}", "✗".red().bold());
    }
    for failure in &report.optional {
        println!("  {} {failure} (optional)", "!".yellow());
    }

    if let CommitStatus::Failed { message } = &report.commit {
        println!(
            "{} manifest not saved: {message}",
            "!".yellow().bold()
        );
    }
    if let Some(hint) = report.remediation() {
        println!("{} {hint}", "hint:".cyan().bold());
    }
}

fn headline(report: &SyncReport) -> (String, &'static str) {
    if report.dry_run {
        return ("•".cyan().to_string(), "would sync");
    }
    match report.status() {
        RunStatus::Success => ("✓".green().bold().to_string(), "synced"),
        RunStatus::Degraded => ("!".yellow().bold().to_string(), "synced with warnings"),
        RunStatus::Failed => ("✗".red().bold().to_string(), "sync failed"),
    }
}

fn marker(kind: DecisionKind) -> String {
    match kind {
        DecisionKind::Create => "+".green().bold().to_string(),
        DecisionKind::Update => "✎".green().to_string(),
        DecisionKind::Conflict => "⚠".red().bold().to_string(),
        DecisionKind::Unchanged => "·".bright_black().to_string(),
        DecisionKind::Skipped => "-".yellow().to_string(),
        DecisionKind::Preserved => "=".cyan().to_string(),
    }
}

fn describe(outcome: &FileOutcome) -> String {
    match &outcome.decision {
        Decision::ConflictWriteSibling => format!(
            "{} (new template in {})",
            outcome.destination,
            outcome.destination.conflict_sibling()
        ),
        Decision::SkipExisting(reason) => format!("{} ({reason})", outcome.destination),
        Decision::Preserve(reason) => {
            format!("{} (preserved by '{}')", outcome.destination, reason.suffix)
        }
        _ => format!("{} ({})", outcome.destination, outcome.decision.kind()),
    }
}
