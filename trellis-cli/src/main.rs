//! Trellis — keep a project's agent files in step with a template tree.
//!
//! # Usage
//!
//! ```text
//! trellis sync <templates> [--target DIR] [--dest-dir NAME] [--preserve S]... [--optional S]... [--force] [--dry-run]
//! trellis diff <templates> [--target DIR] [--dest-dir NAME] [--force]
//! trellis status [--target DIR] [--json]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{diff::DiffArgs, status::StatusArgs, sync::SyncArgs};

#[derive(Parser, Debug)]
#[command(
    name = "trellis",
    version,
    about = "Reconcile template files into a project without losing local edits",
    long_about = None,
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Copy templates into the target, keeping local edits safe.
    Sync(SyncArgs),

    /// Show unified diffs between templates and the target.
    Diff(DiffArgs),

    /// Show whether the target is in step with its last sync.
    Status(StatusArgs),
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.command {
        Commands::Sync(args) => args.run(),
        Commands::Diff(args) => args.run(),
        Commands::Status(args) => args.run(),
    }
}
