pub mod diff;
pub mod status;
pub mod sync;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use trellis_core::{config, PathMapConfig, PathSuffixes, RunOptions};

/// Target selection shared by every command.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Project directory to reconcile into (defaults to the current directory).
    #[arg(long, value_name = "DIR")]
    pub target: Option<PathBuf>,
}

impl TargetArgs {
    /// The target root, resolved against `cwd`.
    pub fn resolve(&self, cwd: &Path) -> PathBuf {
        match &self.target {
            Some(dir) => absolutize(cwd, dir),
            None => cwd.to_path_buf(),
        }
    }
}

/// The process working directory, read once per command.
pub fn current_dir() -> Result<PathBuf> {
    std::env::current_dir().context("could not determine current directory")
}

/// Inputs shared by `sync` and `diff`.
#[derive(Args, Debug, Clone)]
pub struct TemplateArgs {
    /// Template directory to read from.
    pub templates: PathBuf,

    #[command(flatten)]
    pub target: TargetArgs,

    /// Directory that `_dest/` template paths install into.
    #[arg(long, value_name = "NAME", env = "TRELLIS_DEST_DIR")]
    pub dest_dir: Option<String>,

    /// Destination suffix never overwritten once present (repeatable).
    #[arg(long, value_name = "SUFFIX")]
    pub preserve: Vec<String>,

    /// Overwrite files that still match their last synced content; edited
    /// files get a `.trellis-new` sibling instead.
    #[arg(long)]
    pub force: bool,
}

impl TemplateArgs {
    /// Layer config files under command-line flags into run options.
    pub fn run_options(&self) -> Result<RunOptions> {
        let cwd = current_dir()?;
        let target_root = self.target.resolve(&cwd);
        let config = config::load_layered(&target_root)
            .with_context(|| format!("failed to load config for {}", target_root.display()))?;

        let mut options = RunOptions::new(absolutize(&cwd, &self.templates), target_root);
        options.mapping = match &self.dest_dir {
            Some(name) => PathMapConfig::with_dest_dir(name)?,
            None => config.mapping()?,
        };

        options.preserve = PathSuffixes::new(
            config
                .preserve_list()
                .iter()
                .chain(self.preserve.iter().map(String::as_str)),
        );
        options.optional = config.optional_list();
        options.force = self.force;
        Ok(options)
    }
}

fn absolutize(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}
