//! Layered YAML configuration.
//!
//! # Storage layout
//!
//! ```text
//! ~/.trellis/config.yaml            (user defaults — optional)
//! <target>/.trellis/config.yaml     (project settings — optional)
//! ```
//!
//! Project values override user values; list fields are concatenated with
//! duplicates removed. Command-line flags are applied on top by the caller.
//!
//! # API pattern
//!
//! Home-relative loaders have two forms:
//! - `fn_at(home, …)` — explicit home; used in tests with `TempDir`
//! - `fn(…)` — derives home from `dirs::home_dir()`, delegates to `_at`

use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::path_map::{validate_dest_dir, PathMapConfig};
use crate::paths::{project_config_path, user_config_path};
use crate::types::PathSuffixes;

/// On-disk configuration document. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Replacement for the `_dest` alias segment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dest_dir: Option<String>,
    /// Destination suffixes never overwritten from templates.
    pub preserve: Vec<String>,
    /// Destination suffixes whose write failures are non-critical.
    pub optional: Vec<String>,
    /// Glob patterns skipped by the status scanner.
    pub exclude: Vec<String>,
}

impl Config {
    /// Layer `over` on top of `self`.
    pub fn merge(mut self, over: Config) -> Config {
        if over.dest_dir.is_some() {
            self.dest_dir = over.dest_dir;
        }
        extend_unique(&mut self.preserve, over.preserve);
        extend_unique(&mut self.optional, over.optional);
        extend_unique(&mut self.exclude, over.exclude);
        self
    }

    pub fn mapping(&self) -> Result<PathMapConfig, ConfigError> {
        match self.dest_dir.as_deref() {
            Some(name) => PathMapConfig::with_dest_dir(name),
            None => Ok(PathMapConfig::default()),
        }
    }

    pub fn preserve_list(&self) -> PathSuffixes {
        PathSuffixes::new(&self.preserve)
    }

    pub fn optional_list(&self) -> PathSuffixes {
        PathSuffixes::new(&self.optional)
    }
}

fn extend_unique(base: &mut Vec<String>, extra: Vec<String>) {
    for item in extra {
        if !base.contains(&item) {
            base.push(item);
        }
    }
}

// ---------------------------------------------------------------------------
// 1. Load
// ---------------------------------------------------------------------------

/// Load a single config file.
///
/// Returns `Ok(None)` if the file does not exist,
/// `ConfigError::Parse` (with path + line context) if malformed YAML.
pub fn load_file(path: &Path) -> Result<Option<Config>, ConfigError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source: err,
            })
        }
    };
    if contents.trim().is_empty() {
        return Ok(Some(Config::default()));
    }
    let config: Config = serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    if let Some(name) = config.dest_dir.as_deref() {
        validate_dest_dir(name)?;
    }
    Ok(Some(config))
}

/// `<home>/.trellis/config.yaml`, or defaults when absent.
pub fn load_user_at(home: &Path) -> Result<Config, ConfigError> {
    Ok(load_file(&user_config_path(home))?.unwrap_or_default())
}

/// `<target>/.trellis/config.yaml`, or defaults when absent.
pub fn load_project(target_root: &Path) -> Result<Config, ConfigError> {
    Ok(load_file(&project_config_path(target_root))?.unwrap_or_default())
}

/// User config (when a home is known) overlaid with project config.
pub fn load_layered_at(home: Option<&Path>, target_root: &Path) -> Result<Config, ConfigError> {
    let user = match home {
        Some(home) => load_user_at(home)?,
        None => Config::default(),
    };
    Ok(user.merge(load_project(target_root)?))
}

/// `load_layered_at` convenience wrapper. A missing home directory only
/// skips the user layer.
pub fn load_layered(target_root: &Path) -> Result<Config, ConfigError> {
    let home = dirs::home_dir();
    load_layered_at(home.as_deref(), target_root)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
