//! Path mapper — template-relative path → [`DestinationPath`].
//!
//! Rules, applied in order:
//!
//! | Rule | Template path              | Destination               |
//! |------|----------------------------|---------------------------|
//! | 1    | `_dest/rules/base.md`      | `<dest_dir>/rules/base.md`|
//! | 2    | `CLAUDE.template.md`       | `CLAUDE.md`               |
//! | 2    | `env.template`             | `env`                     |
//! | 3    | anything else              | unchanged                 |
//!
//! Rules 1 and 2 compose: `_dest/settings.template.json` →
//! `<dest_dir>/settings.json`.

use crate::error::ConfigError;
use crate::paths::{DEFAULT_DEST_DIR, DEST_ALIAS, TEMPLATE_MARKER};
use crate::types::DestinationPath;

/// Mapping configuration, part of the resolved run context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMapConfig {
    /// Directory name substituted for the leading `_dest` alias.
    pub dest_dir: String,
}

impl Default for PathMapConfig {
    fn default() -> Self {
        Self {
            dest_dir: DEFAULT_DEST_DIR.to_string(),
        }
    }
}

impl PathMapConfig {
    /// Build a config from a user-supplied directory name, rejecting anything
    /// that is not a single plain segment.
    pub fn with_dest_dir(name: &str) -> Result<Self, ConfigError> {
        validate_dest_dir(name)?;
        Ok(Self {
            dest_dir: name.to_string(),
        })
    }
}

pub fn validate_dest_dir(name: &str) -> Result<(), ConfigError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\');
    if invalid {
        return Err(ConfigError::InvalidDestDir {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Map a template-relative path to its destination. Pure; performs no I/O.
pub fn map(relative_path: &str, config: &PathMapConfig) -> DestinationPath {
    let normalized = relative_path.replace('\\', "/");
    let mut segments: Vec<&str> = normalized
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();

    if segments.first() == Some(&DEST_ALIAS) {
        segments[0] = config.dest_dir.as_str();
    }

    let Some(basename) = segments.pop() else {
        return DestinationPath(String::new());
    };
    let basename = strip_marker(basename).unwrap_or_else(|| basename.to_string());

    let mut joined = segments.join("/");
    if !joined.is_empty() {
        joined.push('/');
    }
    joined.push_str(&basename);
    DestinationPath(joined)
}

fn strip_marker(name: &str) -> Option<String> {
    if let Some(stem) = name.strip_suffix(TEMPLATE_MARKER) {
        if !stem.is_empty() {
            return Some(stem.to_string());
        }
        return None;
    }
    let infix = format!("{TEMPLATE_MARKER}.");
    match name.find(&infix) {
        Some(idx) if idx > 0 => Some(format!(
            "{}{}",
            &name[..idx],
            &name[idx + TEMPLATE_MARKER.len()..]
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(dest: &str) -> PathMapConfig {
        PathMapConfig::with_dest_dir(dest).unwrap()
    }

    #[test]
    fn alias_only_applies_to_leading_segment() {
        assert_eq!(map("docs/_dest/a.md", &cfg(".agent")).as_str(), "docs/_dest/a.md");
        assert_eq!(map("_dest/a.md", &cfg(".agent")).as_str(), ".agent/a.md");
    }

    #[test]
    fn marker_alone_is_not_stripped() {
        assert_eq!(map(".template", &cfg(".agent")).as_str(), ".template");
        assert_eq!(map(".template.md", &cfg(".agent")).as_str(), ".template.md");
    }

    #[test]
    fn backslashes_and_dot_segments_normalise() {
        assert_eq!(map(r"_dest\rules\x.md", &cfg(".bot")).as_str(), ".bot/rules/x.md");
        assert_eq!(map("./a//b.md", &cfg(".bot")).as_str(), "a/b.md");
    }

    #[test]
    fn dest_dir_validation() {
        assert!(PathMapConfig::with_dest_dir(".claude").is_ok());
        assert!(PathMapConfig::with_dest_dir("").is_err());
        assert!(PathMapConfig::with_dest_dir("..").is_err());
        assert!(PathMapConfig::with_dest_dir("a/b").is_err());
    }
}
