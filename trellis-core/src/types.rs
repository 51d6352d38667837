//! Domain types for template reconciliation.
//!
//! Destination paths are stored `/`-separated relative to the target root and
//! only turned into a `PathBuf` at the filesystem boundary.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::path_map::PathMapConfig;
use crate::paths::{CONFLICT_SUFFIX, STAGING_SUFFIX, STATE_DIR};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A target-root-relative, `/`-separated destination path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DestinationPath(pub String);

impl DestinationPath {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Absolute location of this destination under `root`.
    pub fn to_path(&self, root: &Path) -> PathBuf {
        let mut path = root.to_path_buf();
        for segment in self.0.split('/').filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        path
    }

    /// The sibling that receives template content when a conflict is detected.
    pub fn conflict_sibling(&self) -> DestinationPath {
        DestinationPath(format!("{}{CONFLICT_SUFFIX}", self.0))
    }

    pub fn is_conflict_sibling(&self) -> bool {
        self.0.ends_with(CONFLICT_SUFFIX)
    }

    pub fn is_staging_file(&self) -> bool {
        self.0.ends_with(STAGING_SUFFIX)
    }

    /// True when the path lands inside the engine's own state directory, or
    /// names a file the engine creates next to a destination.
    pub fn is_reserved(&self) -> bool {
        self.0 == STATE_DIR
            || self.0.starts_with(&format!("{STATE_DIR}/"))
            || self.is_conflict_sibling()
            || self.is_staging_file()
    }
}

impl fmt::Display for DestinationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for DestinationPath {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DestinationPath {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Opaque content digest. Equality is the only meaningful operation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Fingerprint {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Fingerprint {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A single file read from the template source tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateRecord {
    /// `/`-separated path relative to the template root.
    pub relative_path: String,
    pub content: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Path suffix lists (preserve / optional)
// ---------------------------------------------------------------------------

/// A set of destination path suffixes, matched on whole path segments.
///
/// `settings.json` matches `settings.json` and `.agent/settings.json` but not
/// `my-settings.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathSuffixes(Vec<String>);

impl PathSuffixes {
    pub fn new<I, S>(suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for raw in suffixes {
            let normalized = raw.as_ref().trim().replace('\\', "/");
            let trimmed = normalized
                .trim_start_matches("./")
                .trim_matches('/')
                .to_string();
            if trimmed.is_empty() || out.contains(&trimmed) {
                continue;
            }
            out.push(trimmed);
        }
        Self(out)
    }

    /// The first suffix that matches `dest`, if any.
    pub fn matches(&self, dest: &DestinationPath) -> Option<&str> {
        let path = dest.as_str();
        self.0
            .iter()
            .find(|suffix| {
                path == suffix.as_str()
                    || (path.len() > suffix.len()
                        && path.ends_with(suffix.as_str())
                        && path.as_bytes()[path.len() - suffix.len() - 1] == b'/')
            })
            .map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

/// Why an existing destination was left alone without force.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// The file differs from its recorded baseline.
    LocalEdits,
    /// The file still matches its baseline; only the template moved on.
    TemplateChanged,
    /// No baseline was ever recorded for the file.
    Untracked,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::LocalEdits => write!(f, "local edits"),
            SkipReason::TemplateChanged => write!(f, "template changed"),
            SkipReason::Untracked => write!(f, "untracked"),
        }
    }
}

/// Why a destination was preserved.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PreserveReason {
    /// The preserve-list suffix that matched.
    pub suffix: String,
}

/// The per-destination outcome of reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Decision {
    Create,
    UpdateInPlace,
    SkipUnchanged,
    SkipExisting(SkipReason),
    Preserve(PreserveReason),
    ConflictWriteSibling,
}

impl Decision {
    pub fn kind(&self) -> DecisionKind {
        match self {
            Decision::Create => DecisionKind::Create,
            Decision::UpdateInPlace => DecisionKind::Update,
            Decision::SkipUnchanged => DecisionKind::Unchanged,
            Decision::SkipExisting(_) => DecisionKind::Skipped,
            Decision::Preserve(_) => DecisionKind::Preserved,
            Decision::ConflictWriteSibling => DecisionKind::Conflict,
        }
    }

    /// True for the only decisions allowed to replace destination bytes.
    pub fn overwrites_destination(&self) -> bool {
        matches!(self, Decision::Create | Decision::UpdateInPlace)
    }
}

/// Payload-free decision discriminant, used for grouping and counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DecisionKind {
    Create,
    Update,
    Conflict,
    Unchanged,
    Skipped,
    Preserved,
}

impl DecisionKind {
    pub fn all() -> &'static [DecisionKind] {
        &[
            DecisionKind::Create,
            DecisionKind::Update,
            DecisionKind::Conflict,
            DecisionKind::Unchanged,
            DecisionKind::Skipped,
            DecisionKind::Preserved,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            DecisionKind::Create => "create",
            DecisionKind::Update => "update",
            DecisionKind::Conflict => "conflict",
            DecisionKind::Unchanged => "unchanged",
            DecisionKind::Skipped => "skipped",
            DecisionKind::Preserved => "preserved",
        }
    }
}

impl fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Run options and context
// ---------------------------------------------------------------------------

/// Caller-supplied inputs for a single run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub template_root: PathBuf,
    pub target_root: PathBuf,
    pub mapping: PathMapConfig,
    pub preserve: PathSuffixes,
    /// Destinations whose write failures are reported as optional.
    pub optional: PathSuffixes,
    pub force: bool,
    pub dry_run: bool,
}

impl RunOptions {
    pub fn new(template_root: impl Into<PathBuf>, target_root: impl Into<PathBuf>) -> Self {
        Self {
            template_root: template_root.into(),
            target_root: target_root.into(),
            mapping: PathMapConfig::default(),
            preserve: PathSuffixes::default(),
            optional: PathSuffixes::default(),
            force: false,
            dry_run: false,
        }
    }
}

/// Everything the engine needs to know about a run, resolved once at start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub target_root: PathBuf,
    pub mapping: PathMapConfig,
    pub preserve: PathSuffixes,
    pub optional: PathSuffixes,
    pub force: bool,
    pub manifest_present: bool,
    /// No usable manifest, but managed destinations already exist on disk.
    pub safe_upgrade: bool,
    pub dry_run: bool,
}

impl RunContext {
    pub fn resolve(options: &RunOptions, manifest_present: bool, prior_install: bool) -> Self {
        Self {
            target_root: options.target_root.clone(),
            mapping: options.mapping.clone(),
            preserve: options.preserve.clone(),
            optional: options.optional.clone(),
            force: options.force,
            manifest_present,
            safe_upgrade: !manifest_present && prior_install,
            dry_run: options.dry_run,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destination_to_path_joins_segments() {
        let dest = DestinationPath::from(".agent/rules/base.md");
        let path = dest.to_path(Path::new("/work"));
        assert_eq!(path, Path::new("/work").join(".agent").join("rules").join("base.md"));
    }

    #[test]
    fn conflict_sibling_appends_suffix() {
        let dest = DestinationPath::from("CLAUDE.md");
        let sibling = dest.conflict_sibling();
        assert_eq!(sibling.as_str(), "CLAUDE.md.trellis-new");
        assert!(sibling.is_conflict_sibling());
        assert!(!dest.is_conflict_sibling());
    }

    #[test]
    fn reserved_paths_cover_state_dir_and_engine_siblings() {
        assert!(DestinationPath::from(".trellis/manifest.json").is_reserved());
        assert!(DestinationPath::from(".trellis").is_reserved());
        assert!(DestinationPath::from("CLAUDE.md.trellis-new").is_reserved());
        assert!(DestinationPath::from("docs/a.md.trellis.tmp").is_reserved());
        assert!(!DestinationPath::from("docs/a.md.tmp").is_reserved());
        assert!(!DestinationPath::from(".trellisrc").is_reserved());
        assert!(!DestinationPath::from("docs/.trellis").is_reserved());
    }

    #[test]
    fn suffixes_match_whole_segments() {
        let list = PathSuffixes::new(["settings.json", "./docs/notes.md"]);
        assert_eq!(
            list.matches(&DestinationPath::from(".agent/settings.json")),
            Some("settings.json")
        );
        assert_eq!(list.matches(&DestinationPath::from("settings.json")), Some("settings.json"));
        assert_eq!(list.matches(&DestinationPath::from("my-settings.json")), None);
        assert_eq!(
            list.matches(&DestinationPath::from("docs/notes.md")),
            Some("docs/notes.md")
        );
    }

    #[test]
    fn suffixes_drop_empty_and_duplicate_entries() {
        let list = PathSuffixes::new(["", "a.md", "/a.md/", "  "]);
        assert_eq!(list.iter().collect::<Vec<_>>(), vec!["a.md"]);
    }

    #[test]
    fn safe_upgrade_requires_missing_manifest_and_prior_install() {
        let options = RunOptions::new("/tpl", "/dst");
        assert!(RunContext::resolve(&options, false, true).safe_upgrade);
        assert!(!RunContext::resolve(&options, true, true).safe_upgrade);
        assert!(!RunContext::resolve(&options, false, false).safe_upgrade);
    }

    #[test]
    fn only_create_and_update_overwrite() {
        assert!(Decision::Create.overwrites_destination());
        assert!(Decision::UpdateInPlace.overwrites_destination());
        assert!(!Decision::ConflictWriteSibling.overwrites_destination());
        assert!(!Decision::SkipExisting(SkipReason::LocalEdits).overwrites_destination());
    }
}
