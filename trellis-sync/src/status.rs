//! Target status, derived from the manifest and the files on disk.
//!
//! Signal precedence:
//! 1. `NeverSynced` (manifest missing, unusable or empty)
//! 2. `Conflicted` (unresolved `.trellis-new` siblings present)
//! 3. `Missing` (tracked destinations deleted from disk)
//! 4. `Modified` (tracked destinations differ from their baseline)
//! 5. `Current`

use std::io::ErrorKind;
use std::path::Path;

use chrono::{DateTime, Utc};
use walkdir::WalkDir;

use trellis_core::{paths, DestinationPath};

use crate::error::io_err;
use crate::glob::ExcludeMatcher;
use crate::manifest::{self, Baseline};
use crate::plan::read_current;
use crate::SyncError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetStatus {
    NeverSynced,
    Current,
    Conflicted { files: Vec<DestinationPath> },
    Missing { files: Vec<DestinationPath> },
    Modified { files: Vec<DestinationPath> },
}

impl TargetStatus {
    pub fn label(&self) -> &'static str {
        match self {
            TargetStatus::NeverSynced => "never-synced",
            TargetStatus::Current => "current",
            TargetStatus::Conflicted { .. } => "conflicted",
            TargetStatus::Missing { .. } => "missing",
            TargetStatus::Modified { .. } => "modified",
        }
    }

    pub fn files(&self) -> &[DestinationPath] {
        match self {
            TargetStatus::Conflicted { files }
            | TargetStatus::Missing { files }
            | TargetStatus::Modified { files } => files,
            TargetStatus::NeverSynced | TargetStatus::Current => &[],
        }
    }
}

/// Classify `target_root`. Paths matching `excludes` are ignored.
pub fn check(target_root: &Path, excludes: &ExcludeMatcher) -> Result<TargetStatus, SyncError> {
    let doc = match manifest::load(&paths::manifest_path(target_root)) {
        Baseline::Loaded(doc) if !doc.entries.is_empty() => doc,
        _ => return Ok(TargetStatus::NeverSynced),
    };

    let conflicts = scan_conflicts(target_root, excludes)?;
    if !conflicts.is_empty() {
        return Ok(TargetStatus::Conflicted { files: conflicts });
    }

    let tracked: Vec<_> = doc
        .entries
        .iter()
        .filter(|(dest, _)| !excludes.is_excluded(dest.as_str()))
        .collect();

    let mut missing = Vec::new();
    let mut modified = Vec::new();
    for (dest, expected) in tracked {
        let path = dest.to_path(target_root);
        match read_current(&path) {
            Ok(None) => missing.push(dest.clone()),
            Ok(Some(current)) if &current != expected => modified.push(dest.clone()),
            Ok(Some(_)) => {}
            // No longer the file we recorded.
            Err(err) => {
                tracing::debug!("cannot read tracked {}: {err}", path.display());
                modified.push(dest.clone());
            }
        }
    }

    if !missing.is_empty() {
        return Ok(TargetStatus::Missing { files: missing });
    }
    if !modified.is_empty() {
        return Ok(TargetStatus::Modified { files: modified });
    }
    Ok(TargetStatus::Current)
}

/// Unresolved conflict siblings under `target_root`, sorted.
pub fn scan_conflicts(
    target_root: &Path,
    excludes: &ExcludeMatcher,
) -> Result<Vec<DestinationPath>, SyncError> {
    match std::fs::metadata(target_root) {
        Ok(_) => {}
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(io_err(target_root, err)),
    }

    let walker = WalkDir::new(target_root)
        .follow_links(false)
        .min_depth(1)
        .into_iter()
        .filter_entry(|entry| {
            let relative = relative_key(target_root, entry.path());
            !excludes.is_excluded(&relative)
        });

    let mut found = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::debug!("skipping unreadable entry during conflict scan: {err}");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let dest = DestinationPath::from(relative_key(target_root, entry.path()));
        if dest.is_conflict_sibling() {
            found.push(dest);
        }
    }
    found.sort();
    Ok(found)
}

/// Timestamp of the last committed manifest, if any.
pub fn last_synced(target_root: &Path) -> Option<DateTime<Utc>> {
    match manifest::load(&paths::manifest_path(target_root)) {
        Baseline::Loaded(doc) => Some(doc.synced_at),
        Baseline::Absent(_) => None,
    }
}

/// Format age from a chrono timestamp (manifest `synced_at`).
pub fn format_datetime_age(timestamp: DateTime<Utc>) -> String {
    let age = Utc::now().signed_duration_since(timestamp).num_seconds().max(0) as u64;
    format_seconds(age)
}

fn format_seconds(seconds: u64) -> String {
    if seconds < 60 {
        return format!("{seconds}s");
    }
    if seconds < 60 * 60 {
        return format!("{}m", seconds / 60);
    }
    if seconds < 60 * 60 * 24 {
        return format!("{}h", seconds / (60 * 60));
    }
    format!("{}d", seconds / (60 * 60 * 24))
}

/// First three paths, then `+N more`.
pub fn preview_files(files: &[DestinationPath]) -> String {
    let mut shown: Vec<String> = files.iter().take(3).map(|p| p.to_string()).collect();
    if files.len() > shown.len() {
        shown.push(format!("+{} more", files.len() - shown.len()));
    }
    shown.join(", ")
}

fn relative_key(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
