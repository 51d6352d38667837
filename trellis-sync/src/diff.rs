//! Read-only unified diff support for `trellis diff`.

use std::io::ErrorKind;
use std::path::Path;

use similar::TextDiff;

use trellis_core::{Decision, DestinationPath, RunOptions};

use crate::error::io_err;
use crate::pipeline;
use crate::SyncError;

/// One destination whose on-disk content differs from its template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub destination: DestinationPath,
    /// What a sync with the same options would do with this destination.
    pub decision: Decision,
    pub unified_diff: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DiffReport {
    pub diffs: Vec<FileDiff>,
    pub safe_upgrade: bool,
}

/// Compare every mapped template with the current destination content.
///
/// No files are written. Preserved and identical destinations are omitted;
/// destinations that cannot be read are reported by the sync itself.
pub fn diff_target(options: &RunOptions) -> Result<DiffReport, SyncError> {
    let mut options = options.clone();
    options.dry_run = true;
    let prepared = pipeline::prepare(&options)?;

    let mut diffs = Vec::new();
    for file in &prepared.plan.files {
        let decision = &file.verdict.decision;
        if matches!(decision, Decision::Preserve(_) | Decision::SkipUnchanged) {
            continue;
        }
        let path = file.destination.to_path(&prepared.ctx.target_root);
        let existing = read_existing_or_empty(&path)?;
        if existing == file.content {
            continue;
        }
        diffs.push(FileDiff {
            destination: file.destination.clone(),
            decision: decision.clone(),
            unified_diff: unified_diff(&file.destination, &existing, &file.content),
        });
    }

    Ok(DiffReport {
        diffs,
        safe_upgrade: prepared.ctx.safe_upgrade,
    })
}

/// Unified diff between `old` and `new`, or a one-line notice for binary data.
pub fn unified_diff(destination: &DestinationPath, old: &[u8], new: &[u8]) -> String {
    let old_header = format!("a/{destination}");
    let new_header = format!("b/{destination}");
    match (std::str::from_utf8(old), std::str::from_utf8(new)) {
        (Ok(old), Ok(new)) => TextDiff::from_lines(old, new)
            .unified_diff()
            .header(&old_header, &new_header)
            .context_radius(3)
            .to_string(),
        _ => format!("Binary files {old_header} and {new_header} differ\n"),
    }
}

fn read_existing_or_empty(path: &Path) -> Result<Vec<u8>, SyncError> {
    match std::fs::read(path) {
        Ok(content) => Ok(content),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(Vec::new()),
        Err(err) => Err(io_err(path, err)),
    }
}
