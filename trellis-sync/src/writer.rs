//! Atomic writer and plan execution.
//!
//! ## `atomic_write`
//!
//! 1. Create missing parent directories.
//! 2. Create `<path>.trellis.tmp` exclusively and write the bytes to it. An
//!    existing file at that name is never reused or replaced.
//! 3. Copy the permissions of an existing destination onto the tmp file.
//! 4. Rename over the final path (atomic on POSIX).
//!
//! A failure at any step removes the tmp file this call created and leaves
//! the destination as it was.
//!
//! ## `apply`
//!
//! Applies every planned decision, collecting per-file failures instead of
//! stopping, then builds the next manifest from this run's outcomes and
//! commits it once.

use std::collections::BTreeSet;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use trellis_core::{paths::STAGING_SUFFIX, Decision, DestinationPath, RunContext};

use crate::manifest::{ManifestEntries, ManifestStore};
use crate::plan::{Plan, PlannedFile};
use crate::reconcile::ManifestEffect;
use crate::report::{CommitStatus, FailureStage, FileFailure, FileOutcome, Severity, SyncReport};

pub fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(STAGING_SUFFIX);
    PathBuf::from(name)
}

/// Atomically replace `path` with `bytes`. Never leaves a partial file behind.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    atomic_write_with_tmp(path, bytes, &tmp_path(path))
}

fn atomic_write_with_tmp(path: &Path, bytes: &[u8], tmp: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // `create_new` fails on anything already at `tmp`, so a file we do not
    // own is never truncated or renamed away.
    let mut staged = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(tmp)
        .map_err(|err| {
            io::Error::new(
                err.kind(),
                format!("cannot stage write at {}: {err}", tmp.display()),
            )
        })?;
    let written = staged.write_all(bytes).and_then(|()| staged.sync_all());
    drop(staged);
    if let Err(err) = written {
        let _ = std::fs::remove_file(tmp);
        return Err(err);
    }

    if let Ok(meta) = std::fs::metadata(path) {
        if meta.is_file() {
            if let Err(err) = std::fs::set_permissions(tmp, meta.permissions()) {
                tracing::debug!("could not copy permissions onto {}: {err}", tmp.display());
            }
        }
    }

    if let Err(err) = std::fs::rename(tmp, path) {
        let _ = std::fs::remove_file(tmp);
        return Err(err);
    }
    Ok(())
}

/// Mutable state threaded through one execution.
struct Execution<'a> {
    ctx: &'a RunContext,
    baseline: &'a ManifestEntries,
    next: ManifestEntries,
    report: SyncReport,
}

impl<'a> Execution<'a> {
    fn fail(&mut self, destination: &DestinationPath, failure: FileFailure) {
        match Severity::of(destination, &self.ctx.optional) {
            Severity::Optional => {
                tracing::warn!("optional file failed: {failure}");
                self.report.optional.push(failure);
            }
            Severity::Critical => {
                tracing::error!("{failure}");
                self.report.critical.push(failure);
            }
        }
    }

    fn carry_baseline(&mut self, destination: &DestinationPath) {
        if let Some(fp) = self.baseline.get(destination) {
            self.next.insert(destination.clone(), fp.clone());
        }
    }

    fn record(&mut self, destination: &DestinationPath, effect: &ManifestEffect) {
        let baseline = self.baseline.get(destination);
        if let Some(fp) = effect.resolve(baseline) {
            self.next.insert(destination.clone(), fp);
        }
    }

    fn write(&mut self, file: &PlannedFile, target: &DestinationPath, stage: FailureStage) -> bool {
        let path = target.to_path(&self.ctx.target_root);
        match atomic_write(&path, &file.content) {
            Ok(()) => {
                tracing::info!("wrote: {}", path.display());
                true
            }
            Err(err) => {
                let failure = FileFailure {
                    path: target.to_string(),
                    stage,
                    message: err.to_string(),
                };
                self.fail(&file.destination, failure);
                false
            }
        }
    }

    fn apply_file(&mut self, file: &PlannedFile) {
        let decision = &file.verdict.decision;
        self.report.outcomes.push(FileOutcome {
            destination: file.destination.clone(),
            template_path: file.template_path.clone(),
            decision: decision.clone(),
        });

        if self.ctx.dry_run {
            tracing::info!("[dry-run] {}: {}", file.destination, decision.kind());
            return;
        }

        // Only create and update may touch the destination itself.
        if decision.overwrites_destination() {
            if self.write(file, &file.destination, FailureStage::Write) {
                self.record(&file.destination, &file.verdict.effect);
            } else if *decision == Decision::UpdateInPlace {
                self.carry_baseline(&file.destination);
            }
            // A failed create leaves the destination untracked.
            return;
        }

        match decision {
            Decision::ConflictWriteSibling => {
                let sibling = file.destination.conflict_sibling();
                if self.write(file, &sibling, FailureStage::WriteSibling) {
                    tracing::warn!(
                        "{} has local edits; new template written to {}",
                        file.destination,
                        sibling
                    );
                }
                self.record(&file.destination, &file.verdict.effect);
            }
            _ => self.record(&file.destination, &file.verdict.effect),
        }
    }
}

/// Apply `plan` to the target and commit the next manifest.
///
/// In dry-run mode decisions are reported but nothing on disk changes.
pub fn apply(plan: Plan, ctx: &RunContext, store: &ManifestStore) -> SyncReport {
    let mut exec = Execution {
        ctx,
        baseline: store.snapshot(),
        next: ManifestEntries::new(),
        report: SyncReport {
            target_root: ctx.target_root.clone(),
            dest_dir: ctx.mapping.dest_dir.clone(),
            dry_run: ctx.dry_run,
            manifest_present: ctx.manifest_present,
            safe_upgrade: ctx.safe_upgrade,
            outcomes: Vec::with_capacity(plan.files.len()),
            critical: Vec::new(),
            optional: Vec::new(),
            commit: CommitStatus::Skipped,
        },
    };

    let mut produced: BTreeSet<DestinationPath> = BTreeSet::new();

    for undecided in plan.undecided {
        exec.fail(&undecided.destination, undecided.failure);
        exec.carry_baseline(&undecided.destination);
        produced.insert(undecided.destination);
    }

    for file in &plan.files {
        exec.apply_file(file);
        produced.insert(file.destination.clone());
    }

    for (destination, fp) in exec.baseline {
        if produced.contains(destination) {
            continue;
        }
        if plan.source_complete {
            tracing::debug!("retiring manifest entry with no template: {destination}");
        } else {
            exec.next.insert(destination.clone(), fp.clone());
        }
    }

    if ctx.dry_run {
        return exec.report;
    }

    exec.report.commit = match store.commit(exec.next) {
        Ok(doc) => CommitStatus::Committed {
            entries: doc.entries.len(),
        },
        Err(err) => {
            tracing::warn!("manifest was not saved: {err}");
            CommitStatus::Failed {
                message: err.to_string(),
            }
        }
    };
    exec.report
}
