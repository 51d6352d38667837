//! Shared sync pipeline entrypoint used by every CLI command.

use trellis_core::{paths, RunContext, RunOptions};

use crate::manifest::ManifestStore;
use crate::plan::{self, MappedTree, Plan};
use crate::report::SyncReport;
use crate::source::read_source_tree;
use crate::{writer, SyncError};

/// Everything resolved before the first mutation of a run.
#[derive(Debug)]
pub struct Prepared {
    pub ctx: RunContext,
    pub store: ManifestStore,
    pub plan: Plan,
}

/// Read the template tree, load the baseline and decide every destination.
///
/// Performs no writes. Fatal conditions (unreadable source root, destination
/// collisions, reserved destinations) are returned before anything is touched.
pub fn prepare(options: &RunOptions) -> Result<Prepared, SyncError> {
    let source = read_source_tree(&options.template_root)?;
    let mapped: MappedTree = plan::map_templates(source, &options.mapping)?;

    let store = ManifestStore::load(&paths::manifest_path(&options.target_root));
    let prior_install =
        !store.is_present() && plan::detect_prior_install(&options.target_root, &mapped);
    let ctx = RunContext::resolve(options, store.is_present(), prior_install);

    if ctx.safe_upgrade {
        tracing::warn!(
            "no usable manifest under {} but managed files already exist; \
             edited files will get conflict siblings instead of being overwritten",
            ctx.target_root.display()
        );
    }

    let plan = plan::build_plan(mapped, &ctx, store.snapshot());
    Ok(Prepared { ctx, store, plan })
}

/// Run one reconciliation of `options.template_root` into `options.target_root`.
///
/// Returns `Err` only for run-aborting conditions; per-file failures are in
/// the report.
pub fn run(options: &RunOptions) -> Result<SyncReport, SyncError> {
    let Prepared { ctx, store, plan } = prepare(options)?;
    tracing::debug!(
        "planned {} file(s) for {} (force={}, dry_run={})",
        plan.files.len(),
        ctx.target_root.display(),
        ctx.force,
        ctx.dry_run
    );
    Ok(writer::apply(plan, &ctx, &store))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;
    use trellis_core::Decision;

    use super::*;

    #[test]
    fn run_into_empty_target_creates_everything() {
        let templates = TempDir::new().expect("templates");
        let target = TempDir::new().expect("target");
        fs::write(templates.path().join("CLAUDE.md"), "hello").expect("write");

        let report = run(&RunOptions::new(templates.path(), target.path())).expect("run");
        assert_eq!(report.decision_for("CLAUDE.md"), Some(&Decision::Create));
        assert!(!report.safe_upgrade);
        assert!(paths::manifest_path(target.path()).exists());
    }

    #[test]
    fn prepare_does_not_touch_target() {
        let templates = TempDir::new().expect("templates");
        let target = TempDir::new().expect("target");
        fs::write(templates.path().join("a.md"), "a").expect("write");

        let prepared = prepare(&RunOptions::new(templates.path(), target.path())).expect("prepare");
        assert_eq!(prepared.plan.files.len(), 1);
        assert!(fs::read_dir(target.path()).expect("ls").next().is_none());
    }
}
