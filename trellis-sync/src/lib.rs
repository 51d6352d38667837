//! # trellis-sync
//!
//! Template reconciliation: read a template tree, decide per destination
//! against the target and the manifest baseline, apply atomically, and commit
//! the next manifest.
//!
//! Call [`pipeline::run`] for a full run, [`diff::diff_target`] for a
//! read-only preview, or [`status::check`] to classify a target.

pub mod diff;
pub mod error;
pub mod glob;
pub mod manifest;
pub mod pipeline;
pub mod plan;
pub mod reconcile;
pub mod report;
pub mod source;
pub mod status;
pub mod writer;

pub use diff::{diff_target, DiffReport, FileDiff};
pub use error::SyncError;
pub use glob::ExcludeMatcher;
pub use manifest::{ManifestDocument, ManifestEntries, ManifestStore};
pub use pipeline::run;
pub use reconcile::{decide, DecisionInputs, ManifestEffect, Verdict};
pub use report::{
    CommitStatus, FailureStage, FileFailure, FileOutcome, RunStatus, Severity,
    SyncReport,
};
pub use status::TargetStatus;
