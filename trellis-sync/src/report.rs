//! Run report: decisions, per-file failures, manifest commit status.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use trellis_core::{Decision, DecisionKind, DestinationPath, PathSuffixes};

/// Two or more failed writes trigger the alternate-destination hint.
pub const REMEDIATION_THRESHOLD: usize = 2;

/// The step at which a per-file failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureStage {
    ReadTemplate,
    ReadCurrent,
    Write,
    WriteSibling,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureStage::ReadTemplate => write!(f, "read template"),
            FailureStage::ReadCurrent => write!(f, "read destination"),
            FailureStage::Write => write!(f, "write"),
            FailureStage::WriteSibling => write!(f, "write conflict sibling"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// A required destination; the run fails.
    Critical,
    /// An auxiliary destination; the run continues with a warning.
    Optional,
}

impl Severity {
    /// Destinations matching the optional suffix list are optional.
    pub fn of(destination: &DestinationPath, optional: &PathSuffixes) -> Self {
        if optional.matches(destination).is_some() {
            Severity::Optional
        } else {
            Severity::Critical
        }
    }
}

/// A structured per-file failure. Never interrupts the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    /// Destination path, or template path when no destination is known.
    pub path: String,
    pub stage: FailureStage,
    pub message: String,
}

impl fmt::Display for FileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} failed: {}", self.path, self.stage, self.message)
    }
}

/// The decision taken for one destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub destination: DestinationPath,
    pub template_path: String,
    pub decision: Decision,
}

/// Manifest persistence result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitStatus {
    /// Dry-run: nothing persisted.
    Skipped,
    Committed { entries: usize },
    Failed { message: String },
}

/// Overall run verdict, mapped to the process exit status by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    /// Optional failures or a manifest commit failure only.
    Degraded,
    Failed,
}

#[derive(Debug, Clone)]
pub struct SyncReport {
    pub target_root: PathBuf,
    pub dest_dir: String,
    pub dry_run: bool,
    pub manifest_present: bool,
    pub safe_upgrade: bool,
    pub outcomes: Vec<FileOutcome>,
    pub critical: Vec<FileFailure>,
    pub optional: Vec<FileFailure>,
    pub commit: CommitStatus,
}

impl SyncReport {
    pub fn count(&self, kind: DecisionKind) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.decision.kind() == kind)
            .count()
    }

    /// Outcomes grouped by decision kind, in [`DecisionKind`] order.
    pub fn grouped(&self) -> BTreeMap<DecisionKind, Vec<&FileOutcome>> {
        let mut groups: BTreeMap<DecisionKind, Vec<&FileOutcome>> = BTreeMap::new();
        for outcome in &self.outcomes {
            groups.entry(outcome.decision.kind()).or_default().push(outcome);
        }
        groups
    }

    pub fn decision_for(&self, destination: &str) -> Option<&Decision> {
        self.outcomes
            .iter()
            .find(|o| o.destination.as_str() == destination)
            .map(|o| &o.decision)
    }

    pub fn status(&self) -> RunStatus {
        if !self.critical.is_empty() {
            return RunStatus::Failed;
        }
        if !self.optional.is_empty() || matches!(self.commit, CommitStatus::Failed { .. }) {
            return RunStatus::Degraded;
        }
        RunStatus::Success
    }

    pub fn is_failure(&self) -> bool {
        self.status() == RunStatus::Failed
    }

    /// Guidance for the user after repeated write failures.
    pub fn remediation(&self) -> Option<String> {
        let failed_writes = self
            .critical
            .iter()
            .filter(|f| matches!(f.stage, FailureStage::Write | FailureStage::WriteSibling))
            .count();
        if failed_writes < REMEDIATION_THRESHOLD {
            return None;
        }
        let mut hint = format!(
            "{failed_writes} writes failed under {}; check permissions and free space",
            self.target_root.display()
        );
        hint.push_str(&format!(
            ", or retry with `--dest-dir <name>` to install into a directory other than '{}'",
            self.dest_dir
        ));
        if matches!(self.commit, CommitStatus::Failed { .. }) {
            hint.push_str("; the manifest was not saved, re-run once the cause is fixed");
        }
        Some(hint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::SkipReason;

    fn report() -> SyncReport {
        SyncReport {
            target_root: PathBuf::from("/work"),
            dest_dir: ".agent".into(),
            dry_run: false,
            manifest_present: true,
            safe_upgrade: false,
            outcomes: vec![
                FileOutcome {
                    destination: "a.md".into(),
                    template_path: "a.md".into(),
                    decision: Decision::Create,
                },
                FileOutcome {
                    destination: "b.md".into(),
                    template_path: "b.md".into(),
                    decision: Decision::SkipExisting(SkipReason::LocalEdits),
                },
                FileOutcome {
                    destination: "c.md".into(),
                    template_path: "c.md".into(),
                    decision: Decision::Create,
                },
            ],
            critical: vec![],
            optional: vec![],
            commit: CommitStatus::Committed { entries: 3 },
        }
    }

    fn write_failure(path: &str) -> FileFailure {
        FileFailure {
            path: path.into(),
            stage: FailureStage::Write,
            message: "disk full".into(),
        }
    }

    #[test]
    fn counts_and_groups_by_kind() {
        let r = report();
        assert_eq!(r.count(DecisionKind::Create), 2);
        assert_eq!(r.count(DecisionKind::Skipped), 1);
        let groups = r.grouped();
        assert_eq!(groups[&DecisionKind::Create].len(), 2);
        assert!(!groups.contains_key(&DecisionKind::Conflict));
    }

    #[test]
    fn status_escalation() {
        let mut r = report();
        assert_eq!(r.status(), RunStatus::Success);

        r.commit = CommitStatus::Failed {
            message: "read-only".into(),
        };
        assert_eq!(r.status(), RunStatus::Degraded);

        r.critical.push(write_failure("a.md"));
        assert_eq!(r.status(), RunStatus::Failed);
    }

    #[test]
    fn optional_failures_degrade_only() {
        let mut r = report();
        r.optional.push(write_failure("banner.txt"));
        assert_eq!(r.status(), RunStatus::Degraded);
        assert!(!r.is_failure());
    }

    #[test]
    fn remediation_after_repeated_write_failures() {
        let mut r = report();
        r.critical.push(write_failure("a.md"));
        assert!(r.remediation().is_none());

        r.critical.push(write_failure("c.md"));
        let hint = r.remediation().expect("hint");
        assert!(hint.contains("--dest-dir"));
        assert!(hint.contains(".agent"));
    }

    #[test]
    fn read_failures_do_not_trigger_remediation() {
        let mut r = report();
        for path in ["a.md", "c.md"] {
            r.critical.push(FileFailure {
                path: path.into(),
                stage: FailureStage::ReadCurrent,
                message: "is a directory".into(),
            });
        }
        assert!(r.remediation().is_none());
    }

    #[test]
    fn severity_follows_optional_suffixes() {
        let optional = PathSuffixes::new(["banner.txt"]);
        assert_eq!(
            Severity::of(&".agent/banner.txt".into(), &optional),
            Severity::Optional
        );
        assert_eq!(Severity::of(&"CLAUDE.md".into(), &optional), Severity::Critical);
        assert_eq!(
            Severity::of(&"CLAUDE.md".into(), &PathSuffixes::default()),
            Severity::Critical
        );
    }
}
