//! Planning: map templates to destinations, inspect the target, decide.
//!
//! Everything here is read-only with respect to the target root.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;

use trellis_core::{fingerprint, path_map, DestinationPath, Fingerprint, PathMapConfig, RunContext};

use crate::manifest::ManifestEntries;
use crate::reconcile::{decide, DecisionInputs, Verdict};
use crate::report::{FailureStage, FileFailure};
use crate::source::SourceTree;
use crate::SyncError;

/// A template file paired with its destination and fingerprint.
#[derive(Debug, Clone)]
pub struct MappedTemplate {
    pub template_path: String,
    pub destination: DestinationPath,
    pub content: Vec<u8>,
    pub fingerprint: Fingerprint,
}

/// A source entry that could not be read, with its mapped destination.
#[derive(Debug, Clone)]
pub struct MappedUnreadable {
    pub template_path: String,
    pub destination: DestinationPath,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct MappedTree {
    pub templates: Vec<MappedTemplate>,
    pub unreadable: Vec<MappedUnreadable>,
}

impl MappedTree {
    pub fn is_complete(&self) -> bool {
        self.unreadable.is_empty()
    }

    pub fn destinations(&self) -> impl Iterator<Item = &DestinationPath> {
        self.templates
            .iter()
            .map(|t| &t.destination)
            .chain(self.unreadable.iter().map(|u| &u.destination))
    }
}

/// Map every source entry, rejecting collisions and reserved destinations.
///
/// Runs before anything touches the target, so a configuration error aborts
/// with zero mutation.
pub fn map_templates(tree: SourceTree, config: &PathMapConfig) -> Result<MappedTree, SyncError> {
    let mut seen: BTreeMap<DestinationPath, String> = BTreeMap::new();
    let mut claim = |template: &str| -> Result<DestinationPath, SyncError> {
        let destination = path_map::map(template, config);
        if destination.is_reserved() {
            return Err(SyncError::ReservedDestination {
                destination,
                template: template.to_string(),
            });
        }
        if let Some(first) = seen.get(&destination) {
            return Err(SyncError::DestinationCollision {
                destination,
                first: first.clone(),
                second: template.to_string(),
            });
        }
        seen.insert(destination.clone(), template.to_string());
        Ok(destination)
    };

    let mut mapped = MappedTree::default();
    for record in tree.records {
        let destination = claim(&record.relative_path)?;
        mapped.templates.push(MappedTemplate {
            fingerprint: fingerprint(&record.content),
            template_path: record.relative_path,
            destination,
            content: record.content,
        });
    }
    for entry in tree.unreadable {
        let destination = claim(&entry.relative_path)?;
        mapped.unreadable.push(MappedUnreadable {
            template_path: entry.relative_path,
            destination,
            message: entry.message,
        });
    }
    Ok(mapped)
}

/// True when any mapped destination already exists under `target_root`.
pub fn detect_prior_install(target_root: &Path, tree: &MappedTree) -> bool {
    tree.destinations()
        .any(|dest| std::fs::symlink_metadata(dest.to_path(target_root)).is_ok())
}

/// Fingerprint of the file at `path`, `None` when it does not exist.
pub fn read_current(path: &Path) -> std::io::Result<Option<Fingerprint>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(fingerprint(&bytes))),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

/// One decided destination, with what the executor needs to apply it.
#[derive(Debug, Clone)]
pub struct PlannedFile {
    pub template_path: String,
    pub destination: DestinationPath,
    pub content: Vec<u8>,
    pub template: Fingerprint,
    pub current: Option<Fingerprint>,
    pub baseline: Option<Fingerprint>,
    pub verdict: Verdict,
}

/// A destination with no decision this run; its baseline is carried forward.
#[derive(Debug, Clone)]
pub struct Undecided {
    pub destination: DestinationPath,
    pub failure: FileFailure,
}

#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub files: Vec<PlannedFile>,
    pub undecided: Vec<Undecided>,
    /// False when part of the template tree could not be read.
    pub source_complete: bool,
}

/// Decide every mapped destination against the target and the baseline.
pub fn build_plan(tree: MappedTree, ctx: &RunContext, baseline: &ManifestEntries) -> Plan {
    let mut plan = Plan {
        source_complete: tree.is_complete(),
        ..Plan::default()
    };

    for entry in tree.unreadable {
        plan.undecided.push(Undecided {
            failure: FileFailure {
                path: entry.template_path,
                stage: FailureStage::ReadTemplate,
                message: entry.message,
            },
            destination: entry.destination,
        });
    }

    for template in tree.templates {
        let path = template.destination.to_path(&ctx.target_root);
        let current = match read_current(&path) {
            Ok(current) => current,
            Err(err) => {
                tracing::warn!("cannot read destination {}: {err}", path.display());
                plan.undecided.push(Undecided {
                    failure: FileFailure {
                        path: template.destination.to_string(),
                        stage: FailureStage::ReadCurrent,
                        message: err.to_string(),
                    },
                    destination: template.destination,
                });
                continue;
            }
        };
        let baseline = baseline.get(&template.destination).cloned();
        let verdict = decide(&DecisionInputs {
            template: &template.fingerprint,
            current: current.as_ref(),
            baseline: baseline.as_ref(),
            preserved: ctx.preserve.matches(&template.destination),
            force: ctx.force,
            safe_upgrade: ctx.safe_upgrade,
        });
        tracing::debug!("{}: {:?}", template.destination, verdict.decision);
        plan.files.push(PlannedFile {
            template_path: template.template_path,
            destination: template.destination,
            content: template.content,
            template: template.fingerprint,
            current,
            baseline,
            verdict,
        });
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::UnreadableEntry;
    use trellis_core::TemplateRecord;

    fn tree(paths: &[&str]) -> SourceTree {
        SourceTree {
            records: paths
                .iter()
                .map(|p| TemplateRecord {
                    relative_path: p.to_string(),
                    content: p.as_bytes().to_vec(),
                })
                .collect(),
            unreadable: vec![],
        }
    }

    #[test]
    fn collision_is_fatal() {
        let err = map_templates(
            tree(&["CLAUDE.md", "CLAUDE.template.md"]),
            &PathMapConfig::default(),
        )
        .unwrap_err();
        match err {
            SyncError::DestinationCollision {
                destination,
                first,
                second,
            } => {
                assert_eq!(destination.as_str(), "CLAUDE.md");
                assert_eq!(first, "CLAUDE.md");
                assert_eq!(second, "CLAUDE.template.md");
            }
            other => panic!("expected collision, got {other:?}"),
        }
    }

    #[test]
    fn alias_collision_with_literal_dir_is_fatal() {
        let err = map_templates(
            tree(&[".agent/a.md", "_dest/a.md"]),
            &PathMapConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, SyncError::DestinationCollision { .. }));
    }

    #[test]
    fn unreadable_entries_take_part_in_collision_check() {
        let mut source = tree(&["a.md"]);
        source.unreadable.push(UnreadableEntry {
            relative_path: "a.template.md".into(),
            message: "denied".into(),
        });
        let err = map_templates(source, &PathMapConfig::default()).unwrap_err();
        assert!(matches!(err, SyncError::DestinationCollision { .. }));
    }

    #[test]
    fn reserved_destinations_are_fatal() {
        for path in [
            ".trellis/manifest.json",
            "notes.md.trellis-new",
            "notes.md.trellis.tmp",
            "_dest/rules.md.trellis.tmp",
        ] {
            let err = map_templates(tree(&[path]), &PathMapConfig::default()).unwrap_err();
            assert!(
                matches!(err, SyncError::ReservedDestination { .. }),
                "{path}: {err:?}"
            );
        }
    }

    #[test]
    fn mapping_fingerprints_content() {
        let mapped = map_templates(tree(&["_dest/x.md"]), &PathMapConfig::default()).unwrap();
        assert_eq!(mapped.templates[0].destination.as_str(), ".agent/x.md");
        assert_eq!(mapped.templates[0].fingerprint, fingerprint(b"_dest/x.md"));
    }
}
