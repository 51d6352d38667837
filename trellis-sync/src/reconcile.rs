//! Reconciliation engine — the per-destination decision table.
//!
//! Rules, first match wins:
//!
//! 1. preserved and present on disk → `Preserve`, record current
//! 2. absent on disk → `Create`, record template
//! 3. current == template → `SkipUnchanged`, record template
//! 4. user_modified = (baseline ≠ current) or (no baseline and safe-upgrade)
//! 5. force or safe-upgrade:
//!    user_modified → `ConflictWriteSibling`, keep baseline;
//!    otherwise → `UpdateInPlace`, record template
//! 6. otherwise → `SkipExisting`, record current if a baseline existed,
//!    leave untracked if not
//!
//! [`decide`] is pure: no I/O, no hidden state.

use trellis_core::{Decision, Fingerprint, PreserveReason, SkipReason};

/// Everything the decision depends on for one destination.
#[derive(Debug, Clone, Copy)]
pub struct DecisionInputs<'a> {
    pub template: &'a Fingerprint,
    pub current: Option<&'a Fingerprint>,
    pub baseline: Option<&'a Fingerprint>,
    /// The preserve-list suffix matching this destination, if any.
    pub preserved: Option<&'a str>,
    pub force: bool,
    pub safe_upgrade: bool,
}

/// What the next manifest should hold for a destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestEffect {
    Record(Fingerprint),
    /// Carry the baseline over unchanged (nothing if there was none).
    Retain,
    Untrack,
}

impl ManifestEffect {
    /// Resolve the effect against the baseline.
    pub fn resolve(&self, baseline: Option<&Fingerprint>) -> Option<Fingerprint> {
        match self {
            ManifestEffect::Record(fp) => Some(fp.clone()),
            ManifestEffect::Retain => baseline.cloned(),
            ManifestEffect::Untrack => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub decision: Decision,
    pub effect: ManifestEffect,
}

pub fn decide(inputs: &DecisionInputs<'_>) -> Verdict {
    let template = inputs.template;

    let Some(current) = inputs.current else {
        return Verdict {
            decision: Decision::Create,
            effect: ManifestEffect::Record(template.clone()),
        };
    };

    if let Some(suffix) = inputs.preserved {
        return Verdict {
            decision: Decision::Preserve(PreserveReason {
                suffix: suffix.to_string(),
            }),
            effect: ManifestEffect::Record(current.clone()),
        };
    }

    if current == template {
        return Verdict {
            decision: Decision::SkipUnchanged,
            effect: ManifestEffect::Record(template.clone()),
        };
    }

    let user_modified = match inputs.baseline {
        Some(baseline) => baseline != current,
        None => inputs.safe_upgrade,
    };

    if inputs.force || inputs.safe_upgrade {
        if user_modified {
            return Verdict {
                decision: Decision::ConflictWriteSibling,
                effect: ManifestEffect::Retain,
            };
        }
        return Verdict {
            decision: Decision::UpdateInPlace,
            effect: ManifestEffect::Record(template.clone()),
        };
    }

    match inputs.baseline {
        Some(_) => Verdict {
            decision: Decision::SkipExisting(if user_modified {
                SkipReason::LocalEdits
            } else {
                SkipReason::TemplateChanged
            }),
            effect: ManifestEffect::Record(current.clone()),
        },
        None => Verdict {
            decision: Decision::SkipExisting(SkipReason::Untracked),
            effect: ManifestEffect::Untrack,
        },
    }
}
