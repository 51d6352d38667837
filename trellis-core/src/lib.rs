//! trellis core library — domain types, fingerprints, path mapping, config.
//!
//! Public API surface:
//! - [`types`] — newtypes, decisions, run options and the resolved run context
//! - [`fingerprint`] — content digests used for change detection
//! - [`path_map`] — template-relative path → destination path
//! - [`config`] — layered YAML configuration (user, project)
//! - [`paths`] — fixed locations under a target root
//! - [`error`] — [`ConfigError`]

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod path_map;
pub mod paths;
pub mod types;

pub use config::Config;
pub use error::ConfigError;
pub use fingerprint::fingerprint;
pub use path_map::PathMapConfig;
pub use types::{
    Decision, DecisionKind, DestinationPath, Fingerprint, PathSuffixes, PreserveReason,
    RunContext, RunOptions, SkipReason, TemplateRecord,
};
