//! Manifest store — per-target fingerprint baseline.
//!
//! Persists a [`ManifestDocument`] JSON at `<target>/.trellis/manifest.json`.
//! Writes use an atomic `.tmp` + rename. Loading never fails: a missing,
//! unreadable, or corrupt manifest is reported as [`Baseline::Absent`] so the
//! run can fall back to safe-upgrade mode.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use trellis_core::{DestinationPath, Fingerprint};

use crate::error::{io_err, SyncError};

/// Destination → fingerprint map. Ordered so the JSON output is stable.
pub type ManifestEntries = BTreeMap<DestinationPath, Fingerprint>;

/// Version string stamped into every committed manifest.
pub const MANIFEST_VERSION: &str = env!("CARGO_PKG_VERSION");

/// On-disk manifest payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManifestDocument {
    pub version: String,
    pub synced_at: DateTime<Utc>,
    pub entries: ManifestEntries,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ManifestCompat {
    Structured(ManifestStructuredCompat),
    Legacy(ManifestEntries),
}

#[derive(Debug, Deserialize)]
struct ManifestStructuredCompat {
    pub version: Option<String>,
    pub synced_at: Option<DateTime<Utc>>,
    pub entries: ManifestEntries,
}

/// Why no baseline is available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbsentReason {
    Missing,
    Unreadable(String),
    Corrupt(String),
}

/// Result of loading the manifest at run start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Baseline {
    Loaded(ManifestDocument),
    Absent(AbsentReason),
}

/// Parse a manifest document, accepting the legacy flat `{path: digest}` shape.
pub fn parse_document(contents: &str) -> Result<ManifestDocument, serde_json::Error> {
    match serde_json::from_str::<ManifestCompat>(contents)? {
        ManifestCompat::Structured(doc) => Ok(ManifestDocument {
            version: doc.version.unwrap_or_default(),
            synced_at: doc.synced_at.unwrap_or_else(Utc::now),
            entries: doc.entries,
        }),
        ManifestCompat::Legacy(entries) => Ok(ManifestDocument {
            version: String::new(),
            synced_at: Utc::now(),
            entries,
        }),
    }
}

/// Load the manifest at `path`, degrading to [`Baseline::Absent`].
pub fn load(path: &Path) -> Baseline {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Baseline::Absent(AbsentReason::Missing)
        }
        Err(err) => {
            tracing::warn!("manifest {} is unreadable: {err}", path.display());
            return Baseline::Absent(AbsentReason::Unreadable(err.to_string()));
        }
    };
    match parse_document(&contents) {
        Ok(doc) => {
            if !doc.version.is_empty() && doc.version != MANIFEST_VERSION {
                tracing::debug!(
                    "manifest written by version {}, running {MANIFEST_VERSION}",
                    doc.version
                );
            }
            Baseline::Loaded(doc)
        }
        Err(err) => {
            tracing::warn!(
                "manifest {} is corrupt and will be rebuilt: {err}",
                path.display()
            );
            Baseline::Absent(AbsentReason::Corrupt(err.to_string()))
        }
    }
}

/// Atomically write `doc` to `path`.
///
/// Writes to `<path>.tmp` then renames to `<path>`.
pub fn save(path: &Path, doc: &ManifestDocument) -> Result<(), SyncError> {
    let Some(dir) = path.parent() else {
        return Err(io_err(
            path,
            std::io::Error::other("invalid manifest path"),
        ));
    };

    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let json = serde_json::to_string_pretty(doc)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

/// Owns the manifest for the duration of one run.
///
/// The loaded baseline is never mutated; the executor builds a separate next
/// map and hands it to [`ManifestStore::commit`].
#[derive(Debug)]
pub struct ManifestStore {
    path: PathBuf,
    baseline: Baseline,
    empty: ManifestEntries,
}

impl ManifestStore {
    pub fn load(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            baseline: load(path),
            empty: ManifestEntries::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_present(&self) -> bool {
        matches!(self.baseline, Baseline::Loaded(_))
    }

    pub fn absent_reason(&self) -> Option<&AbsentReason> {
        match &self.baseline {
            Baseline::Loaded(_) => None,
            Baseline::Absent(reason) => Some(reason),
        }
    }

    pub fn document(&self) -> Option<&ManifestDocument> {
        match &self.baseline {
            Baseline::Loaded(doc) => Some(doc),
            Baseline::Absent(_) => None,
        }
    }

    /// Read-only baseline view; empty when the manifest is absent.
    pub fn snapshot(&self) -> &ManifestEntries {
        match &self.baseline {
            Baseline::Loaded(doc) => &doc.entries,
            Baseline::Absent(_) => &self.empty,
        }
    }

    /// Persist `next` as the new manifest, stamping the current version.
    pub fn commit(&self, next: ManifestEntries) -> Result<ManifestDocument, SyncError> {
        let doc = ManifestDocument {
            version: MANIFEST_VERSION.to_string(),
            synced_at: Utc::now(),
            entries: next,
        };
        save(&self.path, &doc)?;
        tracing::debug!(
            "committed manifest with {} entr(y/ies) to {}",
            doc.entries.len(),
            self.path.display()
        );
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn entries(pairs: &[(&str, &str)]) -> ManifestEntries {
        pairs
            .iter()
            .map(|(k, v)| (DestinationPath::from(*k), Fingerprint::from(*v)))
            .collect()
    }

    #[test]
    fn missing_manifest_is_absent() {
        let tmp = TempDir::new().unwrap();
        let store = ManifestStore::load(&tmp.path().join(".trellis/manifest.json"));
        assert!(!store.is_present());
        assert_eq!(store.absent_reason(), Some(&AbsentReason::Missing));
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn commit_then_load_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(".trellis/manifest.json");
        let store = ManifestStore::load(&path);
        let committed = store
            .commit(entries(&[("CLAUDE.md", "deadbeef"), (".agent/a.md", "cafebabe")]))
            .unwrap();

        let reloaded = ManifestStore::load(&path);
        assert!(reloaded.is_present());
        assert_eq!(reloaded.snapshot(), &committed.entries);
        assert_eq!(reloaded.document().unwrap().version, MANIFEST_VERSION);
    }

    #[test]
    fn tmp_file_cleaned_up_after_commit() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(".trellis/manifest.json");
        ManifestStore::load(&path).commit(ManifestEntries::new()).unwrap();
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn corrupt_manifest_degrades_to_absent() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("manifest.json");
        fs::write(&path, "{ not json").unwrap();
        let store = ManifestStore::load(&path);
        assert!(!store.is_present());
        assert!(matches!(store.absent_reason(), Some(AbsentReason::Corrupt(_))));
    }

    #[test]
    fn wrong_value_types_degrade_to_absent() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("manifest.json");
        fs::write(&path, r#"{"version":"1","entries":{"a.md":42}}"#).unwrap();
        assert!(!ManifestStore::load(&path).is_present());
    }

    #[test]
    fn legacy_flat_map_is_migrated() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("manifest.json");
        fs::write(&path, r#"{"CLAUDE.md":"deadbeef"}"#).unwrap();

        let store = ManifestStore::load(&path);
        assert!(store.is_present());
        assert_eq!(
            store.snapshot().get(&DestinationPath::from("CLAUDE.md")),
            Some(&Fingerprint::from("deadbeef"))
        );
    }

    #[test]
    fn version_skew_is_accepted_and_overwritten() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("manifest.json");
        fs::write(
            &path,
            r#"{"version":"0.0.1","entries":{"a.md":"aa"}}"#,
        )
        .unwrap();

        let store = ManifestStore::load(&path);
        assert_eq!(store.document().unwrap().version, "0.0.1");
        let doc = store.commit(store.snapshot().clone()).unwrap();
        assert_eq!(doc.version, MANIFEST_VERSION);
    }

    #[test]
    fn unreadable_manifest_path_degrades_to_absent() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".trellis"), "not a dir").unwrap();
        let store = ManifestStore::load(&tmp.path().join(".trellis/manifest.json"));
        assert!(matches!(store.absent_reason(), Some(AbsentReason::Unreadable(_))));
    }
}
