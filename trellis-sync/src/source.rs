//! Source tree reader — enumerates template files under a root directory.

use std::path::Path;

use walkdir::WalkDir;

use trellis_core::TemplateRecord;

use crate::SyncError;

/// An entry below the template root that could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnreadableEntry {
    pub relative_path: String,
    pub message: String,
}

/// Everything read from the template root in one pass.
#[derive(Debug, Clone, Default)]
pub struct SourceTree {
    /// Regular files, sorted by relative path.
    pub records: Vec<TemplateRecord>,
    pub unreadable: Vec<UnreadableEntry>,
}

impl SourceTree {
    /// True when every entry below the root was read.
    pub fn is_complete(&self) -> bool {
        self.unreadable.is_empty()
    }
}

/// Read every regular file under `root`.
///
/// Symlinks are not followed and are skipped, as are other non-regular
/// entries. Only a root that cannot be listed is an error; entries below it
/// that fail are reported in [`SourceTree::unreadable`].
pub fn read_source_tree(root: &Path) -> Result<SourceTree, SyncError> {
    let root_err = |source| SyncError::SourceRoot {
        path: root.to_path_buf(),
        source,
    };
    let meta = std::fs::metadata(root).map_err(root_err)?;
    if !meta.is_dir() {
        return Err(root_err(std::io::Error::other("not a directory")));
    }
    std::fs::read_dir(root).map_err(root_err)?;

    let mut tree = SourceTree::default();
    for entry in WalkDir::new(root).follow_links(false).min_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let relative = err
                    .path()
                    .map(|p| relative_key(root, p))
                    .unwrap_or_default();
                tracing::warn!("cannot read template entry '{relative}': {err}");
                tree.unreadable.push(UnreadableEntry {
                    relative_path: relative,
                    message: err.to_string(),
                });
                continue;
            }
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            continue;
        }
        let relative = relative_key(root, entry.path());
        if !file_type.is_file() {
            tracing::debug!("skipping non-regular template entry: {relative}");
            continue;
        }

        match std::fs::read(entry.path()) {
            Ok(content) => tree.records.push(TemplateRecord {
                relative_path: relative,
                content,
            }),
            Err(err) => {
                tracing::warn!("cannot read template '{relative}': {err}");
                tree.unreadable.push(UnreadableEntry {
                    relative_path: relative,
                    message: err.to_string(),
                });
            }
        }
    }

    tree.records
        .sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    tree.unreadable
        .sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    tracing::debug!(
        "read {} template file(s) from {}",
        tree.records.len(),
        root.display()
    );
    Ok(tree)
}

/// `/`-joined path of `path` relative to `root`.
fn relative_key(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn reads_nested_files_sorted() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("b/c")).unwrap();
        fs::write(tmp.path().join("b/c/deep.md"), "deep").unwrap();
        fs::write(tmp.path().join("a.md"), "a").unwrap();
        fs::write(tmp.path().join("b/one.md"), "one").unwrap();

        let tree = read_source_tree(tmp.path()).unwrap();
        let paths: Vec<_> = tree.records.iter().map(|r| r.relative_path.as_str()).collect();
        assert_eq!(paths, vec!["a.md", "b/c/deep.md", "b/one.md"]);
        assert_eq!(tree.records[0].content, b"a");
        assert!(tree.is_complete());
    }

    #[test]
    fn empty_dirs_yield_no_records() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("empty/nested")).unwrap();
        let tree = read_source_tree(tmp.path()).unwrap();
        assert!(tree.records.is_empty());
    }

    #[test]
    fn missing_root_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let err = read_source_tree(&tmp.path().join("absent")).unwrap_err();
        assert!(matches!(err, SyncError::SourceRoot { .. }), "got: {err}");
    }

    #[test]
    fn file_root_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("file.md");
        fs::write(&file, "x").unwrap();
        let err = read_source_tree(&file).unwrap_err();
        assert!(matches!(err, SyncError::SourceRoot { .. }), "got: {err}");
    }

    #[test]
    #[cfg(unix)]
    fn symlinks_are_not_followed() {
        let tmp = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("secret.md"), "outside").unwrap();
        fs::write(tmp.path().join("real.md"), "real").unwrap();
        std::os::unix::fs::symlink(outside.path(), tmp.path().join("linked_dir")).unwrap();
        std::os::unix::fs::symlink(
            outside.path().join("secret.md"),
            tmp.path().join("linked.md"),
        )
        .unwrap();

        let tree = read_source_tree(tmp.path()).unwrap();
        let paths: Vec<_> = tree.records.iter().map(|r| r.relative_path.as_str()).collect();
        assert_eq!(paths, vec!["real.md"]);
    }
}
