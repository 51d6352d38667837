use std::path::{Path, PathBuf};

/// Engine state directory, relative to a target root (and to `$HOME`).
pub const STATE_DIR: &str = ".trellis";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const CONFIG_FILE: &str = "config.yaml";

/// Appended to a destination path to name its conflict sibling.
pub const CONFLICT_SUFFIX: &str = ".trellis-new";

/// Appended to a destination path to name the file a write is staged in.
pub const STAGING_SUFFIX: &str = ".trellis.tmp";

/// Leading template segment rewritten to the configured destination directory.
pub const DEST_ALIAS: &str = "_dest";
pub const DEFAULT_DEST_DIR: &str = ".agent";

/// Basename marker stripped from template file names.
pub const TEMPLATE_MARKER: &str = ".template";

pub fn state_dir(target_root: &Path) -> PathBuf {
    target_root.join(STATE_DIR)
}

pub fn manifest_path(target_root: &Path) -> PathBuf {
    state_dir(target_root).join(MANIFEST_FILE)
}

pub fn project_config_path(target_root: &Path) -> PathBuf {
    state_dir(target_root).join(CONFIG_FILE)
}

pub fn user_config_path(home: &Path) -> PathBuf {
    home.join(STATE_DIR).join(CONFIG_FILE)
}
