//! Config loading, layering, and error-message tests.

use assert_fs::prelude::*;
use predicates::prelude::*;
use trellis_core::{config, ConfigError};

#[test]
fn project_config_overrides_user_config() {
    let home = assert_fs::TempDir::new().expect("home");
    let target = assert_fs::TempDir::new().expect("target");

    home.child(".trellis/config.yaml")
        .write_str("dest_dir: .user\npreserve:\n  - notes.md\n")
        .expect("write user config");
    target
        .child(".trellis/config.yaml")
        .write_str("dest_dir: .project\npreserve:\n  - local.json\noptional:\n  - extras/banner.txt\n")
        .expect("write project config");

    let cfg = config::load_layered_at(Some(home.path()), target.path()).expect("load");
    assert_eq!(cfg.dest_dir.as_deref(), Some(".project"));
    assert_eq!(cfg.preserve, vec!["notes.md", "local.json"]);
    assert_eq!(cfg.optional, vec!["extras/banner.txt"]);
    assert_eq!(cfg.mapping().expect("mapping").dest_dir, ".project");
}

#[test]
fn missing_files_yield_defaults() {
    let home = assert_fs::TempDir::new().expect("home");
    let target = assert_fs::TempDir::new().expect("target");
    let cfg = config::load_layered_at(Some(home.path()), target.path()).expect("load");
    assert_eq!(cfg, config::Config::default());
    assert_eq!(cfg.mapping().expect("mapping").dest_dir, ".agent");
}

#[test]
fn no_home_skips_user_layer() {
    let target = assert_fs::TempDir::new().expect("target");
    target
        .child(".trellis/config.yaml")
        .write_str("exclude:\n  - vendor/**\n")
        .expect("write");
    let cfg = config::load_layered_at(None, target.path()).expect("load");
    assert_eq!(cfg.exclude, vec!["vendor/**"]);
}

#[test]
fn corrupt_yaml_returns_parse_error_with_path() {
    let target = assert_fs::TempDir::new().expect("target");
    let file = target.child(".trellis/config.yaml");
    file.write_str(": : corrupt : yaml : !!!\n  - broken: [unclosed")
        .expect("write");

    let err = config::load_project(target.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    assert!(
        predicate::str::contains("config.yaml").eval(&err.to_string()),
        "must contain file path, got: {err}"
    );
}

#[test]
fn invalid_dest_dir_in_file_is_rejected() {
    let target = assert_fs::TempDir::new().expect("target");
    target
        .child(".trellis/config.yaml")
        .write_str("dest_dir: ../escape\n")
        .expect("write");

    let err = config::load_project(target.path()).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidDestDir { .. }), "got: {err}");
}

#[test]
fn wrong_shape_yaml_returns_parse_error() {
    let target = assert_fs::TempDir::new().expect("target");
    target
        .child(".trellis/config.yaml")
        .write_str("- this is a list, not a mapping\n")
        .expect("write");
    let err = config::load_project(target.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
}
