//! Plugin directory scanning against real files.

use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use tether_node::{HostConfig, NodeError, NodeManager, NodeRegistry};

fn lib_name(stem: &str) -> String {
    format!(
        "{stem}.{}",
        if cfg!(target_os = "windows") {
            "dll"
        } else if cfg!(target_os = "macos") {
            "dylib"
        } else {
            "so"
        }
    )
}

fn write_fake_library(dir: &Path, stem: &str) {
    fs::write(dir.join(lib_name(stem)), b"not a shared library").unwrap();
}

#[test]
fn empty_directory_loads_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = NodeRegistry::new();
    let reports = registry.load_plugins_at(dir.path()).unwrap();
    assert!(reports.is_empty());
    assert!(registry.is_empty());
    assert_eq!(registry.library_count(), 0);
}

#[test]
fn broken_library_becomes_a_failed_report() {
    let dir = tempfile::tempdir().unwrap();
    write_fake_library(dir.path(), "broken");
    fs::write(dir.path().join("README.md"), "plugins live here").unwrap();

    let mut registry = NodeRegistry::new();
    let reports = registry.load_plugins_at(dir.path()).unwrap();
    assert_eq!(reports.len(), 1);

    let report = &reports[0];
    assert!(report.module.ends_with(&lib_name("broken")));
    assert_eq!(report.status, -1);
    assert!(!report.is_complete());
    assert!(matches!(report.error, Some(NodeError::Load { .. })));
    assert_eq!(registry.library_count(), 0);
}

#[test]
fn every_module_is_attempted_in_name_order() {
    let dir = tempfile::tempdir().unwrap();
    for stem in ["b_second", "a_first", "c_third"] {
        write_fake_library(dir.path(), stem);
    }

    let mut registry = NodeRegistry::new();
    let reports = registry.load_plugins_at(dir.path()).unwrap();
    let order: Vec<bool> = ["a_first", "b_second", "c_third"]
        .iter()
        .zip(&reports)
        .map(|(stem, report)| report.module.ends_with(&lib_name(stem)))
        .collect();
    assert_eq!(order, [true, true, true]);
}

#[test]
fn lenient_configuration_collects_failures() {
    let dir = tempfile::tempdir().unwrap();
    write_fake_library(dir.path(), "broken");
    let config = HostConfig::default()
        .with_plugin_dir(dir.path())
        .with_plugin_dir(dir.path().join("missing"));

    let mut registry = NodeRegistry::with_config(config);
    let reports = registry.load_configured_plugins().unwrap();
    assert_eq!(reports.len(), 1);
    assert!(reports[0].error.is_some());
}

#[test]
fn strict_configuration_stops_at_the_first_failure() {
    let dir = tempfile::tempdir().unwrap();
    write_fake_library(dir.path(), "broken");
    let config = HostConfig {
        fail_on_load_error: true,
        ..HostConfig::default()
    }
    .with_plugin_dir(dir.path());

    let mut registry = NodeRegistry::with_config(config);
    let err = registry.load_configured_plugins().unwrap_err();
    assert!(matches!(err, NodeError::Load { .. }));
}

#[test]
fn strict_configuration_without_failures_returns_the_reports() {
    let dir = tempfile::tempdir().unwrap();
    let config = HostConfig {
        fail_on_load_error: true,
        ..HostConfig::default()
    }
    .with_plugin_dir(dir.path());

    let mut registry = NodeRegistry::with_config(config);
    let reports = registry.load_configured_plugins().unwrap();
    assert!(reports.is_empty());
}

#[test]
fn strict_configuration_rejects_missing_directories() {
    let dir = tempfile::tempdir().unwrap();
    let config = HostConfig {
        fail_on_load_error: true,
        ..HostConfig::default()
    }
    .with_plugin_dir(dir.path().join("missing"));

    let mut registry = NodeRegistry::with_config(config);
    let err = registry.load_configured_plugins().unwrap_err();
    assert!(matches!(err, NodeError::DirectoryRead(_)));
}

#[test]
fn configuration_file_drives_discovery() {
    let dir = tempfile::tempdir().unwrap();
    let plugins = dir.path().join("plugins");
    fs::create_dir(&plugins).unwrap();
    let file = dir.path().join("host.toml");
    fs::write(
        &file,
        format!("plugin_dirs = [{:?}]\nentry_symbol = \"custom_entry\"\n", plugins.display().to_string()),
    )
    .unwrap();

    let config = HostConfig::from_file(&file).unwrap();
    assert_eq!(config.entry_symbol, "custom_entry");
    let mut registry = NodeRegistry::with_config(config);
    assert!(registry.load_configured_plugins().unwrap().is_empty());
}
