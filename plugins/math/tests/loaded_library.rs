//! The built shared library loaded from disk, the way a host discovers plugins.

use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::path::PathBuf;
use std::sync::{Arc, mpsc};
use std::time::Duration;
use std::{env, fs, thread};

use pretty_assertions::assert_eq;
use tempfile::TempDir;
use tether_node::{Context, Graph, GraphKey, HostConfig, NodeError, NodeManager, NodeRegistry, Status};
use tether_plugin_math::Constant;
use tether_value::{Bridge, HeapRuntime, ListRef, TaggedValue};

const STEM: &str = "tether_plugin_math";

/// The cdylib cargo built next to this test binary.
fn built_library() -> PathBuf {
    let exe = env::current_exe().unwrap();
    let deps = exe.parent().unwrap();
    let prefix = format!("{DLL_PREFIX}{STEM}");
    let mut found: Vec<PathBuf> = [deps, deps.parent().unwrap_or(deps)]
        .iter()
        .filter_map(|dir| fs::read_dir(dir).ok())
        .flatten()
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(&prefix) && name.ends_with(DLL_SUFFIX))
        })
        .collect();
    found.sort_by_key(|path| fs::metadata(path).and_then(|meta| meta.modified()).ok());
    found
        .pop()
        .unwrap_or_else(|| panic!("{prefix}{DLL_SUFFIX} not built next to {}", deps.display()))
}

/// A fresh plugin directory holding a copy of the built library.
fn plugin_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::copy(built_library(), dir.path().join(format!("{DLL_PREFIX}{STEM}{DLL_SUFFIX}"))).unwrap();
    dir
}

#[test]
fn library_on_disk_registers_every_node() {
    let dir = plugin_dir();
    let mut registry = NodeRegistry::new();
    let reports = registry.load_plugins_at(dir.path()).unwrap();

    assert_eq!(reports.len(), 1);
    let report = &reports[0];
    assert_eq!((report.status, report.registered, report.total), (0, 5, 5));
    assert!(report.error.is_none());
    assert!(report.is_complete());
    assert_eq!(registry.library_count(), 1);
    assert_eq!(
        registry.labels().collect::<Vec<_>>(),
        ["Constant", "Add", "Multiply", "Negate", "Pair"]
    );
    assert!(registry.descriptor("Pair").is_some());
}

#[test]
fn loaded_nodes_create_and_release_objects_under_the_host_lock() {
    let (done, outcome) = mpsc::channel();
    thread::spawn(move || {
        let runtime = Arc::new(HeapRuntime::new());
        let bridge = Bridge::new(runtime.clone());
        let dir = plugin_dir();
        let mut registry = NodeRegistry::new();
        registry.load_plugins_at(dir.path()).unwrap();

        let lock = bridge.lock();
        let mut graph = Graph::new();
        for (id, value) in [(1, 2.0), (2, 3.0)] {
            let constant = Box::new(Constant::new(value));
            assert_eq!(graph.create_node(&lock, TaggedValue::I64(id), constant), Status::Success);
        }
        assert_eq!(graph.instantiate(&lock, TaggedValue::I64(3), "Pair", &registry), Status::Success);
        for (src, dst_pin) in [(1, "a"), (2, "b")] {
            let status = graph.create_link(
                &lock,
                TaggedValue::I64(src),
                TaggedValue::Cstr("out"),
                TaggedValue::I64(3),
                TaggedValue::Cstr(dst_pin),
            );
            assert_eq!(status, Status::Success);
        }

        // The second round replaces the first list from inside the library.
        for _ in 0..2 {
            let statuses: Vec<Status> = graph.perform_all(&lock).into_iter().map(|(_, status)| status).collect();
            assert_eq!(statuses, [Status::Success; 3]);
        }
        let pair = graph.node(&GraphKey::Int(3)).unwrap().get_output(&lock, "pair");
        let items: Vec<f64> = ListRef::try_new(&lock, &pair)
            .unwrap()
            .iter()
            .map(|item| item.to_f64(&lock))
            .collect();

        drop(graph);
        drop(lock);
        done.send((items, runtime.live_objects())).unwrap();
    });

    let (items, live) = outcome
        .recv_timeout(Duration::from_secs(30))
        .expect("graph run on loaded nodes did not finish");
    assert_eq!(items, [2.0, 3.0]);
    assert_eq!(live, 0);
}

#[test]
fn strict_loading_keeps_modules_registered_before_the_failure() {
    let dir = plugin_dir();
    fs::write(dir.path().join(format!("{DLL_PREFIX}zz_broken{DLL_SUFFIX}")), b"junk").unwrap();
    let config = HostConfig {
        fail_on_load_error: true,
        ..HostConfig::default()
    }
    .with_plugin_dir(dir.path());

    let mut registry = NodeRegistry::with_config(config);
    let err = registry.load_configured_plugins().unwrap_err();
    assert!(matches!(err, NodeError::Load { .. }), "{err}");
    assert!(registry.contains("Pair"));
    assert_eq!(registry.library_count(), 1);
}
