//! Plugin discovery from shared libraries on disk.
//!
//! Every file in a plugin directory carrying the platform's library
//! extension (`.so`, `.dylib` or `.dll`) is opened, its entry symbol looked
//! up and called once. Files are visited in name order.

#![allow(unsafe_code, reason = "FFI calls for dynamic library loading")]

use std::path::{Path, PathBuf};

use libloading::Library;

use crate::error::NodeError;
use crate::plugin::{PluginEntry, PluginLoadReport};
use crate::registry::NodeRegistry;

/// Load every plugin module in `dir` into `registry`.
///
/// A module that cannot be opened, lacks the entry symbol, or panics is
/// reported and skipped. Only an unreadable directory fails the call.
pub(crate) fn load_directory(registry: &mut NodeRegistry, dir: &Path) -> Result<Vec<PluginLoadReport>, NodeError> {
    let modules = plugin_files(dir)?;
    tracing::debug!(dir = %dir.display(), count = modules.len(), "scanning plugin directory");

    let mut reports = Vec::with_capacity(modules.len());
    for path in modules {
        let report = load_module(registry, &path);
        if let Some(error) = &report.error {
            tracing::warn!(module = report.module.as_str(), %error, "skipping plugin that failed to load");
        }
        reports.push(report);
    }
    Ok(reports)
}

fn load_module(registry: &mut NodeRegistry, path: &Path) -> PluginLoadReport {
    let module = path.display().to_string();
    let symbol = registry.config().entry_symbol.clone();

    // SAFETY: opening a library runs its initialisers; plugin directories
    // are trusted to hold modules built against this crate.
    let library = match unsafe { Library::new(path) } {
        Ok(library) => library,
        Err(e) => {
            return PluginLoadReport::failed(
                &module,
                NodeError::Load {
                    module: module.clone(),
                    reason: e.to_string(),
                },
            );
        }
    };

    // SAFETY: the symbol is declared with the plugin entry signature; the
    // pointer is only used while `library` is alive.
    let entry: PluginEntry = match unsafe { library.get::<PluginEntry>(symbol.as_bytes()) } {
        Ok(entry) => *entry,
        Err(e) => {
            return PluginLoadReport::failed(
                &module,
                NodeError::SymbolNotFound {
                    module: module.clone(),
                    symbol,
                    reason: e.to_string(),
                },
            );
        }
    };

    // SAFETY: `entry` comes from a module exporting the plugin entry; the
    // library is kept alive by the registry below.
    let report = unsafe { registry.invoke_entry(&module, entry) };
    registry.keep_library(library);
    report
}

/// Library files in `dir`, sorted by path.
fn plugin_files(dir: &Path) -> Result<Vec<PathBuf>, NodeError> {
    let read_error = |e: std::io::Error| NodeError::DirectoryRead(format!("{}: {e}", dir.display()));
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(read_error)? {
        let path = entry.map_err(read_error)?.path();
        if path.is_file() && is_plugin_library(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Platform-specific library extension.
pub(crate) fn lib_ext() -> &'static str {
    if cfg!(target_os = "windows") {
        "dll"
    } else if cfg!(target_os = "macos") {
        "dylib"
    } else {
        "so"
    }
}

fn is_plugin_library(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| ext == lib_ext())
}
