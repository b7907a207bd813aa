//! The host's node manager.

#![allow(unsafe_code, reason = "plugin entries are called through raw pointers")]

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use indexmap::IndexMap;
use indexmap::map::Entry;
use libloading::Library;

use crate::config::HostConfig;
use crate::descriptor::NodeDescriptor;
use crate::error::NodeError;
use crate::manager::{NodeFactory, NodeManager, UiDescriptorFn};
use crate::plugin::{ManagerHandle, PluginEntry, PluginLoadReport};

/// Insertion-ordered [`NodeManager`] with dynamic plugin loading.
///
/// Libraries opened by [`load_plugins_at`](NodeManager::load_plugins_at)
/// stay loaded for the registry's lifetime. Factories, nodes and UI trees
/// obtained from a plugin must be dropped before the registry.
///
/// ```
/// use tether_node::{Node, NodeInterface, NodeManager, NodeRegistry, Status, register_node_types_into, NodeEntry};
/// use tether_value::ScopedLock;
///
/// #[derive(Default)]
/// struct Echo;
/// impl Node for Echo {
///     fn apply(&mut self, _lock: &ScopedLock<'_>) -> Status { Status::Success }
/// }
/// impl NodeInterface for Echo {}
///
/// let mut registry = NodeRegistry::new();
/// let (registered, total) = register_node_types_into(&mut registry, &[NodeEntry::of::<Echo>()]);
/// assert_eq!((registered, total), (1, 1));
/// assert!(registry.retrieve_node_factory("Echo").is_some());
/// ```
pub struct NodeRegistry {
    config: HostConfig,
    factories: IndexMap<String, NodeFactory>,
    ui_descriptors: IndexMap<String, UiDescriptorFn>,
    descriptors: IndexMap<String, NodeDescriptor<'static>>,
    // Dropped last: factories and descriptors may point into these.
    libraries: Vec<Library>,
}

impl NodeRegistry {
    /// Empty registry with the default configuration.
    pub fn new() -> Self {
        Self::with_config(HostConfig::default())
    }

    /// Empty registry using `config` for plugin discovery.
    pub fn with_config(config: HostConfig) -> Self {
        Self {
            config,
            factories: IndexMap::new(),
            ui_descriptors: IndexMap::new(),
            descriptors: IndexMap::new(),
            libraries: Vec::new(),
        }
    }

    /// The discovery configuration.
    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Registered labels in registration order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Number of registered factories.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Whether no factory is registered.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Whether `label` has a factory.
    pub fn contains(&self, label: &str) -> bool {
        self.factories.contains_key(label)
    }

    /// Factory for `label`, or [`NodeError::NotFound`].
    pub fn factory(&self, label: &str) -> Result<NodeFactory, NodeError> {
        self.retrieve_node_factory(label)
            .ok_or_else(|| NodeError::NotFound(label.to_owned()))
    }

    /// Static metadata registered with `label`.
    pub fn descriptor(&self, label: &str) -> Option<NodeDescriptor<'static>> {
        self.descriptors.get(label).copied()
    }

    /// UI accessor registered with `label`.
    pub fn ui_descriptor(&self, label: &str) -> Option<UiDescriptorFn> {
        self.ui_descriptors.get(label).copied()
    }

    /// Number of plugin libraries kept loaded.
    pub fn library_count(&self) -> usize {
        self.libraries.len()
    }

    pub(crate) fn keep_library(&mut self, library: Library) {
        self.libraries.push(library);
    }

    /// Run one plugin entry against this registry.
    ///
    /// The entry is called exactly once. A panic escaping it is caught and
    /// reported. Shortfalls are logged; the report carries the details.
    ///
    /// # Safety
    ///
    /// `entry` must follow the plugin entry contract: it may only use the
    /// manager handle and out-parameters for the duration of the call.
    pub unsafe fn invoke_entry(&mut self, module: &str, entry: PluginEntry) -> PluginLoadReport {
        let (mut registered, mut total) = (0_i32, 0_i32);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut handle = ManagerHandle::new(self);
            // SAFETY: the handle and counters outlive the call; the entry
            // honours the contract per this function's precondition.
            unsafe { entry(&mut handle, &mut registered, &mut total) }
        }));

        let report = match outcome {
            Ok(status) => PluginLoadReport {
                module: module.to_owned(),
                status,
                registered,
                total,
                error: None,
            },
            Err(_) => PluginLoadReport {
                registered,
                total,
                ..PluginLoadReport::failed(module, NodeError::Panic(module.to_owned()))
            },
        };

        if report.is_complete() {
            tracing::info!(module, registered, total, "plugin loaded");
        } else {
            tracing::warn!(
                module,
                status = report.status,
                registered,
                total,
                "plugin registered only part of its nodes"
            );
        }
        report
    }

    /// Load every directory listed in the configuration.
    ///
    /// Unreadable directories and failing modules are logged and skipped
    /// unless `fail_on_load_error` is set. In strict mode an unreadable
    /// directory stops the walk at once. Modules are checked after all
    /// directories are loaded, so the first incomplete one becomes the error
    /// while every registration made along the way stays in place.
    pub fn load_configured_plugins(&mut self) -> Result<Vec<PluginLoadReport>, NodeError> {
        let strict = self.config.fail_on_load_error;
        let mut reports = Vec::new();
        for dir in self.config.plugin_dirs.clone() {
            match self.load_plugins_at(&dir) {
                Ok(found) => reports.extend(found),
                Err(error) if !strict => {
                    tracing::warn!(dir = %dir.display(), %error, "skipping plugin directory");
                }
                Err(error) => return Err(error),
            }
        }
        if strict && let Some(failed) = reports.iter().find(|report| !report.is_complete()) {
            failed.clone().into_result()?;
        }
        Ok(reports)
    }

    fn conflict(label: &str, what: &'static str) -> NodeError {
        tracing::warn!(label, what, "registration conflict, keeping the first one");
        NodeError::RegistrationConflict(label.to_owned())
    }
}

impl NodeManager for NodeRegistry {
    fn load_plugins_at(&mut self, path: &Path) -> Result<Vec<PluginLoadReport>, NodeError> {
        crate::loader::load_directory(self, path)
    }

    fn register_node_factory(&mut self, label: &str, factory: NodeFactory) -> Result<(), NodeError> {
        match self.factories.entry(label.to_owned()) {
            Entry::Occupied(_) => Err(Self::conflict(label, "factory")),
            Entry::Vacant(slot) => {
                slot.insert(factory);
                tracing::debug!(label, "node factory registered");
                Ok(())
            }
        }
    }

    fn register_ui_descriptor(&mut self, label: &str, ui: UiDescriptorFn) -> Result<(), NodeError> {
        match self.ui_descriptors.entry(label.to_owned()) {
            Entry::Occupied(_) => Err(Self::conflict(label, "ui descriptor")),
            Entry::Vacant(slot) => {
                slot.insert(ui);
                Ok(())
            }
        }
    }

    fn register_node_factory_with_descriptor(
        &mut self,
        label: &str,
        factory: NodeFactory,
        descriptor: NodeDescriptor<'static>,
    ) -> Result<(), NodeError> {
        self.register_node_factory(label, factory)?;
        self.descriptors.insert(label.to_owned(), descriptor);
        Ok(())
    }

    fn retrieve_node_factory(&self, label: &str) -> Option<NodeFactory> {
        self.factories.get(label).cloned()
    }

    fn display_node_factories(&self) {
        tracing::info!(count = self.factories.len(), "registered node factories");
        for label in self.factories.keys() {
            tracing::info!(
                label = label.as_str(),
                ui = self.ui_descriptors.contains_key(label),
                descriptor = self.descriptors.contains_key(label),
                "node factory"
            );
        }
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("count", &self.factories.len())
            .field("labels", &self.factories.keys().collect::<Vec<_>>())
            .field("libraries", &self.libraries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tether_value::ScopedLock;

    use super::*;
    use crate::node::{Node, NodeInterface, Status};

    #[derive(Default)]
    struct Stub;

    impl Node for Stub {
        fn apply(&mut self, _lock: &ScopedLock<'_>) -> Status {
            Status::Success
        }
    }

    impl NodeInterface for Stub {}

    fn factory() -> NodeFactory {
        NodeFactory::from(Stub::create_node as fn(&mut dyn crate::Context) -> Box<dyn Node>)
    }

    #[test]
    fn first_registration_wins() {
        let mut reg = NodeRegistry::new();
        reg.register_node_factory("a", factory()).unwrap();
        let err = reg.register_node_factory("a", factory()).unwrap_err();
        assert_eq!(err, NodeError::RegistrationConflict("a".into()));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn descriptor_rides_with_factory() {
        let mut reg = NodeRegistry::new();
        let descriptor = NodeDescriptor::default();
        reg.register_node_factory_with_descriptor("a", factory(), descriptor)
            .unwrap();
        assert_eq!(reg.descriptor("a"), Some(descriptor));

        let err = reg
            .register_node_factory_with_descriptor("a", factory(), descriptor)
            .unwrap_err();
        assert_eq!(err, NodeError::RegistrationConflict("a".into()));
    }

    #[test]
    fn labels_keep_registration_order() {
        let mut reg = NodeRegistry::new();
        for label in ["zeta", "alpha", "mid"] {
            reg.register_node_factory(label, factory()).unwrap();
        }
        assert_eq!(reg.labels().collect::<Vec<_>>(), ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn missing_factory_is_not_found() {
        let reg = NodeRegistry::new();
        assert_eq!(
            reg.factory("nope").unwrap_err(),
            NodeError::NotFound("nope".into())
        );
        assert!(reg.retrieve_node_factory("nope").is_none());
    }

    unsafe extern "C-unwind" fn panicking_entry(
        _manager: *mut ManagerHandle<'_>,
        _registered: *mut i32,
        _total: *mut i32,
    ) -> i32 {
        panic!("entry blew up");
    }

    #[test]
    fn panicking_entry_is_reported() {
        let mut reg = NodeRegistry::new();
        // SAFETY: the entry touches none of its arguments.
        let report = unsafe { reg.invoke_entry("boom", panicking_entry) };
        assert_eq!(report.error, Some(NodeError::Panic("boom".into())));
        assert!(!report.is_complete());
    }

    #[test]
    fn missing_directory_is_an_error_unless_lenient() {
        let mut reg = NodeRegistry::new();
        let err = reg
            .load_plugins_at(Path::new("/nonexistent/tether-plugins"))
            .unwrap_err();
        assert!(matches!(err, NodeError::DirectoryRead(_)));

        let mut lenient =
            NodeRegistry::with_config(HostConfig::default().with_plugin_dir("/nonexistent/tether-plugins"));
        assert!(lenient.load_configured_plugins().unwrap().is_empty());
    }
}
