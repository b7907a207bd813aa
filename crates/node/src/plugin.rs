//! Plugin entry ABI.
//!
//! A plugin module exports one entry, `register_node_factories` by default:
//!
//! ```text
//! unsafe extern "C-unwind" fn(*mut ManagerHandle, *mut i32 registered, *mut i32 total) -> i32
//! ```
//!
//! The host calls it exactly once per module. The entry registers its node
//! types, writes how many it registered and how many it declared, and
//! returns zero when every registration went through. [`export_nodes!`]
//! writes the entry for a list of [`NodeInterface`] types.
//!
//! Host and plugin exchange Rust trait objects through the entry, so both
//! must be built with the same toolchain and the same `tether-node`.
//!
//! [`export_nodes!`]: crate::export_nodes

#![allow(unsafe_code, reason = "the plugin entry is an FFI boundary")]

use crate::descriptor::NodeDescriptor;
use crate::error::NodeError;
use crate::manager::{NodeFactory, NodeManager, UiDescriptorFn};
use crate::node::{Context, Node, NodeInterface};

/// Default name of the exported entry symbol.
pub const ENTRY_SYMBOL: &str = "register_node_factories";

/// Signature of a plugin entry.
pub type PluginEntry = unsafe extern "C-unwind" fn(*mut ManagerHandle<'_>, *mut i32, *mut i32) -> i32;

/// The manager as seen through the entry's thin pointer.
pub struct ManagerHandle<'m>(&'m mut dyn NodeManager);

impl<'m> ManagerHandle<'m> {
    /// Wrap a manager for one entry call.
    pub fn new(manager: &'m mut dyn NodeManager) -> Self {
        Self(manager)
    }

    /// The wrapped manager.
    pub fn manager(&mut self) -> &mut dyn NodeManager {
        &mut *self.0
    }
}

/// Everything registered for one node type.
#[derive(Debug, Clone, Copy)]
pub struct NodeEntry {
    /// Registration label.
    pub label: &'static str,
    /// Constructor.
    pub create: fn(&mut dyn Context) -> Box<dyn Node>,
    /// Static metadata.
    pub descriptor: Option<NodeDescriptor<'static>>,
    /// UI accessor.
    pub ui: UiDescriptorFn,
}

impl NodeEntry {
    /// Entry for a [`NodeInterface`] type.
    pub fn of<T: NodeInterface>() -> Self {
        Self {
            label: T::label(),
            create: T::create_node,
            descriptor: T::descriptor(),
            ui: T::ui_descriptor,
        }
    }

    fn register(&self, manager: &mut dyn NodeManager) -> Result<(), NodeError> {
        let factory = NodeFactory::from(self.create);
        match self.descriptor {
            Some(descriptor) => manager.register_node_factory_with_descriptor(self.label, factory, descriptor)?,
            None => manager.register_node_factory(self.label, factory)?,
        }
        manager.register_ui_descriptor(self.label, self.ui)
    }
}

/// Register `entries` and count the successes.
///
/// An entry counts only when both its factory and its UI accessor were
/// accepted. Returns `(registered, total)`.
pub fn register_node_types_into(manager: &mut dyn NodeManager, entries: &[NodeEntry]) -> (i32, i32) {
    let registered = entries
        .iter()
        .filter(|entry| match entry.register(manager) {
            Ok(()) => true,
            Err(error) => {
                tracing::debug!(label = entry.label, %error, "node type not registered");
                false
            }
        })
        .count();
    (registered as i32, entries.len() as i32)
}

/// Body of a plugin entry.
///
/// Writes the counts to the non-null out-parameters and returns zero only
/// if every entry registered.
///
/// # Safety
///
/// `manager` must be null or point to a live [`ManagerHandle`], and the
/// out-parameters must be null or valid for writes.
pub unsafe fn register_node_types(
    manager: *mut ManagerHandle<'_>,
    registered: *mut i32,
    total: *mut i32,
    entries: &[NodeEntry],
) -> i32 {
    // SAFETY: non-null `manager` points to a live handle per the contract.
    let (done, declared) = match unsafe { manager.as_mut() } {
        Some(handle) => register_node_types_into(handle.manager(), entries),
        None => (0, entries.len() as i32),
    };
    // SAFETY: non-null out-parameters are valid for writes per the contract.
    unsafe {
        if let Some(out) = registered.as_mut() {
            *out = done;
        }
        if let Some(out) = total.as_mut() {
            *out = declared;
        }
    }
    i32::from(done != declared)
}

/// Export a plugin entry registering the given [`NodeInterface`] types.
///
/// `export_nodes!(A, B)` defines the `register_node_factories` symbol.
/// `export_nodes!(@entry name; A, B)` defines an ordinary function `name`
/// with the entry signature, for hosts that link the nodes in-process.
///
/// [`NodeInterface`]: crate::NodeInterface
#[macro_export]
macro_rules! export_nodes {
    (@entry $name:ident; $($node:ty),+ $(,)?) => {
        /// Plugin entry registering this module's node types.
        ///
        /// # Safety
        ///
        /// See `tether_node::register_node_types`.
        #[allow(unsafe_code, improper_ctypes_definitions)]
        pub unsafe extern "C-unwind" fn $name(
            manager: *mut $crate::ManagerHandle<'_>,
            registered: *mut i32,
            total: *mut i32,
        ) -> i32 {
            let entries = [$($crate::NodeEntry::of::<$node>()),+];
            // SAFETY: forwarded unchanged from our caller.
            unsafe { $crate::register_node_types(manager, registered, total, &entries) }
        }
    };
    ($($node:ty),+ $(,)?) => {
        /// Plugin entry registering this module's node types.
        ///
        /// # Safety
        ///
        /// See `tether_node::register_node_types`.
        #[allow(unsafe_code, improper_ctypes_definitions)]
        #[unsafe(no_mangle)]
        pub unsafe extern "C-unwind" fn register_node_factories(
            manager: *mut $crate::ManagerHandle<'_>,
            registered: *mut i32,
            total: *mut i32,
        ) -> i32 {
            let entries = [$($crate::NodeEntry::of::<$node>()),+];
            // SAFETY: forwarded unchanged from our caller.
            unsafe { $crate::register_node_types(manager, registered, total, &entries) }
        }
    };
}

/// Outcome of running one plugin entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginLoadReport {
    /// Module path or name.
    pub module: String,
    /// Status returned by the entry; `-1` when it never returned.
    pub status: i32,
    /// Factories registered.
    pub registered: i32,
    /// Factories declared.
    pub total: i32,
    /// Why the module could not be run at all.
    pub error: Option<NodeError>,
}

impl PluginLoadReport {
    /// Report for a module whose entry could not be reached.
    pub fn failed(module: impl Into<String>, error: NodeError) -> Self {
        Self {
            module: module.into(),
            status: -1,
            registered: 0,
            total: 0,
            error: Some(error),
        }
    }

    /// Whether the entry ran and registered everything it declared.
    pub fn is_complete(&self) -> bool {
        self.error.is_none() && self.status == 0 && self.registered >= self.total
    }

    /// The report if complete, otherwise the failure as an error.
    pub fn into_result(self) -> Result<Self, NodeError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        if self.status != 0 || self.registered < self.total {
            return Err(NodeError::PartialPluginFailure {
                module: self.module,
                registered: self.registered,
                total: self.total,
                status: self.status,
            });
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn incomplete_report_is_partial_failure() {
        let report = PluginLoadReport {
            module: "m".into(),
            status: 1,
            registered: 2,
            total: 3,
            error: None,
        };
        assert!(!report.is_complete());
        assert_eq!(
            report.into_result(),
            Err(NodeError::PartialPluginFailure {
                module: "m".into(),
                registered: 2,
                total: 3,
                status: 1,
            })
        );
    }

    #[test]
    fn failed_report_carries_its_error() {
        let report = PluginLoadReport::failed("m", NodeError::Panic("m".into()));
        assert_eq!(report.into_result(), Err(NodeError::Panic("m".into())));
    }

    #[test]
    fn null_manager_registers_nothing() {
        let entries: [NodeEntry; 0] = [];
        let (mut registered, mut total) = (7, 7);
        // SAFETY: null manager and valid out-parameters.
        let status = unsafe {
            register_node_types(std::ptr::null_mut(), &mut registered, &mut total, &entries)
        };
        assert_eq!((status, registered, total), (0, 0, 0));
    }
}
