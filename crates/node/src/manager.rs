//! The node manager protocol: label → factory registration.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tether_value::{ScopedLock, SharedRef};

use crate::descriptor::NodeDescriptor;
use crate::error::NodeError;
use crate::node::{Context, Node};
use crate::plugin::PluginLoadReport;

/// Accessor producing a node type's UI tree.
pub type UiDescriptorFn = fn(&ScopedLock<'_>) -> SharedRef<'static>;

/// Cloneable node constructor bound to a label.
#[derive(Clone)]
pub struct NodeFactory(Arc<dyn Fn(&mut dyn Context) -> Box<dyn Node> + Send + Sync>);

impl NodeFactory {
    /// Wrap a constructor.
    pub fn new(create: impl Fn(&mut dyn Context) -> Box<dyn Node> + Send + Sync + 'static) -> Self {
        Self(Arc::new(create))
    }

    /// Build a node for `ctx`.
    pub fn create(&self, ctx: &mut dyn Context) -> Box<dyn Node> {
        (self.0)(ctx)
    }
}

impl From<fn(&mut dyn Context) -> Box<dyn Node>> for NodeFactory {
    fn from(create: fn(&mut dyn Context) -> Box<dyn Node>) -> Self {
        Self::new(create)
    }
}

impl fmt::Debug for NodeFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NodeFactory").finish_non_exhaustive()
    }
}

/// Registry of node types, implemented by the host.
///
/// Labels are flat and case-sensitive. The first registration of a label
/// wins; a second one is reported as [`NodeError::RegistrationConflict`]
/// and leaves the first in place.
pub trait NodeManager {
    /// Load every plugin module in `path`.
    fn load_plugins_at(&mut self, path: &Path) -> Result<Vec<PluginLoadReport>, NodeError>;

    /// Bind `label` to `factory`.
    fn register_node_factory(&mut self, label: &str, factory: NodeFactory) -> Result<(), NodeError>;

    /// Bind `label` to a UI accessor.
    fn register_ui_descriptor(&mut self, label: &str, ui: UiDescriptorFn) -> Result<(), NodeError>;

    /// Bind `label` to `factory` together with its static metadata.
    fn register_node_factory_with_descriptor(
        &mut self,
        label: &str,
        factory: NodeFactory,
        descriptor: NodeDescriptor<'static>,
    ) -> Result<(), NodeError>;

    /// Factory registered under `label`.
    fn retrieve_node_factory(&self, label: &str) -> Option<NodeFactory>;

    /// Log the registered factories.
    fn display_node_factories(&self);
}
