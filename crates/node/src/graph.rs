//! In-process [`Context`]: nodes keyed by id, pins and links between them.
//!
//! [`Graph::perform`] pulls every linked output into the node's inputs and
//! then drives `pre_apply → apply → post_apply`, stopping at the first step
//! that does not succeed. The step and status that stopped a node are kept
//! in its [`NodeState`].

use std::fmt;

use indexmap::IndexMap;
use tether_value::{DictRef, ScopedLock, SharedRef, StrRef, TaggedValue};

use crate::manager::NodeManager;
use crate::node::{Context, Node, Status};

/// Node id: an integer or a string, native or runtime object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GraphKey {
    /// Integral id.
    Int(i64),
    /// Text id.
    Text(String),
}

impl GraphKey {
    /// Key for `value`; `None` for values that are neither integral nor text.
    pub fn from_value(lock: &ScopedLock<'_>, value: TaggedValue<'_>) -> Option<Self> {
        if value.is_integral(lock) {
            return value.try_to_i64(lock).ok().map(Self::Int);
        }
        text_of(lock, value).map(Self::Text)
    }
}

impl From<i64> for GraphKey {
    fn from(id: i64) -> Self {
        Self::Int(id)
    }
}

impl From<&str> for GraphKey {
    fn from(id: &str) -> Self {
        Self::Text(id.to_owned())
    }
}

impl fmt::Display for GraphKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
        }
    }
}

/// Text of a native string or a str object.
fn text_of(lock: &ScopedLock<'_>, value: TaggedValue<'_>) -> Option<String> {
    if let Some(text) = value.as_cstr() {
        return Some(text.to_owned());
    }
    StrRef::try_new(lock, &value)?.to_text()
}

/// Lifecycle step of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Receiving linked inputs.
    SetInput,
    /// `pre_apply`.
    PreApply,
    /// `apply`.
    Apply,
    /// `post_apply`.
    PostApply,
}

/// Where a node stands in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeState {
    /// Created, never performed.
    Constructed,
    /// Last perform ran every step.
    Applied,
    /// Last perform stopped at a step.
    Halted(Stage, Status),
}

impl NodeState {
    /// Status of the last perform.
    pub const fn status(self) -> Status {
        match self {
            Self::Constructed | Self::Applied => Status::Success,
            Self::Halted(_, status) => status,
        }
    }
}

/// Drive one node through its lifecycle.
///
/// Inputs are delivered in order, then the three apply steps run. The
/// first step that does not succeed ends the run.
pub fn run_node(node: &mut dyn Node, lock: &ScopedLock<'_>, inputs: &[(&str, TaggedValue<'_>)]) -> NodeState {
    for &(tag, value) in inputs {
        let status = node.set_input(lock, tag, value);
        if !status.is_success() {
            return NodeState::Halted(Stage::SetInput, status);
        }
    }
    for stage in [Stage::PreApply, Stage::Apply, Stage::PostApply] {
        let status = match stage {
            Stage::PreApply => node.pre_apply(lock),
            Stage::Apply => node.apply(lock),
            Stage::PostApply => node.post_apply(lock),
            Stage::SetInput => continue,
        };
        if !status.is_success() {
            return NodeState::Halted(stage, status);
        }
    }
    NodeState::Applied
}

/// A directed connection from an output pin to an input pin.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Link {
    /// Source node.
    pub src: GraphKey,
    /// Output pin on the source.
    pub src_pin: String,
    /// Destination node.
    pub dst: GraphKey,
    /// Input pin on the destination.
    pub dst_pin: String,
}

impl Link {
    fn touches(&self, key: &GraphKey) -> bool {
        self.src == *key || self.dst == *key
    }

    fn uses_pin(&self, key: &GraphKey, pin: &str) -> bool {
        (self.src == *key && self.src_pin == pin) || (self.dst == *key && self.dst_pin == pin)
    }
}

struct NodeSlot {
    node: Option<Box<dyn Node>>,
    pins: IndexMap<String, SharedRef<'static>>,
    state: NodeState,
}

impl Drop for NodeSlot {
    fn drop(&mut self) {
        if let Some(node) = self.node.take() {
            node.deinit();
        }
    }
}

/// Graph of nodes owned by the host.
///
/// Nodes are destroyed through [`Node::deinit`] when deleted or when the
/// graph is dropped. Ids are unique; link and pin names are plain text.
#[derive(Default)]
pub struct Graph {
    nodes: IndexMap<GraphKey, NodeSlot>,
    links: Vec<Link>,
}

impl Graph {
    /// Empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether a node sits under `key`.
    pub fn contains(&self, key: &GraphKey) -> bool {
        self.nodes.contains_key(key)
    }

    /// Node ids in creation order.
    pub fn keys(&self) -> impl Iterator<Item = &GraphKey> {
        self.nodes.keys()
    }

    /// The node under `key`.
    pub fn node(&self, key: &GraphKey) -> Option<&dyn Node> {
        self.nodes.get(key)?.node.as_deref()
    }

    /// Lifecycle state of the node under `key`.
    pub fn state(&self, key: &GraphKey) -> Option<NodeState> {
        self.nodes.get(key).map(|slot| slot.state)
    }

    /// Descriptor of a declared pin.
    pub fn pin(&self, key: &GraphKey, pin: &str) -> Option<&SharedRef<'static>> {
        self.nodes.get(key)?.pins.get(pin)
    }

    /// Declared pin names of a node.
    pub fn pins(&self, key: &GraphKey) -> impl Iterator<Item = &str> {
        self.nodes
            .get(key)
            .into_iter()
            .flat_map(|slot| slot.pins.keys().map(String::as_str))
    }

    /// All links in creation order.
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Create a node through `manager`'s factory for `label` and insert it.
    pub fn instantiate(
        &mut self,
        lock: &ScopedLock<'_>,
        id: TaggedValue<'_>,
        label: &str,
        manager: &dyn NodeManager,
    ) -> Status {
        let Some(factory) = manager.retrieve_node_factory(label) else {
            tracing::warn!(label, "no factory for node label");
            return Status::Fail;
        };
        let node = factory.create(self);
        self.create_node(lock, id, node)
    }

    /// Perform every node in creation order, continuing past failures.
    pub fn perform_all(&mut self, lock: &ScopedLock<'_>) -> Vec<(GraphKey, Status)> {
        let keys: Vec<GraphKey> = self.nodes.keys().cloned().collect();
        keys.into_iter()
            .map(|key| {
                let status = self.perform_key(lock, &key);
                (key, status)
            })
            .collect()
    }

    fn perform_key(&mut self, lock: &ScopedLock<'_>, key: &GraphKey) -> Status {
        if !self.nodes.contains_key(key) {
            return Status::Fail;
        }
        let inputs = self.gather_inputs(lock, key);
        let pairs: Vec<(&str, TaggedValue<'_>)> = inputs
            .iter()
            .map(|(pin, value)| (pin.as_str(), value.value()))
            .collect();

        let Some(slot) = self.nodes.get_mut(key) else {
            return Status::Fail;
        };
        let Some(node) = slot.node.as_deref_mut() else {
            return Status::Fail;
        };
        slot.state = run_node(node, lock, &pairs);
        if let NodeState::Halted(stage, status) = slot.state {
            tracing::debug!(node = %key, ?stage, %status, "node halted");
        }
        slot.state.status()
    }

    /// Current outputs of every node linked into `key`, as object shares.
    fn gather_inputs(&self, lock: &ScopedLock<'_>, key: &GraphKey) -> Vec<(String, SharedRef<'static>)> {
        self.links
            .iter()
            .filter(|link| link.dst == *key)
            .filter_map(|link| {
                let source = self.node(&link.src)?;
                let value = source.get_output(lock, &link.src_pin);
                if value.is_empty() {
                    tracing::trace!(src = %link.src, pin = link.src_pin.as_str(), "linked output is empty");
                    return None;
                }
                Some((link.dst_pin.clone(), lock.to_object(value)))
            })
            .collect()
    }

    fn link_from(
        &self,
        lock: &ScopedLock<'_>,
        src_id: TaggedValue<'_>,
        src_pin: TaggedValue<'_>,
        dst_id: TaggedValue<'_>,
        dst_pin: TaggedValue<'_>,
    ) -> Option<Link> {
        Some(Link {
            src: GraphKey::from_value(lock, src_id)?,
            src_pin: text_of(lock, src_pin)?,
            dst: GraphKey::from_value(lock, dst_id)?,
            dst_pin: text_of(lock, dst_pin)?,
        })
    }
}

impl Context for Graph {
    fn create_node(&mut self, lock: &ScopedLock<'_>, id: TaggedValue<'_>, node: Box<dyn Node>) -> Status {
        let Some(key) = GraphKey::from_value(lock, id) else {
            node.deinit();
            return Status::Fail;
        };
        if self.nodes.contains_key(&key) {
            tracing::warn!(node = %key, "node id already in use");
            node.deinit();
            return Status::Fail;
        }
        tracing::debug!(node = %key, "node created");
        self.nodes.insert(
            key,
            NodeSlot {
                node: Some(node),
                pins: IndexMap::new(),
                state: NodeState::Constructed,
            },
        );
        Status::Success
    }

    fn delete_node(&mut self, lock: &ScopedLock<'_>, id: TaggedValue<'_>) -> Status {
        let Some(key) = GraphKey::from_value(lock, id) else {
            return Status::Fail;
        };
        match self.nodes.shift_remove(&key) {
            Some(slot) => {
                self.links.retain(|link| !link.touches(&key));
                drop(slot);
                Status::Success
            }
            None => Status::Fail,
        }
    }

    fn perform(&mut self, lock: &ScopedLock<'_>, id: TaggedValue<'_>) -> Status {
        match GraphKey::from_value(lock, id) {
            Some(key) => self.perform_key(lock, &key),
            None => Status::Fail,
        }
    }

    fn create_link(
        &mut self,
        lock: &ScopedLock<'_>,
        src_id: TaggedValue<'_>,
        src_pin: TaggedValue<'_>,
        dst_id: TaggedValue<'_>,
        dst_pin: TaggedValue<'_>,
    ) -> Status {
        let Some(link) = self.link_from(lock, src_id, src_pin, dst_id, dst_pin) else {
            return Status::Fail;
        };
        if !self.contains(&link.src) || !self.contains(&link.dst) || self.links.contains(&link) {
            return Status::Fail;
        }
        self.links.push(link);
        Status::Success
    }

    fn delete_link(
        &mut self,
        lock: &ScopedLock<'_>,
        src_id: TaggedValue<'_>,
        src_pin: TaggedValue<'_>,
        dst_id: TaggedValue<'_>,
        dst_pin: TaggedValue<'_>,
    ) -> Status {
        let Some(link) = self.link_from(lock, src_id, src_pin, dst_id, dst_pin) else {
            return Status::Fail;
        };
        match self.links.iter().position(|l| *l == link) {
            Some(at) => {
                self.links.remove(at);
                Status::Success
            }
            None => Status::Fail,
        }
    }

    fn create_pin(
        &mut self,
        lock: &ScopedLock<'_>,
        id: TaggedValue<'_>,
        pin: TaggedValue<'_>,
        descriptor: TaggedValue<'_>,
    ) -> Status {
        let (Some(key), Some(name)) = (GraphKey::from_value(lock, id), text_of(lock, pin)) else {
            return Status::Fail;
        };
        if !descriptor.is_empty() && DictRef::try_new(lock, &descriptor).is_none() {
            return Status::Fail;
        }
        let Some(slot) = self.nodes.get_mut(&key) else {
            return Status::Fail;
        };
        if slot.pins.contains_key(&name) {
            return Status::Fail;
        }
        slot.pins.insert(name, lock.to_object(descriptor));
        Status::Success
    }

    fn delete_pin(&mut self, lock: &ScopedLock<'_>, id: TaggedValue<'_>, pin: TaggedValue<'_>) -> Status {
        let (Some(key), Some(name)) = (GraphKey::from_value(lock, id), text_of(lock, pin)) else {
            return Status::Fail;
        };
        let Some(slot) = self.nodes.get_mut(&key) else {
            return Status::Fail;
        };
        if slot.pins.shift_remove(&name).is_none() {
            return Status::Fail;
        }
        self.links.retain(|link| !link.uses_pin(&key, &name));
        Status::Success
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .field("links", &self.links)
            .finish()
    }
}
