//! The node and context protocols.
//!
//! A node moves through
//! `Constructed → set_input* → pre_apply → apply → post_apply → get_output* → deinit`.
//! Every step reports a [`Status`]; a host stops advancing a node at the
//! first step that does not return [`Status::Success`].

use std::fmt;

use tether_value::{ScopedLock, SharedRef, TaggedValue};

use crate::descriptor::NodeDescriptor;

/// Outcome of a lifecycle or context call.
#[must_use]
#[repr(u64)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// The step completed.
    Success = 0,
    /// The step failed; the node must not advance.
    Fail = 1,
    /// The step gave up waiting.
    Timeout = 2,
}

impl Status {
    /// Whether this is [`Status::Success`].
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    /// `Ok(())` on success, the status itself otherwise.
    pub const fn ok(self) -> Result<(), Self> {
        match self {
            Self::Success => Ok(()),
            other => Err(other),
        }
    }

    /// Wire code.
    pub const fn code(self) -> u64 {
        self as u64
    }

    /// Decode a wire code.
    pub const fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(Self::Success),
            1 => Some(Self::Fail),
            2 => Some(Self::Timeout),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Success => "success",
            Self::Fail => "fail",
            Self::Timeout => "timeout",
        })
    }
}

/// A node implemented by a plugin.
///
/// Steps run with the runtime lock held, so every method receives the
/// [`ScopedLock`]. Only [`apply`](Node::apply) must be provided.
pub trait Node: Send {
    /// Receive a value on the input socket `tag`.
    ///
    /// The value is borrowed for the call; keep it with
    /// [`SharedRef::share`] or [`OwnedValue::copy_of`](tether_value::OwnedValue::copy_of).
    fn set_input(&mut self, lock: &ScopedLock<'_>, tag: &str, value: TaggedValue<'_>) -> Status {
        let _ = (lock, tag, value);
        Status::Fail
    }

    /// Borrowed value of the output socket `tag`; empty when there is none.
    fn get_output(&self, lock: &ScopedLock<'_>, tag: &str) -> TaggedValue<'_> {
        let _ = (lock, tag);
        TaggedValue::Empty
    }

    /// Runs before [`apply`](Node::apply).
    fn pre_apply(&mut self, lock: &ScopedLock<'_>) -> Status {
        let _ = lock;
        Status::Success
    }

    /// The node's work.
    fn apply(&mut self, lock: &ScopedLock<'_>) -> Status;

    /// Runs after [`apply`](Node::apply).
    fn post_apply(&mut self, lock: &ScopedLock<'_>) -> Status {
        let _ = lock;
        Status::Success
    }

    /// Destroy the node. Runs inside the code that created it, so a plugin
    /// node is always freed by its own plugin.
    fn deinit(self: Box<Self>) {}
}

/// Graph operations a host offers to nodes and drivers.
///
/// Every call is synchronous and assumes it is the only mutation of the
/// graph in flight. The defaults refuse the operation.
pub trait Context {
    /// Insert `node` under `id`. The context owns the node from here on,
    /// even when it refuses it.
    fn create_node(&mut self, lock: &ScopedLock<'_>, id: TaggedValue<'_>, node: Box<dyn Node>) -> Status {
        let _ = (lock, id);
        node.deinit();
        Status::Fail
    }

    /// Remove and destroy the node under `id`.
    fn delete_node(&mut self, lock: &ScopedLock<'_>, id: TaggedValue<'_>) -> Status {
        let _ = (lock, id);
        Status::Fail
    }

    /// Run the node under `id`.
    fn perform(&mut self, lock: &ScopedLock<'_>, id: TaggedValue<'_>) -> Status {
        let _ = (lock, id);
        Status::Fail
    }

    /// Link an output pin to an input pin.
    fn create_link(
        &mut self,
        lock: &ScopedLock<'_>,
        src_id: TaggedValue<'_>,
        src_pin: TaggedValue<'_>,
        dst_id: TaggedValue<'_>,
        dst_pin: TaggedValue<'_>,
    ) -> Status {
        let _ = (lock, src_id, src_pin, dst_id, dst_pin);
        Status::Fail
    }

    /// Remove a link.
    fn delete_link(
        &mut self,
        lock: &ScopedLock<'_>,
        src_id: TaggedValue<'_>,
        src_pin: TaggedValue<'_>,
        dst_id: TaggedValue<'_>,
        dst_pin: TaggedValue<'_>,
    ) -> Status {
        let _ = (lock, src_id, src_pin, dst_id, dst_pin);
        Status::Fail
    }

    /// Declare a pin on a node. `descriptor` is expected to be a dict.
    fn create_pin(
        &mut self,
        lock: &ScopedLock<'_>,
        id: TaggedValue<'_>,
        pin: TaggedValue<'_>,
        descriptor: TaggedValue<'_>,
    ) -> Status {
        let _ = (lock, id, pin, descriptor);
        Status::Fail
    }

    /// Remove a pin and the links using it.
    fn delete_pin(&mut self, lock: &ScopedLock<'_>, id: TaggedValue<'_>, pin: TaggedValue<'_>) -> Status {
        let _ = (lock, id, pin);
        Status::Fail
    }

    /// Destroy the context.
    fn deinit(self: Box<Self>) {}
}

/// Typed helper for node implementations.
///
/// ```
/// use tether_node::{Node, NodeInterface, Status};
/// use tether_value::ScopedLock;
///
/// #[derive(Default)]
/// struct Noop;
///
/// impl Node for Noop {
///     fn apply(&mut self, _lock: &ScopedLock<'_>) -> Status {
///         Status::Success
///     }
/// }
///
/// impl NodeInterface for Noop {}
///
/// assert_eq!(Noop::label(), "Noop");
/// ```
pub trait NodeInterface: Node + Default + 'static {
    /// Registration label: the type name without its module path.
    fn label() -> &'static str {
        short_type_name(std::any::type_name::<Self>())
    }

    /// Factory entry point.
    fn create_node(ctx: &mut dyn Context) -> Box<dyn Node> {
        let _ = ctx;
        Box::new(Self::default())
    }

    /// Static metadata, if the node publishes any.
    fn descriptor() -> Option<NodeDescriptor<'static>> {
        None
    }

    /// UI tree built from [`descriptor`](NodeInterface::descriptor), or an
    /// empty value without one.
    fn ui_descriptor(lock: &ScopedLock<'_>) -> SharedRef<'static> {
        match Self::descriptor() {
            Some(descriptor) => descriptor.to_ui_tree(lock),
            None => SharedRef::empty(lock.bridge()),
        }
    }
}

/// Strip the module path of a type name, leaving generic arguments alone.
pub(crate) fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    let start = base.rfind("::").map_or(0, |i| i + 2);
    &full[start..]
}
