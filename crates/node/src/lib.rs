//! # Tether Node
//!
//! Node protocol and plugin loading on top of [`tether_value`].
//!
//! A **node** is a unit of work with named input and output sockets that
//! runs under the runtime lock. Plugins package node types and register
//! them with a host through a single exported entry.
//!
//! ## Core Types
//!
//! - [`Node`]: lifecycle every node implements (`set_input`, `apply`, `get_output`, ...)
//! - [`NodeInterface`]: typed helper giving a node a label, factory and UI tree
//! - [`Context`]: graph operations a host offers; [`Graph`] is the in-process one
//! - [`NodeManager`]: label → factory registry; [`NodeRegistry`] is the host's
//! - [`Descriptor`] / [`NodeDescriptor`]: static socket and attribute metadata
//! - [`UiDescriptor`]: the UI shape of a descriptor as serde data or a runtime tree
//! - [`Command`] / [`CommandHistory`]: undoable host actions
//! - [`HostConfig`]: plugin directories and entry symbol, from TOML or env
//! - [`NodeError`]: error type for registration and loading
//!
//! ## Plugins
//!
//! A plugin crate builds as a `cdylib` and calls [`export_nodes!`] with its
//! node types. [`NodeRegistry::load_plugins_at`](NodeManager::load_plugins_at)
//! opens every shared library in a directory and runs its entry once.

// `deny` instead of `forbid` so the plugin modules can opt out for FFI.
#![deny(unsafe_code)]
#![warn(missing_docs)]

mod command;
mod config;
mod descriptor;
mod error;
mod graph;
mod loader;
mod manager;
mod node;
mod plugin;
mod registry;
mod ui;

// ── Public re-exports ─────────────────────────────────────────────────────────

pub use command::{Command, CommandHistory, CommandKind};
pub use config::{ENTRY_SYMBOL_ENV, HostConfig, PLUGIN_PATH_ENV};
pub use descriptor::{
    AttribDescriptor, CategoryDescriptor, Descriptor, FieldDescriptor, NodeDescriptor,
    SocketDescriptor,
};
pub use error::NodeError;
pub use graph::{Graph, GraphKey, Link, NodeState, Stage, run_node};
pub use manager::{NodeFactory, NodeManager, UiDescriptorFn};
pub use node::{Context, Node, NodeInterface, Status};
pub use plugin::{
    ENTRY_SYMBOL, ManagerHandle, NodeEntry, PluginEntry, PluginLoadReport, register_node_types,
    register_node_types_into,
};
pub use registry::NodeRegistry;
pub use ui::{UiDescriptor, UiField};
