// SPDX-License-Identifier: MIT OR Apache-2.0
//! Live scene graph model for `OrdoPlay` scene reimport.
//!
//! This crate provides the in-memory scene trees the editor works on:
//! - Nodes with ordered children, owners, groups and reflected properties
//! - Signal connections between nodes
//! - On-disk scene definitions with inheritance and sub-instances
//! - Instantiation of definitions into live subtrees
//!
//! ## Architecture
//!
//! All nodes live in a single [`SceneGraph`] arena. Parents, owners and
//! connection endpoints are [`NodeId`]s resolved through the arena, never
//! owning pointers, so freeing a subtree is a matter of purging ids.

pub mod path;
pub mod property;
pub mod class;
pub mod node;
pub mod connection;
pub mod graph;
pub mod definition;
pub mod instantiate;

pub use path::NodePath;
pub use property::{PropertyError, PropertyInfo, PropertyKind, PropertyValue, Reflectable, Transform};
pub use class::{ClassDb, NodeClass, ReimportHook, ScriptClass, ScriptRef};
pub use node::{GroupInfo, Node, NodeId};
pub use connection::{Callable, ConnectFlags, Connection, ConnectionId};
pub use graph::{GraphError, GraphResult, SceneGraph};
pub use definition::{DefinitionConnection, DefinitionError, DefinitionNode, SceneDefinition};
pub use instantiate::{instantiate, DefinitionSource, InstanceMode, InstantiateError, StaticDefinitions};
