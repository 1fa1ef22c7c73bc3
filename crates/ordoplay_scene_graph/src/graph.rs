// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scene graph arena holding nodes and connections.
//!
//! Every structural link is an id resolved through the arena, so several
//! scene trees (one per open tab) can share one `SceneGraph`.

use crate::connection::{Callable, ConnectFlags, Connection, ConnectionId};
use crate::node::{Node, NodeId};
use crate::path::{NodePath, PARENT_SEGMENT};
use crate::property::{PropertyError, PropertyValue, Reflectable};
use indexmap::IndexMap;

/// Errors from structural graph operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Node is already attached somewhere else
    #[error("Node {0} already has a parent")]
    AlreadyHasParent(NodeId),

    /// Parenting would make a node its own ancestor
    #[error("Adding {child} under {parent} would create a cycle")]
    WouldCreateCycle {
        /// Intended parent
        parent: NodeId,
        /// Intended child
        child: NodeId,
    },

    /// Owner is not an ancestor of the node
    #[error("Node {owner} is not an ancestor of {node} and cannot own it")]
    InvalidOwner {
        /// Owned node
        node: NodeId,
        /// Rejected owner
        owner: NodeId,
    },

    /// Identical connection already exists
    #[error("Signal {signal} is already connected to this handler")]
    AlreadyConnected {
        /// Signal name
        signal: String,
    },

    /// Handler method does not exist on the target
    #[error("Method {method} not found on target node")]
    MethodNotFound {
        /// Method name
        method: String,
    },

    /// Property access failed
    #[error(transparent)]
    Property(#[from] PropertyError),
}

/// Result type for graph operations
pub type GraphResult<T> = Result<T, GraphError>;

/// Arena of live nodes and their signal connections
#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    nodes: IndexMap<NodeId, Node>,
    connections: IndexMap<ConnectionId, Connection>,
}

impl SceneGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a detached node to the arena
    pub fn insert(&mut self, node: Node) -> NodeId {
        let id = node.id();
        self.nodes.insert(id, node);
        id
    }

    /// Get a node by ID
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Get a mutable node by ID
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    fn require(&self, id: NodeId) -> GraphResult<&Node> {
        self.nodes.get(&id).ok_or(GraphError::NodeNotFound(id))
    }

    fn require_mut(&mut self, id: NodeId) -> GraphResult<&mut Node> {
        self.nodes.get_mut(&id).ok_or(GraphError::NodeNotFound(id))
    }

    /// Whether the node is alive
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Number of live nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get all nodes
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Attach `child` as the last child of `parent`.
    ///
    /// The child is renamed if a sibling already uses its name.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> GraphResult<()> {
        self.require(parent)?;
        if self.require(child)?.parent.is_some() {
            return Err(GraphError::AlreadyHasParent(child));
        }
        if parent == child || self.is_ancestor_of(child, parent) {
            return Err(GraphError::WouldCreateCycle { parent, child });
        }

        let name = self.unique_child_name(parent, self.require(child)?.name(), None);
        let node = self.require_mut(child)?;
        node.set_name_unchecked(name);
        node.parent = Some(parent);
        self.require_mut(parent)?.children.push(child);
        Ok(())
    }

    /// Move a child to `index` among its siblings. Out of range indices clamp
    /// to the end.
    pub fn move_child(&mut self, child: NodeId, index: usize) -> GraphResult<()> {
        let parent = self.require(child)?.parent.ok_or(GraphError::NodeNotFound(child))?;
        let children = &mut self.require_mut(parent)?.children;
        children.retain(|c| *c != child);
        let index = index.min(children.len());
        children.insert(index, child);
        Ok(())
    }

    /// Detach a node from its parent, returning its former index. The node
    /// stays alive in the arena.
    pub fn detach(&mut self, child: NodeId) -> GraphResult<Option<usize>> {
        let Some(parent) = self.require(child)?.parent else {
            return Ok(None);
        };
        let index = self.index_in_parent(child);
        if let Some(parent) = self.nodes.get_mut(&parent) {
            parent.children.retain(|c| *c != child);
        }
        self.require_mut(child)?.parent = None;
        Ok(index)
    }

    /// Position of a node among its siblings
    pub fn index_in_parent(&self, child: NodeId) -> Option<usize> {
        let parent = self.nodes.get(&child)?.parent?;
        self.nodes.get(&parent)?.children.iter().position(|c| *c == child)
    }

    /// Rename a node, keeping sibling names unique. Returns the applied name.
    pub fn rename(&mut self, id: NodeId, name: &str) -> GraphResult<String> {
        let name = match self.require(id)?.parent {
            Some(parent) => self.unique_child_name(parent, name, Some(id)),
            None => name.to_string(),
        };
        self.require_mut(id)?.set_name_unchecked(name.clone());
        Ok(name)
    }

    fn unique_child_name(&self, parent: NodeId, base: &str, exclude: Option<NodeId>) -> String {
        let taken = |candidate: &str| {
            self.nodes.get(&parent).is_some_and(|p| {
                p.children.iter().any(|c| {
                    Some(*c) != exclude && self.nodes.get(c).is_some_and(|n| n.name() == candidate)
                })
            })
        };
        if !taken(base) {
            return base.to_string();
        }
        let mut suffix = 2;
        loop {
            let candidate = format!("{base}{suffix}");
            if !taken(&candidate) {
                return candidate;
            }
            suffix += 1;
        }
    }

    /// Free a node and all of its descendants, dropping every connection that
    /// touches them. Returns the removed ids, root first.
    pub fn remove_subtree(&mut self, root: NodeId) -> GraphResult<Vec<NodeId>> {
        self.detach(root)?;
        let removed = self.subtree(root);
        self.purge(&removed);
        Ok(removed)
    }

    /// Drop nodes from the arena without touching their parents' child lists
    pub fn purge(&mut self, ids: &[NodeId]) {
        for id in ids {
            self.nodes.shift_remove(id);
        }
        self.connections
            .retain(|_, c| !ids.iter().any(|id| c.involves_node(*id)));
    }

    /// Resolve a path relative to `from`
    pub fn get_node_or_null(&self, from: NodeId, path: &NodePath) -> Option<NodeId> {
        let mut current = self.nodes.get(&from)?;
        for name in path.names() {
            let next = if name == PARENT_SEGMENT {
                current.parent?
            } else {
                current
                    .children
                    .iter()
                    .copied()
                    .find(|c| self.nodes.get(c).is_some_and(|n| n.name() == name))?
            };
            current = self.nodes.get(&next)?;
        }
        Some(current.id())
    }

    /// Relative path leading from `from` to `to`, or `None` if they are not
    /// in the same tree
    pub fn path_to(&self, from: NodeId, to: NodeId) -> Option<NodePath> {
        if !self.contains(from) || !self.contains(to) {
            return None;
        }
        let from_chain = self.ancestry(from);
        let to_chain = self.ancestry(to);
        let common = to_chain.iter().find(|id| from_chain.contains(id))?;

        let mut path = NodePath::current();
        for id in &from_chain {
            if id == common {
                break;
            }
            path.push(PARENT_SEGMENT);
        }
        let down: Vec<_> = to_chain.iter().take_while(|id| *id != common).collect();
        for id in down.into_iter().rev() {
            path.push(self.nodes.get(id)?.name());
        }
        Some(path)
    }

    /// The node followed by each of its ancestors
    fn ancestry(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = vec![id];
        let mut current = self.nodes.get(&id).and_then(Node::parent);
        while let Some(parent) = current {
            chain.push(parent);
            current = self.nodes.get(&parent).and_then(Node::parent);
        }
        chain
    }

    /// Whether `ancestor` is a strict ancestor of `node`
    pub fn is_ancestor_of(&self, ancestor: NodeId, node: NodeId) -> bool {
        ancestor != node && self.ancestry(node).contains(&ancestor)
    }

    /// Topmost ancestor of a node
    pub fn root_of(&self, id: NodeId) -> NodeId {
        self.ancestry(id).last().copied().unwrap_or(id)
    }

    /// All descendants of `root` in depth-first pre-order, excluding `root`
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = self.subtree(root);
        if !out.is_empty() {
            out.remove(0);
        }
        out
    }

    /// `root` followed by its descendants in depth-first pre-order
    pub fn subtree(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.contains(root) {
            return out;
        }
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            if let Some(node) = self.nodes.get(&id) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    /// Set or clear the owner of a node. The owner must be a strict
    /// ancestor, which rules out ownership cycles and owners outside the tree.
    pub fn set_owner(&mut self, node: NodeId, owner: Option<NodeId>) -> GraphResult<()> {
        if let Some(owner) = owner {
            self.require(owner)?;
            if !self.is_ancestor_of(owner, node) {
                return Err(GraphError::InvalidOwner { node, owner });
            }
        }
        self.require_mut(node)?.owner = owner;
        Ok(())
    }

    /// Nodes under `owner` whose owner is exactly `owner`, in pre-order
    pub fn owned_by(&self, owner: NodeId) -> Vec<NodeId> {
        self.descendants(owner)
            .into_iter()
            .filter(|id| self.nodes.get(id).and_then(Node::owner) == Some(owner))
            .collect()
    }

    /// Whether following owner links from `node` reaches `target`
    pub fn owner_chain_reaches(&self, node: NodeId, target: NodeId) -> bool {
        let mut current = self.nodes.get(&node).and_then(Node::owner);
        let mut steps = 0;
        while let Some(owner) = current {
            if owner == target {
                return true;
            }
            steps += 1;
            if steps > self.nodes.len() {
                return false;
            }
            current = self.nodes.get(&owner).and_then(Node::owner);
        }
        false
    }

    /// Put detached `new` into the slot `old` occupies in its parent and give
    /// it `old`'s owner. `old` is detached and keeps its own children.
    /// Connections and groups are not carried over.
    pub fn replace_by(&mut self, old: NodeId, new: NodeId) -> GraphResult<()> {
        let (parent, owner) = {
            let node = self.require(old)?;
            (node.parent, node.owner)
        };
        if self.require(new)?.parent.is_some() {
            return Err(GraphError::AlreadyHasParent(new));
        }

        if let Some(parent) = parent {
            let children = &mut self.require_mut(parent)?.children;
            if let Some(slot) = children.iter_mut().find(|c| **c == old) {
                *slot = new;
            }
            self.require_mut(old)?.parent = None;
            self.require_mut(new)?.parent = Some(parent);
            let name = self.require(new)?.name().to_string();
            self.rename(new, &name)?;
        }
        self.require_mut(new)?.owner = owner;
        Ok(())
    }

    /// Write a property through the node's reflection interface
    pub fn set_property(&mut self, id: NodeId, name: &str, value: PropertyValue) -> GraphResult<()> {
        self.require_mut(id)?.set(name, value)?;
        Ok(())
    }

    /// Connect a signal to a handler
    pub fn connect(
        &mut self,
        source: NodeId,
        signal: impl Into<String>,
        callable: Callable,
        flags: ConnectFlags,
    ) -> GraphResult<ConnectionId> {
        let signal = signal.into();
        self.require(source)?;
        if let Callable::Method { target, method } = &callable {
            if !self.require(*target)?.has_method(method) {
                return Err(GraphError::MethodNotFound {
                    method: method.clone(),
                });
            }
        }
        if self.is_connected(source, &signal, &callable) {
            return Err(GraphError::AlreadyConnected { signal });
        }

        let connection = Connection::new(source, signal, callable, flags);
        let id = connection.id;
        self.connections.insert(id, connection);
        Ok(id)
    }

    /// Remove a connection
    pub fn disconnect(&mut self, id: ConnectionId) -> Option<Connection> {
        self.connections.shift_remove(&id)
    }

    /// Whether the signal is already linked to this handler
    pub fn is_connected(&self, source: NodeId, signal: &str, callable: &Callable) -> bool {
        self.connections
            .values()
            .any(|c| c.same_link(source, signal, callable))
    }

    /// Get all connections
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Connections whose signal is emitted by `node`
    pub fn outgoing(&self, node: NodeId) -> impl Iterator<Item = &Connection> {
        self.connections.values().filter(move |c| c.source == node)
    }

    /// Connections whose handler lives on `node`
    pub fn incoming(&self, node: NodeId) -> impl Iterator<Item = &Connection> {
        self.connections
            .values()
            .filter(move |c| c.callable.target() == Some(node))
    }
}
