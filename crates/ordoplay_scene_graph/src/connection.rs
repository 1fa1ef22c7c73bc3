// SPDX-License-Identifier: MIT OR Apache-2.0
//! Signal connections between nodes.

use crate::node::NodeId;
use serde::{Deserialize, Serialize};
use std::ops::BitOr;
use uuid::Uuid;

/// Unique identifier for a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Create a new random connection ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Connection behaviour flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectFlags(pub u32);

impl ConnectFlags {
    /// No flags
    pub const NONE: Self = Self(0);
    /// Handler runs at idle time
    pub const DEFERRED: Self = Self(1);
    /// Connection is saved with the scene
    pub const PERSIST: Self = Self(2);
    /// Disconnect after the first emission
    pub const ONE_SHOT: Self = Self(4);

    /// Whether every bit of `other` is set
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for ConnectFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Handler invoked when a signal fires
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Callable {
    /// A named method on a node
    Method {
        /// Node receiving the call
        target: NodeId,
        /// Method name
        method: String,
    },
    /// A handler assembled at runtime (bound arguments, lambdas). These
    /// cannot be rebuilt from a name and are never persisted.
    Custom {
        /// Node the handler is bound to, if any
        target: Option<NodeId>,
        /// Debug label
        label: String,
    },
}

impl Callable {
    /// Method callable
    pub fn method(target: NodeId, method: impl Into<String>) -> Self {
        Callable::Method {
            target,
            method: method.into(),
        }
    }

    /// Node receiving the call
    pub fn target(&self) -> Option<NodeId> {
        match self {
            Callable::Method { target, .. } => Some(*target),
            Callable::Custom { target, .. } => *target,
        }
    }

    /// Method name, for method callables
    pub fn method_name(&self) -> Option<&str> {
        match self {
            Callable::Method { method, .. } => Some(method),
            Callable::Custom { .. } => None,
        }
    }

    /// Whether this is a runtime-assembled handler
    pub fn is_custom(&self) -> bool {
        matches!(self, Callable::Custom { .. })
    }
}

/// A subscription from a node's signal to a handler
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    /// Unique connection ID
    pub id: ConnectionId,
    /// Emitting node
    pub source: NodeId,
    /// Signal name
    pub signal: String,
    /// Handler
    pub callable: Callable,
    /// Flags
    pub flags: ConnectFlags,
}

impl Connection {
    /// Create a new connection
    pub fn new(source: NodeId, signal: impl Into<String>, callable: Callable, flags: ConnectFlags) -> Self {
        Self {
            id: ConnectionId::new(),
            source,
            signal: signal.into(),
            callable,
            flags,
        }
    }

    /// Check if this connection involves a specific node
    pub fn involves_node(&self, node_id: NodeId) -> bool {
        self.source == node_id || self.callable.target() == Some(node_id)
    }

    /// Whether this connection links the same signal to the same handler
    pub fn same_link(&self, source: NodeId, signal: &str, callable: &Callable) -> bool {
        self.source == source && self.signal == signal && &self.callable == callable
    }
}
