// SPDX-License-Identifier: MIT OR Apache-2.0
//! On-disk scene definitions.
//!
//! A definition is a flat list of node entries. Each entry names its parent
//! by a path relative to the scene root, so a definition that `inherits`
//! another one can override inherited nodes by path and add new ones.
//! Entries may also instance another definition as a sub-scene.

use crate::connection::ConnectFlags;
use crate::path::NodePath;
use crate::property::PropertyValue;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

/// Errors found when validating a definition
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DefinitionError {
    /// Written by a newer format
    #[error("Definition version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version in the file
        found: u32,
        /// Highest supported version
        supported: u32,
    },

    /// No root entry and nothing inherited
    #[error("Definition has no root node")]
    MissingRoot,

    /// More than one entry without a parent
    #[error("Definition has more than one root node")]
    MultipleRoots,

    /// Root entry instances another definition
    #[error("Root node cannot be an instance, use `inherits` instead")]
    RootIsInstance,

    /// Two entries resolve to the same path
    #[error("Duplicate node path: {0}")]
    DuplicatePath(String),

    /// New entry has neither a class nor an instance
    #[error("Node {0} has no class and no instance")]
    MissingClass(String),
}

/// A scene definition as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneDefinition {
    /// Display name
    pub name: String,
    /// Version for format compatibility
    pub version: u32,
    /// Definition this one extends
    #[serde(default)]
    pub inherits: Option<PathBuf>,
    /// Node entries, parents before children
    pub nodes: Vec<DefinitionNode>,
    /// Persistent connections
    #[serde(default)]
    pub connections: Vec<DefinitionConnection>,
    /// File path this definition was loaded from
    #[serde(skip)]
    pub path: Option<PathBuf>,
    /// Resolved `inherits` definition
    #[serde(skip)]
    pub base: Option<Arc<SceneDefinition>>,
}

/// A node entry within a definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefinitionNode {
    /// Node name
    pub name: String,
    /// Parent path relative to the scene root, `None` for the root itself
    #[serde(default)]
    pub parent: Option<NodePath>,
    /// Class of a new node. Omitted when overriding an inherited node.
    #[serde(default)]
    pub class: Option<String>,
    /// Definition instanced at this position
    #[serde(default)]
    pub instance: Option<PathBuf>,
    /// Script resource attached to the node
    #[serde(default)]
    pub script: Option<String>,
    /// Property values. Node references are stored as paths relative to
    /// this node.
    #[serde(default)]
    pub properties: IndexMap<String, PropertyValue>,
    /// Persistent groups
    #[serde(default)]
    pub groups: Vec<String>,
}

/// A persistent connection within a definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefinitionConnection {
    /// Emitting node, relative to the scene root
    pub from: NodePath,
    /// Signal name
    pub signal: String,
    /// Handler node, relative to the scene root
    pub to: NodePath,
    /// Handler method
    pub method: String,
    /// Connection flags
    #[serde(default)]
    pub flags: ConnectFlags,
}

impl SceneDefinition {
    /// Current definition format version
    pub const FORMAT_VERSION: u32 = 1;

    /// Create an empty definition
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: Self::FORMAT_VERSION,
            inherits: None,
            nodes: Vec::new(),
            connections: Vec::new(),
            path: None,
            base: None,
        }
    }

    /// Extend another definition
    pub fn inheriting(mut self, path: impl Into<PathBuf>) -> Self {
        self.inherits = Some(path.into());
        self
    }

    /// Add a node entry
    pub fn with_node(mut self, node: DefinitionNode) -> Self {
        self.nodes.push(node);
        self
    }

    /// Add a connection
    pub fn with_connection(mut self, connection: DefinitionConnection) -> Self {
        self.connections.push(connection);
        self
    }

    /// Entry declared by this definition at `path`
    pub fn own_node(&self, path: &NodePath) -> Option<&DefinitionNode> {
        self.nodes.iter().find(|n| &n.path() == path)
    }

    /// Whether this definition or anything it inherits declares `path`
    pub fn has_node_path(&self, path: &NodePath) -> bool {
        self.chain().iter().any(|def| def.own_node(path).is_some())
    }

    /// The inheritance chain, most basic definition first
    pub fn chain(&self) -> Vec<&SceneDefinition> {
        let mut chain = vec![self];
        let mut current = self.base.as_deref();
        while let Some(def) = current {
            chain.push(def);
            current = def.base.as_deref();
        }
        chain.reverse();
        chain
    }

    /// Check the file-local structure
    pub fn validate(&self) -> Result<(), DefinitionError> {
        if self.version > Self::FORMAT_VERSION {
            return Err(DefinitionError::UnsupportedVersion {
                found: self.version,
                supported: Self::FORMAT_VERSION,
            });
        }

        let roots: Vec<_> = self.nodes.iter().filter(|n| n.parent.is_none()).collect();
        match roots.as_slice() {
            [] if self.inherits.is_none() => return Err(DefinitionError::MissingRoot),
            [root] if root.instance.is_some() => return Err(DefinitionError::RootIsInstance),
            [] | [_] => {}
            _ => return Err(DefinitionError::MultipleRoots),
        }

        let mut seen = HashSet::new();
        for node in &self.nodes {
            let path = node.path();
            if !seen.insert(path.clone()) {
                return Err(DefinitionError::DuplicatePath(path.to_string()));
            }
            if self.inherits.is_none() && node.class.is_none() && node.instance.is_none() {
                return Err(DefinitionError::MissingClass(path.to_string()));
            }
        }
        Ok(())
    }

    /// Serialize to RON format
    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }

    /// Deserialize from RON format
    pub fn from_ron(s: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(s)
    }
}

impl DefinitionNode {
    /// Root entry of a new scene
    pub fn root(name: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            class: Some(class.into()),
            instance: None,
            script: None,
            properties: IndexMap::new(),
            groups: Vec::new(),
        }
    }

    /// New child entry
    pub fn child(parent: impl Into<NodePath>, name: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            parent: Some(parent.into()),
            ..Self::root(name, class)
        }
    }

    /// Entry instancing another definition
    pub fn instance(parent: impl Into<NodePath>, name: impl Into<String>, scene: impl Into<PathBuf>) -> Self {
        Self {
            class: None,
            instance: Some(scene.into()),
            ..Self::child(parent, name, String::new())
        }
    }

    /// Entry overriding a node that already exists at `path`
    pub fn overriding(path: impl Into<NodePath>) -> Self {
        let path = path.into();
        let name = path.last().unwrap_or_default().to_string();
        Self {
            name,
            parent: path.parent(),
            class: None,
            instance: None,
            script: None,
            properties: IndexMap::new(),
            groups: Vec::new(),
        }
    }

    /// Set a property value
    pub fn with_property(mut self, name: impl Into<String>, value: PropertyValue) -> Self {
        self.properties.insert(name.into(), value);
        self
    }

    /// Attach a script
    pub fn with_script(mut self, script: impl Into<String>) -> Self {
        self.script = Some(script.into());
        self
    }

    /// Join a group
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }

    /// Path of this entry relative to the scene root
    pub fn path(&self) -> NodePath {
        match &self.parent {
            Some(parent) => parent.join(self.name.clone()),
            None => NodePath::current(),
        }
    }
}

impl DefinitionConnection {
    /// Persistent connection between two nodes of the scene
    pub fn new(
        from: impl Into<NodePath>,
        signal: impl Into<String>,
        to: impl Into<NodePath>,
        method: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            signal: signal.into(),
            to: to.into(),
            method: method.into(),
            flags: ConnectFlags::PERSIST,
        }
    }
}
