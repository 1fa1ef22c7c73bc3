// SPDX-License-Identifier: MIT OR Apache-2.0
//! Building live subtrees from definitions.
//!
//! Definitions are applied layer by layer, most basic first. In
//! [`InstanceMode::Instance`] every value also becomes the node's revert
//! baseline. In [`InstanceMode::Edit`] the top layer is treated as the edits
//! of the opened scene: its values are applied live and only the inherited
//! layers feed the baseline. Node references are resolved once every node
//! exists, then persistent connections are made.

use crate::class::ClassDb;
use crate::connection::{Callable, ConnectFlags};
use crate::definition::{DefinitionNode, SceneDefinition};
use crate::graph::{GraphError, SceneGraph};
use crate::node::{Node, NodeId};
use crate::path::NodePath;
use crate::property::{PropertyKind, PropertyValue, Reflectable, SCRIPT_PROPERTY};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Errors while instantiating a definition
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InstantiateError {
    /// Class not registered
    #[error("Unknown node class: {0}")]
    UnknownClass(String),

    /// Script not registered
    #[error("Unknown script: {0}")]
    UnknownScript(String),

    /// Entry names a parent that does not exist yet
    #[error("Parent of {0} does not exist")]
    MissingParent(String),

    /// Definition produced no root node
    #[error("Definition {0} has no root node")]
    EmptyDefinition(String),

    /// Definition instances itself
    #[error("Definition {0} instances itself")]
    RecursiveInstance(PathBuf),

    /// Definition could not be loaded
    #[error("Failed to load {path}: {message}")]
    Source {
        /// Requested path
        path: PathBuf,
        /// Loader error
        message: String,
    },

    /// Graph operation failed
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Provider of resolved definitions for sub-instances
pub trait DefinitionSource {
    /// Load the definition at `path` with its inheritance chain resolved
    fn definition(&mut self, path: &Path) -> Result<Arc<SceneDefinition>, InstantiateError>;
}

/// How definition values are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceMode {
    /// Instanced sub-scene: every value is a baseline
    Instance,
    /// Opened scene: top-layer values are edits
    Edit,
}

/// Build a detached live subtree from `def`. On failure every node created
/// so far is freed and the graph is left as it was.
pub fn instantiate(
    graph: &mut SceneGraph,
    db: &ClassDb,
    source: &mut dyn DefinitionSource,
    def: &Arc<SceneDefinition>,
    mode: InstanceMode,
) -> Result<NodeId, InstantiateError> {
    let mut builder = Builder {
        graph,
        db,
        source,
        stack: Vec::new(),
        created: Vec::new(),
    };
    match builder.build(def, mode) {
        Ok(root) => Ok(root),
        Err(err) => {
            let created = std::mem::take(&mut builder.created);
            builder.graph.purge(&created);
            Err(err)
        }
    }
}

struct PendingReference {
    node: NodeId,
    property: String,
    path: NodePath,
    baseline: bool,
}

struct Builder<'a> {
    graph: &'a mut SceneGraph,
    db: &'a ClassDb,
    source: &'a mut dyn DefinitionSource,
    stack: Vec<PathBuf>,
    created: Vec<NodeId>,
}

impl Builder<'_> {
    fn build(&mut self, def: &Arc<SceneDefinition>, mode: InstanceMode) -> Result<NodeId, InstantiateError> {
        if let Some(path) = &def.path {
            if self.stack.contains(path) {
                return Err(InstantiateError::RecursiveInstance(path.clone()));
            }
            self.stack.push(path.clone());
        }
        let result = self.build_layers(def, mode);
        if def.path.is_some() {
            self.stack.pop();
        }
        result
    }

    fn build_layers(&mut self, def: &Arc<SceneDefinition>, mode: InstanceMode) -> Result<NodeId, InstantiateError> {
        let chain = def.chain();
        let top = chain.len() - 1;
        let mut root: Option<NodeId> = None;
        let mut pending = Vec::new();

        for (depth, layer) in chain.iter().enumerate() {
            let baseline = mode == InstanceMode::Instance || depth < top;
            for entry in &layer.nodes {
                let path = entry.path();
                let existing = match root {
                    Some(root) => self.graph.get_node_or_null(root, &path),
                    None => None,
                };
                let id = match existing {
                    Some(id) => id,
                    None => self.create(entry, &path, &mut root)?,
                };
                self.apply(id, entry, baseline, &mut pending)?;
            }
        }

        let root = root.ok_or_else(|| InstantiateError::EmptyDefinition(def.name.clone()))?;

        for reference in pending {
            let target = self.graph.get_node_or_null(reference.node, &reference.path);
            if target.is_none() {
                tracing::warn!(
                    "Unresolved reference {} -> {} in {}",
                    reference.property,
                    reference.path,
                    def.name
                );
            }
            self.graph
                .set_property(reference.node, &reference.property, PropertyValue::Node(target))?;
            if reference.baseline {
                if let Some(node) = self.graph.node_mut(reference.node) {
                    node.set_baseline(reference.property, PropertyValue::Node(target));
                }
            }
        }

        for layer in &chain {
            for conn in &layer.connections {
                let from = self.graph.get_node_or_null(root, &conn.from);
                let to = self.graph.get_node_or_null(root, &conn.to);
                let (Some(from), Some(to)) = (from, to) else {
                    tracing::warn!("Skipping connection {} -> {} in {}", conn.from, conn.to, def.name);
                    continue;
                };
                let callable = Callable::method(to, conn.method.clone());
                if self.graph.is_connected(from, &conn.signal, &callable) {
                    continue;
                }
                let flags = conn.flags | ConnectFlags::PERSIST;
                if let Err(err) = self.graph.connect(from, conn.signal.clone(), callable, flags) {
                    tracing::warn!("Skipping connection {}.{}: {}", conn.from, conn.signal, err);
                }
            }
        }

        if let Some(node) = self.graph.node_mut(root) {
            node.set_scene_file_path(def.path.clone());
            node.set_inherited_state(def.base.clone());
            if mode == InstanceMode::Instance {
                node.set_instance_state(Some(def.clone()));
            }
        }
        Ok(root)
    }

    fn create(
        &mut self,
        entry: &DefinitionNode,
        path: &NodePath,
        root: &mut Option<NodeId>,
    ) -> Result<NodeId, InstantiateError> {
        let id = if let Some(scene) = &entry.instance {
            let sub = self.source.definition(scene)?;
            let id = self.build(&sub, InstanceMode::Instance)?;
            self.graph.rename(id, &entry.name)?;
            id
        } else {
            let class_name = entry.class.as_deref().unwrap_or_default();
            let class = self
                .db
                .class(class_name)
                .ok_or_else(|| InstantiateError::UnknownClass(class_name.to_string()))?;
            let id = self.graph.insert(Node::new(class, entry.name.clone()));
            self.created.push(id);
            id
        };

        match (&entry.parent, *root) {
            (None, None) => *root = Some(id),
            (Some(parent), Some(root)) => {
                let parent = self
                    .graph
                    .get_node_or_null(root, parent)
                    .ok_or_else(|| InstantiateError::MissingParent(path.to_string()))?;
                self.graph.add_child(parent, id)?;
                self.graph.set_owner(id, Some(root))?;
            }
            _ => return Err(InstantiateError::MissingParent(path.to_string())),
        }
        Ok(id)
    }

    fn apply(
        &mut self,
        id: NodeId,
        entry: &DefinitionNode,
        baseline: bool,
        pending: &mut Vec<PendingReference>,
    ) -> Result<(), InstantiateError> {
        let Some(node) = self.graph.node_mut(id) else {
            return Ok(());
        };

        if let Some(script_path) = &entry.script {
            let script = self
                .db
                .script(script_path)
                .ok_or_else(|| InstantiateError::UnknownScript(script_path.clone()))?;
            node.set(SCRIPT_PROPERTY, PropertyValue::Script(script.clone()))
                .map_err(GraphError::from)?;
            if baseline {
                node.set_baseline(SCRIPT_PROPERTY, PropertyValue::Script(script));
            }
        }

        for (name, value) in &entry.properties {
            let Some(info) = node.property_info(name) else {
                tracing::warn!("Ignoring unknown property {} on {}", name, entry.name);
                continue;
            };
            if let (PropertyKind::NodeRef, PropertyValue::Path(path)) = (info.kind, value) {
                pending.push(PendingReference {
                    node: id,
                    property: name.clone(),
                    path: path.clone(),
                    baseline,
                });
                continue;
            }
            if let Err(err) = node.set(name, value.clone()) {
                tracing::warn!("Ignoring property {} on {}: {}", name, entry.name, err);
                continue;
            }
            if baseline {
                if let Some(applied) = node.get(name) {
                    node.set_baseline(name.clone(), applied);
                }
            }
        }

        for group in &entry.groups {
            node.add_to_group(group.clone(), true);
        }
        Ok(())
    }
}

/// Definition source that only knows a fixed set of definitions
#[derive(Debug, Default)]
pub struct StaticDefinitions {
    definitions: HashMap<PathBuf, Arc<SceneDefinition>>,
}

impl StaticDefinitions {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resolved definition under its path
    pub fn insert(&mut self, path: impl Into<PathBuf>, mut def: SceneDefinition) -> Arc<SceneDefinition> {
        let path = path.into();
        def.path = Some(path.clone());
        if let Some(base) = def.inherits.as_ref().and_then(|p| self.definitions.get(p)) {
            def.base = Some(base.clone());
        }
        let def = Arc::new(def);
        self.definitions.insert(path, def.clone());
        def
    }
}

impl DefinitionSource for StaticDefinitions {
    fn definition(&mut self, path: &Path) -> Result<Arc<SceneDefinition>, InstantiateError> {
        self.definitions
            .get(path)
            .cloned()
            .ok_or_else(|| InstantiateError::Source {
                path: path.to_path_buf(),
                message: "not registered".to_string(),
            })
    }
}
