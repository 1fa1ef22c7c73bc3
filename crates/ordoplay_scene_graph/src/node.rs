// SPDX-License-Identifier: MIT OR Apache-2.0
//! Live scene nodes.

use crate::class::{NodeClass, ScriptRef};
use crate::definition::SceneDefinition;
use crate::property::{PropertyError, PropertyInfo, PropertyKind, PropertyValue, Reflectable, SCRIPT_PROPERTY};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Unique identifier for a live node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Membership of a node in a named group
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupInfo {
    /// Group name
    pub name: String,
    /// Whether the membership is saved with the scene
    pub persistent: bool,
}

/// A vertex in the live scene graph.
///
/// Structural links (`parent`, `children`, `owner`) are ids resolved through
/// the owning [`SceneGraph`](crate::SceneGraph) and only mutated by it.
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    name: String,
    class: Arc<NodeClass>,
    script: Option<ScriptRef>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) owner: Option<NodeId>,
    properties: IndexMap<String, PropertyValue>,
    baseline: IndexMap<String, PropertyValue>,
    groups: Vec<GroupInfo>,
    scene_file_path: Option<PathBuf>,
    inherited_state: Option<Arc<SceneDefinition>>,
    instance_state: Option<Arc<SceneDefinition>>,
    /// Collapsed in the hierarchy view
    pub display_folded: bool,
    /// Children of this instance are editable in the owning scene
    pub editable_children: bool,
    /// Instance is kept as a placeholder and loaded on demand
    pub load_placeholder: bool,
}

impl Node {
    /// Create a detached node with every property at its class default
    pub fn new(class: Arc<NodeClass>, name: impl Into<String>) -> Self {
        let properties = class
            .properties
            .iter()
            .filter(|info| info.name != SCRIPT_PROPERTY)
            .map(|info| {
                (
                    info.name.clone(),
                    info.default.clone().unwrap_or(PropertyValue::Nil),
                )
            })
            .collect();

        Self {
            id: NodeId::new(),
            name: name.into(),
            class,
            script: None,
            parent: None,
            children: Vec::new(),
            owner: None,
            properties,
            baseline: IndexMap::new(),
            groups: Vec::new(),
            scene_file_path: None,
            inherited_state: None,
            instance_state: None,
            display_folded: false,
            editable_children: false,
            load_placeholder: false,
        }
    }

    /// Node ID
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Node name, unique among its siblings
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name_unchecked(&mut self, name: String) {
        self.name = name;
    }

    /// Class of this node
    pub fn class(&self) -> &Arc<NodeClass> {
        &self.class
    }

    /// Class name of this node
    pub fn class_name(&self) -> &str {
        &self.class.name
    }

    /// Attached script
    pub fn script(&self) -> Option<&ScriptRef> {
        self.script.as_ref()
    }

    /// Parent node
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Ordered children
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Node responsible for persisting this one
    pub fn owner(&self) -> Option<NodeId> {
        self.owner
    }

    /// Whether the class or the attached script defines `method`
    pub fn has_method(&self, method: &str) -> bool {
        self.class.methods.iter().any(|m| m == method)
            || self
                .script
                .as_ref()
                .is_some_and(|s| s.0.methods.iter().any(|m| m == method))
    }

    /// Whether the class declares `signal`
    pub fn has_signal(&self, signal: &str) -> bool {
        self.class.signals.iter().any(|s| s == signal)
    }

    /// Value the property reverts to: the definition-supplied baseline, or
    /// the declared default. `None` if neither exists.
    pub fn revert_value(&self, name: &str) -> Option<PropertyValue> {
        if let Some(value) = self.baseline.get(name) {
            return Some(value.clone());
        }
        self.property_info(name).and_then(|info| info.default)
    }

    /// Record the definition-supplied value of a property
    pub fn set_baseline(&mut self, name: impl Into<String>, value: PropertyValue) {
        self.baseline.insert(name.into(), value);
    }

    /// Group memberships
    pub fn groups(&self) -> &[GroupInfo] {
        &self.groups
    }

    /// Whether the node belongs to `group`
    pub fn is_in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g.name == group)
    }

    /// Join a group (idempotent)
    pub fn add_to_group(&mut self, group: impl Into<String>, persistent: bool) {
        let group = group.into();
        if !self.is_in_group(&group) {
            self.groups.push(GroupInfo {
                name: group,
                persistent,
            });
        }
    }

    /// Leave a group
    pub fn remove_from_group(&mut self, group: &str) {
        self.groups.retain(|g| g.name != group);
    }

    /// Definition this node was instantiated from, if it is an instance root
    /// or the root of an opened scene
    pub fn scene_file_path(&self) -> Option<&Path> {
        self.scene_file_path.as_deref()
    }

    /// Set the definition path
    pub fn set_scene_file_path(&mut self, path: Option<PathBuf>) {
        self.scene_file_path = path;
    }

    /// Definition this node's own definition inherits from
    pub fn inherited_state(&self) -> Option<&Arc<SceneDefinition>> {
        self.inherited_state.as_ref()
    }

    /// Set the inherited definition
    pub fn set_inherited_state(&mut self, state: Option<Arc<SceneDefinition>>) {
        self.inherited_state = state;
    }

    /// Definition this instance root was built from
    pub fn instance_state(&self) -> Option<&Arc<SceneDefinition>> {
        self.instance_state.as_ref()
    }

    /// Set the instance definition
    pub fn set_instance_state(&mut self, state: Option<Arc<SceneDefinition>>) {
        self.instance_state = state;
    }

    /// Paths of the inheritance chain, nearest base first
    pub fn inherited_paths(&self) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        let mut state = self.inherited_state.clone();
        while let Some(def) = state {
            if let Some(path) = &def.path {
                paths.push(path.clone());
            }
            state = def.base.clone();
        }
        paths
    }

    fn attach_script(&mut self, script: Option<ScriptRef>) {
        if let Some(old) = self.script.take() {
            for export in &old.0.exports {
                if self.class.property(&export.name).is_none() {
                    self.properties.shift_remove(&export.name);
                }
            }
        }
        if let Some(new) = &script {
            for export in &new.0.exports {
                self.properties
                    .entry(export.name.clone())
                    .or_insert_with(|| export.default.clone().unwrap_or(PropertyValue::Nil));
            }
        }
        self.script = script;
    }
}

impl Reflectable for Node {
    fn list_properties(&self) -> Vec<PropertyInfo> {
        let mut list = self.class.properties.clone();
        if let Some(script) = &self.script {
            for export in &script.0.exports {
                if !list.iter().any(|p| p.name == export.name) {
                    list.push(export.clone());
                }
            }
        }
        list
    }

    fn get(&self, name: &str) -> Option<PropertyValue> {
        if name == SCRIPT_PROPERTY {
            return Some(
                self.script
                    .clone()
                    .map_or(PropertyValue::Nil, PropertyValue::Script),
            );
        }
        self.properties.get(name).cloned()
    }

    fn set(&mut self, name: &str, value: PropertyValue) -> Result<(), PropertyError> {
        let info = self
            .property_info(name)
            .ok_or_else(|| PropertyError::UnknownProperty(name.to_string()))?;
        if !info.accepts(&value) {
            return Err(PropertyError::TypeMismatch {
                name: name.to_string(),
                expected: info.kind,
                found: value.kind(),
            });
        }

        match (info.kind, value) {
            (PropertyKind::Script, PropertyValue::Script(script)) => self.attach_script(Some(script)),
            (PropertyKind::Script, _) => self.attach_script(None),
            (PropertyKind::NodeRef, PropertyValue::Nil) => {
                self.properties.insert(name.to_string(), PropertyValue::Node(None));
            }
            (PropertyKind::Float, PropertyValue::Int(i)) => {
                self.properties.insert(name.to_string(), PropertyValue::Float(i as f64));
            }
            (_, value) => {
                self.properties.insert(name.to_string(), value);
            }
        }
        Ok(())
    }
}
