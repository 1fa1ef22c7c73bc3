// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node classes and scripts.
//!
//! A [`NodeClass`] declares the stored properties, methods and signals of a
//! built-in node type. A [`ScriptClass`] extends a node at runtime: its
//! exported properties only show up once the script is attached.

use crate::property::{PropertyInfo, PropertyKind, PropertyValue, Transform, SCRIPT_PROPERTY, TRANSFORM_PROPERTY};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Editor-side cache a node class must refresh after its scene is reimported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReimportHook {
    /// Nothing cached
    #[default]
    None,
    /// Cached bind poses are stale and must be rebuilt
    ResetPoseCache,
    /// Bone bindings must be resolved again
    RequireRebind,
}

/// A built-in node type
#[derive(Debug, Clone)]
pub struct NodeClass {
    /// Class name
    pub name: String,
    /// Declared properties
    pub properties: Vec<PropertyInfo>,
    /// Callable methods
    pub methods: Vec<String>,
    /// Emitted signals
    pub signals: Vec<String>,
    /// Cache refresh required after reimport
    pub reimport_hook: ReimportHook,
}

impl NodeClass {
    /// Create a class with no members
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
            methods: Vec::new(),
            signals: Vec::new(),
            reimport_hook: ReimportHook::None,
        }
    }

    /// Create a class inheriting every member of `base`
    pub fn derived(name: impl Into<String>, base: &NodeClass) -> Self {
        Self {
            name: name.into(),
            ..base.clone()
        }
    }

    /// Add a property, replacing any inherited one of the same name
    pub fn with_property(mut self, info: PropertyInfo) -> Self {
        self.properties.retain(|p| p.name != info.name);
        self.properties.push(info);
        self
    }

    /// Add a method
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.methods.push(method.into());
        self
    }

    /// Add a signal
    pub fn with_signal(mut self, signal: impl Into<String>) -> Self {
        self.signals.push(signal.into());
        self
    }

    /// Set the reimport hook
    pub fn with_reimport_hook(mut self, hook: ReimportHook) -> Self {
        self.reimport_hook = hook;
        self
    }

    /// Find a declared property
    pub fn property(&self, name: &str) -> Option<&PropertyInfo> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// A script that can be attached to a node
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptClass {
    /// Resource path of the script
    pub path: String,
    /// Exported properties
    pub exports: Vec<PropertyInfo>,
    /// Methods defined by the script
    pub methods: Vec<String>,
}

impl ScriptClass {
    /// Create an empty script
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            exports: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Add an exported property
    pub fn with_export(mut self, info: PropertyInfo) -> Self {
        self.exports.push(info);
        self
    }

    /// Add a method
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.methods.push(method.into());
        self
    }
}

/// Shared handle to a script, compared by path
#[derive(Clone)]
pub struct ScriptRef(pub Arc<ScriptClass>);

impl ScriptRef {
    /// Wrap a script
    pub fn new(script: ScriptClass) -> Self {
        Self(Arc::new(script))
    }

    /// Resource path of the script
    pub fn path(&self) -> &str {
        &self.0.path
    }
}

impl PartialEq for ScriptRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.path == other.0.path
    }
}

impl fmt::Debug for ScriptRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ScriptRef").field(&self.0.path).finish()
    }
}

/// Registry of node classes and scripts
#[derive(Debug, Clone, Default)]
pub struct ClassDb {
    classes: HashMap<String, Arc<NodeClass>>,
    scripts: HashMap<String, ScriptRef>,
}

impl ClassDb {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in node classes
    pub fn with_builtins() -> Self {
        let mut db = Self::new();

        let node = NodeClass::new("Node")
            .with_property(PropertyInfo {
                name: SCRIPT_PROPERTY.to_string(),
                kind: PropertyKind::Script,
                storage: true,
                default: Some(PropertyValue::Nil),
            })
            .with_property(PropertyInfo::stored("process_mode", PropertyValue::Int(0)))
            .with_property(PropertyInfo::stored(
                "editor_description",
                PropertyValue::String(String::new()),
            ))
            .with_method("queue_free")
            .with_method("set_name")
            .with_signal("ready")
            .with_signal("renamed")
            .with_signal("tree_exiting");

        let node_2d = NodeClass::derived("Node2D", &node)
            .with_property(PropertyInfo::stored(
                TRANSFORM_PROPERTY,
                PropertyValue::Transform(Transform::default()),
            ))
            .with_property(PropertyInfo::stored("visible", PropertyValue::Bool(true)))
            .with_property(PropertyInfo::stored(
                "modulate",
                PropertyValue::Color([1.0, 1.0, 1.0, 1.0]),
            ))
            .with_method("show")
            .with_method("hide")
            .with_signal("visibility_changed");

        let node_3d = NodeClass::derived("Node3D", &node)
            .with_property(PropertyInfo::stored(
                TRANSFORM_PROPERTY,
                PropertyValue::Transform(Transform::default()),
            ))
            .with_property(PropertyInfo::stored("visible", PropertyValue::Bool(true)))
            .with_method("show")
            .with_method("hide")
            .with_signal("visibility_changed");

        let label = NodeClass::derived("Label", &node_2d)
            .with_property(PropertyInfo::stored("text", PropertyValue::String(String::new())))
            .with_property(PropertyInfo::stored(
                "font_color",
                PropertyValue::Color([1.0, 1.0, 1.0, 1.0]),
            ))
            .with_method("set_text")
            .with_signal("meta_clicked");

        let mesh_instance = NodeClass::derived("MeshInstance3D", &node_3d)
            .with_property(PropertyInfo::stored("mesh", PropertyValue::Resource(String::new())))
            .with_property(PropertyInfo::stored(
                "color",
                PropertyValue::Color([1.0, 1.0, 1.0, 1.0]),
            ))
            .with_property(PropertyInfo::node_ref("skeleton"))
            .with_property(PropertyInfo::stored("cast_shadows", PropertyValue::Bool(true)));

        let skeleton = NodeClass::derived("Skeleton3D", &node_3d)
            .with_property(PropertyInfo::stored("bone_count", PropertyValue::Int(0)))
            .with_property(PropertyInfo::transient("bind_pose_cached", PropertyValue::Bool(false)))
            .with_method("reset_bone_poses")
            .with_signal("pose_updated")
            .with_reimport_hook(ReimportHook::ResetPoseCache);

        let attachment = NodeClass::derived("BoneAttachment3D", &node_3d)
            .with_property(PropertyInfo::node_ref("skeleton"))
            .with_property(PropertyInfo::stored("bone_name", PropertyValue::String(String::new())))
            .with_property(PropertyInfo::transient("rebind_required", PropertyValue::Bool(false)))
            .with_method("notify_rebind_required")
            .with_reimport_hook(ReimportHook::RequireRebind);

        for class in [node, node_2d, node_3d, label, mesh_instance, skeleton, attachment] {
            db.register_class(class);
        }
        db
    }

    /// Register or replace a node class
    pub fn register_class(&mut self, class: NodeClass) {
        self.classes.insert(class.name.clone(), Arc::new(class));
    }

    /// Register or replace a script
    pub fn register_script(&mut self, script: ScriptClass) {
        self.scripts.insert(script.path.clone(), ScriptRef::new(script));
    }

    /// Look up a node class
    pub fn class(&self, name: &str) -> Option<Arc<NodeClass>> {
        self.classes.get(name).cloned()
    }

    /// Look up a script
    pub fn script(&self, path: &str) -> Option<ScriptRef> {
        self.scripts.get(path).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_inherit_members() {
        let db = ClassDb::with_builtins();
        let label = db.class("Label").unwrap();
        assert!(label.property(TRANSFORM_PROPERTY).is_some());
        assert!(label.property("text").is_some());
        assert_eq!(label.property(SCRIPT_PROPERTY).unwrap().kind, PropertyKind::Script);
        assert!(label.methods.iter().any(|m| m == "queue_free"));
    }

    #[test]
    fn test_reimport_hooks() {
        let db = ClassDb::with_builtins();
        assert_eq!(db.class("Skeleton3D").unwrap().reimport_hook, ReimportHook::ResetPoseCache);
        assert_eq!(db.class("BoneAttachment3D").unwrap().reimport_hook, ReimportHook::RequireRebind);
        assert_eq!(db.class("Node3D").unwrap().reimport_hook, ReimportHook::None);
    }

    #[test]
    fn test_script_ref_equality() {
        let a = ScriptRef::new(ScriptClass::new("res://player.gd"));
        let b = ScriptRef::new(ScriptClass::new("res://player.gd").with_method("jump"));
        assert_eq!(a, b);
        assert_ne!(a, ScriptRef::new(ScriptClass::new("res://enemy.gd")));
    }
}
