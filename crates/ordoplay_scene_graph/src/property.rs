// SPDX-License-Identifier: MIT OR Apache-2.0
//! Property values and the reflection contract every node implements.

use crate::class::ScriptRef;
use crate::node::NodeId;
use crate::path::NodePath;
use serde::{Deserialize, Serialize};

/// Name of the property holding a node's attached script
pub const SCRIPT_PROPERTY: &str = "script";

/// Name of the property holding a spatial node's local transform
pub const TRANSFORM_PROPERTY: &str = "transform";

/// Transform component data
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Transform {
    /// Position (x, y, z)
    pub position: [f32; 3],
    /// Rotation in euler angles (degrees)
    pub rotation: [f32; 3],
    /// Scale
    pub scale: [f32; 3],
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 0.0],
            rotation: [0.0, 0.0, 0.0],
            scale: [1.0, 1.0, 1.0],
        }
    }
}

impl Transform {
    /// Identity transform moved to `position`
    pub fn from_position(position: [f32; 3]) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }
}

/// Type tag of a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyKind {
    /// No value
    Nil,
    /// Boolean
    Bool,
    /// Signed integer
    Int,
    /// Floating point
    Float,
    /// Text
    String,
    /// RGBA color
    Color,
    /// 3D vector
    Vector3,
    /// Local transform
    Transform,
    /// Reference to another live node
    NodeRef,
    /// Path to another node
    NodePath,
    /// External resource path
    Resource,
    /// Attached script
    Script,
}

/// A property value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    /// No value
    Nil,
    /// Boolean
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Floating point
    Float(f64),
    /// Text
    String(String),
    /// RGBA color (0-1)
    Color([f32; 4]),
    /// 3D vector
    Vector3([f32; 3]),
    /// Local transform
    Transform(Transform),
    /// Live node reference. Only meaningful inside one graph.
    Node(Option<NodeId>),
    /// Path to a node, relative to the node holding the property
    Path(NodePath),
    /// External resource path
    Resource(String),
    /// Attached script. Scripts are referenced by path in definitions.
    #[serde(skip)]
    Script(ScriptRef),
}

impl PropertyValue {
    /// Type tag of this value
    pub fn kind(&self) -> PropertyKind {
        match self {
            PropertyValue::Nil => PropertyKind::Nil,
            PropertyValue::Bool(_) => PropertyKind::Bool,
            PropertyValue::Int(_) => PropertyKind::Int,
            PropertyValue::Float(_) => PropertyKind::Float,
            PropertyValue::String(_) => PropertyKind::String,
            PropertyValue::Color(_) => PropertyKind::Color,
            PropertyValue::Vector3(_) => PropertyKind::Vector3,
            PropertyValue::Transform(_) => PropertyKind::Transform,
            PropertyValue::Node(_) => PropertyKind::NodeRef,
            PropertyValue::Path(_) => PropertyKind::NodePath,
            PropertyValue::Resource(_) => PropertyKind::Resource,
            PropertyValue::Script(_) => PropertyKind::Script,
        }
    }

    /// Whether this is [`PropertyValue::Nil`]
    pub fn is_nil(&self) -> bool {
        matches!(self, PropertyValue::Nil)
    }

    /// Referenced node, if this is a non-null node reference
    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            PropertyValue::Node(id) => *id,
            _ => None,
        }
    }

    /// Compare by value, with a tolerance for float components.
    pub fn differs_from(&self, other: &PropertyValue) -> bool {
        !value_eq(self, other)
    }
}

macro_rules! approx_eq {
    ($Ty:ty, $a:expr, $b:expr) => {
        float_cmp::approx_eq!($Ty, $a, $b) || $a.is_nan() && $b.is_nan()
    };
}

fn slice_eq(a: &[f32], b: &[f32]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(a, b)| approx_eq!(f32, *a, *b))
}

fn value_eq(a: &PropertyValue, b: &PropertyValue) -> bool {
    match (a, b) {
        (PropertyValue::Float(a), PropertyValue::Float(b)) => approx_eq!(f64, *a, *b),
        (PropertyValue::Color(a), PropertyValue::Color(b)) => slice_eq(a, b),
        (PropertyValue::Vector3(a), PropertyValue::Vector3(b)) => slice_eq(a, b),
        (PropertyValue::Transform(a), PropertyValue::Transform(b)) => {
            slice_eq(&a.position, &b.position)
                && slice_eq(&a.rotation, &b.rotation)
                && slice_eq(&a.scale, &b.scale)
        }
        (PropertyValue::Node(None), PropertyValue::Nil)
        | (PropertyValue::Nil, PropertyValue::Node(None)) => true,
        (a, b) => a == b,
    }
}

/// Description of one property
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyInfo {
    /// Property name
    pub name: String,
    /// Value type
    pub kind: PropertyKind,
    /// Whether the property is persisted with the scene
    pub storage: bool,
    /// Class default used as the revert value when nothing else supplies one
    pub default: Option<PropertyValue>,
}

impl PropertyInfo {
    /// A stored property with a class default
    pub fn stored(name: impl Into<String>, default: PropertyValue) -> Self {
        Self {
            name: name.into(),
            kind: default.kind(),
            storage: true,
            default: Some(default),
        }
    }

    /// A stored node reference, null by default
    pub fn node_ref(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: PropertyKind::NodeRef,
            storage: true,
            default: Some(PropertyValue::Node(None)),
        }
    }

    /// A stored property without any default
    pub fn without_default(name: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            name: name.into(),
            kind,
            storage: true,
            default: None,
        }
    }

    /// An editor-only property that is never persisted
    pub fn transient(name: impl Into<String>, default: PropertyValue) -> Self {
        Self {
            storage: false,
            ..Self::stored(name, default)
        }
    }

    /// Whether this property holds a node reference
    pub fn is_node_ref(&self) -> bool {
        self.kind == PropertyKind::NodeRef
    }

    /// Whether `value` may be assigned to this property
    pub fn accepts(&self, value: &PropertyValue) -> bool {
        let kind = value.kind();
        kind == self.kind
            || (kind == PropertyKind::Nil
                && matches!(
                    self.kind,
                    PropertyKind::NodeRef | PropertyKind::Resource | PropertyKind::Script
                ))
            || (kind == PropertyKind::Int && self.kind == PropertyKind::Float)
    }
}

/// Errors when reading or writing a property
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PropertyError {
    /// Property does not exist on this object
    #[error("Unknown property: {0}")]
    UnknownProperty(String),

    /// Value does not match the property type
    #[error("Property {name} expects {expected:?}, got {found:?}")]
    TypeMismatch {
        /// Property name
        name: String,
        /// Declared type
        expected: PropertyKind,
        /// Type of the rejected value
        found: PropertyKind,
    },
}

/// Named property access
pub trait Reflectable {
    /// Every property currently exposed, in declaration order
    fn list_properties(&self) -> Vec<PropertyInfo>;

    /// Read a property
    fn get(&self, name: &str) -> Option<PropertyValue>;

    /// Write a property
    fn set(&mut self, name: &str, value: PropertyValue) -> Result<(), PropertyError>;

    /// Look up the description of a single property
    fn property_info(&self, name: &str) -> Option<PropertyInfo> {
        self.list_properties().into_iter().find(|info| info.name == name)
    }
}
