// SPDX-License-Identifier: MIT OR Apache-2.0
//! Structural-change notifications after a reimport.

use ordoplay_scene_graph::{NodeId, PropertyValue, ReimportHook, SceneGraph};

/// A tab whose instances were replaced
#[derive(Debug, Clone, PartialEq)]
pub struct StructuralChange {
    /// Tab index
    pub tab: usize,
    /// Tab root after reconciliation
    pub root: NodeId,
    /// Roots of the replacement subtrees
    pub replaced: Vec<NodeId>,
}

/// Callback type for structural-change notifications
pub type ChangeCallback = Box<dyn Fn(&StructuralChange) + Send + Sync>;

/// Subscribers to structural changes
#[derive(Default)]
pub struct ChangeListeners {
    callbacks: Vec<ChangeCallback>,
}

impl ChangeListeners {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback
    pub fn subscribe(&mut self, callback: ChangeCallback) {
        self.callbacks.push(callback);
    }

    /// Number of registered callbacks
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    /// Whether nobody listens
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Deliver a change to every subscriber
    pub fn emit(&self, change: &StructuralChange) {
        for callback in &self.callbacks {
            callback(change);
        }
    }
}

impl std::fmt::Debug for ChangeListeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeListeners")
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

/// Invalidate reimport-sensitive caches under every root: bind poses are
/// marked stale and bone attachments are flagged for rebinding. Returns the
/// number of nodes touched.
pub fn notify_scene_reimported(graph: &mut SceneGraph, roots: &[NodeId]) -> usize {
    let mut touched = 0;
    for root in roots {
        for id in graph.subtree(*root) {
            let hook = match graph.node(id) {
                Some(node) => node.class().reimport_hook,
                None => continue,
            };
            let result = match hook {
                ReimportHook::None => continue,
                ReimportHook::ResetPoseCache => graph.set_property(id, "bind_pose_cached", PropertyValue::Bool(false)),
                ReimportHook::RequireRebind => graph.set_property(id, "rebind_required", PropertyValue::Bool(true)),
            };
            match result {
                Ok(()) => touched += 1,
                Err(err) => tracing::debug!("Reimport hook on {} skipped: {}", id, err),
            }
        }
    }
    tracing::debug!("Refreshed {} reimport-sensitive nodes", touched);
    touched
}
