// SPDX-License-Identifier: MIT OR Apache-2.0
//! Identity remapping after subtree replacement.
//!
//! Selection and undo entries are keyed by [`NodeId`]. When a subtree is
//! swapped for a freshly instantiated one, every old id is matched to the
//! node at the same path in the new subtree. Ids with no counterpart are
//! cleared from the tables.

use ordoplay_scene_graph::{NodeId, NodePath, SceneGraph};

/// State keyed by node identity
pub trait IdentityRemap {
    /// Replace `old` with `new`, or drop it when `new` is `None`
    fn replace_identity(&mut self, old: NodeId, new: Option<NodeId>);
}

/// Old identities of a subtree, recorded before it is replaced
#[derive(Debug, Clone, Default)]
pub struct HistoryRemapper {
    captured: Vec<(NodeId, NodePath)>,
}

impl HistoryRemapper {
    /// Record every node of the subtree under `root` with its path from `root`
    pub fn capture(graph: &SceneGraph, root: NodeId) -> Self {
        let captured = graph
            .subtree(root)
            .into_iter()
            .filter_map(|id| graph.path_to(root, id).map(|path| (id, path)))
            .collect();
        Self { captured }
    }

    /// Number of recorded identities
    pub fn len(&self) -> usize {
        self.captured.len()
    }

    /// Whether nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.captured.is_empty()
    }

    /// Repoint every recorded identity that is no longer alive to its
    /// counterpart under `new_root`. Ids that survived the swap (detached
    /// and reattached nodes) keep their entries. Returns the number of
    /// identities that found a counterpart.
    pub fn apply(&self, graph: &SceneGraph, new_root: NodeId, targets: &mut [&mut dyn IdentityRemap]) -> usize {
        let mut remapped = 0;
        for (old, path) in &self.captured {
            if graph.contains(*old) {
                continue;
            }
            let new = graph.get_node_or_null(new_root, path);
            if new.is_some() {
                remapped += 1;
            }
            for target in targets.iter_mut() {
                target.replace_identity(*old, new);
            }
        }
        tracing::debug!("Remapped {}/{} identities", remapped, self.captured.len());
        remapped
    }
}
