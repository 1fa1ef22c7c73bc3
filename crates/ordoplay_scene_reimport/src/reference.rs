// SPDX-License-Identifier: MIT OR Apache-2.0
//! References into replaced subtrees from the rest of the tab.
//!
//! Nodes outside every replaced subtree may point at nodes inside one. Those
//! links dangle once the subtree is freed, so they are captured as paths
//! from the referencing node and applied again after every replacement and
//! reattachment in the tab is done.

use crate::diff::{PropertyDiffEngine, PropertyTable};
use indexmap::{IndexMap, IndexSet};
use ordoplay_scene_graph::{NodeId, NodePath, SceneGraph};
use std::collections::HashSet;

/// Finds node-reference properties pointing into replaced subtrees
pub struct ReferenceResolver<'a> {
    graph: &'a SceneGraph,
    edited_root: NodeId,
}

impl<'a> ReferenceResolver<'a> {
    /// Scan the tab rooted at `edited_root`
    pub fn new(graph: &'a SceneGraph, edited_root: NodeId) -> Self {
        Self { graph, edited_root }
    }

    /// Referencing node path (from the edited root) to its captured
    /// references
    pub fn resolve(&self, replaced: &IndexSet<NodeId>) -> IndexMap<NodePath, PropertyTable> {
        let targets: HashSet<NodeId> = replaced
            .iter()
            .flat_map(|root| self.graph.subtree(*root))
            .collect();
        let mut out = IndexMap::new();
        if targets.is_empty() {
            return out;
        }

        let engine = PropertyDiffEngine::new(self.graph);
        let mut stack = vec![self.edited_root];
        while let Some(id) = stack.pop() {
            if replaced.contains(&id) {
                continue;
            }
            let Some(node) = self.graph.node(id) else {
                continue;
            };
            let table = engine.references_to(id, &targets);
            if !table.is_empty() {
                if let Some(path) = self.graph.path_to(self.edited_root, id) {
                    tracing::debug!("{} references into a replaced subtree from {}", table.len(), path);
                    out.insert(path, table);
                }
            }
            stack.extend(node.children().iter().rev().copied());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordoplay_scene_graph::{ClassDb, Node, PropertyValue};

    #[test]
    fn test_finds_references_outside_replaced_subtrees() {
        let db = ClassDb::with_builtins();
        let mut graph = SceneGraph::new();
        let level = graph.insert(Node::new(db.class("Node3D").unwrap(), "Level"));
        let robot = graph.insert(Node::new(db.class("Node3D").unwrap(), "Robot"));
        let skeleton = graph.insert(Node::new(db.class("Skeleton3D").unwrap(), "Skeleton"));
        let grip = graph.insert(Node::new(db.class("BoneAttachment3D").unwrap(), "Grip"));
        let inner = graph.insert(Node::new(db.class("BoneAttachment3D").unwrap(), "Inner"));
        let other = graph.insert(Node::new(db.class("Skeleton3D").unwrap(), "Other"));
        graph.add_child(level, robot).unwrap();
        graph.add_child(robot, skeleton).unwrap();
        graph.add_child(robot, inner).unwrap();
        graph.add_child(level, grip).unwrap();
        graph.add_child(level, other).unwrap();

        graph.set_property(grip, "skeleton", PropertyValue::Node(Some(skeleton))).unwrap();
        graph.set_property(inner, "skeleton", PropertyValue::Node(Some(skeleton))).unwrap();

        let resolver = ReferenceResolver::new(&graph, level);
        let refs = resolver.resolve(&IndexSet::from([robot]));
        assert_eq!(refs.len(), 1);
        assert_eq!(
            refs[&NodePath::parse("Grip")].get("skeleton"),
            Some(&PropertyValue::Path(NodePath::parse("../Robot/Skeleton")))
        );

        graph.set_property(grip, "skeleton", PropertyValue::Node(Some(other))).unwrap();
        assert!(ReferenceResolver::new(&graph, level).resolve(&IndexSet::from([robot])).is_empty());
    }
}
