// SPDX-License-Identifier: MIT OR Apache-2.0
//! Property diffs against definition baselines.

use indexmap::IndexMap;
use ordoplay_scene_graph::{NodeId, PropertyValue, Reflectable, SceneGraph};
use std::collections::HashSet;

/// Property name to captured value. Node references are stored as
/// [`PropertyValue::Path`] relative to the diffed node.
pub type PropertyTable = IndexMap<String, PropertyValue>;

/// Which properties a diff considers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffMode {
    /// Every stored property
    All,
    /// Only node-reference properties
    NodeReferencesOnly,
}

/// Extracts properties whose live value differs from the revert baseline
pub struct PropertyDiffEngine<'a> {
    graph: &'a SceneGraph,
}

impl<'a> PropertyDiffEngine<'a> {
    /// Diff nodes of `graph`
    pub fn new(graph: &'a SceneGraph) -> Self {
        Self { graph }
    }

    /// Stored properties of `node` that differ from their revert value.
    /// Properties without a revert value are skipped.
    pub fn diff(&self, node: NodeId, mode: DiffMode) -> PropertyTable {
        let mut table = PropertyTable::new();
        let Some(n) = self.graph.node(node) else {
            return table;
        };

        for info in n.list_properties() {
            if !info.storage {
                continue;
            }
            let is_ref = info.is_node_ref();
            if mode == DiffMode::NodeReferencesOnly && !is_ref {
                continue;
            }
            let Some(revert) = n.revert_value(&info.name) else {
                continue;
            };
            let Some(current) = n.get(&info.name) else {
                continue;
            };
            if !current.differs_from(&revert) {
                continue;
            }

            if is_ref {
                match current.as_node() {
                    Some(target) => match self.graph.path_to(node, target) {
                        Some(path) => {
                            table.insert(info.name, PropertyValue::Path(path));
                        }
                        None => tracing::debug!("Dropping dangling reference {} on {}", info.name, n.name()),
                    },
                    None => {
                        table.insert(info.name, PropertyValue::Nil);
                    }
                }
            } else {
                table.insert(info.name, current);
            }
        }
        table
    }

    /// Node-reference properties of `node` that point into `targets`,
    /// whether or not they differ from the baseline
    pub fn references_to(&self, node: NodeId, targets: &HashSet<NodeId>) -> PropertyTable {
        let mut table = PropertyTable::new();
        let Some(n) = self.graph.node(node) else {
            return table;
        };

        for info in n.list_properties() {
            if !info.storage || !info.is_node_ref() {
                continue;
            }
            let Some(target) = n.get(&info.name).and_then(|v| v.as_node()) else {
                continue;
            };
            if !targets.contains(&target) {
                continue;
            }
            if let Some(path) = self.graph.path_to(node, target) {
                table.insert(info.name, PropertyValue::Path(path));
            }
        }
        table
    }
}
