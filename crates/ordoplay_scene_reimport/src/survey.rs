// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection surveys.
//!
//! Runtime-assembled (custom) handlers are never captured: they cannot be
//! rebuilt from a method name, so they do not survive a reload.

use ordoplay_scene_graph::{ConnectFlags, NodeId, NodePath, SceneGraph};

/// A connection emitted by the surveyed node
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingConnection {
    /// Signal name
    pub signal: String,
    /// Handler node, relative to the surveyed node
    pub target_path: NodePath,
    /// Handler node at capture time
    pub target: NodeId,
    /// Handler method
    pub method: String,
    /// Connection flags
    pub flags: ConnectFlags,
}

/// A connection whose handler is the surveyed node
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingConnection {
    /// Emitting node
    pub source: NodeId,
    /// Signal name
    pub signal: String,
    /// Handler method on the surveyed node
    pub method: String,
    /// Connection flags
    pub flags: ConnectFlags,
}

/// Lists reproducible connections of a node
pub struct ConnectionSurveyor<'a> {
    graph: &'a SceneGraph,
}

impl<'a> ConnectionSurveyor<'a> {
    /// Survey connections of `graph`
    pub fn new(graph: &'a SceneGraph) -> Self {
        Self { graph }
    }

    /// Connections emitted by `node` to method handlers in the same tree
    pub fn outgoing(&self, node: NodeId) -> Vec<OutgoingConnection> {
        self.graph
            .outgoing(node)
            .filter_map(|conn| {
                let method = conn.callable.method_name()?;
                let target = conn.callable.target()?;
                let target_path = self.graph.path_to(node, target)?;
                Some(OutgoingConnection {
                    signal: conn.signal.clone(),
                    target_path,
                    target,
                    method: method.to_string(),
                    flags: conn.flags,
                })
            })
            .collect()
    }

    /// Connections into `node` from sources outside `replaced_root`'s
    /// ownership. Connections from inside are recreated by the definition.
    pub fn incoming(&self, node: NodeId, replaced_root: NodeId) -> Vec<IncomingConnection> {
        self.graph
            .incoming(node)
            .filter(|conn| {
                conn.source != replaced_root
                    && !self.graph.owner_chain_reaches(conn.source, replaced_root)
            })
            .filter_map(|conn| {
                Some(IncomingConnection {
                    source: conn.source,
                    signal: conn.signal.clone(),
                    method: conn.callable.method_name()?.to_string(),
                    flags: conn.flags,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordoplay_scene_graph::{Callable, ClassDb, Node};

    struct Fixture {
        graph: SceneGraph,
        root: NodeId,
        button: NodeId,
        panel: NodeId,
        outside: NodeId,
    }

    fn fixture() -> Fixture {
        let db = ClassDb::with_builtins();
        let mut graph = SceneGraph::new();
        let level = graph.insert(Node::new(db.class("Node").unwrap(), "Level"));
        let root = graph.insert(Node::new(db.class("Node2D").unwrap(), "Menu"));
        let button = graph.insert(Node::new(db.class("Label").unwrap(), "Button"));
        let panel = graph.insert(Node::new(db.class("Node2D").unwrap(), "Panel"));
        let outside = graph.insert(Node::new(db.class("Label").unwrap(), "Outside"));
        graph.add_child(level, root).unwrap();
        graph.add_child(root, button).unwrap();
        graph.add_child(root, panel).unwrap();
        graph.add_child(level, outside).unwrap();
        graph.set_owner(root, Some(level)).unwrap();
        graph.set_owner(button, Some(root)).unwrap();
        graph.set_owner(panel, Some(root)).unwrap();
        graph.set_owner(outside, Some(level)).unwrap();
        Fixture {
            graph,
            root,
            button,
            panel,
            outside,
        }
    }

    #[test]
    fn test_outgoing_records_target_path() {
        let mut f = fixture();
        f.graph
            .connect(f.button, "meta_clicked", Callable::method(f.panel, "show"), ConnectFlags::PERSIST)
            .unwrap();
        let out = ConnectionSurveyor::new(&f.graph).outgoing(f.button);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].target_path.to_string(), "../Panel");
        assert_eq!(out[0].method, "show");
        assert!(out[0].flags.contains(ConnectFlags::PERSIST));
    }

    #[test]
    fn test_custom_callables_are_dropped() {
        let mut f = fixture();
        let custom = Callable::Custom {
            target: Some(f.panel),
            label: "bound(show, 3)".to_string(),
        };
        f.graph.connect(f.button, "meta_clicked", custom, ConnectFlags::PERSIST).unwrap();
        let lambda = Callable::Custom {
            target: Some(f.panel),
            label: "lambda".to_string(),
        };
        f.graph.connect(f.outside, "meta_clicked", lambda, ConnectFlags::NONE).unwrap();

        let surveyor = ConnectionSurveyor::new(&f.graph);
        assert!(surveyor.outgoing(f.button).is_empty());
        assert!(surveyor.incoming(f.panel, f.root).is_empty());
    }

    #[test]
    fn test_incoming_skips_internal_sources() {
        let mut f = fixture();
        f.graph
            .connect(f.button, "meta_clicked", Callable::method(f.panel, "show"), ConnectFlags::PERSIST)
            .unwrap();
        f.graph
            .connect(f.root, "visibility_changed", Callable::method(f.panel, "hide"), ConnectFlags::PERSIST)
            .unwrap();
        f.graph
            .connect(f.outside, "meta_clicked", Callable::method(f.panel, "hide"), ConnectFlags::PERSIST)
            .unwrap();

        let incoming = ConnectionSurveyor::new(&f.graph).incoming(f.panel, f.root);
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].source, f.outside);
        assert_eq!(incoming[0].method, "hide");
    }
}
