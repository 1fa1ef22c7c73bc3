// SPDX-License-Identifier: MIT OR Apache-2.0
//! Capturing editor-side changes of a subtree before it is replaced.
//!
//! Every node under the replaced root is classified as either *base*
//! (derivable from the definition chain) or *additive* (added in the editor).
//! Base nodes contribute a [`ModificationEntry`] keyed by their path from
//! the replaced root. Additive nodes owned by the edited root are detached
//! whole and recorded as [`AdditiveNodeEntry`] values.

use crate::diff::{DiffMode, PropertyDiffEngine, PropertyTable};
use crate::survey::{ConnectionSurveyor, IncomingConnection, OutgoingConnection};
use indexmap::IndexMap;
use ordoplay_scene_graph::property::TRANSFORM_PROPERTY;
use ordoplay_scene_graph::{GroupInfo, NodeId, NodePath, PropertyValue, Reflectable, SceneGraph, Transform};

/// Captured state of one base node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModificationEntry {
    /// Properties differing from the definition
    pub properties: PropertyTable,
    /// Connections emitted by the node
    pub outgoing: Vec<OutgoingConnection>,
    /// Connections into the node from outside the replaced instance
    pub incoming: Vec<IncomingConnection>,
    /// Group memberships
    pub groups: Vec<GroupInfo>,
}

impl ModificationEntry {
    /// Whether there is nothing to restore
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
            && self.outgoing.is_empty()
            && self.incoming.is_empty()
            && self.groups.is_empty()
    }
}

/// An editor-added node, detached during replacement and reattached after
#[derive(Debug, Clone, PartialEq)]
pub struct AdditiveNodeEntry {
    /// The detached node, kept alive in the arena
    pub node: NodeId,
    /// Parent path relative to the replaced root
    pub parent_path: NodePath,
    /// Owner at capture time
    pub owner: NodeId,
    /// Position among its siblings
    pub index: usize,
    /// Local transform at capture time, for spatial nodes
    pub transform: Option<Transform>,
}

/// Everything needed to restore a replaced subtree. Built right before the
/// reload and consumed by it.
#[derive(Debug, Clone, Default)]
pub struct ModificationTable {
    /// Base-node entries keyed by path from the replaced root
    pub modifications: IndexMap<NodePath, ModificationEntry>,
    /// Additive nodes in capture order (parents before children)
    pub additions: Vec<AdditiveNodeEntry>,
    /// Node references held by additive nodes, keyed by path from the
    /// replaced root. Applied once additions are back in place.
    pub additive_references: IndexMap<NodePath, PropertyTable>,
}

impl ModificationTable {
    /// Whether the table restores nothing
    pub fn is_empty(&self) -> bool {
        self.modifications.is_empty() && self.additions.is_empty() && self.additive_references.is_empty()
    }
}

/// Whether `node` was added in the editor rather than coming from the
/// definitions behind `replaced_root`.
///
/// A node matching a path of the edited root's inherited definitions is
/// part of that base unless the edited root owns it directly, since then it
/// was added over the base. Anything owned (transitively) by a nested
/// instance is base content of that instance.
pub fn is_additive_node(graph: &SceneGraph, edited_root: NodeId, replaced_root: NodeId, node: NodeId) -> bool {
    if node == replaced_root {
        return false;
    }
    let owner = graph.node(node).and_then(|n| n.owner());

    if node != edited_root {
        let inherited = graph.node(edited_root).and_then(|n| n.inherited_state());
        if let (Some(state), Some(path)) = (inherited, graph.path_to(edited_root, node)) {
            let part_of_base = state.has_node_path(&path)
                && (owner != Some(edited_root) || replaced_root == edited_root);
            if part_of_base {
                return false;
            }
        }
    }

    !(replaced_root != edited_root && graph.owner_chain_reaches(node, replaced_root))
}

/// Walks a subtree and builds its [`ModificationTable`]
pub struct ModificationTableBuilder<'a> {
    graph: &'a SceneGraph,
    edited_root: NodeId,
    replaced_root: NodeId,
}

impl<'a> ModificationTableBuilder<'a> {
    /// Prepare to capture `replaced_root`, which lives in the tab rooted at
    /// `edited_root`
    pub fn new(graph: &'a SceneGraph, edited_root: NodeId, replaced_root: NodeId) -> Self {
        Self {
            graph,
            edited_root,
            replaced_root,
        }
    }

    /// Capture the subtree
    pub fn build(&self) -> ModificationTable {
        let mut table = ModificationTable::default();
        self.visit(self.replaced_root, &mut table);
        tracing::debug!(
            "Captured {} modified nodes and {} additions",
            table.modifications.len(),
            table.additions.len()
        );
        table
    }

    fn visit(&self, node: NodeId, table: &mut ModificationTable) {
        let Some(n) = self.graph.node(node) else {
            return;
        };
        let diff = PropertyDiffEngine::new(self.graph);

        if is_additive_node(self.graph, self.edited_root, self.replaced_root, node) {
            match n.owner() {
                Some(owner) => {
                    if owner == self.edited_root {
                        if let Some(entry) = self.additive_entry(node, owner) {
                            table.additions.push(entry);
                        }
                    }
                    let references = diff.diff(node, DiffMode::NodeReferencesOnly);
                    if !references.is_empty() {
                        if let Some(path) = self.graph.path_to(self.replaced_root, node) {
                            table.additive_references.insert(path, references);
                        }
                    }
                }
                None => tracing::debug!("Not preserving ownerless node {}", n.name()),
            }
        } else if let Some(path) = self.graph.path_to(self.replaced_root, node) {
            let surveyor = ConnectionSurveyor::new(self.graph);
            let entry = ModificationEntry {
                properties: diff.diff(node, DiffMode::All),
                outgoing: surveyor.outgoing(node),
                incoming: surveyor.incoming(node, self.replaced_root),
                groups: n.groups().to_vec(),
            };
            if !entry.is_empty() {
                table.modifications.insert(path, entry);
            }
        }

        for child in n.children() {
            self.visit(*child, table);
        }
    }

    fn additive_entry(&self, node: NodeId, owner: NodeId) -> Option<AdditiveNodeEntry> {
        let n = self.graph.node(node)?;
        let parent = n.parent()?;
        let parent_path = self.graph.path_to(self.replaced_root, parent)?;
        let transform = match n.get(TRANSFORM_PROPERTY) {
            Some(PropertyValue::Transform(t)) => Some(t),
            _ => None,
        };
        Some(AdditiveNodeEntry {
            node,
            parent_path,
            owner,
            index: self.graph.index_in_parent(node)?,
            transform,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordoplay_scene_graph::{
        instantiate, Callable, ClassDb, ConnectFlags, DefinitionNode, InstanceMode, Node, SceneDefinition,
        StaticDefinitions,
    };

    struct Fixture {
        graph: SceneGraph,
        db: ClassDb,
        level: NodeId,
        robot: NodeId,
    }

    fn fixture() -> Fixture {
        let db = ClassDb::with_builtins();
        let mut graph = SceneGraph::new();
        let mut defs = StaticDefinitions::new();
        defs.insert(
            "robot.scn",
            SceneDefinition::new("Robot")
                .with_node(DefinitionNode::root("Robot", "Node3D"))
                .with_node(DefinitionNode::child(".", "Skeleton", "Skeleton3D"))
                .with_node(DefinitionNode::child("Skeleton", "Arm", "Node3D"))
                .with_node(DefinitionNode::child(".", "Mesh", "MeshInstance3D").with_group("renderable")),
        );
        let level = defs.insert(
            "level.scn",
            SceneDefinition::new("Level")
                .with_node(DefinitionNode::root("Level", "Node3D"))
                .with_node(DefinitionNode::instance(".", "Robot", "robot.scn")),
        );
        let level = instantiate(&mut graph, &db, &mut defs, &level, InstanceMode::Edit).unwrap();
        let robot = graph.get_node_or_null(level, &NodePath::parse("Robot")).unwrap();
        Fixture {
            graph,
            db,
            level,
            robot,
        }
    }

    fn add(f: &mut Fixture, parent: NodeId, class: &str, name: &str, owner: Option<NodeId>) -> NodeId {
        let id = f.graph.insert(Node::new(f.db.class(class).unwrap(), name));
        f.graph.add_child(parent, id).unwrap();
        f.graph.set_owner(id, owner).unwrap();
        id
    }

    #[test]
    fn test_classification() {
        let mut f = fixture();
        let arm = f.graph.get_node_or_null(f.robot, &NodePath::parse("Skeleton/Arm")).unwrap();
        let (level, robot) = (f.level, f.robot);
        let hat = add(&mut f, arm, "Node3D", "Hat", Some(level));
        let scratch = add(&mut f, robot, "Node3D", "Scratch", None);

        assert!(!is_additive_node(&f.graph, f.level, f.robot, f.robot));
        assert!(!is_additive_node(&f.graph, f.level, f.robot, arm));
        assert!(is_additive_node(&f.graph, f.level, f.robot, hat));
        assert!(is_additive_node(&f.graph, f.level, f.robot, scratch));
    }

    #[test]
    fn test_unmodified_instance_captures_only_groups() {
        let f = fixture();
        let table = ModificationTableBuilder::new(&f.graph, f.level, f.robot).build();
        assert!(table.additions.is_empty());
        assert_eq!(table.modifications.len(), 1);
        let mesh = &table.modifications[&NodePath::parse("Mesh")];
        assert_eq!(mesh.groups[0].name, "renderable");
        assert!(mesh.properties.is_empty());
    }

    #[test]
    fn test_captures_additions_and_modifications() {
        let mut f = fixture();
        let (level, robot) = (f.level, f.robot);
        let arm = f.graph.get_node_or_null(f.robot, &NodePath::parse("Skeleton/Arm")).unwrap();
        let mesh = f.graph.get_node_or_null(f.robot, &NodePath::parse("Mesh")).unwrap();
        f.graph
            .set_property(mesh, "color", PropertyValue::Color([1.0, 0.0, 0.0, 1.0]))
            .unwrap();
        let hat = add(&mut f, arm, "Node3D", "Hat", Some(level));
        let hat_transform = Transform::from_position([0.0, 2.0, 0.0]);
        f.graph
            .set_property(hat, TRANSFORM_PROPERTY, PropertyValue::Transform(hat_transform))
            .unwrap();
        let tag = add(&mut f, hat, "Node", "Tag", Some(level));
        let attachment = add(&mut f, robot, "BoneAttachment3D", "Grip", Some(level));
        let skeleton = f.graph.get_node_or_null(f.robot, &NodePath::parse("Skeleton")).unwrap();
        f.graph
            .set_property(attachment, "skeleton", PropertyValue::Node(Some(skeleton)))
            .unwrap();
        add(&mut f, robot, "Node3D", "Scratch", None);

        let table = ModificationTableBuilder::new(&f.graph, f.level, f.robot).build();

        let mesh_entry = &table.modifications[&NodePath::parse("Mesh")];
        assert_eq!(
            mesh_entry.properties.get("color"),
            Some(&PropertyValue::Color([1.0, 0.0, 0.0, 1.0]))
        );

        let added: Vec<_> = table.additions.iter().map(|a| a.node).collect();
        assert_eq!(added, vec![hat, tag, attachment]);
        assert_eq!(table.additions[0].parent_path, NodePath::parse("Skeleton/Arm"));
        assert_eq!(table.additions[0].transform, Some(hat_transform));
        assert_eq!(table.additions[1].parent_path, NodePath::parse("Skeleton/Arm/Hat"));
        assert_eq!(table.additions[1].transform, None);
        assert_eq!(table.additions[2].index, 2);

        let refs = &table.additive_references[&NodePath::parse("Grip")];
        assert_eq!(refs.get("skeleton"), Some(&PropertyValue::Path(NodePath::parse("../Skeleton"))));

        for path in table.modifications.keys() {
            assert!(!path.names().iter().any(|n| n == "Hat" || n == "Grip" || n == "Scratch"));
        }
    }

    #[test]
    fn test_connections_are_captured_on_base_nodes() {
        let mut f = fixture();
        let level = f.level;
        let mesh = f.graph.get_node_or_null(f.robot, &NodePath::parse("Mesh")).unwrap();
        let label = add(&mut f, level, "Label", "Status", Some(level));
        f.graph
            .connect(label, "meta_clicked", Callable::method(mesh, "hide"), ConnectFlags::PERSIST)
            .unwrap();
        f.graph
            .connect(
                label,
                "meta_clicked",
                Callable::Custom {
                    target: Some(mesh),
                    label: "lambda".to_string(),
                },
                ConnectFlags::NONE,
            )
            .unwrap();

        let table = ModificationTableBuilder::new(&f.graph, f.level, f.robot).build();
        let entry = &table.modifications[&NodePath::parse("Mesh")];
        assert_eq!(entry.incoming.len(), 1);
        assert_eq!(entry.incoming[0].source, label);
        for entry in table.modifications.values() {
            assert!(entry.incoming.iter().all(|c| !c.method.is_empty()));
        }
    }

    #[test]
    fn test_inherited_tab_root() {
        let db = ClassDb::with_builtins();
        let mut graph = SceneGraph::new();
        let mut defs = StaticDefinitions::new();
        defs.insert(
            "base.scn",
            SceneDefinition::new("Base")
                .with_node(DefinitionNode::root("Base", "Node3D"))
                .with_node(DefinitionNode::child(".", "Body", "MeshInstance3D")),
        );
        let child = defs.insert(
            "child.scn",
            SceneDefinition::new("Child")
                .inheriting("base.scn")
                .with_node(DefinitionNode::child(".", "Extra", "Node3D")),
        );
        let root = instantiate(&mut graph, &db, &mut defs, &child, InstanceMode::Edit).unwrap();
        let body = graph.get_node_or_null(root, &NodePath::parse("Body")).unwrap();
        let extra = graph.get_node_or_null(root, &NodePath::parse("Extra")).unwrap();

        assert!(!is_additive_node(&graph, root, root, body));
        assert!(is_additive_node(&graph, root, root, extra));

        let table = ModificationTableBuilder::new(&graph, root, root).build();
        assert_eq!(table.additions.len(), 1);
        assert_eq!(table.additions[0].node, extra);
        assert_eq!(table.additions[0].parent_path, NodePath::current());
    }
}
