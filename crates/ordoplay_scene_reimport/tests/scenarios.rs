// SPDX-License-Identifier: MIT OR Apache-2.0
//! End-to-end reimport scenarios over an in-memory project.

use ordoplay_scene_graph::property::TRANSFORM_PROPERTY;
use ordoplay_scene_graph::{
    Callable, ClassDb, ConnectFlags, DefinitionNode, Node, NodeId, NodePath, PropertyValue, Reflectable,
    SceneDefinition, Transform,
};
use ordoplay_scene_reimport::{
    analyze, DiffMode, MemorySceneLoader, PropertyDiffEngine, ReimportConfig, ReimportError, TreeOutcome, Workspace,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const RED: PropertyValue = PropertyValue::Color([1.0, 0.0, 0.0, 1.0]);
const WHITE: PropertyValue = PropertyValue::Color([1.0, 1.0, 1.0, 1.0]);

fn robot_with_mesh(class: &str) -> SceneDefinition {
    SceneDefinition::new("Robot")
        .with_node(DefinitionNode::root("Robot", "Node3D"))
        .with_node(DefinitionNode::child(".", "Skeleton", "Skeleton3D"))
        .with_node(DefinitionNode::child(".", "Mesh", class).with_group("Meshes"))
}

fn robot() -> SceneDefinition {
    robot_with_mesh("MeshInstance3D")
}

fn level() -> SceneDefinition {
    SceneDefinition::new("Level")
        .with_node(DefinitionNode::root("Level", "Node3D"))
        .with_node(DefinitionNode::instance(".", "Robot", "robot.scn"))
        .with_node(DefinitionNode::child(".", "Switch", "Node3D"))
}

fn project() -> MemorySceneLoader {
    let loader = MemorySceneLoader::new();
    loader.insert("robot.scn", &robot()).unwrap();
    loader.insert("level.scn", &level()).unwrap();
    loader
}

fn open(loader: &MemorySceneLoader, scenes: &[&str]) -> Workspace {
    let mut ws = Workspace::new(ClassDb::with_builtins(), ReimportConfig::default());
    for scene in scenes {
        ws.open_scene(loader, *scene).unwrap();
    }
    ws
}

fn robot_path() -> Vec<PathBuf> {
    vec![PathBuf::from("robot.scn")]
}

fn node_at(ws: &Workspace, tab: usize, path: &str) -> NodeId {
    let root = ws.tab(tab).unwrap().root;
    ws.graph()
        .get_node_or_null(root, &NodePath::parse(path))
        .unwrap_or_else(|| panic!("{path} not found"))
}

fn add_node(ws: &mut Workspace, parent: NodeId, owner: NodeId, class: &str, name: &str) -> NodeId {
    let class = ws.db().class(class).unwrap();
    let graph = ws.graph_mut();
    let id = graph.insert(Node::new(class, name));
    graph.add_child(parent, id).unwrap();
    graph.set_owner(id, Some(owner)).unwrap();
    id
}

fn get(ws: &Workspace, node: NodeId, name: &str) -> PropertyValue {
    ws.graph().node(node).unwrap().get(name).unwrap()
}

/// Stored properties, groups, child order and connections of a tab, with
/// every node written as its path so snapshots compare across identities
fn snapshot(ws: &Workspace, tab: usize) -> Vec<String> {
    let graph = ws.graph();
    let root = ws.tab(tab).unwrap().root;
    let path_of = |id: NodeId| graph.path_to(root, id).map(|p| p.to_string());
    let mut lines = Vec::new();

    for id in graph.subtree(root) {
        let node = graph.node(id).unwrap();
        let path = path_of(id).unwrap();
        lines.push(format!("{path} {} #{:?}", node.class_name(), graph.index_in_parent(id)));
        for info in node.list_properties().into_iter().filter(|i| i.storage) {
            let value = match node.get(&info.name) {
                Some(PropertyValue::Node(Some(target))) => format!("-> {:?}", path_of(target)),
                other => format!("{other:?}"),
            };
            lines.push(format!("{path} {} = {value}", info.name));
        }
        for group in node.groups() {
            lines.push(format!("{path} in {}", group.name));
        }
        for conn in graph.outgoing(id) {
            let target = conn.callable.target().and_then(&path_of);
            lines.push(format!(
                "{path} {} -> {:?}.{:?}",
                conn.signal,
                target,
                conn.callable.method_name()
            ));
        }
    }
    lines.sort();
    lines
}

#[test]
fn added_label_survives_reimport_with_its_connection() {
    let loader = project();
    let mut ws = open(&loader, &["level.scn"]);
    let root = ws.tab(0).unwrap().root;
    let robot = node_at(&ws, 0, "Robot");
    let mesh = node_at(&ws, 0, "Robot/Mesh");

    let label = add_node(&mut ws, robot, root, "Label", "Tag");
    let placed = Transform::from_position([1.0, 2.0, 3.0]);
    let graph = ws.graph_mut();
    graph.set_property(label, "text", PropertyValue::String("Hello".into())).unwrap();
    graph.set_property(label, TRANSFORM_PROPERTY, PropertyValue::Transform(placed)).unwrap();
    graph
        .connect(label, "meta_clicked", Callable::method(mesh, "hide"), ConnectFlags::PERSIST)
        .unwrap();
    assert_eq!(ws.graph().index_in_parent(label), Some(2));

    let report = ws.reconcile(&loader, &robot_path());
    assert_eq!(report.reconciled(), 1);

    let new_robot = node_at(&ws, 0, "Robot");
    assert_ne!(new_robot, robot);
    assert!(!ws.graph().contains(mesh));

    let tag = node_at(&ws, 0, "Robot/Tag");
    assert_eq!(ws.graph().index_in_parent(tag), Some(2));
    assert_eq!(ws.graph().node(tag).unwrap().owner(), Some(root));
    assert_eq!(get(&ws, tag, "text"), PropertyValue::String("Hello".into()));
    assert_eq!(get(&ws, tag, TRANSFORM_PROPERTY), PropertyValue::Transform(placed));

    let new_mesh = node_at(&ws, 0, "Robot/Mesh");
    assert!(ws
        .graph()
        .is_connected(tag, "meta_clicked", &Callable::method(new_mesh, "hide")));
    assert_eq!(ws.graph().outgoing(tag).count(), 1);
}

#[test]
fn overridden_color_is_kept() {
    let loader = project();
    let mut ws = open(&loader, &["level.scn"]);
    let mesh = node_at(&ws, 0, "Robot/Mesh");
    ws.graph_mut().set_property(mesh, "color", RED).unwrap();

    loader
        .insert("robot.scn", &robot().with_node(DefinitionNode::child(".", "Antenna", "Node3D")))
        .unwrap();
    let report = ws.reconcile(&loader, &robot_path());
    let Some(TreeOutcome::Reconciled(result)) = report.outcome(0) else {
        panic!("level was not reconciled");
    };
    assert!(result.restored_properties >= 1);

    let new_mesh = node_at(&ws, 0, "Robot/Mesh");
    assert_ne!(new_mesh, mesh);
    assert_eq!(get(&ws, new_mesh, "color"), RED);
    node_at(&ws, 0, "Robot/Antenna");
}

#[test]
fn references_between_added_nodes_resolve_after_reattachment() {
    let loader = project();
    let mut ws = open(&loader, &["level.scn"]);
    let root = ws.tab(0).unwrap().root;
    let robot = node_at(&ws, 0, "Robot");
    let mesh = node_at(&ws, 0, "Robot/Mesh");

    let rig = add_node(&mut ws, robot, root, "Skeleton3D", "Rig");
    let decal = add_node(&mut ws, robot, root, "MeshInstance3D", "Decal");
    let graph = ws.graph_mut();
    graph.set_property(decal, "skeleton", PropertyValue::Node(Some(rig))).unwrap();
    graph.set_property(mesh, "skeleton", PropertyValue::Node(Some(rig))).unwrap();

    let report = ws.reconcile(&loader, &robot_path());
    assert_eq!(report.reconciled(), 1);

    let rig = node_at(&ws, 0, "Robot/Rig");
    let decal = node_at(&ws, 0, "Robot/Decal");
    let new_mesh = node_at(&ws, 0, "Robot/Mesh");
    assert_eq!(get(&ws, decal, "skeleton"), PropertyValue::Node(Some(rig)));
    assert_eq!(get(&ws, new_mesh, "skeleton"), PropertyValue::Node(Some(rig)));
}

#[test]
fn incoming_connection_restored_while_method_exists() {
    let loader = project();
    let mut ws = open(&loader, &["level.scn"]);
    let switch = node_at(&ws, 0, "Switch");
    let mesh = node_at(&ws, 0, "Robot/Mesh");
    ws.graph_mut()
        .connect(switch, "renamed", Callable::method(mesh, "hide"), ConnectFlags::PERSIST)
        .unwrap();

    ws.reconcile(&loader, &robot_path());
    let new_mesh = node_at(&ws, 0, "Robot/Mesh");
    assert!(ws
        .graph()
        .is_connected(switch, "renamed", &Callable::method(new_mesh, "hide")));
    assert_eq!(ws.graph().outgoing(switch).count(), 1);
}

#[test]
fn incoming_connection_dropped_with_warning_when_method_is_gone() {
    let loader = project();
    let mut ws = open(&loader, &["level.scn"]);
    let switch = node_at(&ws, 0, "Switch");
    let mesh = node_at(&ws, 0, "Robot/Mesh");
    ws.graph_mut()
        .connect(switch, "renamed", Callable::method(mesh, "hide"), ConnectFlags::PERSIST)
        .unwrap();

    loader.insert("robot.scn", &robot_with_mesh("Node")).unwrap();
    let report = ws.reconcile(&loader, &robot_path());
    let Some(TreeOutcome::Reconciled(result)) = report.outcome(0) else {
        panic!("a missing method must not fail the tab");
    };
    assert_eq!(result.skipped_connections, 1);
    assert!(result
        .warnings
        .iter()
        .any(|w| matches!(w, ReimportError::LookupMiss(m) if m.contains("hide"))));
    assert_eq!(ws.graph().outgoing(switch).count(), 0);
    assert_eq!(ws.graph().node(node_at(&ws, 0, "Robot/Mesh")).unwrap().class_name(), "Node");
}

#[test]
fn failing_tab_does_not_affect_other_tabs() {
    let loader = project();
    loader
        .insert(
            "crate.scn",
            &SceneDefinition::new("Crate").with_node(DefinitionNode::root("Crate", "Node3D")),
        )
        .unwrap();
    loader
        .insert(
            "depot.scn",
            &level().with_node(DefinitionNode::instance(".", "Crate", "crate.scn")),
        )
        .unwrap();
    let mut ws = open(&loader, &["depot.scn", "level.scn"]);

    let depot_mesh = node_at(&ws, 0, "Robot/Mesh");
    let level_mesh = node_at(&ws, 1, "Robot/Mesh");
    ws.graph_mut().set_property(depot_mesh, "color", RED).unwrap();
    ws.graph_mut().set_property(level_mesh, "color", RED).unwrap();
    let depot_before = snapshot(&ws, 0);
    let depot_nodes = ws.graph().subtree(ws.tab(0).unwrap().root);

    loader.insert_raw("crate.scn", "(broken");
    let report = ws.reconcile(&loader, &[PathBuf::from("crate.scn"), PathBuf::from("robot.scn")]);

    assert!(matches!(
        report.outcome(0),
        Some(TreeOutcome::Failed(ReimportError::DefinitionLoad { .. }))
    ));
    assert!(report.outcome(1).is_some_and(TreeOutcome::is_reconciled));
    assert_eq!(report.failed(), 1);

    assert_eq!(snapshot(&ws, 0), depot_before);
    assert_eq!(ws.graph().subtree(ws.tab(0).unwrap().root), depot_nodes);
    assert_eq!(node_at(&ws, 0, "Robot/Mesh"), depot_mesh);

    let new_level_mesh = node_at(&ws, 1, "Robot/Mesh");
    assert_ne!(new_level_mesh, level_mesh);
    assert_eq!(get(&ws, new_level_mesh, "color"), RED);
}

#[test]
fn identical_reimport_changes_nothing() {
    let loader = project();
    let mut ws = open(&loader, &["level.scn"]);
    let root = ws.tab(0).unwrap().root;
    let robot = node_at(&ws, 0, "Robot");
    let mesh = node_at(&ws, 0, "Robot/Mesh");
    let switch = node_at(&ws, 0, "Switch");
    let tag = add_node(&mut ws, robot, root, "Label", "Tag");
    let graph = ws.graph_mut();
    graph.set_property(mesh, "cast_shadows", PropertyValue::Bool(false)).unwrap();
    graph.node_mut(mesh).unwrap().add_to_group("Selectable", true);
    graph
        .connect(switch, "renamed", Callable::method(mesh, "hide"), ConnectFlags::PERSIST)
        .unwrap();
    graph
        .connect(tag, "meta_clicked", Callable::method(switch, "show"), ConnectFlags::PERSIST)
        .unwrap();

    let before = snapshot(&ws, 0);
    let report = ws.reconcile(&loader, &robot_path());
    assert_eq!(report.reconciled(), 1);
    assert_ne!(node_at(&ws, 0, "Robot"), robot);
    assert_eq!(snapshot(&ws, 0), before);
}

#[test]
fn property_diff_is_stable_across_replacement() {
    let loader = project();
    let mut ws = open(&loader, &["level.scn"]);
    let mesh = node_at(&ws, 0, "Robot/Mesh");
    let graph = ws.graph_mut();
    graph.set_property(mesh, "color", RED).unwrap();
    graph.set_property(mesh, "cast_shadows", PropertyValue::Bool(false)).unwrap();
    let before = PropertyDiffEngine::new(ws.graph()).diff(mesh, DiffMode::All);
    assert_eq!(before.len(), 2);

    ws.reconcile(&loader, &robot_path());
    let new_mesh = node_at(&ws, 0, "Robot/Mesh");
    let after = PropertyDiffEngine::new(ws.graph()).diff(new_mesh, DiffMode::All);
    assert_eq!(after, before);

    ws.graph_mut().set_property(new_mesh, "color", WHITE).unwrap();
    ws.graph_mut().set_property(new_mesh, "cast_shadows", PropertyValue::Bool(true)).unwrap();
    assert!(PropertyDiffEngine::new(ws.graph()).diff(new_mesh, DiffMode::All).is_empty());
}

#[test]
fn custom_callables_are_never_captured() {
    let loader = project();
    let mut ws = open(&loader, &["level.scn"]);
    let root = ws.tab(0).unwrap().root;
    let switch = node_at(&ws, 0, "Switch");
    let mesh = node_at(&ws, 0, "Robot/Mesh");
    let graph = ws.graph_mut();
    graph
        .connect(switch, "renamed", Callable::method(mesh, "hide"), ConnectFlags::PERSIST)
        .unwrap();
    graph
        .connect(
            switch,
            "ready",
            Callable::Custom {
                target: Some(mesh),
                label: "bound hide".into(),
            },
            ConnectFlags::PERSIST,
        )
        .unwrap();
    graph
        .connect(
            mesh,
            "ready",
            Callable::Custom {
                target: None,
                label: "lambda".into(),
            },
            ConnectFlags::PERSIST,
        )
        .unwrap();

    let plan = analyze(ws.graph(), root, &robot_path()).unwrap();
    let table = &plan.instances[0].table;
    let entry = &table.modifications[&NodePath::parse("Mesh")];
    assert_eq!(entry.incoming.len(), 1);
    assert_eq!(entry.incoming[0].method, "hide");
    assert!(entry.outgoing.is_empty());

    ws.reconcile(&loader, &robot_path());
    let new_mesh = node_at(&ws, 0, "Robot/Mesh");
    assert!(ws.graph().connections().all(|c| !c.callable.is_custom() || c.source == switch));
    assert_eq!(ws.graph().incoming(new_mesh).count(), 1);
}

#[test]
fn selection_and_undo_follow_the_new_nodes() {
    let loader = project();
    let mut ws = open(&loader, &["level.scn"]);
    let mesh = node_at(&ws, 0, "Robot/Mesh");
    let skeleton = node_at(&ws, 0, "Robot/Skeleton");
    ws.set_property(0, mesh, "color", RED).unwrap();
    let tab = ws.tab_mut(0).unwrap();
    tab.selection.select(mesh);
    tab.selection.select(skeleton);
    tab.history.mark_saved();
    assert!(!ws.tab(0).unwrap().is_unsaved());

    let mut shrunk = robot();
    shrunk.nodes.retain(|n| n.name != "Skeleton");
    loader.insert("robot.scn", &shrunk).unwrap();
    ws.reconcile(&loader, &robot_path());

    let new_mesh = node_at(&ws, 0, "Robot/Mesh");
    let tab = ws.tab(0).unwrap();
    assert_eq!(tab.selection.iter().collect::<Vec<_>>(), vec![new_mesh]);
    assert!(!tab.is_unsaved());

    ws.undo(0).unwrap();
    assert_eq!(get(&ws, new_mesh, "color"), WHITE);
}

#[test]
fn inherited_tab_root_is_rebuilt_from_its_base() {
    let loader = MemorySceneLoader::new();
    loader
        .insert(
            "character.scn",
            &SceneDefinition::new("Character")
                .with_node(DefinitionNode::root("Character", "Node3D"))
                .with_node(DefinitionNode::child(".", "Body", "MeshInstance3D")),
        )
        .unwrap();
    loader
        .insert(
            "hero.scn",
            &SceneDefinition::new("Hero")
                .inheriting("character.scn")
                .with_node(DefinitionNode::overriding("Body").with_property("color", RED))
                .with_node(DefinitionNode::child(".", "Sword", "Node3D")),
        )
        .unwrap();
    let mut ws = open(&loader, &["hero.scn"]);
    let old_root = ws.tab(0).unwrap().root;

    loader
        .insert(
            "character.scn",
            &SceneDefinition::new("Character")
                .with_node(DefinitionNode::root("Character", "Node3D"))
                .with_node(DefinitionNode::child(".", "Body", "MeshInstance3D"))
                .with_node(DefinitionNode::child(".", "Cape", "MeshInstance3D")),
        )
        .unwrap();
    let report = ws.reconcile(&loader, &[PathBuf::from("character.scn")]);
    assert_eq!(report.reconciled(), 1);

    let tab = ws.tab(0).unwrap();
    assert_ne!(tab.root, old_root);
    assert_eq!(tab.path, PathBuf::from("hero.scn"));
    let root = ws.graph().node(tab.root).unwrap();
    assert_eq!(root.scene_file_path(), Some(std::path::Path::new("hero.scn")));
    assert_eq!(root.inherited_paths(), vec![PathBuf::from("character.scn")]);

    assert_eq!(get(&ws, node_at(&ws, 0, "Body"), "color"), RED);
    let sword = node_at(&ws, 0, "Sword");
    assert_eq!(ws.graph().node(sword).unwrap().owner(), Some(tab.root));
    node_at(&ws, 0, "Cape");
}

#[test]
fn subscribers_hear_about_each_reconciled_tab() {
    let loader = project();
    loader
        .insert(
            "garage.scn",
            &SceneDefinition::new("Garage")
                .with_node(DefinitionNode::root("Garage", "Node3D"))
                .with_node(DefinitionNode::instance(".", "Robot", "robot.scn")),
        )
        .unwrap();
    let mut ws = open(&loader, &["level.scn", "garage.scn"]);
    let heard = Arc::new(AtomicUsize::new(0));
    let counter = heard.clone();
    ws.subscribe(Box::new(move |change| {
        counter.fetch_add(change.replaced.len(), Ordering::SeqCst);
    }));

    let skeleton = node_at(&ws, 1, "Robot/Skeleton");
    ws.graph_mut()
        .set_property(skeleton, "bind_pose_cached", PropertyValue::Bool(true))
        .unwrap();

    let report = ws.reconcile(&loader, &robot_path());
    assert_eq!(report.reconciled(), 2);
    assert_eq!(report.changes.len(), 2);
    assert_eq!(heard.load(Ordering::SeqCst), 2);
    assert_eq!(ws.current_tab(), Some(1));

    let skeleton = node_at(&ws, 1, "Robot/Skeleton");
    assert_eq!(get(&ws, skeleton, "bind_pose_cached"), PropertyValue::Bool(false));
}

#[test]
fn open_source_tabs_stay_put_when_reopen_is_disabled() {
    let loader = project();
    let config = ReimportConfig {
        reload_open_sources: false,
        ..ReimportConfig::default()
    };
    let mut ws = Workspace::new(ClassDb::with_builtins(), config);
    ws.open_scene(&loader, "robot.scn").unwrap();
    let root = ws.tab(0).unwrap().root;

    let report = ws.reconcile(&loader, &robot_path());
    assert!(report.outcomes.is_empty());
    assert!(report.reopened.is_empty());
    assert_eq!(ws.tab(0).unwrap().root, root);
}

fn rig() -> SceneDefinition {
    SceneDefinition::new("Rig")
        .with_node(DefinitionNode::root("Rig", "Node3D"))
        .with_node(DefinitionNode::child(".", "Skeleton", "Skeleton3D"))
}

#[test]
fn links_between_instances_replaced_together_reach_the_new_nodes() {
    let loader = project();
    loader.insert("rig.scn", &rig()).unwrap();
    loader
        .insert("level.scn", &level().with_node(DefinitionNode::instance(".", "Rig", "rig.scn")))
        .unwrap();
    let mut ws = open(&loader, &["level.scn"]);
    let mesh = node_at(&ws, 0, "Robot/Mesh");
    let skeleton = node_at(&ws, 0, "Rig/Skeleton");
    let graph = ws.graph_mut();
    graph.set_property(mesh, "skeleton", PropertyValue::Node(Some(skeleton))).unwrap();
    graph
        .connect(
            mesh,
            "visibility_changed",
            Callable::method(skeleton, "reset_bone_poses"),
            ConnectFlags::PERSIST,
        )
        .unwrap();

    let report = ws.reconcile(&loader, &[PathBuf::from("robot.scn"), PathBuf::from("rig.scn")]);
    let Some(TreeOutcome::Reconciled(result)) = report.outcome(0) else {
        panic!("level was not reconciled");
    };
    assert_eq!(result.replaced.len(), 2);

    let new_mesh = node_at(&ws, 0, "Robot/Mesh");
    let new_skeleton = node_at(&ws, 0, "Rig/Skeleton");
    assert!(!ws.graph().contains(skeleton));
    assert_eq!(get(&ws, new_mesh, "skeleton"), PropertyValue::Node(Some(new_skeleton)));
    assert!(ws.graph().is_connected(
        new_mesh,
        "visibility_changed",
        &Callable::method(new_skeleton, "reset_bone_poses")
    ));

    let root = ws.tab(0).unwrap().root;
    for id in ws.graph().subtree(root) {
        let node = ws.graph().node(id).unwrap();
        for info in node.list_properties() {
            if let Some(PropertyValue::Node(Some(target))) = node.get(&info.name) {
                assert!(ws.graph().contains(target), "{} points at a freed node", info.name);
            }
        }
    }
}

#[test]
fn nested_instance_of_inherited_base_keeps_base_overrides() {
    let loader = MemorySceneLoader::new();
    let gun = SceneDefinition::new("Gun")
        .with_node(DefinitionNode::root("Gun", "Node3D"))
        .with_node(DefinitionNode::child(".", "Barrel", "MeshInstance3D"));
    loader.insert("gun.scn", &gun).unwrap();
    loader
        .insert(
            "character.scn",
            &SceneDefinition::new("Character")
                .with_node(DefinitionNode::root("Character", "Node3D"))
                .with_node(DefinitionNode::instance(".", "Gun", "gun.scn"))
                .with_node(DefinitionNode::overriding("Gun/Barrel").with_property("color", RED)),
        )
        .unwrap();
    loader
        .insert(
            "hero.scn",
            &SceneDefinition::new("Hero")
                .inheriting("character.scn")
                .with_node(DefinitionNode::child("Gun", "Extra", "Node3D")),
        )
        .unwrap();
    let mut ws = open(&loader, &["hero.scn"]);
    let old_gun = node_at(&ws, 0, "Gun");

    loader
        .insert("gun.scn", &gun.with_node(DefinitionNode::child(".", "Scope", "Node3D")))
        .unwrap();
    let report = ws.reconcile(&loader, &[PathBuf::from("gun.scn")]);
    assert_eq!(report.reconciled(), 1);

    let new_gun = node_at(&ws, 0, "Gun");
    assert_ne!(new_gun, old_gun);
    assert_eq!(get(&ws, node_at(&ws, 0, "Gun/Barrel"), "color"), RED);
    node_at(&ws, 0, "Gun/Scope");
    let extra = node_at(&ws, 0, "Gun/Extra");
    assert_eq!(ws.graph().node(extra).unwrap().owner(), Some(ws.tab(0).unwrap().root));
    assert_eq!(ws.graph().node(new_gun).unwrap().children().len(), 3);
}

#[test]
fn added_node_falls_back_to_scene_root_when_its_parent_is_gone() {
    let loader = project();
    let mut ws = open(&loader, &["level.scn"]);
    let root = ws.tab(0).unwrap().root;
    let skeleton = node_at(&ws, 0, "Robot/Skeleton");
    add_node(&mut ws, skeleton, root, "Node3D", "Hat");

    loader
        .insert(
            "robot.scn",
            &SceneDefinition::new("Robot")
                .with_node(DefinitionNode::root("Robot", "Node3D"))
                .with_node(DefinitionNode::child(".", "Mesh", "MeshInstance3D")),
        )
        .unwrap();
    let report = ws.reconcile(&loader, &robot_path());
    let Some(TreeOutcome::Reconciled(result)) = report.outcome(0) else {
        panic!("level was not reconciled");
    };
    assert_eq!(result.restored_additions, 1);
    assert!(result
        .warnings
        .iter()
        .any(|w| matches!(w, ReimportError::LookupMiss(m) if m.contains("Skeleton"))));

    let hat = node_at(&ws, 0, "Hat");
    assert_eq!(ws.graph().node(hat).unwrap().parent(), Some(root));
    assert_eq!(ws.graph().node(hat).unwrap().owner(), Some(root));
    assert!(ws.graph().get_node_or_null(root, &NodePath::parse("Robot/Skeleton")).is_none());
}
