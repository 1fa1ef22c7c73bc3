// SPDX-License-Identifier: MIT OR Apache-2.0
//! Replacing reimported instances inside one open tab.
//!
//! A tab goes through [`ReloadStage`]s in order. Its [`TreeReloadPlan`] is
//! built while the old nodes are untouched. Then every replacement subtree is
//! instantiated, and only if all of them load is the tab mutated: each stale
//! instance is swapped for its replacement and the captured editor-side state
//! is reapplied.

use crate::diff::PropertyTable;
use crate::error::{ReimportError, Result};
use crate::loader::DefinitionCache;
use crate::modification::{is_additive_node, ModificationEntry, ModificationTable, ModificationTableBuilder};
use crate::reference::ReferenceResolver;
use crate::survey::OutgoingConnection;
use crate::remap::{HistoryRemapper, IdentityRemap};
use crate::workspace::OpenTree;
use indexmap::{IndexMap, IndexSet};
use ordoplay_scene_graph::property::{SCRIPT_PROPERTY, TRANSFORM_PROPERTY};
use ordoplay_scene_graph::{
    instantiate, Callable, ClassDb, ConnectFlags, InstanceMode, Node, NodeClass, NodeId, NodePath, PropertyValue,
    Reflectable, SceneGraph,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Progress of one tab through reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReloadStage {
    /// Modification tables captured
    Analyzed,
    /// Every replacement subtree built
    Instantiated,
    /// Stale subtrees swapped out
    Spliced,
    /// Captured state reapplied
    Reconciled,
    /// Dirty state restored
    Done,
}

/// One instance scheduled for replacement
#[derive(Debug, Clone)]
pub struct InstanceReload {
    /// Node being replaced
    pub original: NodeId,
    /// Reimported path that matched this instance
    pub instance_path: PathBuf,
    /// State captured from the original subtree
    pub table: ModificationTable,
}

/// Everything captured from one tab before its instances are replaced
#[derive(Debug, Clone)]
pub struct TreeReloadPlan {
    /// Tab root at capture time
    pub tab_root: NodeId,
    /// Instances to replace, in order
    pub instances: Vec<InstanceReload>,
    /// References from the rest of the tab into replaced subtrees, keyed by
    /// path from the tab root
    pub references: IndexMap<NodePath, PropertyTable>,
    stage: ReloadStage,
}

impl TreeReloadPlan {
    /// Current stage
    pub fn stage(&self) -> ReloadStage {
        self.stage
    }

    fn advance(&mut self, stage: ReloadStage) {
        tracing::trace!("Reload of {} {:?} -> {:?}", self.tab_root, self.stage, stage);
        self.stage = stage;
    }
}

/// Nodes of the tab at `root` built from `path`, directly or by inheritance.
///
/// Matches inside a nested instance resolve to the outermost instance the
/// tab owns, since that is what gets rebuilt. The tab root only matches
/// through inheritance: a tab whose own file changed is reopened instead.
pub fn find_instances_inheriting(graph: &SceneGraph, root: NodeId, path: &Path) -> IndexSet<NodeId> {
    let mut found = IndexSet::new();
    for id in graph.subtree(root) {
        let Some(node) = graph.node(id) else {
            continue;
        };
        let direct = id != root && node.scene_file_path() == Some(path);
        if !direct && !node.inherited_paths().iter().any(|p| p == path) {
            continue;
        }

        let mut target = id;
        while target != root {
            match graph.node(target).and_then(Node::owner) {
                Some(owner) if owner != root => target = owner,
                _ => break,
            }
        }
        found.insert(target);
    }
    found
}

/// Capture a reload plan for the tab at `root`, or `None` if nothing in it
/// comes from `paths`
pub fn analyze(graph: &SceneGraph, root: NodeId, paths: &[PathBuf]) -> Option<TreeReloadPlan> {
    let mut matched: IndexMap<NodeId, PathBuf> = IndexMap::new();
    for path in paths {
        for id in find_instances_inheriting(graph, root, path) {
            matched.entry(id).or_insert_with(|| path.clone());
        }
    }

    // An instance rebuilt as base content of another match needs no reload
    // of its own
    let covered: Vec<NodeId> = matched
        .keys()
        .filter(|id| {
            matched.keys().any(|other| {
                other != *id && graph.is_ancestor_of(*other, **id) && !is_additive_node(graph, root, *other, **id)
            })
        })
        .copied()
        .collect();
    for id in covered {
        matched.shift_remove(&id);
    }
    if matched.is_empty() {
        return None;
    }

    let originals: IndexSet<NodeId> = matched.keys().copied().collect();
    let instances = matched
        .into_iter()
        .map(|(original, instance_path)| InstanceReload {
            original,
            instance_path,
            table: ModificationTableBuilder::new(graph, root, original).build(),
        })
        .collect();
    let references = ReferenceResolver::new(graph, root).resolve(&originals);

    Some(TreeReloadPlan {
        tab_root: root,
        instances,
        references,
        stage: ReloadStage::Analyzed,
    })
}

/// Counters and recoverable failures of one tab reload
#[derive(Debug, Default)]
pub struct ReloadReport {
    /// Properties reapplied
    pub restored_properties: usize,
    /// Properties that could not be reapplied
    pub skipped_properties: usize,
    /// Connections reapplied
    pub restored_connections: usize,
    /// Connections that could not be reapplied
    pub skipped_connections: usize,
    /// Additive nodes reattached
    pub restored_additions: usize,
    /// Additive nodes that could not be reattached
    pub skipped_additions: usize,
    /// Roots of the new subtrees
    pub replaced: Vec<NodeId>,
    /// Recoverable failures, in order
    pub warnings: Vec<ReimportError>,
}

impl ReloadReport {
    fn miss(&mut self, message: String) {
        tracing::warn!("{}", message);
        self.warnings.push(ReimportError::LookupMiss(message));
    }

    fn violation(&mut self, message: String) {
        tracing::warn!("{}", message);
        self.warnings.push(ReimportError::StructuralInvariant(message));
    }
}

/// Result of reloading one tab
#[derive(Debug)]
pub enum TreeOutcome {
    /// Instances replaced, with what could not be restored
    Reconciled(ReloadReport),
    /// A replacement failed to load. The tab was left untouched.
    Failed(ReimportError),
}

impl TreeOutcome {
    /// Whether the tab was reconciled
    pub fn is_reconciled(&self) -> bool {
        matches!(self, TreeOutcome::Reconciled(_))
    }
}

/// Holder that parents the tab currently being worked on. At most one tab
/// root is attached at a time.
#[derive(Debug)]
pub struct RootContainer {
    holder: NodeId,
    current: Option<NodeId>,
}

impl RootContainer {
    /// Create the holder node in `graph`
    pub fn new(graph: &mut SceneGraph) -> Self {
        let holder = graph.insert(Node::new(Arc::new(NodeClass::new("Node")), "EditorRoot"));
        Self { holder, current: None }
    }

    /// Holder node
    pub fn holder(&self) -> NodeId {
        self.holder
    }

    /// Tab root currently attached
    pub fn current(&self) -> Option<NodeId> {
        self.current
    }

    /// Attach `root`, detaching whatever was current
    pub fn make_current(&mut self, graph: &mut SceneGraph, root: NodeId) -> Result<()> {
        if self.current == Some(root) {
            return Ok(());
        }
        self.release(graph)?;
        graph.add_child(self.holder, root)?;
        self.current = Some(root);
        Ok(())
    }

    /// Detach the current root, if any
    pub fn release(&mut self, graph: &mut SceneGraph) -> Result<()> {
        if let Some(current) = self.current.take() {
            if graph.contains(current) {
                graph.detach(current)?;
            }
        }
        Ok(())
    }

    /// Track a root swapped in place by [`SceneGraph::replace_by`]
    pub fn replace_current(&mut self, old: NodeId, new: NodeId) {
        if self.current == Some(old) {
            self.current = Some(new);
        }
    }
}

/// Restorations that resolve paths across the whole tab, run once every
/// instance of it is in place
#[derive(Default)]
struct Pending {
    connections: Vec<DeferredConnection>,
    references: Vec<DeferredReference>,
}

struct DeferredConnection {
    anchor: NodeId,
    node_path: NodePath,
    connection: OutgoingConnection,
}

struct DeferredReference {
    /// Root the referencing node is found from, possibly swapped since
    anchor: NodeId,
    node_path: NodePath,
    property: String,
    /// `None` for a reference captured as cleared
    target: Option<NodePath>,
}

struct EditorState {
    path: NodePath,
    display_folded: bool,
    editable_children: bool,
}

/// Replaces the planned instances of one tab
pub struct InstanceReloader<'a> {
    graph: &'a mut SceneGraph,
    db: &'a ClassDb,
    container: &'a mut RootContainer,
    restore_editor_state: bool,
}

impl<'a> InstanceReloader<'a> {
    /// Work on `graph`, swapping tab roots through `container`
    pub fn new(graph: &'a mut SceneGraph, db: &'a ClassDb, container: &'a mut RootContainer) -> Self {
        Self {
            graph,
            db,
            container,
            restore_editor_state: true,
        }
    }

    /// Whether fold and editable-children flags are carried over
    pub fn with_editor_state(mut self, restore: bool) -> Self {
        self.restore_editor_state = restore;
        self
    }

    /// Replace every instance in `plan`. Definitions come from `cache`.
    pub fn reload(
        &mut self,
        tree: &mut OpenTree,
        mut plan: TreeReloadPlan,
        cache: &mut DefinitionCache<'_>,
    ) -> TreeOutcome {
        if plan.tab_root != tree.root {
            return TreeOutcome::Failed(ReimportError::StructuralInvariant(format!(
                "Plan for {} applied to tab {}",
                plan.tab_root, tree.root
            )));
        }
        let was_unsaved = tree.history.is_unsaved();
        let instances = std::mem::take(&mut plan.instances);

        let mut prepared = Vec::with_capacity(instances.len());
        for reload in instances {
            if !self.graph.contains(reload.original) {
                continue;
            }
            match self.instantiate_replacement(tree.root, &reload, cache) {
                Ok(replacement) => prepared.push((reload, replacement)),
                Err(err) => {
                    for (_, replacement) in prepared {
                        self.discard(replacement);
                    }
                    tracing::error!("Could not reload {:?}: {}", tree.path, err);
                    return TreeOutcome::Failed(err);
                }
            }
        }
        plan.advance(ReloadStage::Instantiated);

        let mut report = ReloadReport::default();
        let mut swaps: HashMap<NodeId, NodeId> = HashMap::new();
        let mut pending = Pending::default();
        for (reload, replacement) in prepared {
            match self.replace_instance(tree, reload, replacement, &mut swaps, &mut pending, &mut report) {
                Ok(()) => report.replaced.push(replacement),
                Err(err) => {
                    report.violation(format!("Replacement aborted: {err}"));
                    if self.graph.node(replacement).is_some_and(|n| n.parent().is_none()) {
                        self.discard(replacement);
                    }
                }
            }
        }
        plan.advance(ReloadStage::Spliced);

        // Paths resolve only once every instance of the tab is in place, so
        // none of them can land on a node replaced later
        for (path, table) in &plan.references {
            defer_references(tree.root, path, table, &mut pending, &mut report);
        }
        self.apply_pending(&swaps, pending, &mut report);
        plan.advance(ReloadStage::Reconciled);

        if was_unsaved {
            tree.history.mark_unsaved();
        } else {
            tree.history.mark_saved();
        }
        plan.advance(ReloadStage::Done);

        tracing::info!(
            "Reloaded {} instance(s) in {:?}: {} properties, {} connections, {} additions restored",
            report.replaced.len(),
            tree.path,
            report.restored_properties,
            report.restored_connections,
            report.restored_additions
        );
        TreeOutcome::Reconciled(report)
    }

    fn instantiate_replacement(
        &mut self,
        tab_root: NodeId,
        reload: &InstanceReload,
        cache: &mut DefinitionCache<'_>,
    ) -> Result<NodeId> {
        let original = self
            .graph
            .node(reload.original)
            .ok_or_else(|| ReimportError::LookupMiss(format!("Instance {} is gone", reload.original)))?;
        let own_path = original.scene_file_path().map(Path::to_path_buf);
        let nearest_base = original.inherited_paths().into_iter().next();

        let relative = self.graph.path_to(tab_root, reload.original);
        let root_state = self.graph.node(tab_root).and_then(|n| n.inherited_state()).cloned();
        if let (Some(relative), Some(state)) = (relative, root_state) {
            let extract = !relative.is_current()
                && state.path.as_deref() != Some(reload.instance_path.as_path())
                && state.has_node_path(&relative);
            if let (true, Some(base_path)) = (extract, state.path.clone()) {
                return self.extract_from_base(&base_path, &relative, cache);
            }
        }

        let path = if reload.original == tab_root {
            nearest_base.unwrap_or_else(|| reload.instance_path.clone())
        } else {
            own_path.unwrap_or_else(|| reload.instance_path.clone())
        };
        let def = cache.resolve(&path)?;
        instantiate(self.graph, self.db, cache, &def, InstanceMode::Instance)
            .map_err(|e| ReimportError::definition_load(&path, e))
    }

    /// Build the base definition and take the node at `relative` out of it,
    /// so an instance declared by an inherited scene keeps that scene's
    /// overrides
    fn extract_from_base(
        &mut self,
        base_path: &Path,
        relative: &NodePath,
        cache: &mut DefinitionCache<'_>,
    ) -> Result<NodeId> {
        let def = cache.resolve(base_path)?;
        let temp = instantiate(self.graph, self.db, cache, &def, InstanceMode::Instance)
            .map_err(|e| ReimportError::definition_load(base_path, e))?;

        let Some(node) = self.graph.get_node_or_null(temp, relative) else {
            self.graph.remove_subtree(temp)?;
            return Err(ReimportError::definition_load(
                base_path,
                format!("{relative} does not exist"),
            ));
        };
        self.graph.detach(node)?;
        self.graph.set_owner(node, None)?;

        // Children the base scene added are restored from the table
        for id in self.graph.descendants(node) {
            if self.graph.contains(id) && !self.graph.owner_chain_reaches(id, node) {
                self.graph.remove_subtree(id)?;
            }
        }
        self.graph.remove_subtree(temp)?;
        tracing::debug!("Extracted {} from {:?}", relative, base_path);
        Ok(node)
    }

    fn replace_instance(
        &mut self,
        tree: &mut OpenTree,
        reload: InstanceReload,
        replacement: NodeId,
        swaps: &mut HashMap<NodeId, NodeId>,
        pending: &mut Pending,
        report: &mut ReloadReport,
    ) -> Result<()> {
        let original = reload.original;
        let table = reload.table;
        let is_root = original == tree.root;

        let remapper = HistoryRemapper::capture(self.graph, original);
        let editor_state = if self.restore_editor_state {
            self.capture_editor_state(original)
        } else {
            Vec::new()
        };

        let (name, placeholder, scene_path) = {
            let node = self
                .graph
                .node(original)
                .ok_or_else(|| ReimportError::LookupMiss(format!("Instance {original} is gone")))?;
            (
                node.name().to_string(),
                node.load_placeholder,
                node.scene_file_path().map(Path::to_path_buf),
            )
        };
        self.graph.rename(replacement, &name)?;
        self.graph.replace_by(original, replacement)?;

        // The old subtree is out of the tab now. Additions leave it before it
        // is freed.
        for entry in &table.additions {
            let node = resolve_swap(swaps, entry.node);
            if self.graph.node(node).is_some_and(|n| n.parent().is_some()) {
                if let Err(err) = self.graph.detach(node) {
                    tracing::debug!("Could not detach added node {}: {}", node, err);
                }
            }
        }
        if is_root {
            if let Some(node) = self.graph.node_mut(replacement) {
                let state = node.instance_state().cloned();
                node.set_inherited_state(state);
                node.set_instance_state(None);
                node.set_scene_file_path(scene_path);
            }
            tree.root = replacement;
            self.container.replace_current(original, replacement);
        }
        self.discard(original);
        if let Some(node) = self.graph.node_mut(replacement) {
            node.load_placeholder = placeholder;
        }
        swaps.insert(original, replacement);
        tracing::debug!("Swapped {} for {}", original, replacement);

        for (path, entry) in &table.modifications {
            match self.graph.get_node_or_null(replacement, path) {
                Some(node) => self.apply_entry(replacement, path, node, entry, report, pending),
                None => {
                    report.skipped_properties += entry.properties.len();
                    report.skipped_connections += entry.incoming.len() + entry.outgoing.len();
                    report.miss(format!("Modified node {path} no longer exists"));
                }
            }
        }

        for entry in &table.additions {
            let node = resolve_swap(swaps, entry.node);
            if !self.graph.contains(node) {
                report.skipped_additions += 1;
                continue;
            }
            let parent = match self.graph.get_node_or_null(replacement, &entry.parent_path) {
                Some(parent) => parent,
                None => {
                    report.miss(format!(
                        "Parent {} of an added node is gone, attaching to the scene root",
                        entry.parent_path
                    ));
                    tree.root
                }
            };
            let mut owner = resolve_swap(swaps, entry.owner);
            if !self.graph.contains(owner) {
                owner = tree.root;
            }

            let attached = self
                .graph
                .add_child(parent, node)
                .and_then(|()| self.graph.move_child(node, entry.index))
                .and_then(|()| self.graph.set_owner(node, Some(owner)));
            if let Err(err) = attached {
                report.violation(format!("Dropping added node {node}: {err}"));
                report.skipped_additions += 1;
                self.discard(node);
                continue;
            }
            if let Some(transform) = entry.transform {
                if let Err(err) = self
                    .graph
                    .set_property(node, TRANSFORM_PROPERTY, PropertyValue::Transform(transform))
                {
                    tracing::debug!("Transform not restored on {}: {}", node, err);
                }
            }
            report.restored_additions += 1;
        }

        for (path, references) in &table.additive_references {
            defer_references(replacement, path, references, pending, report);
        }

        for state in editor_state {
            if let Some(node) = self
                .graph
                .get_node_or_null(replacement, &state.path)
                .and_then(|id| self.graph.node_mut(id))
            {
                node.display_folded = state.display_folded;
                node.editable_children = state.editable_children;
            }
        }

        let OpenTree {
            selection, history, ..
        } = tree;
        let mut targets: [&mut dyn IdentityRemap; 2] = [selection, history];
        remapper.apply(self.graph, replacement, &mut targets);
        Ok(())
    }

    fn capture_editor_state(&self, root: NodeId) -> Vec<EditorState> {
        self.graph
            .subtree(root)
            .into_iter()
            .filter_map(|id| {
                let node = self.graph.node(id)?;
                if !node.display_folded && !node.editable_children {
                    return None;
                }
                Some(EditorState {
                    path: self.graph.path_to(root, id)?,
                    display_folded: node.display_folded,
                    editable_children: node.editable_children,
                })
            })
            .collect()
    }

    fn apply_entry(
        &mut self,
        anchor: NodeId,
        path: &NodePath,
        node: NodeId,
        entry: &ModificationEntry,
        report: &mut ReloadReport,
        pending: &mut Pending,
    ) {
        // Script exports only exist once the script is attached
        if let Some(script) = entry.properties.get(SCRIPT_PROPERTY) {
            self.set_captured(node, SCRIPT_PROPERTY, script, report);
        }
        for (name, value) in entry.properties.iter().filter(|(name, _)| *name != SCRIPT_PROPERTY) {
            let Some(info) = self.graph.node(node).and_then(|n| n.property_info(name)) else {
                report.skipped_properties += 1;
                report.miss(format!("Property {name} no longer exists"));
                continue;
            };
            match value {
                PropertyValue::Path(target) if info.is_node_ref() => pending.references.push(DeferredReference {
                    anchor,
                    node_path: path.clone(),
                    property: name.clone(),
                    target: Some(target.clone()),
                }),
                _ => self.set_captured(node, name, value, report),
            }
        }

        for conn in &entry.incoming {
            if !self.graph.contains(conn.source) {
                report.skipped_connections += 1;
                report.miss(format!("Source of {} is gone", conn.signal));
                continue;
            }
            if !self.graph.node(node).is_some_and(|n| n.has_method(&conn.method)) {
                report.skipped_connections += 1;
                report.miss(format!("Method {} no longer exists, dropping {}", conn.method, conn.signal));
                continue;
            }
            self.reconnect(conn.source, &conn.signal, Callable::method(node, conn.method.clone()), conn.flags, report);
        }

        pending.connections.extend(
            entry
                .outgoing
                .iter()
                .filter(|conn| conn.flags.contains(ConnectFlags::PERSIST))
                .map(|conn| DeferredConnection {
                    anchor,
                    node_path: path.clone(),
                    connection: conn.clone(),
                }),
        );

        if let Some(n) = self.graph.node_mut(node) {
            for group in &entry.groups {
                n.add_to_group(group.name.clone(), group.persistent);
            }
        }
    }

    fn reconnect(
        &mut self,
        source: NodeId,
        signal: &str,
        callable: Callable,
        flags: ConnectFlags,
        report: &mut ReloadReport,
    ) {
        if self.graph.is_connected(source, signal, &callable) {
            report.restored_connections += 1;
            return;
        }
        match self.graph.connect(source, signal, callable, flags) {
            Ok(_) => report.restored_connections += 1,
            Err(err) => {
                report.skipped_connections += 1;
                report.miss(format!("Could not reconnect {signal}: {err}"));
            }
        }
    }

    fn set_captured(&mut self, node: NodeId, name: &str, value: &PropertyValue, report: &mut ReloadReport) {
        if self.graph.node(node).and_then(|n| n.property_info(name)).is_none() {
            report.skipped_properties += 1;
            report.miss(format!("Property {name} no longer exists"));
            return;
        }
        match self.graph.set_property(node, name, value.clone()) {
            Ok(()) => report.restored_properties += 1,
            Err(err) => {
                report.skipped_properties += 1;
                report.miss(format!("Could not restore {name}: {err}"));
            }
        }
    }

    /// Resolve postponed connections, then node references, against the
    /// finished tab. A reference whose target no longer resolves is cleared.
    fn apply_pending(&mut self, swaps: &HashMap<NodeId, NodeId>, pending: Pending, report: &mut ReloadReport) {
        for DeferredConnection {
            anchor,
            node_path,
            connection: conn,
        } in pending.connections
        {
            let Some(node) = self.graph.get_node_or_null(resolve_swap(swaps, anchor), &node_path) else {
                report.skipped_connections += 1;
                report.miss(format!("Source {} of {} no longer exists", node_path, conn.signal));
                continue;
            };
            let fallback = resolve_swap(swaps, conn.target);
            let target = self
                .graph
                .get_node_or_null(node, &conn.target_path)
                .or_else(|| self.graph.contains(fallback).then_some(fallback));
            let Some(target) = target else {
                report.skipped_connections += 1;
                report.miss(format!("Handler {} of {} does not resolve", conn.target_path, conn.signal));
                continue;
            };
            self.reconnect(node, &conn.signal, Callable::method(target, conn.method), conn.flags, report);
        }

        for reference in pending.references {
            let anchor = resolve_swap(swaps, reference.anchor);
            let Some(node) = self.graph.get_node_or_null(anchor, &reference.node_path) else {
                report.skipped_properties += 1;
                report.miss(format!("Referencing node {} no longer exists", reference.node_path));
                continue;
            };

            let mut resolved = true;
            let target = match &reference.target {
                Some(path) => {
                    let target = self.graph.get_node_or_null(node, path);
                    if target.is_none() {
                        resolved = false;
                        report.miss(format!("Reference {} -> {} does not resolve", reference.property, path));
                    }
                    target
                }
                None => None,
            };

            match self.graph.set_property(node, &reference.property, PropertyValue::Node(target)) {
                Ok(()) if resolved => report.restored_properties += 1,
                Ok(()) => report.skipped_properties += 1,
                Err(err) => {
                    report.skipped_properties += 1;
                    report.miss(format!("Could not restore {}: {}", reference.property, err));
                }
            }
        }
    }

    fn discard(&mut self, root: NodeId) {
        if let Err(err) = self.graph.remove_subtree(root) {
            tracing::debug!("Could not free {}: {}", root, err);
        }
    }
}

/// Queue the references of the node at `node_path` under `anchor`
fn defer_references(
    anchor: NodeId,
    node_path: &NodePath,
    table: &PropertyTable,
    pending: &mut Pending,
    report: &mut ReloadReport,
) {
    for (name, value) in table {
        let target = match value {
            PropertyValue::Path(path) => Some(path.clone()),
            value if value.is_nil() => None,
            _ => {
                report.skipped_properties += 1;
                report.miss(format!("Reference {name} on {node_path} is not a node path"));
                continue;
            }
        };
        pending.references.push(DeferredReference {
            anchor,
            node_path: node_path.clone(),
            property: name.clone(),
            target,
        });
    }
}

fn resolve_swap(swaps: &HashMap<NodeId, NodeId>, mut id: NodeId) -> NodeId {
    let mut steps = 0;
    while let Some(next) = swaps.get(&id) {
        id = *next;
        steps += 1;
        if steps > swaps.len() {
            break;
        }
    }
    id
}
