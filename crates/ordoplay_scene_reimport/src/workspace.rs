// SPDX-License-Identifier: MIT OR Apache-2.0
//! Open scene tabs and the reconciliation entry point.

use crate::config::ReimportConfig;
use crate::error::{ReimportError, Result};
use crate::events::{notify_scene_reimported, ChangeCallback, ChangeListeners, StructuralChange};
use crate::history::{History, Operation, StateSnapshot};
use crate::loader::{DefinitionCache, SceneLoader};
use crate::reloader::{analyze, InstanceReloader, RootContainer, TreeOutcome};
use crate::remap::IdentityRemap;
use indexmap::IndexSet;
use ordoplay_scene_graph::{instantiate, ClassDb, InstanceMode, NodeId, PropertyValue, Reflectable, SceneGraph};
use std::path::{Path, PathBuf};

/// Selected nodes of a tab, in selection order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection(IndexSet<NodeId>);

impl Selection {
    /// Create an empty selection
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node
    pub fn select(&mut self, node: NodeId) {
        self.0.insert(node);
    }

    /// Remove a node
    pub fn deselect(&mut self, node: NodeId) {
        self.0.shift_remove(&node);
    }

    /// Remove every node
    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Whether `node` is selected
    pub fn contains(&self, node: NodeId) -> bool {
        self.0.contains(&node)
    }

    /// Selected nodes
    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.0.iter().copied()
    }

    /// Number of selected nodes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing is selected
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl IdentityRemap for Selection {
    fn replace_identity(&mut self, old: NodeId, new: Option<NodeId>) {
        if !self.0.contains(&old) {
            return;
        }
        self.0 = self
            .0
            .iter()
            .filter_map(|id| if *id == old { new } else { Some(*id) })
            .collect();
    }
}

/// One open scene tab
#[derive(Debug)]
pub struct OpenTree {
    /// Root of the edited scene
    pub root: NodeId,
    /// Definition the tab was opened from
    pub path: PathBuf,
    /// Selected nodes
    pub selection: Selection,
    /// Undo history
    pub history: History,
}

impl OpenTree {
    /// Tab for a freshly opened scene
    pub fn new(root: NodeId, path: PathBuf) -> Self {
        Self {
            root,
            path,
            selection: Selection::new(),
            history: History::new(),
        }
    }

    /// Whether the tab has changes not written to disk
    pub fn is_unsaved(&self) -> bool {
        self.history.is_unsaved()
    }
}

/// What one [`Workspace::reconcile`] call did
#[derive(Debug, Default)]
pub struct ReconcileReport {
    /// Tab index and outcome of every tab holding a reimported instance
    pub outcomes: Vec<(usize, TreeOutcome)>,
    /// Tabs reopened because their own file was reimported
    pub reopened: Vec<usize>,
    /// Tabs that could not be reopened
    pub failed_reopens: Vec<(usize, ReimportError)>,
    /// Notifications delivered to subscribers
    pub changes: Vec<StructuralChange>,
    /// Nodes whose reimport-sensitive caches were reset
    pub refreshed_nodes: usize,
}

impl ReconcileReport {
    /// Number of tabs reconciled
    pub fn reconciled(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_reconciled()).count()
    }

    /// Number of tabs whose replacement failed to load
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.reconciled() + self.failed_reopens.len()
    }

    /// Outcome for a tab, if it held a reimported instance
    pub fn outcome(&self, tab: usize) -> Option<&TreeOutcome> {
        self.outcomes.iter().find(|(i, _)| *i == tab).map(|(_, o)| o)
    }
}

/// Every open tab over a shared scene graph
pub struct Workspace {
    graph: SceneGraph,
    db: ClassDb,
    tabs: Vec<OpenTree>,
    current_tab: Option<usize>,
    container: RootContainer,
    config: ReimportConfig,
    listeners: ChangeListeners,
}

impl Workspace {
    /// Create a workspace with no open tabs
    pub fn new(db: ClassDb, config: ReimportConfig) -> Self {
        let mut graph = SceneGraph::new();
        let container = RootContainer::new(&mut graph);
        Self {
            graph,
            db,
            tabs: Vec::new(),
            current_tab: None,
            container,
            config,
            listeners: ChangeListeners::new(),
        }
    }

    /// Shared scene graph
    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    /// Mutable shared scene graph
    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }

    /// Class registry
    pub fn db(&self) -> &ClassDb {
        &self.db
    }

    /// Active settings
    pub fn config(&self) -> &ReimportConfig {
        &self.config
    }

    /// Open tabs
    pub fn tabs(&self) -> &[OpenTree] {
        &self.tabs
    }

    /// Get a tab
    pub fn tab(&self, index: usize) -> Option<&OpenTree> {
        self.tabs.get(index)
    }

    /// Get a mutable tab
    pub fn tab_mut(&mut self, index: usize) -> Option<&mut OpenTree> {
        self.tabs.get_mut(index)
    }

    /// Index of the tab being edited
    pub fn current_tab(&self) -> Option<usize> {
        self.current_tab
    }

    /// Index of the tab opened from `path`
    pub fn find_tab(&self, path: &Path) -> Option<usize> {
        self.tabs.iter().position(|t| t.path == path)
    }

    /// Open the definition at `path` in a new tab and make it current
    pub fn open_scene(&mut self, loader: &dyn SceneLoader, path: impl Into<PathBuf>) -> Result<usize> {
        let path = path.into();
        let mut cache = DefinitionCache::new(loader);
        let def = cache.resolve(&path)?;
        let root = instantiate(&mut self.graph, &self.db, &mut cache, &def, InstanceMode::Edit)
            .map_err(|e| ReimportError::definition_load(&path, e))?;

        tracing::info!("Opened {:?}", path);
        self.tabs.push(OpenTree::new(root, path));
        let index = self.tabs.len() - 1;
        self.set_current_tab(index)?;
        Ok(index)
    }

    /// Close a tab and free its nodes
    pub fn close_scene(&mut self, index: usize) -> Result<()> {
        if index >= self.tabs.len() {
            return Err(ReimportError::LookupMiss(format!("No tab {index}")));
        }
        if self.current_tab == Some(index) {
            self.container.release(&mut self.graph)?;
            self.current_tab = None;
        }
        let tab = self.tabs.remove(index);
        self.graph.remove_subtree(tab.root)?;
        if let Some(current) = self.current_tab {
            if current > index {
                self.current_tab = Some(current - 1);
            }
        }
        Ok(())
    }

    /// Switch the tab being edited
    pub fn set_current_tab(&mut self, index: usize) -> Result<()> {
        let root = self
            .tabs
            .get(index)
            .map(|t| t.root)
            .ok_or_else(|| ReimportError::LookupMiss(format!("No tab {index}")))?;
        self.container.make_current(&mut self.graph, root)?;
        self.current_tab = Some(index);
        Ok(())
    }

    /// Edit a property through the tab's undo history
    pub fn set_property(&mut self, tab: usize, node: NodeId, name: &str, value: PropertyValue) -> Result<()> {
        let before = self
            .graph
            .node(node)
            .and_then(|n| n.get(name))
            .ok_or_else(|| ReimportError::LookupMiss(format!("Property {name} on {node}")))?;
        let before = StateSnapshot::from_value(&(name.to_string(), before))?;
        let after = StateSnapshot::from_value(&(name.to_string(), value.clone()))?;

        let tree = self
            .tabs
            .get_mut(tab)
            .ok_or_else(|| ReimportError::LookupMiss(format!("No tab {tab}")))?;
        self.graph.set_property(node, name, value)?;
        let mut group = tree.history.begin_group(&format!("Set {name}"));
        group.add_operation(Operation::new(vec![node], before, after));
        tree.history.commit(group);
        Ok(())
    }

    /// Undo the last edit of a tab
    pub fn undo(&mut self, tab: usize) -> Result<()> {
        let tree = self
            .tabs
            .get_mut(tab)
            .ok_or_else(|| ReimportError::LookupMiss(format!("No tab {tab}")))?;
        let group = tree.history.undo()?;
        for op in group.operations.iter().rev() {
            let (name, value): (String, PropertyValue) = op.before.to_value()?;
            for target in &op.targets {
                self.graph.set_property(*target, &name, value.clone())?;
            }
        }
        Ok(())
    }

    /// Redo the last undone edit of a tab
    pub fn redo(&mut self, tab: usize) -> Result<()> {
        let tree = self
            .tabs
            .get_mut(tab)
            .ok_or_else(|| ReimportError::LookupMiss(format!("No tab {tab}")))?;
        let group = tree.history.redo()?;
        for op in &group.operations {
            let (name, value): (String, PropertyValue) = op.after.to_value()?;
            for target in &op.targets {
                self.graph.set_property(*target, &name, value.clone())?;
            }
        }
        Ok(())
    }

    /// Register for structural-change notifications
    pub fn subscribe(&mut self, callback: ChangeCallback) {
        self.listeners.subscribe(callback);
    }

    /// Rebuild every open instance of the reimported `paths`.
    ///
    /// Each tab is captured before any tab is touched, then reloaded on its
    /// own: a tab that fails to load leaves the others unaffected. Tabs
    /// opened from a reimported path are reopened in place when
    /// `reload_open_sources` is set.
    pub fn reconcile(&mut self, loader: &dyn SceneLoader, paths: &[PathBuf]) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let mut cache = DefinitionCache::new(loader);
        tracing::info!("Reconciling {} reimported path(s) across {} tab(s)", paths.len(), self.tabs.len());

        let plans: Vec<_> = self
            .tabs
            .iter()
            .enumerate()
            .filter(|(_, tab)| !paths.contains(&tab.path))
            .filter_map(|(index, tab)| analyze(&self.graph, tab.root, paths).map(|plan| (index, plan)))
            .collect();

        let previous = self.current_tab;
        for (index, plan) in plans {
            if let Err(err) = self.set_current_tab(index) {
                report.outcomes.push((index, TreeOutcome::Failed(err)));
                continue;
            }
            let outcome = InstanceReloader::new(&mut self.graph, &self.db, &mut self.container)
                .with_editor_state(self.config.restore_editor_state)
                .reload(&mut self.tabs[index], plan, &mut cache);
            if let TreeOutcome::Reconciled(result) = &outcome {
                report.changes.push(StructuralChange {
                    tab: index,
                    root: self.tabs[index].root,
                    replaced: result.replaced.clone(),
                });
            }
            report.outcomes.push((index, outcome));
        }

        if self.config.reload_open_sources {
            for index in 0..self.tabs.len() {
                if !paths.contains(&self.tabs[index].path) {
                    continue;
                }
                match self.reopen(index, &mut cache) {
                    Ok(root) => {
                        report.reopened.push(index);
                        report.changes.push(StructuralChange {
                            tab: index,
                            root,
                            replaced: vec![root],
                        });
                    }
                    Err(err) => {
                        tracing::error!("Could not reopen {:?}: {}", self.tabs[index].path, err);
                        report.failed_reopens.push((index, err));
                    }
                }
            }
        }

        let restored = match previous {
            Some(index) => self.set_current_tab(index),
            None => {
                self.current_tab = None;
                self.container.release(&mut self.graph)
            }
        };
        if let Err(err) = restored {
            tracing::warn!("Could not restore the current tab: {}", err);
        }

        let roots: Vec<NodeId> = self.tabs.iter().map(|t| t.root).collect();
        report.refreshed_nodes = notify_scene_reimported(&mut self.graph, &roots);
        for change in &report.changes {
            self.listeners.emit(change);
        }

        tracing::info!(
            "Reconciled {} tab(s), reopened {}, {} failed",
            report.reconciled(),
            report.reopened.len(),
            report.failed()
        );
        report
    }

    /// Replace a tab's whole tree with a fresh instantiation of its file
    fn reopen(&mut self, index: usize, cache: &mut DefinitionCache<'_>) -> Result<NodeId> {
        let path = self.tabs[index].path.clone();
        let def = cache.resolve(&path)?;
        let root = instantiate(&mut self.graph, &self.db, cache, &def, InstanceMode::Edit)
            .map_err(|e| ReimportError::definition_load(&path, e))?;

        let was_current = self.container.current() == Some(self.tabs[index].root);
        if was_current {
            self.container.release(&mut self.graph)?;
        }
        let tree = &mut self.tabs[index];
        let was_unsaved = tree.is_unsaved();
        let old = std::mem::replace(&mut tree.root, root);
        tree.selection.clear();
        tree.history.clear();
        if was_unsaved {
            tree.history.mark_unsaved();
        }
        self.graph.remove_subtree(old)?;
        if was_current {
            self.container.make_current(&mut self.graph, root)?;
        }
        tracing::info!("Reopened {:?}", path);
        Ok(root)
    }
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("tabs", &self.tabs.len())
            .field("current_tab", &self.current_tab)
            .field("nodes", &self.graph.node_count())
            .finish()
    }
}
