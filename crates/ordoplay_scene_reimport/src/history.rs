// SPDX-License-Identifier: MIT OR Apache-2.0
//! Undo/redo history for an open scene tab.
//!
//! Operations carry bincode snapshots of the edited state plus the ids of
//! the nodes they touched. After a reimport the ids are repointed through
//! [`IdentityRemap`]; operations left without a live target are dropped.
//! A saved marker tracks whether the tab differs from what is on disk.

use crate::remap::IdentityRemap;
use ordoplay_scene_graph::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Maximum undo history depth
const MAX_HISTORY: usize = 100;

/// History errors
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Nothing to undo
    #[error("Nothing to undo")]
    NothingToUndo,

    /// Nothing to redo
    #[error("Nothing to redo")]
    NothingToRedo,

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}

/// Result type for history operations
pub type Result<T> = std::result::Result<T, HistoryError>;

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Unique operation ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationID(u64);

impl OperationID {
    /// Get the raw ID value
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Serialized state captured before or after an edit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Serialized state
    pub data: Vec<u8>,
    /// Timestamp when snapshot was taken
    pub timestamp: u64,
}

impl StateSnapshot {
    /// Create from serializable value
    pub fn from_value<T: Serialize>(value: &T) -> Result<Self> {
        Ok(Self {
            data: bincode::serialize(value)?,
            timestamp: now_secs(),
        })
    }

    /// Deserialize to value
    pub fn to_value<T: for<'de> Deserialize<'de>>(&self) -> Result<T> {
        Ok(bincode::deserialize(&self.data)?)
    }

    /// Size in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// An operation that can be undone/redone
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    /// Nodes the operation applies to
    pub targets: Vec<NodeId>,
    /// State before operation (for undo)
    pub before: StateSnapshot,
    /// State after operation (for redo)
    pub after: StateSnapshot,
}

impl Operation {
    /// Create a new operation on `targets`
    pub fn new(targets: Vec<NodeId>, before: StateSnapshot, after: StateSnapshot) -> Self {
        Self {
            targets,
            before,
            after,
        }
    }

    /// Get memory size of this operation
    pub fn memory_size(&self) -> usize {
        self.before.size() + self.after.size()
    }
}

/// Group of operations that are undone/redone together
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationGroup {
    /// Group ID
    pub id: OperationID,
    /// Human-readable description
    pub description: String,
    /// Operations in this group
    pub operations: Vec<Operation>,
    /// Timestamp
    pub timestamp: u64,
}

impl OperationGroup {
    /// Add an operation to this group
    pub fn add_operation(&mut self, operation: Operation) {
        self.operations.push(operation);
    }

    /// Get total memory size of this group
    pub fn memory_size(&self) -> usize {
        self.operations.iter().map(Operation::memory_size).sum()
    }

    fn remap(&mut self, old: NodeId, new: Option<NodeId>) {
        for op in &mut self.operations {
            match new {
                Some(new) => {
                    for target in &mut op.targets {
                        if *target == old {
                            *target = new;
                        }
                    }
                }
                None => op.targets.retain(|t| *t != old),
            }
        }
        self.operations.retain(|op| !op.targets.is_empty());
    }
}

/// Undo/redo history manager
#[derive(Debug)]
pub struct History {
    undo_stack: VecDeque<OperationGroup>,
    redo_stack: VecDeque<OperationGroup>,
    next_id: u64,
    max_depth: usize,
    memory_used: usize,
    /// Top of the undo stack when the tab was last saved
    saved_top: Option<OperationID>,
    /// False once the saved state can no longer be reached by undo/redo
    saved_reachable: bool,
}

impl History {
    /// Create a new history manager
    pub fn new() -> Self {
        Self::with_max_depth(MAX_HISTORY)
    }

    /// Create with custom maximum depth
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            next_id: 1,
            max_depth,
            memory_used: 0,
            saved_top: None,
            saved_reachable: true,
        }
    }

    /// Begin a new operation group
    pub fn begin_group(&mut self, description: &str) -> OperationGroup {
        let id = OperationID(self.next_id);
        self.next_id += 1;
        OperationGroup {
            id,
            description: description.to_string(),
            operations: Vec::new(),
            timestamp: now_secs(),
        }
    }

    /// Commit an operation group
    pub fn commit(&mut self, group: OperationGroup) {
        if group.operations.is_empty() {
            return;
        }

        // The saved state lived on the redo stack
        if self.redo_stack.iter().any(|g| Some(g.id) == self.saved_top) {
            self.saved_reachable = false;
        }
        self.redo_stack.clear();

        self.memory_used += group.memory_size();
        self.undo_stack.push_back(group);

        while self.undo_stack.len() > self.max_depth {
            if let Some(old_group) = self.undo_stack.pop_front() {
                self.memory_used = self.memory_used.saturating_sub(old_group.memory_size());
                // Either the saved group or the empty state before it is gone
                if self.saved_top.is_none() || Some(old_group.id) == self.saved_top {
                    self.saved_reachable = false;
                }
            }
        }
    }

    /// Undo the last operation
    pub fn undo(&mut self) -> Result<OperationGroup> {
        let group = self
            .undo_stack
            .pop_back()
            .ok_or(HistoryError::NothingToUndo)?;

        self.memory_used = self.memory_used.saturating_sub(group.memory_size());
        self.redo_stack.push_back(group.clone());

        Ok(group)
    }

    /// Redo the last undone operation
    pub fn redo(&mut self) -> Result<OperationGroup> {
        let group = self
            .redo_stack
            .pop_back()
            .ok_or(HistoryError::NothingToRedo)?;

        self.memory_used += group.memory_size();
        self.undo_stack.push_back(group.clone());

        Ok(group)
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Get undo stack depth
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Get redo stack depth
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Total bytes held by undo snapshots
    pub fn memory_used(&self) -> usize {
        self.memory_used
    }

    /// Clear all history. The current state becomes the saved one.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.memory_used = 0;
        self.mark_saved();
    }

    /// Get description of next undo operation
    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.back().map(|g| g.description.as_str())
    }

    /// Get description of next redo operation
    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.back().map(|g| g.description.as_str())
    }

    /// Record the current position as saved
    pub fn mark_saved(&mut self) {
        self.saved_top = self.undo_stack.back().map(|g| g.id);
        self.saved_reachable = true;
    }

    /// Force the unsaved state regardless of position
    pub fn mark_unsaved(&mut self) {
        self.saved_reachable = false;
    }

    /// Whether the current position differs from the saved one
    pub fn is_unsaved(&self) -> bool {
        !self.saved_reachable || self.undo_stack.back().map(|g| g.id) != self.saved_top
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityRemap for History {
    fn replace_identity(&mut self, old: NodeId, new: Option<NodeId>) {
        for group in self.undo_stack.iter_mut().chain(self.redo_stack.iter_mut()) {
            group.remap(old, new);
        }
        let before = self.undo_stack.len() + self.redo_stack.len();
        self.undo_stack.retain(|g| !g.operations.is_empty());
        self.redo_stack.retain(|g| !g.operations.is_empty());
        let dropped = before - self.undo_stack.len() - self.redo_stack.len();
        if dropped > 0 {
            tracing::debug!("Dropped {} history entries for removed node {}", dropped, old);
        }
        self.memory_used = self.undo_stack.iter().map(OperationGroup::memory_size).sum();
    }
}
