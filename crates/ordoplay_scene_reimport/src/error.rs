// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types for reimport reconciliation.

use crate::history::HistoryError;
use ordoplay_scene_graph::{GraphError, InstantiateError};
use std::path::PathBuf;

/// Errors raised while reconciling reimported scenes
#[derive(Debug, thiserror::Error)]
pub enum ReimportError {
    /// Replacement definition could not be loaded or instantiated. Aborts
    /// reconciliation of the affected tree only.
    #[error("Failed to load definition {path}: {reason}")]
    DefinitionLoad {
        /// Definition path
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// A path, node, method or property no longer resolves
    #[error("Lookup miss: {0}")]
    LookupMiss(String),

    /// Restoring an entry would break ownership rules
    #[error("Structural invariant violated: {0}")]
    StructuralInvariant(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// RON parse error
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// RON serialization error
    #[error("Serialization error: {0}")]
    Serialize(#[from] ron::Error),

    /// Instantiation failed
    #[error(transparent)]
    Instantiate(#[from] InstantiateError),

    /// Graph operation failed
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Undo history failure
    #[error(transparent)]
    History(#[from] HistoryError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// File watcher failure
    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),
}

impl ReimportError {
    /// Build a [`ReimportError::DefinitionLoad`] from any displayable cause
    pub fn definition_load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::DefinitionLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this failure only costs a single restored entry
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::LookupMiss(_) | Self::StructuralInvariant(_))
    }
}

/// Result type for reimport operations
pub type Result<T> = std::result::Result<T, ReimportError>;
