// SPDX-License-Identifier: MIT OR Apache-2.0
//! Reimport reconciliation for `OrdoPlay` Editor.
//!
//! When a scene definition changes on disk, every open tab holding an
//! instance of it is rebuilt from the new definition while keeping what the
//! user did in the editor:
//! - Property overrides and node references
//! - Signal connections into and out of the instance
//! - Group membership
//! - Nodes added under the instance
//! - Selection and undo history, remapped to the new nodes
//!
//! ## Architecture
//!
//! A tab is captured completely before it is touched
//! ([`ModificationTableBuilder`], [`ReferenceResolver`]), every replacement
//! is instantiated, and only then is the tab spliced and reconciled by
//! [`InstanceReloader`]. [`Workspace::reconcile`] drives this for all open
//! tabs. [`ReimportMonitor`] and [`ImportWorker`] turn filesystem changes
//! into batches for it.

pub mod error;
pub mod config;
pub mod loader;
pub mod diff;
pub mod survey;
pub mod modification;
pub mod reference;
pub mod remap;
pub mod history;
pub mod reloader;
pub mod workspace;
pub mod events;
pub mod batch;
pub mod file_watcher;
pub mod import_worker;

pub use error::{ReimportError, Result};
pub use config::{ReimportConfig, CONFIG_FILE_NAME};
pub use loader::{DefinitionCache, MemorySceneLoader, RonSceneLoader, SceneLoader};
pub use diff::{DiffMode, PropertyDiffEngine, PropertyTable};
pub use survey::{ConnectionSurveyor, IncomingConnection, OutgoingConnection};
pub use modification::{AdditiveNodeEntry, ModificationEntry, ModificationTable, ModificationTableBuilder};
pub use reference::ReferenceResolver;
pub use remap::{HistoryRemapper, IdentityRemap};
pub use history::{History, HistoryError};
pub use reloader::{
    analyze, find_instances_inheriting, InstanceReloader, ReloadReport, ReloadStage, RootContainer, TreeOutcome,
    TreeReloadPlan,
};
pub use workspace::{OpenTree, ReconcileReport, Selection, Workspace};
pub use events::{notify_scene_reimported, ChangeCallback, ChangeListeners, StructuralChange};
pub use batch::{ReimportBatch, ReimportMonitor, ReimportStats};
pub use file_watcher::{FileEvent, SceneWatcher};
pub use import_worker::{ImportCompletion, ImportWorker, PreparedLoader};
