// SPDX-License-Identifier: MIT OR Apache-2.0
//! Reimport batches.
//!
//! Filesystem changes are collected until the project has been quiet for the
//! configured debounce window, then handed over as one [`ReimportBatch`].
//! Scene definitions in a batch go to reconciliation. Every other resource is
//! only reported.

use crate::config::ReimportConfig;
use crate::error::Result;
use crate::file_watcher::{FileEvent, SceneWatcher};
use crate::workspace::ReconcileReport;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Paths reimported together
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReimportBatch {
    /// Scene definitions to reconcile
    pub definitions: Vec<PathBuf>,
    /// Other changed resources
    pub resources: Vec<PathBuf>,
    /// Deleted files
    pub removed: Vec<PathBuf>,
}

impl ReimportBatch {
    /// Route changed paths by file type
    pub fn from_paths<P: AsRef<Path>>(paths: impl IntoIterator<Item = P>, config: &ReimportConfig) -> Self {
        let mut batch = Self::default();
        for path in paths {
            batch.push(path.as_ref().to_path_buf(), false, config);
        }
        batch
    }

    fn push(&mut self, path: PathBuf, deleted: bool, config: &ReimportConfig) {
        let list = if deleted {
            &mut self.removed
        } else if config.is_scene_path(&path) {
            &mut self.definitions
        } else {
            &mut self.resources
        };
        if !list.contains(&path) {
            list.push(path);
        }
    }

    /// Whether any definition needs reconciling
    pub fn has_definitions(&self) -> bool {
        !self.definitions.is_empty()
    }

    /// Whether the batch is empty
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty() && self.resources.is_empty() && self.removed.is_empty()
    }

    /// Total number of paths
    pub fn len(&self) -> usize {
        self.definitions.len() + self.resources.len() + self.removed.len()
    }
}

/// Counters over the lifetime of a monitor
#[derive(Debug, Clone, Default)]
pub struct ReimportStats {
    /// Batches handed out
    pub batches: usize,
    /// Definitions handed out for reconciliation
    pub definitions: usize,
    /// Resources reported
    pub resources: usize,
    /// Tabs reconciled
    pub reconciled_tabs: usize,
    /// Tabs that failed to reconcile
    pub failed_tabs: usize,
    /// When the last batch was handed out
    pub last_batch: Option<Instant>,
}

#[derive(Debug, Clone, Copy)]
struct PendingChange {
    detected_at: Instant,
    deleted: bool,
}

/// Collects file changes into debounced batches
pub struct ReimportMonitor {
    watcher: Option<SceneWatcher>,
    project_root: PathBuf,
    pending: IndexMap<PathBuf, PendingChange>,
    stats: Arc<RwLock<ReimportStats>>,
    debounce: Duration,
    config: ReimportConfig,
    enabled: bool,
}

impl ReimportMonitor {
    /// Create a monitor for a project directory
    pub fn new(project_root: impl Into<PathBuf>, config: ReimportConfig) -> Self {
        Self {
            watcher: None,
            project_root: project_root.into(),
            pending: IndexMap::new(),
            stats: Arc::new(RwLock::new(ReimportStats::default())),
            debounce: Duration::from_millis(config.debounce_ms),
            config,
            enabled: true,
        }
    }

    /// Start watching the project directory
    pub fn watch(&mut self) -> Result<()> {
        let mut watcher = SceneWatcher::new(&self.config)?;
        watcher.watch(&self.project_root)?;
        self.watcher = Some(watcher);
        Ok(())
    }

    /// Set the quiet window
    pub fn set_debounce(&mut self, debounce: Duration) {
        self.debounce = debounce;
    }

    /// Enable or disable batching
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Whether batching is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record a change by hand. Absolute paths under the project root are
    /// made relative to it.
    pub fn push(&mut self, path: impl AsRef<Path>, deleted: bool) {
        self.push_at(path.as_ref(), deleted, Instant::now());
    }

    fn push_at(&mut self, path: &Path, deleted: bool, now: Instant) {
        let path = path
            .strip_prefix(&self.project_root)
            .unwrap_or(path)
            .to_path_buf();
        self.pending.insert(
            path,
            PendingChange {
                detected_at: now,
                deleted,
            },
        );
    }

    /// Pull watcher events and hand out a batch once the project has been
    /// quiet for the debounce window
    pub fn poll(&mut self) -> Option<ReimportBatch> {
        if !self.enabled {
            return None;
        }
        let now = Instant::now();
        let events = self
            .watcher
            .as_ref()
            .map(SceneWatcher::poll_events)
            .unwrap_or_default();
        for event in events {
            match event {
                FileEvent::Created(path) | FileEvent::Modified(path) => self.push_at(&path, false, now),
                FileEvent::Deleted(path) => self.push_at(&path, true, now),
                FileEvent::Renamed(old, new) => {
                    self.push_at(&old, true, now);
                    self.push_at(&new, false, now);
                }
                FileEvent::Error(err) => tracing::warn!("File watcher error: {}", err),
            }
        }
        self.take_ready(now)
    }

    fn take_ready(&mut self, now: Instant) -> Option<ReimportBatch> {
        let latest = self.pending.values().map(|c| c.detected_at).max()?;
        if now.duration_since(latest) < self.debounce {
            return None;
        }

        let mut batch = ReimportBatch::default();
        for (path, change) in self.pending.drain(..) {
            batch.push(path, change.deleted, &self.config);
        }

        let mut stats = self.stats.write();
        stats.batches += 1;
        stats.definitions += batch.definitions.len();
        stats.resources += batch.resources.len();
        stats.last_batch = Some(now);
        tracing::info!(
            "Reimport batch: {} definition(s), {} resource(s), {} removed",
            batch.definitions.len(),
            batch.resources.len(),
            batch.removed.len()
        );
        Some(batch)
    }

    /// Fold a reconciliation result into the counters
    pub fn record(&self, report: &ReconcileReport) {
        let mut stats = self.stats.write();
        stats.reconciled_tabs += report.reconciled() + report.reopened.len();
        stats.failed_tabs += report.failed();
    }

    /// Snapshot of the counters
    pub fn stats(&self) -> ReimportStats {
        self.stats.read().clone()
    }

    /// Shared handle to the counters
    pub fn stats_handle(&self) -> Arc<RwLock<ReimportStats>> {
        self.stats.clone()
    }

    /// Number of changes waiting for the quiet window
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
