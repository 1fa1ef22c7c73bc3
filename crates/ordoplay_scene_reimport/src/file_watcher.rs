// SPDX-License-Identifier: MIT OR Apache-2.0
//! Debounced filesystem watcher for a project directory.

use crate::config::{ReimportConfig, CONFIG_FILE_NAME};
use notify_debouncer_full::{
    new_debouncer,
    notify::{
        self,
        event::{ModifyKind, RenameMode},
        EventKind, RecommendedWatcher, RecursiveMode,
    },
    DebounceEventResult, Debouncer, RecommendedCache,
};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::time::Duration;

/// Events emitted by the watcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEvent {
    /// A file was created
    Created(PathBuf),
    /// A file was modified
    Modified(PathBuf),
    /// A file was deleted
    Deleted(PathBuf),
    /// A file was renamed (old path, new path)
    Renamed(PathBuf, PathBuf),
    /// The backend reported an error
    Error(String),
}

/// Whether a changed path is worth reporting. Hidden files, editor swap
/// files and the settings file are ignored.
pub fn is_relevant(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    !(name.starts_with('.') || name.ends_with('~') || name.ends_with(".tmp") || name == CONFIG_FILE_NAME)
}

fn convert(kind: EventKind, paths: Vec<PathBuf>) -> Vec<FileEvent> {
    if let EventKind::Modify(ModifyKind::Name(RenameMode::Both)) = kind {
        if let [old, new] = paths.as_slice() {
            return vec![FileEvent::Renamed(old.clone(), new.clone())];
        }
    }
    let make: fn(PathBuf) -> FileEvent = match kind {
        EventKind::Create(_) => FileEvent::Created,
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) | EventKind::Remove(_) => FileEvent::Deleted,
        EventKind::Modify(_) => FileEvent::Modified,
        EventKind::Any | EventKind::Access(_) | EventKind::Other => return Vec::new(),
    };
    paths.into_iter().filter(|p| is_relevant(p)).map(make).collect()
}

/// Watches directories and reports changed files
pub struct SceneWatcher {
    debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
    event_rx: Receiver<FileEvent>,
    watched_dirs: Arc<RwLock<HashSet<PathBuf>>>,
}

impl SceneWatcher {
    /// Create a watcher using the configured debounce window
    pub fn new(config: &ReimportConfig) -> Result<Self, notify::Error> {
        let (event_tx, event_rx) = mpsc::channel();
        let debouncer = new_debouncer(
            Duration::from_millis(config.debounce_ms),
            None,
            move |result: DebounceEventResult| match result {
                Ok(events) => {
                    for event in events {
                        for converted in convert(event.event.kind, event.event.paths.clone()) {
                            let _ = event_tx.send(converted);
                        }
                    }
                }
                Err(errors) => {
                    for error in errors {
                        let _ = event_tx.send(FileEvent::Error(error.to_string()));
                    }
                }
            },
        )?;

        Ok(Self {
            debouncer,
            event_rx,
            watched_dirs: Arc::new(RwLock::new(HashSet::new())),
        })
    }

    /// Watch a directory recursively
    pub fn watch(&mut self, path: impl AsRef<Path>) -> Result<(), notify::Error> {
        let path = path.as_ref().to_path_buf();
        self.debouncer.watch(&path, RecursiveMode::Recursive)?;
        self.watched_dirs.write().insert(path.clone());
        tracing::info!("Watching {:?} for reimports", path);
        Ok(())
    }

    /// Stop watching a directory
    pub fn unwatch(&mut self, path: impl AsRef<Path>) -> Result<(), notify::Error> {
        let path = path.as_ref();
        self.debouncer.unwatch(path)?;
        self.watched_dirs.write().remove(path);
        tracing::info!("Stopped watching {:?}", path);
        Ok(())
    }

    /// Whether a directory is watched
    pub fn is_watching(&self, path: &Path) -> bool {
        self.watched_dirs.read().contains(path)
    }

    /// Drain pending events without blocking
    pub fn poll_events(&self) -> Vec<FileEvent> {
        let mut events = Vec::new();
        loop {
            match self.event_rx.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    tracing::warn!("File watcher channel disconnected");
                    break;
                }
            }
        }
        events
    }
}
