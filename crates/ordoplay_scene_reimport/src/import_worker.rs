// SPDX-License-Identifier: MIT OR Apache-2.0
//! Background reading and parsing of changed definitions.
//!
//! Requests go to a worker thread running a current-thread tokio runtime.
//! Completions come back over a channel and are drained by the thread that
//! owns the workspace, so reconciliation never overlaps the file reads.

use crate::error::{ReimportError, Result};
use crate::loader::SceneLoader;
use ordoplay_scene_graph::SceneDefinition;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

/// A finished read
#[derive(Debug)]
pub struct ImportCompletion {
    /// Path relative to the project root
    pub path: PathBuf,
    /// Parsed definition or the reason it could not be read
    pub result: Result<SceneDefinition>,
}

/// Handle to the import worker thread
pub struct ImportWorker {
    request_tx: mpsc::UnboundedSender<PathBuf>,
    result_rx: mpsc::UnboundedReceiver<ImportCompletion>,
    in_flight: HashSet<PathBuf>,
}

impl ImportWorker {
    /// Start a worker reading definitions under `project_root`
    pub fn spawn(project_root: impl Into<PathBuf>) -> Result<Self> {
        let root = project_root.into();
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (result_tx, result_rx) = mpsc::unbounded_channel();

        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        std::thread::Builder::new()
            .name("reimport-worker".to_string())
            .spawn(move || {
                rt.block_on(import_loop(root, request_rx, result_tx));
            })?;

        Ok(Self {
            request_tx,
            result_rx,
            in_flight: HashSet::new(),
        })
    }

    /// Queue a definition for reading. A path already in flight is not
    /// queued twice.
    pub fn request(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        if !self.in_flight.insert(path.clone()) {
            return Ok(());
        }
        self.request_tx
            .send(path.clone())
            .map_err(|_| ReimportError::definition_load(path, "import worker stopped"))
    }

    /// Number of requests without a completion
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Take every completion available now
    pub fn drain(&mut self) -> Vec<ImportCompletion> {
        let mut done = Vec::new();
        while let Ok(completion) = self.result_rx.try_recv() {
            self.in_flight.remove(&completion.path);
            done.push(completion);
        }
        done
    }

    /// Block until every queued request has completed
    pub fn wait_all(&mut self) -> Vec<ImportCompletion> {
        let mut done = Vec::new();
        while !self.in_flight.is_empty() {
            let Some(completion) = self.result_rx.blocking_recv() else {
                tracing::warn!("Import worker stopped with {} request(s) pending", self.in_flight.len());
                self.in_flight.clear();
                break;
            };
            self.in_flight.remove(&completion.path);
            done.push(completion);
        }
        done
    }
}

impl std::fmt::Debug for ImportWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImportWorker")
            .field("in_flight", &self.in_flight.len())
            .finish()
    }
}

async fn import_loop(
    root: PathBuf,
    mut request_rx: mpsc::UnboundedReceiver<PathBuf>,
    result_tx: mpsc::UnboundedSender<ImportCompletion>,
) {
    while let Some(path) = request_rx.recv().await {
        let result = read_definition(&root, &path).await;
        if result_tx.send(ImportCompletion { path, result }).is_err() {
            break;
        }
    }
}

async fn read_definition(root: &Path, path: &Path) -> Result<SceneDefinition> {
    let text = tokio::fs::read_to_string(root.join(path))
        .await
        .map_err(|e| ReimportError::definition_load(path, e))?;
    let def = SceneDefinition::from_ron(&text).map_err(|e| ReimportError::definition_load(path, e))?;
    tracing::debug!("Read {:?} off-thread", path);
    Ok(def)
}

/// Loader answering from completed imports first, then from a fallback
pub struct PreparedLoader<'a> {
    prepared: HashMap<PathBuf, SceneDefinition>,
    failed: HashMap<PathBuf, String>,
    fallback: &'a dyn SceneLoader,
}

impl<'a> PreparedLoader<'a> {
    /// Start with no completed imports
    pub fn new(fallback: &'a dyn SceneLoader) -> Self {
        Self {
            prepared: HashMap::new(),
            failed: HashMap::new(),
            fallback,
        }
    }

    /// Record completions. A failed read is reported again on load instead
    /// of retrying through the fallback.
    pub fn absorb(&mut self, completions: impl IntoIterator<Item = ImportCompletion>) {
        for completion in completions {
            match completion.result {
                Ok(def) => {
                    self.failed.remove(&completion.path);
                    self.prepared.insert(completion.path, def);
                }
                Err(err) => {
                    tracing::error!("{}", err);
                    self.prepared.remove(&completion.path);
                    self.failed.insert(completion.path, err.to_string());
                }
            }
        }
    }

    /// Number of definitions ready
    pub fn prepared(&self) -> usize {
        self.prepared.len()
    }
}

impl SceneLoader for PreparedLoader<'_> {
    fn load(&self, path: &Path) -> Result<SceneDefinition> {
        if let Some(def) = self.prepared.get(path) {
            return Ok(def.clone());
        }
        if let Some(reason) = self.failed.get(path) {
            return Err(ReimportError::definition_load(path, reason));
        }
        self.fallback.load(path)
    }
}
