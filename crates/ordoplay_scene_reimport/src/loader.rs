// SPDX-License-Identifier: MIT OR Apache-2.0
//! Loading scene definitions.
//!
//! [`SceneLoader`] is the persistence seam: it turns a path into a parsed
//! definition. [`DefinitionCache`] sits on top of a loader for the duration
//! of one reimport batch. Every definition is read fresh the first time it is
//! requested in that batch and shared afterwards, with its inheritance chain
//! resolved.

use crate::error::{ReimportError, Result};
use ordoplay_scene_graph::{DefinitionSource, InstantiateError, SceneDefinition};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Source of scene definitions
pub trait SceneLoader {
    /// Read and parse the definition at `path`
    fn load(&self, path: &Path) -> Result<SceneDefinition>;
}

/// Loads RON definitions from a project directory
#[derive(Debug, Clone)]
pub struct RonSceneLoader {
    root: PathBuf,
}

impl RonSceneLoader {
    /// Resolve relative definition paths against `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Project directory
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl SceneLoader for RonSceneLoader {
    fn load(&self, path: &Path) -> Result<SceneDefinition> {
        let full = self.root.join(path);
        let content =
            std::fs::read_to_string(&full).map_err(|e| ReimportError::definition_load(path, e))?;
        SceneDefinition::from_ron(&content).map_err(|e| ReimportError::definition_load(path, e))
    }
}

/// In-memory definition store keyed by path
#[derive(Debug, Default)]
pub struct MemorySceneLoader {
    files: RwLock<HashMap<PathBuf, String>>,
}

impl MemorySceneLoader {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a definition, serialized the way it would be on disk
    pub fn insert(&self, path: impl Into<PathBuf>, def: &SceneDefinition) -> Result<()> {
        let text = def.to_ron()?;
        self.files.write().insert(path.into(), text);
        Ok(())
    }

    /// Store raw file contents
    pub fn insert_raw(&self, path: impl Into<PathBuf>, text: impl Into<String>) {
        self.files.write().insert(path.into(), text.into());
    }

    /// Remove a file
    pub fn remove(&self, path: &Path) -> bool {
        self.files.write().remove(path).is_some()
    }

    /// Raw contents of a file
    pub fn contents(&self, path: &Path) -> Option<String> {
        self.files.read().get(path).cloned()
    }
}

impl SceneLoader for MemorySceneLoader {
    fn load(&self, path: &Path) -> Result<SceneDefinition> {
        let files = self.files.read();
        let text = files
            .get(path)
            .ok_or_else(|| ReimportError::definition_load(path, "file not found"))?;
        SceneDefinition::from_ron(text).map_err(|e| ReimportError::definition_load(path, e))
    }
}

/// Per-batch cache of resolved definitions
pub struct DefinitionCache<'a> {
    loader: &'a dyn SceneLoader,
    loaded: HashMap<PathBuf, Arc<SceneDefinition>>,
    resolving: Vec<PathBuf>,
}

impl<'a> DefinitionCache<'a> {
    /// Start a fresh cache over `loader`
    pub fn new(loader: &'a dyn SceneLoader) -> Self {
        Self {
            loader,
            loaded: HashMap::new(),
            resolving: Vec::new(),
        }
    }

    /// Load `path` and everything it inherits
    pub fn resolve(&mut self, path: &Path) -> Result<Arc<SceneDefinition>> {
        if let Some(def) = self.loaded.get(path) {
            return Ok(def.clone());
        }
        if self.resolving.iter().any(|p| p == path) {
            return Err(ReimportError::definition_load(path, "inheritance cycle"));
        }

        self.resolving.push(path.to_path_buf());
        let result = self.load_uncached(path);
        self.resolving.pop();

        let def = Arc::new(result?);
        self.loaded.insert(path.to_path_buf(), def.clone());
        tracing::debug!("Loaded definition {:?}", path);
        Ok(def)
    }

    fn load_uncached(&mut self, path: &Path) -> Result<SceneDefinition> {
        let mut def = self.loader.load(path)?;
        def.validate()
            .map_err(|e| ReimportError::definition_load(path, e))?;
        def.path = Some(path.to_path_buf());
        if let Some(base) = def.inherits.clone() {
            def.base = Some(self.resolve(&base)?);
        }
        Ok(def)
    }

    /// Number of definitions loaded so far
    pub fn len(&self) -> usize {
        self.loaded.len()
    }

    /// Whether nothing has been loaded yet
    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
    }
}

impl DefinitionSource for DefinitionCache<'_> {
    fn definition(&mut self, path: &Path) -> std::result::Result<Arc<SceneDefinition>, InstantiateError> {
        self.resolve(path).map_err(|e| InstantiateError::Source {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}
