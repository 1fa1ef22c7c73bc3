// SPDX-License-Identifier: MIT OR Apache-2.0
//! Reimport settings.
//!
//! Settings live in `reimport.ron` at the project root. Missing fields fall
//! back to their defaults, so an empty `()` file is valid.

use crate::error::{ReimportError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings file name
pub const CONFIG_FILE_NAME: &str = "reimport.ron";

/// Reimport settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReimportConfig {
    /// Extensions of scene definitions routed to reconciliation
    pub scene_extensions: Vec<String>,
    /// Quiet period before a batch of file changes is accepted
    pub debounce_ms: u64,
    /// Carry fold and editable-children flags across replacement
    pub restore_editor_state: bool,
    /// Reopen tabs whose own definition was reimported
    pub reload_open_sources: bool,
    /// Default tracing filter directive
    pub log_filter: String,
}

impl Default for ReimportConfig {
    fn default() -> Self {
        Self {
            scene_extensions: vec!["scn".to_string(), "scene".to_string()],
            debounce_ms: 250,
            restore_editor_state: true,
            reload_open_sources: true,
            log_filter: "info".to_string(),
        }
    }
}

impl ReimportConfig {
    /// Load settings from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ReimportConfig = ron::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `reimport.ron` from a project directory, or use defaults when
    /// the file does not exist
    pub fn load_or_default(project_dir: &Path) -> Result<Self> {
        let path = Self::config_file_path(project_dir);
        if path.exists() {
            tracing::info!("Loading reimport settings from {:?}", path);
            Self::load(&path)
        } else {
            tracing::debug!("No {} in {:?}, using defaults", CONFIG_FILE_NAME, project_dir);
            Ok(Self::default())
        }
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        let content = ron::ser::to_string_pretty(self, config)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the settings file path for a project directory
    pub fn config_file_path(project_dir: &Path) -> PathBuf {
        project_dir.join(CONFIG_FILE_NAME)
    }

    /// Whether `path` names a scene definition
    pub fn is_scene_path(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                self.scene_extensions
                    .iter()
                    .any(|s| s.eq_ignore_ascii_case(ext))
            })
    }

    fn validate(&self) -> Result<()> {
        if self.scene_extensions.is_empty() {
            return Err(ReimportError::Config(
                "scene_extensions must name at least one extension".to_string(),
            ));
        }
        if self.scene_extensions.iter().any(|e| e.starts_with('.')) {
            return Err(ReimportError::Config(
                "scene_extensions are written without a leading dot".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ReimportConfig::default();
        assert!(config.is_scene_path(Path::new("levels/forest.scn")));
        assert!(config.is_scene_path(Path::new("levels/FOREST.SCN")));
        assert!(!config.is_scene_path(Path::new("textures/bark.png")));
        assert!(!config.is_scene_path(Path::new("Makefile")));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: ReimportConfig = ron::from_str("(debounce_ms: 50)").unwrap();
        assert_eq!(config.debounce_ms, 50);
        assert!(config.restore_editor_state);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_save_and_load() {
        let dir = std::env::temp_dir().join(format!("ordoplay_reimport_config_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();

        assert_eq!(ReimportConfig::load_or_default(&dir).unwrap(), ReimportConfig::default());

        let config = ReimportConfig {
            reload_open_sources: false,
            scene_extensions: vec!["tscn".to_string()],
            ..Default::default()
        };
        config.save(&ReimportConfig::config_file_path(&dir)).unwrap();
        assert_eq!(ReimportConfig::load_or_default(&dir).unwrap(), config);

        std::fs::write(ReimportConfig::config_file_path(&dir), "(scene_extensions: [])").unwrap();
        assert!(matches!(
            ReimportConfig::load_or_default(&dir),
            Err(ReimportError::Config(_))
        ));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
