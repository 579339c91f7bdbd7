//! Configuration file discovery and loading.
//!
//! This module handles finding and loading configuration files from
//! various locations in the correct priority order. Every file is optional;
//! with none present the defaults apply.

use crate::config::merger::merge_configs;
use crate::config::schema::RunwayConfig;
use crate::error::{Result, RunwayError};
use std::fs;
use std::path::{Path, PathBuf};

/// Directory holding runway configuration, both per user and per project.
pub const CONFIG_DIR: &str = ".runway";

/// Paths to configuration files in priority order (later overrides earlier).
///
/// Merge order:
/// 1. User global config (`~/.runway/config.yml`)
/// 2. Project config (`.runway/config.yml`)
/// 3. Local overrides (`.runway/config.local.yml`)
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    /// User's global config: ~/.runway/config.yml
    pub user_global: Option<PathBuf>,

    /// Project config: .runway/config.yml
    pub project: Option<PathBuf>,

    /// Local overrides: .runway/config.local.yml
    pub project_local: Option<PathBuf>,
}

impl ConfigPaths {
    /// Discover config files for the given project root.
    pub fn discover(project_root: &Path) -> Self {
        Self::discover_with_home(project_root, dirs::home_dir().as_deref())
    }

    /// Discover config files with an explicit home directory.
    pub fn discover_with_home(project_root: &Path, home: Option<&Path>) -> Self {
        Self {
            user_global: home.and_then(|h| existing(h.join(CONFIG_DIR).join("config.yml"))),
            project: existing(project_root.join(CONFIG_DIR).join("config.yml")),
            project_local: existing(project_root.join(CONFIG_DIR).join("config.local.yml")),
        }
    }

    /// Returns all existing config paths in merge order.
    pub fn all_existing(&self) -> Vec<&PathBuf> {
        [&self.user_global, &self.project, &self.project_local]
            .into_iter()
            .flatten()
            .collect()
    }
}

fn existing(path: PathBuf) -> Option<PathBuf> {
    path.exists().then_some(path)
}

/// Find the project root by walking up from `start`.
///
/// Looks for a `.runway` directory first, then `.git`.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        if current.join(CONFIG_DIR).is_dir() {
            return Some(current);
        }

        if current.join(".git").exists() {
            return Some(current);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load a config file as a raw YAML value (for merging).
///
/// An empty file loads as an empty mapping.
///
/// # Errors
///
/// Returns `ConfigNotFound` if the file doesn't exist.
/// Returns `ConfigParseError` if the YAML is invalid.
pub fn load_config_value(path: &Path) -> Result<serde_yaml::Value> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            RunwayError::ConfigNotFound {
                path: path.to_path_buf(),
            }
        } else {
            RunwayError::Io(e)
        }
    })?;

    let value: serde_yaml::Value =
        serde_yaml::from_str(&content).map_err(|e| RunwayError::ConfigParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    Ok(if value.is_null() {
        serde_yaml::Value::Mapping(Default::default())
    } else {
        value
    })
}

/// Parse YAML content into a config.
pub fn parse_config(content: &str, source_path: &Path) -> Result<RunwayConfig> {
    if content.trim().is_empty() {
        return Ok(RunwayConfig::default());
    }
    serde_yaml::from_str(content).map_err(|e| RunwayError::ConfigParseError {
        path: source_path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load a single config file.
pub fn load_config_file(path: &Path) -> Result<RunwayConfig> {
    let value = load_config_value(path)?;
    serde_yaml::from_value(value).map_err(|e| RunwayError::ConfigParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Merge every discovered config file into one typed config.
pub fn load_from_paths(paths: &ConfigPaths, project_root: &Path) -> Result<RunwayConfig> {
    let mut configs = Vec::new();
    for path in paths.all_existing() {
        tracing::debug!("Loading config from {}", path.display());
        configs.push(load_config_value(path)?);
    }

    let merged = merge_configs(&configs);
    serde_yaml::from_value(merged).map_err(|e| RunwayError::ConfigParseError {
        path: project_root.join(CONFIG_DIR).join("config.yml"),
        message: format!("Failed to parse merged config: {}", e),
    })
}

/// Load and merge all config files for a project.
pub fn load_merged_config(project_root: &Path) -> Result<RunwayConfig> {
    load_from_paths(&ConfigPaths::discover(project_root), project_root)
}

/// Load config with optional path override.
///
/// If `config_override` is provided, loads only that file without merging.
/// Otherwise, discovers and merges all config files.
pub fn load_config(project_root: &Path, config_override: Option<&Path>) -> Result<RunwayConfig> {
    match config_override {
        Some(path) => load_config_file(path),
        None => load_merged_config(project_root),
    }
}
