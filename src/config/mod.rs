//! Configuration loading, merging, and validation.
//!
//! - Schema definitions in [`schema`]
//! - File discovery and loading in [`loader`]
//! - Deep merging in [`merger`]
//! - Validation in [`validator`]
//!
//! # Example
//!
//! ```
//! use runway::config::{load_merged_config, validate};
//! use tempfile::TempDir;
//! use std::fs;
//!
//! let temp = TempDir::new().unwrap();
//! let dir = temp.path().join(".runway");
//! fs::create_dir_all(&dir).unwrap();
//! fs::write(dir.join("config.yml"), "runtime:\n  self_provision: false\n").unwrap();
//!
//! let config = load_merged_config(temp.path()).unwrap();
//! validate(&config).unwrap();
//! assert!(!config.runtime.self_provision);
//! ```
//!
//! # Configuration File Locations
//!
//! runway discovers and merges configuration in this order:
//! 1. User global config (`~/.runway/config.yml`)
//! 2. Project config (`.runway/config.yml`)
//! 3. Local overrides (`.runway/config.local.yml`)

pub mod loader;
pub mod merger;
pub mod schema;
pub mod validator;

pub use loader::{
    find_project_root, load_config, load_config_file, load_config_value, load_merged_config,
    parse_config, ConfigPaths,
};
pub use merger::{deep_merge, merge_configs};
pub use schema::{
    InstallSettings, PackageConfig, RunwayConfig, RuntimeSettings, StorageSettings,
};
pub use validator::{validate, validate_config, ValidationError};
