//! Configuration schema definitions for runway.
//!
//! These structs map to the YAML configuration file format.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::provision::{PackageRequirement, RequirementSet};

/// Root configuration structure for `config.yml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunwayConfig {
    /// Identity used to key tool-private storage.
    pub tool_id: String,

    /// Runtime discovery settings
    pub runtime: RuntimeSettings,

    /// Package installation settings
    pub install: InstallSettings,

    /// Storage location overrides
    pub storage: StorageSettings,

    /// Required packages; replaces the defaults when present
    pub packages: Vec<PackageConfig>,
}

impl Default for RunwayConfig {
    fn default() -> Self {
        Self {
            tool_id: default_tool_id(),
            runtime: RuntimeSettings::default(),
            install: InstallSettings::default(),
            storage: StorageSettings::default(),
            packages: default_packages(),
        }
    }
}

impl RunwayConfig {
    /// The configured packages as a requirement set.
    pub fn requirements(&self) -> RequirementSet {
        RequirementSet::from(
            self.packages
                .iter()
                .map(PackageConfig::to_requirement)
                .collect::<Vec<_>>(),
        )
    }

    /// Directory of the private environment.
    pub fn env_dir(&self) -> PathBuf {
        match &self.storage.dir {
            Some(dir) => dir.join("envs").join("python"),
            None => crate::provision::default_env_dir(&self.tool_id),
        }
    }
}

fn default_tool_id() -> String {
    "runway".to_string()
}

fn default_packages() -> Vec<PackageConfig> {
    RequirementSet::defaults()
        .iter()
        .map(|r| PackageConfig {
            name: r.name.clone(),
            import_name: r.import_name.clone(),
            spec: Some(r.install_spec.clone()),
        })
        .collect()
}

/// How the runtime is discovered and validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Explicit interpreter path, tried before anything else
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Create a private environment when nothing else validates
    pub self_provision: bool,

    /// Lowest acceptable `MAJOR.MINOR`
    pub min_version: String,

    /// Version requested from uv for the private environment
    pub provision_version: String,

    /// Command names searched on PATH, in order
    pub commands: Vec<String>,

    /// Bound on each `--version` probe
    pub probe_timeout_secs: u64,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            path: None,
            self_provision: true,
            min_version: "3.11".to_string(),
            provision_version: crate::provision::environment::DEFAULT_PROVISION_VERSION
                .to_string(),
            commands: vec!["python3".into(), "python".into(), "py".into()],
            probe_timeout_secs: 10,
        }
    }
}

/// Package installation behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallSettings {
    /// Install missing packages; when false a runtime with gaps is reported as degraded
    pub auto_install: bool,

    /// Installer output lines kept for failure reports
    pub output_tail_lines: usize,
}

impl Default for InstallSettings {
    fn default() -> Self {
        Self {
            auto_install: true,
            output_tail_lines: crate::provision::installer::DEFAULT_TAIL_LINES,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Root for tool-private data instead of the platform data directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

/// One required package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageConfig {
    /// Distribution name
    pub name: String,

    /// Module probed with `import`
    pub import_name: String,

    /// Installer argument; defaults to `name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<String>,
}

impl PackageConfig {
    pub fn to_requirement(&self) -> PackageRequirement {
        PackageRequirement::new(
            self.name.clone(),
            self.import_name.clone(),
            self.spec.clone().unwrap_or_else(|| self.name.clone()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_yields_defaults() {
        let config: RunwayConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, RunwayConfig::default());
        assert_eq!(config.tool_id, "runway");
        assert!(config.runtime.self_provision);
        assert_eq!(config.runtime.min_version, "3.11");
        assert_eq!(config.runtime.commands, vec!["python3", "python", "py"]);
        assert!(config.install.auto_install);
        assert_eq!(config.install.output_tail_lines, 20);
    }

    #[test]
    fn default_packages_match_default_requirements() {
        assert_eq!(
            RunwayConfig::default().requirements(),
            RequirementSet::defaults()
        );
    }

    #[test]
    fn partial_runtime_section_keeps_other_defaults() {
        let config: RunwayConfig = serde_yaml::from_str(
            r#"
runtime:
  path: /opt/python/bin/python3
  self_provision: false
"#,
        )
        .unwrap();
        assert_eq!(
            config.runtime.path,
            Some(PathBuf::from("/opt/python/bin/python3"))
        );
        assert!(!config.runtime.self_provision);
        assert_eq!(config.runtime.probe_timeout_secs, 10);
    }

    #[test]
    fn package_spec_defaults_to_name() {
        let config: RunwayConfig = serde_yaml::from_str(
            r#"
packages:
  - name: requests
    import_name: requests
"#,
        )
        .unwrap();
        let set = config.requirements();
        assert_eq!(set.len(), 1);
        assert_eq!(set.install_specs(), vec!["requests"]);
    }

    #[test]
    fn storage_dir_overrides_env_location() {
        let mut config = RunwayConfig::default();
        config.storage.dir = Some(PathBuf::from("/srv/runway"));
        assert_eq!(config.env_dir(), PathBuf::from("/srv/runway/envs/python"));
    }

    #[test]
    fn default_env_dir_uses_tool_id() {
        let mut config = RunwayConfig::default();
        config.tool_id = "zotero-assistant".into();
        assert!(config.env_dir().ends_with("zotero-assistant/envs/python"));
    }
}
