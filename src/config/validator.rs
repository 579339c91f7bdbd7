//! Configuration validation rules.
//!
//! All problems are collected so the user can fix them in one pass.

use crate::config::schema::RunwayConfig;
use crate::error::{Result, RunwayError};
use crate::runtime::MinimumVersion;
use std::collections::HashSet;

/// One validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Rule identifier
    pub rule: &'static str,
    /// Human-readable error message
    pub message: String,
}

impl ValidationError {
    fn new(rule: &'static str, message: impl Into<String>) -> Self {
        Self {
            rule,
            message: message.into(),
        }
    }
}

/// Whether `name` is a dotted sequence of Python identifiers (`a.b_c`).
fn is_import_name(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
                && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
        })
}

/// Validate a configuration and return every error found.
pub fn validate_config(config: &RunwayConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.tool_id.trim().is_empty() {
        errors.push(ValidationError::new("empty-tool-id", "tool_id must not be empty"));
    } else if config.tool_id.contains(['/', '\\']) || config.tool_id.starts_with('.') {
        errors.push(ValidationError::new(
            "invalid-tool-id",
            format!("tool_id '{}' must be a plain directory name", config.tool_id),
        ));
    }

    if let Err(message) = config.runtime.min_version.parse::<MinimumVersion>() {
        errors.push(ValidationError::new(
            "invalid-min-version",
            format!("runtime.min_version: {}", message),
        ));
    }

    if config.runtime.commands.is_empty() {
        errors.push(ValidationError::new(
            "empty-commands",
            "runtime.commands must list at least one command name",
        ));
    }

    if config.runtime.probe_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "zero-timeout",
            "runtime.probe_timeout_secs must be greater than zero",
        ));
    }

    let mut seen = HashSet::new();
    for (index, package) in config.packages.iter().enumerate() {
        if package.name.trim().is_empty() {
            errors.push(ValidationError::new(
                "empty-package-name",
                format!("packages[{}] has an empty name", index),
            ));
            continue;
        }
        if !seen.insert(package.name.as_str()) {
            errors.push(ValidationError::new(
                "duplicate-package",
                format!("Package '{}' is listed more than once", package.name),
            ));
        }
        if !is_import_name(&package.import_name) {
            errors.push(ValidationError::new(
                "invalid-import-name",
                format!(
                    "Package '{}' has import_name '{}', which is not a valid module name",
                    package.name, package.import_name
                ),
            ));
        }
        if matches!(&package.spec, Some(spec) if spec.trim().is_empty()) {
            errors.push(ValidationError::new(
                "empty-spec",
                format!("Package '{}' has an empty spec", package.name),
            ));
        }
    }

    errors
}

/// Validate configuration, failing with every message joined.
///
/// # Errors
///
/// Returns `ConfigValidationError` if any validation rules fail.
pub fn validate(config: &RunwayConfig) -> Result<()> {
    let errors = validate_config(config);

    if errors.is_empty() {
        Ok(())
    } else {
        let messages: Vec<_> = errors.iter().map(|e| e.message.clone()).collect();
        Err(RunwayError::ConfigValidationError {
            message: messages.join("; "),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::PackageConfig;

    fn package(name: &str, import_name: &str) -> PackageConfig {
        PackageConfig {
            name: name.into(),
            import_name: import_name.into(),
            spec: None,
        }
    }

    fn rules(config: &RunwayConfig) -> Vec<&'static str> {
        validate_config(config).iter().map(|e| e.rule).collect()
    }

    #[test]
    fn default_config_is_valid() {
        assert!(validate(&RunwayConfig::default()).is_ok());
    }

    #[test]
    fn rejects_unparseable_min_version() {
        let mut config = RunwayConfig::default();
        config.runtime.min_version = "three".into();
        assert_eq!(rules(&config), vec!["invalid-min-version"]);
    }

    #[test]
    fn rejects_empty_commands() {
        let mut config = RunwayConfig::default();
        config.runtime.commands.clear();
        assert_eq!(rules(&config), vec!["empty-commands"]);
    }

    #[test]
    fn rejects_duplicate_packages() {
        let mut config = RunwayConfig::default();
        config.packages = vec![package("requests", "requests"), package("requests", "requests")];
        assert_eq!(rules(&config), vec!["duplicate-package"]);
    }

    #[test]
    fn rejects_bad_import_names() {
        let mut config = RunwayConfig::default();
        config.packages = vec![
            package("a", "zotero-mcp"),
            package("b", "1abc"),
            package("c", "pkg..sub"),
            package("d", ""),
        ];
        assert_eq!(rules(&config).len(), 4);
    }

    #[test]
    fn accepts_dotted_import_names() {
        assert!(is_import_name("google.protobuf"));
        assert!(is_import_name("_private"));
        assert!(!is_import_name("has space"));
    }

    #[test]
    fn rejects_path_like_tool_id() {
        let mut config = RunwayConfig::default();
        config.tool_id = "../escape".into();
        assert_eq!(rules(&config), vec!["invalid-tool-id"]);
    }

    #[test]
    fn collects_multiple_errors() {
        let mut config = RunwayConfig::default();
        config.runtime.commands.clear();
        config.runtime.probe_timeout_secs = 0;
        let err = validate(&config).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("runtime.commands"));
        assert!(msg.contains("probe_timeout_secs"));
    }
}
