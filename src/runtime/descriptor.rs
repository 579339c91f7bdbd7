//! Resolved runtime description.

use serde::Serialize;
use std::path::PathBuf;

use super::version::RuntimeVersion;

/// Which candidate source produced a runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeOrigin {
    /// Explicit path from config, `--python`, or `RUNWAY_PYTHON`.
    UserConfigured,
    /// Interpreter selected in the host editor.
    HostIde,
    /// Well-known command name found on the lookup path.
    SystemPath,
    /// Private environment created under tool storage.
    SelfProvisioned,
}

impl std::fmt::Display for RuntimeOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UserConfigured => write!(f, "configured path"),
            Self::HostIde => write!(f, "host interpreter"),
            Self::SystemPath => write!(f, "system PATH"),
            Self::SelfProvisioned => write!(f, "private environment"),
        }
    }
}

/// A validated runtime: absolute path, reported version, and origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuntimeDescriptor {
    pub path: PathBuf,
    pub version: RuntimeVersion,
    pub origin: RuntimeOrigin,
}

impl RuntimeDescriptor {
    pub fn new(path: PathBuf, version: RuntimeVersion, origin: RuntimeOrigin) -> Self {
        Self {
            path,
            version,
            origin,
        }
    }

    /// Whether the interpreter binary is still on disk.
    pub fn still_exists(&self) -> bool {
        self.path.is_file()
    }
}

impl std::fmt::Display for RuntimeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Python {} at {} ({})",
            self.version,
            self.path.display(),
            self.origin
        )
    }
}
