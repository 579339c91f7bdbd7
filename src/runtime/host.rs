//! Host interpreter integration.
//!
//! An embedding host (an editor extension, a launcher) may already know which
//! interpreter the user picked. It exposes that through [`HostInterpreter`];
//! the candidate chain consults it before searching the lookup path.

use async_trait::async_trait;
use std::path::PathBuf;

use crate::error::Result;

/// The host's notion of a selected interpreter.
#[async_trait]
pub trait HostInterpreter: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Whether the integration is available at all.
    fn is_present(&self) -> bool;

    /// Prepare the integration for queries. Failure skips the source.
    async fn activate(&self) -> Result<()>;

    /// The selected interpreter, if any.
    async fn interpreter_path(&self) -> Option<PathBuf>;
}

/// No host integration.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHost;

#[async_trait]
impl HostInterpreter for NoHost {
    fn name(&self) -> &str {
        "host"
    }

    fn is_present(&self) -> bool {
        false
    }

    async fn activate(&self) -> Result<()> {
        Ok(())
    }

    async fn interpreter_path(&self) -> Option<PathBuf> {
        None
    }
}

/// Treats an activated virtual environment (`VIRTUAL_ENV`) as the host's choice.
#[derive(Debug, Clone, Default)]
pub struct ActiveVirtualEnv {
    root: Option<PathBuf>,
}

impl ActiveVirtualEnv {
    /// Read `VIRTUAL_ENV` from the process environment.
    pub fn from_env() -> Self {
        Self::with_root(std::env::var_os("VIRTUAL_ENV").map(PathBuf::from))
    }

    /// Use an explicit environment root.
    pub fn with_root(root: Option<PathBuf>) -> Self {
        Self {
            root: root.filter(|p| !p.as_os_str().is_empty()),
        }
    }
}

/// Interpreter location inside a virtual environment root.
pub fn venv_interpreter(root: &std::path::Path) -> PathBuf {
    if cfg!(windows) {
        root.join("Scripts").join("python.exe")
    } else {
        root.join("bin").join("python")
    }
}

#[async_trait]
impl HostInterpreter for ActiveVirtualEnv {
    fn name(&self) -> &str {
        "VIRTUAL_ENV"
    }

    fn is_present(&self) -> bool {
        self.root.is_some()
    }

    async fn activate(&self) -> Result<()> {
        Ok(())
    }

    async fn interpreter_path(&self) -> Option<PathBuf> {
        self.root
            .as_deref()
            .map(venv_interpreter)
            .filter(|p| p.is_file())
    }
}
