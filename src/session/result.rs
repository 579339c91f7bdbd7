//! Externally observable provisioning outcomes.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use crate::error::RunwayError;
use crate::runtime::RuntimeDescriptor;

/// Why provisioning failed. A cloneable projection of [`RunwayError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    NoRuntimeFound,
    LookupUnavailable { message: String },
    BootstrapUnavailable { target: PathBuf },
    EnvironmentCreationFailed { target: PathBuf, stderr: String },
    InstallFailed { code: Option<i32>, tail: String },
    AuditInconsistent { missing: Vec<String> },
    Cancelled,
    Other { message: String },
}

impl FailureReason {
    /// Cancellation is not a failure the host should alert on.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<&RunwayError> for FailureReason {
    fn from(err: &RunwayError) -> Self {
        match err {
            RunwayError::NoRuntimeFound => Self::NoRuntimeFound,
            RunwayError::LookupUnavailable { message } => Self::LookupUnavailable {
                message: message.clone(),
            },
            RunwayError::BootstrapUnavailable { target } => Self::BootstrapUnavailable {
                target: target.clone(),
            },
            RunwayError::EnvironmentCreationFailed { target, stderr } => {
                Self::EnvironmentCreationFailed {
                    target: target.clone(),
                    stderr: stderr.clone(),
                }
            }
            RunwayError::InstallFailed { code, tail } => Self::InstallFailed {
                code: *code,
                tail: tail.clone(),
            },
            RunwayError::AuditInconsistent { missing } => Self::AuditInconsistent {
                missing: missing.clone(),
            },
            RunwayError::Cancelled => Self::Cancelled,
            other => Self::Other {
                message: other.to_string(),
            },
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRuntimeFound => write!(
                f,
                "No usable Python runtime found; every candidate source was skipped"
            ),
            Self::LookupUnavailable { message } => write!(f, "Executable lookup unavailable: {}", message),
            Self::BootstrapUnavailable { target } => write!(
                f,
                "Cannot create {}: neither uv nor a Python interpreter is on PATH",
                target.display()
            ),
            Self::EnvironmentCreationFailed { target, stderr } => {
                write!(f, "Environment creation failed at {}:\n{}", target.display(), stderr)
            }
            Self::InstallFailed { code, tail } => match code {
                Some(code) => write!(f, "Package installation failed (exit code {}):\n{}", code, tail),
                None => write!(f, "Package installation failed:\n{}", tail),
            },
            Self::AuditInconsistent { missing } => write!(
                f,
                "Installed but still not importable: {}. Check each package's import name.",
                missing.join(", ")
            ),
            Self::Cancelled => write!(f, "Provisioning cancelled"),
            Self::Other { message } => write!(f, "{}", message),
        }
    }
}

/// Outcome of a provisioning run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningResult {
    /// Runtime resolved and every requirement imports.
    Ready(RuntimeDescriptor),
    /// Runtime resolved but these requirements are missing and were not installed.
    Degraded(RuntimeDescriptor, Vec<String>),
    Failed(FailureReason),
}

impl ProvisioningResult {
    /// The resolved runtime, if there is one.
    pub fn runtime(&self) -> Option<&RuntimeDescriptor> {
        match self {
            Self::Ready(runtime) | Self::Degraded(runtime, _) => Some(runtime),
            Self::Failed(_) => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn failure(&self) -> Option<&FailureReason> {
        match self {
            Self::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    /// Short lowercase label: `ready`, `degraded`, `failed`, or `cancelled`.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ready(_) => "ready",
            Self::Degraded(..) => "degraded",
            Self::Failed(reason) if reason.is_cancellation() => "cancelled",
            Self::Failed(_) => "failed",
        }
    }
}

impl From<RunwayError> for ProvisioningResult {
    fn from(err: RunwayError) -> Self {
        Self::Failed(FailureReason::from(&err))
    }
}
