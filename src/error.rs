//! Error types for runway operations.
//!
//! This module defines [`RunwayError`], the primary error type used throughout
//! the crate, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Candidate rejections (`VersionInvalid`, `VersionTooOld`) are recovered
//!   locally by the candidate chain and never reach the host on their own
//! - Install and audit failures carry the captured output so the user can act
//! - `Cancelled` is distinct from every failure; hosts should not alert on it
//! - Use `anyhow::Error` (via `RunwayError::Other`) for unexpected errors

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for runway operations.
#[derive(Debug, Error)]
pub enum RunwayError {
    /// Configuration file not found at expected location.
    #[error("Configuration not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Failed to parse configuration file.
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParseError { path: PathBuf, message: String },

    /// Invalid configuration structure or values.
    #[error("Invalid configuration: {message}")]
    ConfigValidationError { message: String },

    /// The host's executable lookup mechanism is unusable (e.g. no PATH).
    #[error("Executable lookup unavailable: {message}")]
    LookupUnavailable { message: String },

    /// The candidate did not report a recognizable version.
    #[error("'{path}' did not report a usable version")]
    VersionInvalid { path: PathBuf },

    /// The candidate reported a version below the minimum.
    #[error("'{path}' is version {found}, need at least {required}")]
    VersionTooOld {
        path: PathBuf,
        found: String,
        required: String,
    },

    /// A candidate source did not apply or rejected every runtime it saw.
    #[error("{reason}")]
    CandidateSkipped { reason: String },

    /// No runtime could be found to create the isolated environment.
    #[error("No bootstrap runtime available to create the environment at {target}")]
    BootstrapUnavailable { target: PathBuf },

    /// The environment creation command exited unsuccessfully.
    #[error("Environment creation failed at {target}: {stderr}")]
    EnvironmentCreationFailed { target: PathBuf, stderr: String },

    /// Every candidate source was tried and rejected.
    #[error("No runtime found")]
    NoRuntimeFound,

    /// The package install command exited unsuccessfully.
    #[error("Package installation failed (exit code {code:?}):\n{tail}")]
    InstallFailed { code: Option<i32>, tail: String },

    /// Installation reported success but packages still fail their import probe.
    #[error(
        "Packages still missing after a successful install: {}. \
         Check that each install spec provides its import name.",
        .missing.join(", ")
    )]
    AuditInconsistent { missing: Vec<String> },

    /// The operation was cancelled by the user or a host shutdown.
    #[error("Provisioning cancelled")]
    Cancelled,

    /// A child process could not be started.
    #[error("Failed to start '{command}': {message}")]
    SpawnFailed { command: String, message: String },

    /// A bounded child process did not finish in time and was killed.
    #[error("Command timed out after {}s: {command}", .timeout.as_secs())]
    CommandTimedOut {
        command: String,
        timeout: std::time::Duration,
    },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RunwayError {
    /// Whether this error represents a cancellation rather than a failure.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Whether a candidate source merely declined; the chain moves on.
    pub fn is_candidate_rejection(&self) -> bool {
        matches!(
            self,
            Self::CandidateSkipped { .. } | Self::VersionInvalid { .. } | Self::VersionTooOld { .. }
        )
    }
}

/// Result type alias for runway operations.
pub type Result<T> = std::result::Result<T, RunwayError>;
