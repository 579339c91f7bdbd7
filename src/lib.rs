//! runway - zero-setup Python runtime provisioning for developer tools.
//!
//! An editor extension or CLI that needs a Python interpreter with specific
//! packages asks a [`ProvisioningSession`] for one. The session finds a
//! usable interpreter (configured path, host interpreter, `PATH`, or a
//! private environment it creates with `uv` or `venv`), makes sure every
//! required package imports, installs what is missing, and caches the
//! result for the rest of the session.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - Configuration loading, merging, and validation
//! - [`error`] - Error types and result aliases
//! - [`provision`] - Private environments, package audit, and install
//! - [`runtime`] - Candidate discovery and version checks
//! - [`session`] - The provisioning state machine and its log
//! - [`shell`] - Child process execution
//! - [`ui`] - Spinners and terminal output
//!
//! # Example
//!
//! ```
//! use runway::runtime::{MinimumVersion, RuntimeVersion};
//!
//! let minimum: MinimumVersion = "3.11".parse().unwrap();
//! assert!(minimum.accepts(&RuntimeVersion::new(3, 12, Some(1))));
//! assert!(!minimum.accepts(&RuntimeVersion::new(3, 10, None)));
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod provision;
pub mod runtime;
pub mod session;
pub mod shell;
pub mod ui;

pub use error::{Result, RunwayError};
pub use provision::{PackageRequirement, RequirementSet};
pub use runtime::{RuntimeDescriptor, RuntimeOrigin};
pub use session::{FailureReason, ProvisioningResult, ProvisioningSession};
