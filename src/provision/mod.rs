//! Private environment creation and package provisioning.

pub mod auditor;
pub mod environment;
pub mod installer;
pub mod requirements;

pub use auditor::{PackageAuditor, PackageStatus, DEFAULT_AUDIT_TIMEOUT};
pub use environment::{default_env_dir, Bootstrap, EnvironmentProvisioner};
pub use installer::PackageInstaller;
pub use requirements::{PackageRequirement, RequirementSet};
