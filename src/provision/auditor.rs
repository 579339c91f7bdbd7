//! Import probes against a resolved runtime.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use super::requirements::{PackageRequirement, RequirementSet};
use crate::runtime::RuntimeDescriptor;
use crate::shell::{CommandSpec, ProcessRunner};

/// Script run with `-c`; the module name arrives as `sys.argv[1]`.
pub const IMPORT_PROBE: &str = "import importlib, sys; importlib.import_module(sys.argv[1])";

/// Script printing the installed distribution version of `sys.argv[1]`.
pub const VERSION_QUERY: &str =
    "import importlib.metadata as m, sys; print(m.version(sys.argv[1]))";

/// Default bound on one import probe.
pub const DEFAULT_AUDIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Import status of one requirement, for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageStatus {
    pub name: String,
    pub import_name: String,
    pub satisfied: bool,
    pub installed_version: Option<String>,
}

/// Checks whether requirements are importable. Never modifies anything.
#[derive(Clone)]
pub struct PackageAuditor {
    runner: Arc<dyn ProcessRunner>,
    timeout: Duration,
}

impl PackageAuditor {
    pub fn new(runner: Arc<dyn ProcessRunner>, timeout: Duration) -> Self {
        Self { runner, timeout }
    }

    /// Command line used to probe one import.
    pub fn import_probe(runtime: &RuntimeDescriptor, import_name: &str) -> CommandSpec {
        CommandSpec::new(&runtime.path).args(["-c", IMPORT_PROBE, import_name])
    }

    /// Whether `requirement` imports cleanly. Timeouts and spawn errors count as missing.
    pub async fn is_satisfied(
        &self,
        runtime: &RuntimeDescriptor,
        requirement: &PackageRequirement,
    ) -> bool {
        let spec = Self::import_probe(runtime, &requirement.import_name);
        match self.runner.run(&spec, self.timeout).await {
            Ok(result) => {
                if !result.success {
                    tracing::debug!(
                        "import {} failed: {}",
                        requirement.import_name,
                        result.stderr.lines().last().unwrap_or("").trim()
                    );
                }
                result.success
            }
            Err(e) => {
                tracing::debug!("import probe for {} failed: {}", requirement.import_name, e);
                false
            }
        }
    }

    /// Names of unsatisfied requirements, in set order.
    pub async fn missing(&self, runtime: &RuntimeDescriptor, set: &RequirementSet) -> Vec<String> {
        let mut missing = Vec::new();
        for requirement in set {
            if !self.is_satisfied(runtime, requirement).await {
                missing.push(requirement.name.clone());
            }
        }
        missing
    }

    /// Installed distribution version of `name`, if the runtime reports one.
    pub async fn installed_version(&self, runtime: &RuntimeDescriptor, name: &str) -> Option<String> {
        let spec = CommandSpec::new(&runtime.path).args(["-c", VERSION_QUERY, name]);
        match self.runner.run(&spec, self.timeout).await {
            Ok(result) if result.success => {
                let version = result.stdout.trim();
                (!version.is_empty()).then(|| version.to_string())
            }
            _ => None,
        }
    }

    /// Import status and installed version of every requirement, in set order.
    pub async fn report(&self, runtime: &RuntimeDescriptor, set: &RequirementSet) -> Vec<PackageStatus> {
        let mut statuses = Vec::with_capacity(set.len());
        for requirement in set {
            let satisfied = self.is_satisfied(runtime, requirement).await;
            let installed_version = self.installed_version(runtime, &requirement.name).await;
            statuses.push(PackageStatus {
                name: requirement.name.clone(),
                import_name: requirement.import_name.clone(),
                satisfied,
                installed_version,
            });
        }
        statuses
    }
}

impl std::fmt::Debug for PackageAuditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageAuditor")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
