//! Batched package installation into a resolved runtime.
//!
//! Every install spec goes into a single `install --upgrade` invocation, so
//! running the installer again on a satisfied runtime changes nothing. Output
//! is streamed line by line to the provisioning log; the last lines are kept
//! for the failure report.

use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

use super::auditor::PackageAuditor;
use super::requirements::RequirementSet;
use crate::error::{Result, RunwayError};
use crate::runtime::{CommandResolver, RuntimeDescriptor};
use crate::session::ProvisioningLog;
use crate::shell::{CommandSpec, OutputLine, OutputTail, ProcessRunner};

/// Lines of installer output kept for failure reports.
pub const DEFAULT_TAIL_LINES: usize = 20;

/// Runs the package installer.
pub struct PackageInstaller {
    runner: Arc<dyn ProcessRunner>,
    resolver: Option<CommandResolver>,
    tail_lines: usize,
}

impl PackageInstaller {
    /// Create an installer that looks for `uv` on `PATH`.
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            runner,
            resolver: CommandResolver::from_env().ok(),
            tail_lines: DEFAULT_TAIL_LINES,
        }
    }

    /// Look for `uv` with this resolver instead of `PATH`.
    pub fn with_resolver(mut self, resolver: CommandResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_tail_lines(mut self, lines: usize) -> Self {
        self.tail_lines = lines;
        self
    }

    /// The single invocation that installs the whole set.
    pub fn install_command(&self, runtime: &RuntimeDescriptor, set: &RequirementSet) -> CommandSpec {
        let uv = self.resolver.as_ref().and_then(|r| r.resolve("uv"));
        let spec = match uv {
            Some(uv) => CommandSpec::new(uv)
                .args(["pip", "install", "--upgrade", "--python"])
                .arg(runtime.path.display().to_string()),
            None => CommandSpec::new(&runtime.path)
                .args(["-m", "pip", "install", "--upgrade"])
                .env("PIP_DISABLE_PIP_VERSION_CHECK", "1"),
        };
        spec.args(set.install_specs())
    }

    /// Install or upgrade every requirement in one batch.
    ///
    /// An empty set spawns nothing.
    pub async fn install(
        &self,
        runtime: &RuntimeDescriptor,
        set: &RequirementSet,
        log: &ProvisioningLog,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if set.is_empty() {
            return Ok(());
        }

        let spec = self.install_command(runtime, set);
        log.append(format!("Installing {}", set.install_specs().join(" ")));
        tracing::info!("Installing packages: {}", spec.display());

        let tail = Mutex::new(OutputTail::new(self.tail_lines));
        let on_line = |line: OutputLine| {
            log.append(line.text());
            tail.lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(line.text());
        };

        let result = match self.runner.run_streaming(&spec, &on_line, cancel).await {
            Ok(result) => result,
            Err(RunwayError::Cancelled) => {
                log.append("Installation cancelled");
                return Err(RunwayError::Cancelled);
            }
            Err(e) => {
                return Err(RunwayError::InstallFailed {
                    code: None,
                    tail: e.to_string(),
                })
            }
        };

        if result.success {
            log.append("Installation finished");
            Ok(())
        } else {
            let tail = tail.lock().unwrap_or_else(|e| e.into_inner()).render();
            tracing::warn!("Installer exited with {:?}", result.exit_code);
            Err(RunwayError::InstallFailed {
                code: result.exit_code,
                tail,
            })
        }
    }

    /// Audit first and install only when something is missing.
    ///
    /// `before_install` is called with the missing names right before the
    /// installer runs. Returns the names that were missing before
    /// installation. Fails with [`RunwayError::AuditInconsistent`] when the
    /// installer succeeded but imports still fail.
    pub async fn ensure_installed(
        &self,
        auditor: &PackageAuditor,
        runtime: &RuntimeDescriptor,
        set: &RequirementSet,
        log: &ProvisioningLog,
        cancel: &CancellationToken,
        before_install: &(dyn Fn(&[String]) + Send + Sync),
    ) -> Result<Vec<String>> {
        let missing = auditor.missing(runtime, set).await;
        if missing.is_empty() {
            return Ok(missing);
        }

        log.append(format!("Missing packages: {}", missing.join(", ")));
        before_install(&missing);
        self.install_and_verify(auditor, runtime, set, log, cancel)
            .await?;
        Ok(missing)
    }

    /// Install every requirement without auditing first, then verify.
    pub async fn reinstall(
        &self,
        auditor: &PackageAuditor,
        runtime: &RuntimeDescriptor,
        set: &RequirementSet,
        log: &ProvisioningLog,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.install_and_verify(auditor, runtime, set, log, cancel)
            .await
    }

    async fn install_and_verify(
        &self,
        auditor: &PackageAuditor,
        runtime: &RuntimeDescriptor,
        set: &RequirementSet,
        log: &ProvisioningLog,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(RunwayError::Cancelled);
        }
        self.install(runtime, set, log, cancel).await?;

        let still_missing = auditor.missing(runtime, set).await;
        if still_missing.is_empty() {
            Ok(())
        } else {
            Err(RunwayError::AuditInconsistent {
                missing: still_missing,
            })
        }
    }
}

impl std::fmt::Debug for PackageInstaller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageInstaller")
            .field("tail_lines", &self.tail_lines)
            .finish_non_exhaustive()
    }
}
