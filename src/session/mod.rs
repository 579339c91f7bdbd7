//! Provisioning session: the orchestrator hosts talk to.
//!
//! A [`ProvisioningSession`] owns the resolved runtime for its lifetime. It
//! drives the candidate chain, then the package audit, then (if needed) the
//! installer, and caches the terminal result:
//!
//! ```text
//! Uninitialized -> ResolvingRuntime -> AuditingPackages -> Ready
//!                        |                   |     \-> Degraded (auto_install off)
//!                        v                   v
//!                      Failed            Installing -> Ready | Failed
//! ```
//!
//! Only one run is ever in flight; concurrent callers wait for it and get
//! the same result.
//!
//! # Example
//!
//! ```no_run
//! use runway::session::ProvisioningSession;
//! use runway::config::RunwayConfig;
//!
//! # async fn demo() {
//! let session = ProvisioningSession::builder()
//!     .config(&RunwayConfig::default())
//!     .build();
//! let result = session.ensure_runtime().await;
//! if let Some(runtime) = result.runtime() {
//!     println!("{}", runtime.path.display());
//! }
//! # }
//! ```

pub mod builder;
pub mod log;
pub mod result;
pub mod state;

pub use builder::SessionBuilder;
pub use log::{LogLine, LogSink, MemorySink, NullSink, ProvisioningLog};
pub use result::{FailureReason, ProvisioningResult};
pub use state::SessionState;

use std::sync::{Arc, Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::error::{Result, RunwayError};
use crate::provision::{
    EnvironmentProvisioner, PackageAuditor, PackageInstaller, PackageStatus, RequirementSet,
};
use crate::runtime::{CandidateChain, RuntimeDescriptor};

#[derive(Debug, Clone)]
struct CachedResult {
    result: ProvisioningResult,
    fingerprint: String,
}

/// Orchestrates runtime resolution and package provisioning.
pub struct ProvisioningSession {
    chain: CandidateChain,
    provisioner: Arc<EnvironmentProvisioner>,
    auditor: PackageAuditor,
    installer: PackageInstaller,
    requirements: RwLock<RequirementSet>,
    auto_install: bool,
    log: Arc<ProvisioningLog>,
    cancel: Mutex<CancellationToken>,
    flight: tokio::sync::Mutex<()>,
    cached: RwLock<Option<CachedResult>>,
    state: RwLock<SessionState>,
}

impl ProvisioningSession {
    /// Start building a session.
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// Resolve a runtime and make sure every requirement imports.
    ///
    /// The first call does the work; later calls return the cached result.
    /// A cached runtime whose binary has disappeared is resolved again, and a
    /// changed requirement set is re-audited against the cached runtime.
    pub async fn ensure_runtime(&self) -> ProvisioningResult {
        let _flight = self.flight.lock().await;
        let requirements = self.requirements();
        let fingerprint = requirements.fingerprint();

        if let Some(cached) = self.cached() {
            match cached.result.runtime().cloned() {
                None => return cached.result,
                Some(runtime) if !runtime.still_exists() => {
                    self.log.append(format!(
                        "Cached runtime {} no longer exists; resolving again",
                        runtime.path.display()
                    ));
                    tracing::info!("Cached runtime vanished: {}", runtime.path.display());
                    self.clear_cache();
                }
                Some(runtime) => {
                    if cached.fingerprint == fingerprint {
                        return cached.result;
                    }
                    tracing::info!("Requirement set changed; auditing cached runtime");
                    let result = self.provision_packages(runtime, &requirements, false).await;
                    return self.store(result, fingerprint);
                }
            }
        }

        let result = self.run(&requirements, false).await;
        self.store(result, fingerprint)
    }

    /// Drop every cached result, remove the private environment, and
    /// provision from scratch with a forced install.
    pub async fn invalidate_and_reprovision(&self) -> ProvisioningResult {
        let _flight = self.flight.lock().await;
        let requirements = self.requirements();
        let fingerprint = requirements.fingerprint();

        self.clear_cache();
        self.set_state(SessionState::Uninitialized);
        self.reset_cancel();
        self.log.append("Reinstalling: discarding cached runtime");

        if let Err(e) = self.provisioner.cleanup() {
            let result = self.fail(e);
            return self.store(result, fingerprint);
        }

        let result = self.run(&requirements, true).await;
        self.store(result, fingerprint)
    }

    /// The cached runtime, if the last run produced one. Never blocks on I/O.
    pub fn current_runtime(&self) -> Option<RuntimeDescriptor> {
        self.cached()
            .and_then(|cached| cached.result.runtime().cloned())
    }

    /// The cached result of the last run, if any.
    pub fn last_result(&self) -> Option<ProvisioningResult> {
        self.cached().map(|cached| cached.result)
    }

    /// Replace the requirement set.
    ///
    /// Nothing is re-audited until the next [`ensure_runtime`](Self::ensure_runtime).
    pub fn set_requirements(&self, requirements: RequirementSet) {
        *self
            .requirements
            .write()
            .unwrap_or_else(|e| e.into_inner()) = requirements;
    }

    pub fn requirements(&self) -> RequirementSet {
        self.requirements
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn state(&self) -> SessionState {
        *self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    /// The session's provisioning log.
    pub fn log(&self) -> &ProvisioningLog {
        &self.log
    }

    /// Cancel the in-flight run. Its child process is killed and the run
    /// ends as `Failed(Cancelled)`.
    pub fn cancel(&self) {
        self.cancel
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .cancel();
    }

    /// Resolve a runtime through the chain without auditing or installing.
    pub async fn resolve_runtime(&self) -> Result<RuntimeDescriptor> {
        let _flight = self.flight.lock().await;
        self.chain.resolve(&self.log, &self.token()).await
    }

    /// Import status and installed version of each requirement on `runtime`.
    pub async fn package_report(&self, runtime: &RuntimeDescriptor) -> Vec<PackageStatus> {
        self.auditor.report(runtime, &self.requirements()).await
    }

    /// Remove the private environment and forget the cached result.
    pub async fn clean(&self) -> Result<()> {
        let _flight = self.flight.lock().await;
        self.clear_cache();
        self.set_state(SessionState::Uninitialized);
        self.provisioner.cleanup()
    }

    /// Location of the private environment.
    pub fn env_dir(&self) -> &std::path::Path {
        self.provisioner.env_dir()
    }

    async fn run(&self, requirements: &RequirementSet, force_install: bool) -> ProvisioningResult {
        self.set_state(SessionState::ResolvingRuntime);
        let cancel = self.token();

        let runtime = match self.chain.resolve(&self.log, &cancel).await {
            Ok(runtime) => runtime,
            Err(e) => return self.fail(e),
        };

        self.provision_packages(runtime, requirements, force_install)
            .await
    }

    async fn provision_packages(
        &self,
        runtime: RuntimeDescriptor,
        requirements: &RequirementSet,
        force_install: bool,
    ) -> ProvisioningResult {
        let cancel = self.token();

        let outcome = if force_install {
            self.set_state(SessionState::Installing);
            self.installer
                .reinstall(&self.auditor, &runtime, requirements, &self.log, &cancel)
                .await
        } else if self.auto_install {
            self.set_state(SessionState::AuditingPackages);
            self.installer
                .ensure_installed(
                    &self.auditor,
                    &runtime,
                    requirements,
                    &self.log,
                    &cancel,
                    &|_: &[String]| self.set_state(SessionState::Installing),
                )
                .await
                .map(|_| ())
        } else {
            self.set_state(SessionState::AuditingPackages);
            let missing = self.auditor.missing(&runtime, requirements).await;
            if !missing.is_empty() {
                self.log.append(format!(
                    "Missing packages (automatic install disabled): {}",
                    missing.join(", ")
                ));
                self.set_state(SessionState::Degraded);
                return ProvisioningResult::Degraded(runtime, missing);
            }
            Ok(())
        };

        match outcome {
            Ok(()) => self.ready(runtime),
            Err(e) => self.fail(e),
        }
    }

    fn ready(&self, runtime: RuntimeDescriptor) -> ProvisioningResult {
        self.log.append(format!("Ready: {}", runtime));
        tracing::info!("Runtime ready: {}", runtime);
        self.set_state(SessionState::Ready);
        ProvisioningResult::Ready(runtime)
    }

    fn fail(&self, err: RunwayError) -> ProvisioningResult {
        let reason = FailureReason::from(&err);
        if reason.is_cancellation() {
            self.log.append("Provisioning cancelled");
            tracing::info!("Provisioning cancelled");
        } else {
            self.log.append(format!("Provisioning failed: {}", reason));
            tracing::info!("Provisioning failed: {}", err);
        }
        self.set_state(SessionState::Failed);
        ProvisioningResult::Failed(reason)
    }

    fn store(&self, result: ProvisioningResult, fingerprint: String) -> ProvisioningResult {
        *self.cached.write().unwrap_or_else(|e| e.into_inner()) = Some(CachedResult {
            result: result.clone(),
            fingerprint,
        });
        result
    }

    fn cached(&self) -> Option<CachedResult> {
        self.cached.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn clear_cache(&self) {
        *self.cached.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    fn set_state(&self, state: SessionState) {
        tracing::debug!("Session state: {}", state);
        *self.state.write().unwrap_or_else(|e| e.into_inner()) = state;
    }

    fn token(&self) -> CancellationToken {
        self.cancel
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn reset_cancel(&self) {
        *self.cancel.lock().unwrap_or_else(|e| e.into_inner()) = CancellationToken::new();
    }
}

impl std::fmt::Debug for ProvisioningSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvisioningSession")
            .field("chain", &self.chain)
            .field("state", &self.state())
            .field("auto_install", &self.auto_install)
            .finish_non_exhaustive()
    }
}
