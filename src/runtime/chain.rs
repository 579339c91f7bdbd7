//! Prioritized runtime candidate sources.
//!
//! Each [`CandidateSource`] either produces a validated runtime or explains
//! why it could not. [`CandidateChain`] tries sources in order and stops at
//! the first success; a rejected source is logged and the next one is tried.
//! A broken executable lookup ends the chain at once, and a failed attempt
//! to build the private environment is reported instead of `NoRuntimeFound`.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::descriptor::{RuntimeDescriptor, RuntimeOrigin};
use super::host::HostInterpreter;
use super::resolver::CommandResolver;
use super::version::{MinimumVersion, VersionProbe};
use crate::error::{Result, RunwayError};
use crate::provision::EnvironmentProvisioner;
use crate::session::ProvisioningLog;

/// One strategy for obtaining a runtime.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Short name used in log lines.
    fn name(&self) -> &str;

    /// Produce a validated runtime or the reason this source does not apply.
    async fn try_resolve(
        &self,
        log: &ProvisioningLog,
        cancel: &CancellationToken,
    ) -> Result<RuntimeDescriptor>;
}

fn skipped(reason: impl Into<String>) -> RunwayError {
    RunwayError::CandidateSkipped {
        reason: reason.into(),
    }
}

/// Explicit interpreter path from configuration or the command line.
#[derive(Debug, Clone)]
pub struct ConfiguredPathSource {
    path: Option<PathBuf>,
    probe: VersionProbe,
    minimum: MinimumVersion,
}

impl ConfiguredPathSource {
    pub fn new(path: Option<PathBuf>, probe: VersionProbe, minimum: MinimumVersion) -> Self {
        Self {
            path,
            probe,
            minimum,
        }
    }
}

#[async_trait]
impl CandidateSource for ConfiguredPathSource {
    fn name(&self) -> &str {
        "configured path"
    }

    async fn try_resolve(
        &self,
        _log: &ProvisioningLog,
        _cancel: &CancellationToken,
    ) -> Result<RuntimeDescriptor> {
        let path = self
            .path
            .as_ref()
            .ok_or_else(|| skipped("no interpreter path configured"))?;
        if !path.is_file() {
            return Err(skipped(format!("{} does not exist", path.display())));
        }
        let path = std::path::absolute(path)?;
        let version = self.probe.check(&path, self.minimum).await?;
        Ok(RuntimeDescriptor::new(
            path,
            version,
            RuntimeOrigin::UserConfigured,
        ))
    }
}

/// Interpreter chosen by the embedding host.
pub struct HostInterpreterSource {
    host: Arc<dyn HostInterpreter>,
    probe: VersionProbe,
    minimum: MinimumVersion,
}

impl HostInterpreterSource {
    pub fn new(host: Arc<dyn HostInterpreter>, probe: VersionProbe, minimum: MinimumVersion) -> Self {
        Self {
            host,
            probe,
            minimum,
        }
    }
}

#[async_trait]
impl CandidateSource for HostInterpreterSource {
    fn name(&self) -> &str {
        "host interpreter"
    }

    async fn try_resolve(
        &self,
        _log: &ProvisioningLog,
        _cancel: &CancellationToken,
    ) -> Result<RuntimeDescriptor> {
        if !self.host.is_present() {
            return Err(skipped(format!("{} integration not present", self.host.name())));
        }
        self.host
            .activate()
            .await
            .map_err(|e| skipped(format!("{} activation failed: {}", self.host.name(), e)))?;
        let path = self
            .host
            .interpreter_path()
            .await
            .ok_or_else(|| skipped(format!("{} has no interpreter selected", self.host.name())))?;
        let version = self.probe.check(&path, self.minimum).await?;
        Ok(RuntimeDescriptor::new(path, version, RuntimeOrigin::HostIde))
    }
}

/// Well-known command names looked up on `PATH`.
#[derive(Debug, Clone)]
pub struct SystemCommandSource {
    commands: Vec<String>,
    resolver: std::result::Result<CommandResolver, String>,
    probe: VersionProbe,
    minimum: MinimumVersion,
}

impl SystemCommandSource {
    /// Look commands up on the process `PATH`.
    pub fn from_env(commands: Vec<String>, probe: VersionProbe, minimum: MinimumVersion) -> Self {
        Self::with_lookup(commands, CommandResolver::from_env(), probe, minimum)
    }

    /// Use the outcome of building a resolver; a failed lookup makes every
    /// resolution fail with [`RunwayError::LookupUnavailable`].
    pub fn with_lookup(
        commands: Vec<String>,
        lookup: Result<CommandResolver>,
        probe: VersionProbe,
        minimum: MinimumVersion,
    ) -> Self {
        Self {
            commands,
            resolver: lookup.map_err(|e| match e {
                RunwayError::LookupUnavailable { message } => message,
                other => other.to_string(),
            }),
            probe,
            minimum,
        }
    }

    /// Look commands up with an explicit resolver.
    pub fn new(
        commands: Vec<String>,
        resolver: CommandResolver,
        probe: VersionProbe,
        minimum: MinimumVersion,
    ) -> Self {
        Self {
            commands,
            resolver: Ok(resolver),
            probe,
            minimum,
        }
    }
}

#[async_trait]
impl CandidateSource for SystemCommandSource {
    fn name(&self) -> &str {
        "system PATH"
    }

    async fn try_resolve(
        &self,
        _log: &ProvisioningLog,
        cancel: &CancellationToken,
    ) -> Result<RuntimeDescriptor> {
        let resolver = self.resolver.as_ref().map_err(|message| {
            RunwayError::LookupUnavailable {
                message: message.clone(),
            }
        })?;

        let mut seen: Vec<PathBuf> = Vec::new();
        let mut reasons = Vec::new();
        for name in &self.commands {
            if cancel.is_cancelled() {
                return Err(RunwayError::Cancelled);
            }
            let Some(path) = resolver.resolve(name) else {
                reasons.push(format!("{}: not found", name));
                continue;
            };
            if seen.contains(&path) {
                continue;
            }
            seen.push(path.clone());
            match self.probe.check(&path, self.minimum).await {
                Ok(version) => {
                    return Ok(RuntimeDescriptor::new(
                        path,
                        version,
                        RuntimeOrigin::SystemPath,
                    ))
                }
                Err(e) => reasons.push(e.to_string()),
            }
        }
        Err(skipped(reasons.join("; ")))
    }
}

/// Private environment under tool storage.
pub struct SelfProvisionedSource {
    provisioner: Arc<EnvironmentProvisioner>,
    enabled: bool,
    reuse_only: bool,
}

impl SelfProvisionedSource {
    pub fn new(provisioner: Arc<EnvironmentProvisioner>, enabled: bool) -> Self {
        Self {
            provisioner,
            enabled,
            reuse_only: false,
        }
    }

    /// Accept an existing environment but never create one.
    pub fn reuse_only(mut self, reuse_only: bool) -> Self {
        self.reuse_only = reuse_only;
        self
    }
}

#[async_trait]
impl CandidateSource for SelfProvisionedSource {
    fn name(&self) -> &str {
        "private environment"
    }

    async fn try_resolve(
        &self,
        log: &ProvisioningLog,
        cancel: &CancellationToken,
    ) -> Result<RuntimeDescriptor> {
        if !self.enabled {
            return Err(skipped("self-provisioning is disabled"));
        }
        if self.reuse_only {
            return self.provisioner.validate_existing().await;
        }
        self.provisioner.ensure(log, cancel).await
    }
}

/// Ordered list of sources with first-success semantics.
#[derive(Default)]
pub struct CandidateChain {
    sources: Vec<Box<dyn CandidateSource>>,
}

impl CandidateChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a source; it is tried after every source already present.
    pub fn with_source(mut self, source: impl CandidateSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn push(&mut self, source: Box<dyn CandidateSource>) {
        self.sources.push(source);
    }

    /// Source names in trial order.
    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Try each source in order and return the first runtime produced.
    ///
    /// Sources after the successful one are never invoked. Cancellation and
    /// [`RunwayError::LookupUnavailable`] stop the chain immediately. When no
    /// source succeeds, the last failure that was not a plain rejection
    /// (such as a failed environment creation) is returned; otherwise
    /// [`RunwayError::NoRuntimeFound`].
    pub async fn resolve(
        &self,
        log: &ProvisioningLog,
        cancel: &CancellationToken,
    ) -> Result<RuntimeDescriptor> {
        let mut failure = None;
        for source in &self.sources {
            if cancel.is_cancelled() {
                return Err(RunwayError::Cancelled);
            }
            tracing::debug!("Trying runtime source: {}", source.name());
            match source.try_resolve(log, cancel).await {
                Ok(runtime) => {
                    log.append(format!("Found {}", runtime));
                    tracing::info!("Runtime resolved via {}: {}", source.name(), runtime.path.display());
                    return Ok(runtime);
                }
                Err(RunwayError::Cancelled) => return Err(RunwayError::Cancelled),
                Err(e @ RunwayError::LookupUnavailable { .. }) => {
                    log.append(format!("Cannot search for {}: {}", source.name(), e));
                    return Err(e);
                }
                Err(e) if e.is_candidate_rejection() => {
                    log.append(format!("Skipped {}: {}", source.name(), e));
                    tracing::debug!("Runtime source {} rejected: {}", source.name(), e);
                }
                Err(e) => {
                    log.append(format!("{} failed: {}", source.name(), e));
                    tracing::info!("Runtime source {} failed: {}", source.name(), e);
                    failure = Some(e);
                }
            }
        }
        Err(failure.unwrap_or(RunwayError::NoRuntimeFound))
    }
}

impl std::fmt::Debug for CandidateChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandidateChain")
            .field("sources", &self.source_names())
            .finish()
    }
}
