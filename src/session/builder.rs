//! Session construction.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::log::{LogSink, NullSink, ProvisioningLog};
use super::state::SessionState;
use super::ProvisioningSession;
use crate::config::RunwayConfig;
use crate::provision::{
    default_env_dir, EnvironmentProvisioner, PackageAuditor, PackageInstaller, RequirementSet,
    DEFAULT_AUDIT_TIMEOUT,
};
use crate::runtime::{
    CandidateChain, CommandResolver, ConfiguredPathSource, HostInterpreter,
    HostInterpreterSource, MinimumVersion, NoHost, SelfProvisionedSource, SystemCommandSource,
    VersionProbe, DEFAULT_PROBE_TIMEOUT,
};
use crate::shell::{ProcessRunner, SystemRunner};

/// Builder for [`ProvisioningSession`].
///
/// Defaults: system processes, no host integration, `PATH` lookup, the
/// default requirement set, self-provisioning and automatic install enabled.
pub struct SessionBuilder {
    runner: Option<Arc<dyn ProcessRunner>>,
    host: Arc<dyn HostInterpreter>,
    sink: Arc<dyn LogSink>,
    configured_path: Option<PathBuf>,
    commands: Vec<String>,
    minimum: MinimumVersion,
    provision_version: String,
    probe_timeout: Duration,
    audit_timeout: Duration,
    self_provision: bool,
    reuse_only: bool,
    env_dir: PathBuf,
    lookup_path: Option<Vec<PathBuf>>,
    requirements: RequirementSet,
    auto_install: bool,
    tail_lines: usize,
    chain: Option<CandidateChain>,
}

impl SessionBuilder {
    pub fn new() -> Self {
        let defaults = RunwayConfig::default();
        Self {
            runner: None,
            host: Arc::new(NoHost),
            sink: Arc::new(NullSink),
            configured_path: None,
            commands: defaults.runtime.commands,
            minimum: MinimumVersion::default(),
            provision_version: defaults.runtime.provision_version,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            audit_timeout: DEFAULT_AUDIT_TIMEOUT,
            self_provision: true,
            reuse_only: false,
            env_dir: default_env_dir(&defaults.tool_id),
            lookup_path: None,
            requirements: RequirementSet::defaults(),
            auto_install: true,
            tail_lines: defaults.install.output_tail_lines,
            chain: None,
        }
    }

    /// Apply every setting from a loaded configuration.
    ///
    /// An unparseable `min_version` keeps the default; run
    /// [`validate`](crate::config::validate) first to report it.
    pub fn config(mut self, config: &RunwayConfig) -> Self {
        self.configured_path = config.runtime.path.clone();
        self.self_provision = config.runtime.self_provision;
        match config.runtime.min_version.parse() {
            Ok(minimum) => self.minimum = minimum,
            Err(e) => tracing::warn!("Ignoring min_version: {}", e),
        }
        self.provision_version = config.runtime.provision_version.clone();
        self.commands = config.runtime.commands.clone();
        self.probe_timeout = Duration::from_secs(config.runtime.probe_timeout_secs);
        self.auto_install = config.install.auto_install;
        self.tail_lines = config.install.output_tail_lines;
        self.env_dir = config.env_dir();
        self.requirements = config.requirements();
        self
    }

    /// Run child processes through `runner`.
    pub fn runner(mut self, runner: Arc<dyn ProcessRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    pub fn host(mut self, host: Arc<dyn HostInterpreter>) -> Self {
        self.host = host;
        self
    }

    /// Forward log lines to `sink`.
    pub fn sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Explicit interpreter path, tried first.
    pub fn python_path(mut self, path: Option<PathBuf>) -> Self {
        self.configured_path = path;
        self
    }

    pub fn commands(mut self, commands: Vec<String>) -> Self {
        self.commands = commands;
        self
    }

    pub fn minimum(mut self, minimum: MinimumVersion) -> Self {
        self.minimum = minimum;
        self
    }

    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn audit_timeout(mut self, timeout: Duration) -> Self {
        self.audit_timeout = timeout;
        self
    }

    pub fn self_provision(mut self, enabled: bool) -> Self {
        self.self_provision = enabled;
        self
    }

    /// Accept an existing private environment but never create one.
    pub fn reuse_only(mut self, reuse_only: bool) -> Self {
        self.reuse_only = reuse_only;
        self
    }

    pub fn env_dir(mut self, dir: PathBuf) -> Self {
        self.env_dir = dir;
        self
    }

    /// Search these directories instead of `PATH` for commands and `uv`.
    pub fn lookup_path(mut self, entries: Vec<PathBuf>) -> Self {
        self.lookup_path = Some(entries);
        self
    }

    pub fn requirements(mut self, requirements: RequirementSet) -> Self {
        self.requirements = requirements;
        self
    }

    pub fn auto_install(mut self, enabled: bool) -> Self {
        self.auto_install = enabled;
        self
    }

    /// Use a custom candidate chain instead of the standard four sources.
    pub fn chain(mut self, chain: CandidateChain) -> Self {
        self.chain = Some(chain);
        self
    }

    pub fn build(self) -> ProvisioningSession {
        let runner: Arc<dyn ProcessRunner> = self.runner.unwrap_or_else(|| Arc::new(SystemRunner));
        let probe = VersionProbe::new(runner.clone(), self.probe_timeout);
        let resolver = self.lookup_path.map(CommandResolver::new);

        let mut provisioner = EnvironmentProvisioner::new(self.env_dir, runner.clone(), probe.clone())
            .with_minimum(self.minimum)
            .with_provision_version(self.provision_version)
            .with_bootstrap_commands(self.commands.clone());
        let mut installer = PackageInstaller::new(runner.clone()).with_tail_lines(self.tail_lines);
        if let Some(resolver) = &resolver {
            provisioner = provisioner.with_resolver(resolver.clone());
            installer = installer.with_resolver(resolver.clone());
        }
        let provisioner = Arc::new(provisioner);

        let chain = match self.chain {
            Some(chain) => chain,
            None => {
                let system = match resolver {
                    Some(resolver) => {
                        SystemCommandSource::new(self.commands, resolver, probe.clone(), self.minimum)
                    }
                    None => SystemCommandSource::from_env(self.commands, probe.clone(), self.minimum),
                };
                CandidateChain::new()
                    .with_source(ConfiguredPathSource::new(
                        self.configured_path,
                        probe.clone(),
                        self.minimum,
                    ))
                    .with_source(HostInterpreterSource::new(self.host, probe, self.minimum))
                    .with_source(system)
                    .with_source(
                        SelfProvisionedSource::new(provisioner.clone(), self.self_provision)
                            .reuse_only(self.reuse_only),
                    )
            }
        };

        ProvisioningSession {
            chain,
            provisioner,
            auditor: PackageAuditor::new(runner, self.audit_timeout),
            installer,
            requirements: RwLock::new(self.requirements),
            auto_install: self.auto_install,
            log: Arc::new(ProvisioningLog::new(self.sink)),
            cancel: Mutex::new(CancellationToken::new()),
            flight: tokio::sync::Mutex::new(()),
            cached: RwLock::new(None),
            state: RwLock::new(SessionState::Uninitialized),
        }
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_chain_has_four_sources_in_priority_order() {
        let session = SessionBuilder::new().lookup_path(Vec::new()).build();
        assert_eq!(
            session.chain.source_names(),
            vec![
                "configured path",
                "host interpreter",
                "system PATH",
                "private environment"
            ]
        );
    }

    #[test]
    fn config_is_applied() {
        let mut config = RunwayConfig::default();
        config.install.auto_install = false;
        config.storage.dir = Some(PathBuf::from("/srv/runway"));
        config.packages.truncate(1);

        let session = SessionBuilder::new().config(&config).build();
        assert!(!session.auto_install);
        assert_eq!(session.requirements().len(), 1);
        assert_eq!(session.env_dir(), PathBuf::from("/srv/runway/envs/python"));
    }

    #[test]
    fn new_session_is_uninitialized() {
        let session = SessionBuilder::new().build();
        assert_eq!(session.state(), SessionState::Uninitialized);
        assert!(session.current_runtime().is_none());
        assert!(session.last_result().is_none());
    }
}
