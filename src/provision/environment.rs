//! Private, disposable Python environment under tool storage.
//!
//! The environment is created with `uv venv` when `uv` is available (uv can
//! download a suitable interpreter on its own) and with `<python> -m venv`
//! otherwise. An existing environment is reused only while its interpreter
//! still validates; anything else is removed and rebuilt.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::error::{Result, RunwayError};
use crate::runtime::host::venv_interpreter;
use crate::runtime::{
    CommandResolver, MinimumVersion, RuntimeDescriptor, RuntimeOrigin, VersionProbe,
};
use crate::session::ProvisioningLog;
use crate::shell::{CommandSpec, OutputLine, OutputTail, ProcessRunner};

/// Interpreter version requested from uv when none is configured.
pub const DEFAULT_PROVISION_VERSION: &str = "3.12";

const CREATION_TAIL_LINES: usize = 20;

/// Default location of the private environment for `tool_id`.
pub fn default_env_dir(tool_id: &str) -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(tool_id)
        .join("envs")
        .join("python")
}

/// Program used to create the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bootstrap {
    /// `uv venv`.
    Uv(PathBuf),
    /// `<python> -m venv`.
    Python(PathBuf),
}

impl std::fmt::Display for Bootstrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uv(path) => write!(f, "uv ({})", path.display()),
            Self::Python(path) => write!(f, "{} -m venv", path.display()),
        }
    }
}

/// Creates, validates, and removes the private environment.
pub struct EnvironmentProvisioner {
    env_dir: PathBuf,
    provision_version: String,
    minimum: MinimumVersion,
    bootstrap_commands: Vec<String>,
    runner: Arc<dyn ProcessRunner>,
    probe: VersionProbe,
    resolver: Option<CommandResolver>,
}

impl EnvironmentProvisioner {
    /// Create a provisioner for `env_dir` that resolves bootstraps on `PATH`.
    pub fn new(env_dir: PathBuf, runner: Arc<dyn ProcessRunner>, probe: VersionProbe) -> Self {
        let resolver = match CommandResolver::from_env() {
            Ok(resolver) => Some(resolver),
            Err(e) => {
                tracing::warn!("Bootstrap lookup disabled: {}", e);
                None
            }
        };
        Self {
            env_dir,
            provision_version: DEFAULT_PROVISION_VERSION.to_string(),
            minimum: MinimumVersion::default(),
            bootstrap_commands: vec!["python3".into(), "python".into(), "py".into()],
            runner,
            probe,
            resolver,
        }
    }

    /// Resolve bootstrap programs with this resolver instead of `PATH`.
    pub fn with_resolver(mut self, resolver: CommandResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_minimum(mut self, minimum: MinimumVersion) -> Self {
        self.minimum = minimum;
        self
    }

    /// Interpreter version passed to `uv venv --python`.
    pub fn with_provision_version(mut self, version: impl Into<String>) -> Self {
        self.provision_version = version.into();
        self
    }

    /// Command names tried, in order, for a `-m venv` bootstrap.
    pub fn with_bootstrap_commands(mut self, commands: Vec<String>) -> Self {
        self.bootstrap_commands = commands;
        self
    }

    /// Root directory of the environment.
    pub fn env_dir(&self) -> &Path {
        &self.env_dir
    }

    /// Where the environment's interpreter lives (whether or not it exists).
    pub fn interpreter_path(&self) -> PathBuf {
        venv_interpreter(&self.env_dir)
    }

    /// Whether an environment directory is present on disk.
    pub fn exists(&self) -> bool {
        self.env_dir.exists()
    }

    /// Programs able to create the environment, in preference order.
    pub fn bootstraps(&self) -> Vec<Bootstrap> {
        let Some(resolver) = &self.resolver else {
            return Vec::new();
        };
        let mut found = Vec::new();
        if let Some(uv) = resolver.resolve("uv") {
            found.push(Bootstrap::Uv(uv));
        }
        if let Some(python) = self
            .bootstrap_commands
            .iter()
            .find_map(|name| resolver.resolve(name))
        {
            found.push(Bootstrap::Python(python));
        }
        found
    }

    /// Return a valid environment, creating it if needed.
    ///
    /// An existing environment that validates is returned without spawning
    /// anything beyond the version probe.
    pub async fn ensure(
        &self,
        log: &ProvisioningLog,
        cancel: &CancellationToken,
    ) -> Result<RuntimeDescriptor> {
        let python = self.interpreter_path();
        if python.exists() {
            match self.probe.check(&python, self.minimum).await {
                Ok(version) => {
                    tracing::debug!("Reusing private environment at {}", self.env_dir.display());
                    return Ok(self.descriptor(python, version));
                }
                Err(e) => {
                    log.append(format!("Private environment is unusable ({}); rebuilding", e));
                    tracing::warn!("Rebuilding private environment: {}", e);
                    return self.rebuild(log, cancel).await;
                }
            }
        } else if self.env_dir.exists() {
            log.append("Private environment is incomplete; rebuilding");
            return self.rebuild(log, cancel).await;
        }

        self.create(log, cancel).await
    }

    /// Validate the existing environment without creating or removing anything.
    pub async fn validate_existing(&self) -> Result<RuntimeDescriptor> {
        let python = self.interpreter_path();
        if !python.exists() {
            return Err(RunwayError::CandidateSkipped {
                reason: format!("no private environment at {}", self.env_dir.display()),
            });
        }
        let version = self.probe.check(&python, self.minimum).await?;
        Ok(self.descriptor(python, version))
    }

    /// Remove and recreate the environment.
    pub async fn rebuild(
        &self,
        log: &ProvisioningLog,
        cancel: &CancellationToken,
    ) -> Result<RuntimeDescriptor> {
        self.cleanup()?;
        self.create(log, cancel).await
    }

    /// Remove the environment directory. A missing directory is not an error.
    pub fn cleanup(&self) -> Result<()> {
        match std::fs::remove_dir_all(&self.env_dir) {
            Ok(()) => {
                tracing::info!("Removed {}", self.env_dir.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn create(
        &self,
        log: &ProvisioningLog,
        cancel: &CancellationToken,
    ) -> Result<RuntimeDescriptor> {
        let bootstraps = self.bootstraps();
        if bootstraps.is_empty() {
            return Err(RunwayError::BootstrapUnavailable {
                target: self.env_dir.clone(),
            });
        }

        if let Some(parent) = self.env_dir.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut last_error = None;
        for bootstrap in bootstraps {
            let created = match self.create_with(&bootstrap, log, cancel).await {
                Ok(()) => self.validate_created().await,
                Err(e) => Err(e),
            };
            match created {
                Ok(runtime) => {
                    log.append(format!("Private environment ready: Python {}", runtime.version));
                    return Ok(runtime);
                }
                Err(e) if e.is_cancellation() => {
                    self.cleanup()?;
                    return Err(e);
                }
                Err(e) => {
                    log.append(format!("Environment creation with {} failed", bootstrap));
                    tracing::warn!("{}", e);
                    self.cleanup()?;
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(RunwayError::BootstrapUnavailable {
            target: self.env_dir.clone(),
        }))
    }

    async fn validate_created(&self) -> Result<RuntimeDescriptor> {
        let python = self.interpreter_path();
        match self.probe.check(&python, self.minimum).await {
            Ok(version) => Ok(self.descriptor(python, version)),
            Err(e) => Err(RunwayError::EnvironmentCreationFailed {
                target: self.env_dir.clone(),
                stderr: format!("created environment does not validate: {}", e),
            }),
        }
    }

    async fn create_with(
        &self,
        bootstrap: &Bootstrap,
        log: &ProvisioningLog,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let target = self.env_dir.display().to_string();
        let spec = match bootstrap {
            Bootstrap::Uv(uv) => CommandSpec::new(uv)
                .args(["venv", target.as_str(), "--seed", "--python"])
                .arg(self.provision_version.as_str())
                .env("UV_PYTHON_DOWNLOADS", "automatic"),
            Bootstrap::Python(python) => {
                CommandSpec::new(python).args(["-m", "venv", target.as_str()])
            }
        };

        log.append(format!(
            "Creating private environment at {} with {}",
            target, bootstrap
        ));

        let tail = Mutex::new(OutputTail::new(CREATION_TAIL_LINES));
        let on_line = |line: OutputLine| {
            log.append(line.text());
            tail.lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(line.text());
        };

        let result = self
            .runner
            .run_streaming(&spec, &on_line, cancel)
            .await
            .map_err(|e| match e {
                RunwayError::Cancelled => RunwayError::Cancelled,
                other => RunwayError::EnvironmentCreationFailed {
                    target: self.env_dir.clone(),
                    stderr: other.to_string(),
                },
            })?;

        if result.success {
            Ok(())
        } else {
            let stderr = if result.stderr.trim().is_empty() {
                tail.lock().unwrap_or_else(|e| e.into_inner()).render()
            } else {
                result.stderr.trim().to_string()
            };
            Err(RunwayError::EnvironmentCreationFailed {
                target: self.env_dir.clone(),
                stderr,
            })
        }
    }

    fn descriptor(
        &self,
        path: PathBuf,
        version: crate::runtime::RuntimeVersion,
    ) -> RuntimeDescriptor {
        RuntimeDescriptor::new(path, version, RuntimeOrigin::SelfProvisioned)
    }
}

impl std::fmt::Debug for EnvironmentProvisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvironmentProvisioner")
            .field("env_dir", &self.env_dir)
            .field("provision_version", &self.provision_version)
            .field("minimum", &self.minimum)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::{MockResponse, MockRunner};
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn create_fake_binary(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, "#!/bin/sh\n").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
        }
    }

    struct Fixture {
        temp: TempDir,
        runner: Arc<MockRunner>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                temp: TempDir::new().unwrap(),
                runner: Arc::new(MockRunner::new()),
            }
        }

        fn bin_dir(&self) -> PathBuf {
            self.temp.path().join("bin")
        }

        fn env_dir(&self) -> PathBuf {
            self.temp.path().join("data/runway/envs/python")
        }

        fn provisioner(&self) -> EnvironmentProvisioner {
            let probe = VersionProbe::new(self.runner.clone(), Duration::from_millis(100));
            EnvironmentProvisioner::new(self.env_dir(), self.runner.clone(), probe)
                .with_resolver(CommandResolver::new(vec![self.bin_dir()]).with_extensions(vec![]))
        }

        fn interpreter(&self) -> PathBuf {
            venv_interpreter(&self.env_dir())
        }

        fn on_interpreter_version(&self, response: MockResponse) {
            self.runner.on(
                &format!("{} --version", self.interpreter().display()),
                response,
            );
        }
    }

    #[tokio::test]
    async fn reuses_valid_environment_without_creating() {
        let fx = Fixture::new();
        create_fake_binary(&fx.interpreter());
        create_fake_binary(&fx.bin_dir().join("uv"));
        fx.on_interpreter_version(MockResponse::success("Python 3.12.1"));

        let rt = fx
            .provisioner()
            .ensure(&ProvisioningLog::discard(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(rt.origin, RuntimeOrigin::SelfProvisioned);
        assert_eq!(rt.path, fx.interpreter());
        assert_eq!(fx.runner.count(&fx.bin_dir().join("uv").display().to_string()), 0);
    }

    #[tokio::test]
    async fn creates_with_uv_when_available() {
        let fx = Fixture::new();
        let uv = fx.bin_dir().join("uv");
        create_fake_binary(&uv);
        fx.runner
            .on(&format!("{} venv", uv.display()), MockResponse::success("Using CPython 3.12.4"));
        fx.on_interpreter_version(MockResponse::success("Python 3.12.4"));

        let log = ProvisioningLog::discard();
        let rt = fx
            .provisioner()
            .ensure(&log, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(rt.version.to_string(), "3.12.4");
        let invocations = fx.runner.invocations();
        let create = invocations
            .iter()
            .find(|line| line.contains(" venv "))
            .unwrap();
        assert!(create.ends_with("--seed --python 3.12"));
        assert!(log.lines().iter().any(|l| l.text == "Using CPython 3.12.4"));
    }

    #[tokio::test]
    async fn falls_back_to_python_venv_without_uv() {
        let fx = Fixture::new();
        let python = fx.bin_dir().join("python3");
        create_fake_binary(&python);
        fx.runner
            .on(&format!("{} -m venv", python.display()), MockResponse::success(""));
        fx.on_interpreter_version(MockResponse::success("Python 3.11.9"));

        let rt = fx
            .provisioner()
            .ensure(&ProvisioningLog::discard(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(rt.version.to_string(), "3.11.9");
        assert_eq!(fx.runner.count(&format!("{} -m venv", python.display())), 1);
    }

    #[tokio::test]
    async fn no_bootstrap_is_reported() {
        let fx = Fixture::new();
        let err = fx
            .provisioner()
            .ensure(&ProvisioningLog::discard(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RunwayError::BootstrapUnavailable { .. }));
    }

    #[tokio::test]
    async fn creation_failure_carries_stderr() {
        let fx = Fixture::new();
        let uv = fx.bin_dir().join("uv");
        create_fake_binary(&uv);
        fx.runner.on(
            &format!("{} venv", uv.display()),
            MockResponse::failure(2, "error: No interpreter found for Python 3.12"),
        );

        let err = fx
            .provisioner()
            .ensure(&ProvisioningLog::discard(), &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            RunwayError::EnvironmentCreationFailed { stderr, .. } => {
                assert!(stderr.contains("No interpreter found"));
            }
            other => panic!("Expected EnvironmentCreationFailed, got {:?}", other),
        }
        assert!(!fx.env_dir().exists());
    }

    #[tokio::test]
    async fn corrupted_environment_is_rebuilt() {
        let fx = Fixture::new();
        create_fake_binary(&fx.interpreter());
        let uv = fx.bin_dir().join("uv");
        create_fake_binary(&uv);
        fx.on_interpreter_version(MockResponse::success("\0\0garbage"));
        fx.runner
            .on(&format!("{} venv", uv.display()), MockResponse::success(""));

        // The mock cannot write the new interpreter; the rebuilt environment
        // still probes as garbage and is discarded.
        let err = fx
            .provisioner()
            .ensure(&ProvisioningLog::discard(), &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            RunwayError::EnvironmentCreationFailed { stderr, .. } => {
                assert!(stderr.contains("did not report a usable version"));
            }
            other => panic!("Expected EnvironmentCreationFailed, got {:?}", other),
        }
        assert_eq!(fx.runner.count(&format!("{} venv", uv.display())), 1);
        assert!(!fx.env_dir().exists());
    }

    #[tokio::test]
    async fn unusable_uv_environment_falls_back_to_python_venv() {
        let fx = Fixture::new();
        let uv = fx.bin_dir().join("uv");
        let python = fx.bin_dir().join("python3");
        create_fake_binary(&uv);
        create_fake_binary(&python);
        fx.runner
            .on(&format!("{} venv", uv.display()), MockResponse::success(""));
        fx.runner
            .on(&format!("{} -m venv", python.display()), MockResponse::success(""));
        fx.runner.on_sequence(
            &format!("{} --version", fx.interpreter().display()),
            vec![
                MockResponse::success("Python 3.8.10"),
                MockResponse::success("Python 3.12.3"),
            ],
        );
        let sink = Arc::new(crate::session::MemorySink::new());

        let rt = fx
            .provisioner()
            .with_minimum(MinimumVersion::new(3, 11))
            .ensure(&ProvisioningLog::new(sink.clone()), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(rt.version.to_string(), "3.12.3");
        assert_eq!(fx.runner.count(&format!("{} venv", uv.display())), 1);
        assert_eq!(fx.runner.count(&format!("{} -m venv", python.display())), 1);
        assert!(sink.contains(&format!("Environment creation with uv ({}) failed", uv.display())));
    }

    #[tokio::test]
    async fn cancelled_creation_removes_partial_environment() {
        let fx = Fixture::new();
        let uv = fx.bin_dir().join("uv");
        create_fake_binary(&uv);
        fx.runner
            .on(&format!("{} venv", uv.display()), MockResponse::until_cancelled());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = fx
            .provisioner()
            .ensure(&ProvisioningLog::discard(), &cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancellation());
        assert!(!fx.env_dir().exists());
    }

    #[tokio::test]
    async fn validate_existing_never_creates() {
        let fx = Fixture::new();
        create_fake_binary(&fx.bin_dir().join("uv"));
        let err = fx.provisioner().validate_existing().await.unwrap_err();
        assert!(matches!(err, RunwayError::CandidateSkipped { .. }));
        assert!(fx.runner.invocations().is_empty());
        assert!(!fx.env_dir().exists());
    }

    #[test]
    fn cleanup_tolerates_missing_directory() {
        let fx = Fixture::new();
        assert!(fx.provisioner().cleanup().is_ok());
    }

    #[test]
    fn cleanup_removes_environment() {
        let fx = Fixture::new();
        create_fake_binary(&fx.interpreter());
        let provisioner = fx.provisioner();
        assert!(provisioner.exists());
        provisioner.cleanup().unwrap();
        assert!(!provisioner.exists());
    }

    #[test]
    fn default_env_dir_is_keyed_by_tool() {
        let dir = default_env_dir("runway");
        assert!(dir.ends_with("runway/envs/python"));
    }
}
