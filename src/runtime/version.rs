//! Runtime version parsing, comparison, and probing.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use crate::error::{Result, RunwayError};
use crate::shell::{CommandSpec, ProcessRunner};

/// Default bound on a single `--version` probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// A version reported by a runtime binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RuntimeVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: Option<u32>,
}

impl RuntimeVersion {
    /// Create a version from its components.
    pub fn new(major: u32, minor: u32, patch: Option<u32>) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for RuntimeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.patch {
            Some(patch) => write!(f, "{}.{}.{}", self.major, self.minor, patch),
            None => write!(f, "{}.{}", self.major, self.minor),
        }
    }
}

/// The lowest acceptable `(major, minor)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MinimumVersion {
    pub major: u32,
    pub minor: u32,
}

impl MinimumVersion {
    /// Create a minimum version.
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Whether `version` is at least this minimum.
    ///
    /// The patch component never matters: 3.11.0 satisfies 3.11.
    pub fn accepts(&self, version: &RuntimeVersion) -> bool {
        version.major > self.major || (version.major == self.major && version.minor >= self.minor)
    }
}

impl Default for MinimumVersion {
    fn default() -> Self {
        Self::new(3, 11)
    }
}

impl fmt::Display for MinimumVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for MinimumVersion {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut parts = s.trim().split('.');
        let major = parts
            .next()
            .and_then(|p| p.parse::<u32>().ok())
            .ok_or_else(|| format!("invalid minimum version '{}': expected MAJOR.MINOR", s))?;
        let minor = match parts.next() {
            Some(p) => p
                .parse::<u32>()
                .map_err(|_| format!("invalid minimum version '{}': expected MAJOR.MINOR", s))?,
            None => 0,
        };
        if parts.next().is_some() {
            return Err(format!(
                "invalid minimum version '{}': expected MAJOR.MINOR",
                s
            ));
        }
        Ok(Self::new(major, minor))
    }
}

static VERSION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bpython\s+(\d+)\.(\d+)(?:\.(\d+))?").unwrap());

/// Extract a version from `--version` output.
///
/// Tolerates surrounding noise (banners, trailing build tags such as
/// `3.13.0rc1`); anything without a `Python X.Y` token is `None`.
pub fn parse_version_output(output: &str) -> Option<RuntimeVersion> {
    let caps = VERSION_PATTERN.captures(output)?;
    let major = caps.get(1)?.as_str().parse().ok()?;
    let minor = caps.get(2)?.as_str().parse().ok()?;
    let patch = caps.get(3).and_then(|m| m.as_str().parse().ok());
    Some(RuntimeVersion::new(major, minor, patch))
}

/// Runs candidate binaries with `--version` and judges the result.
#[derive(Clone)]
pub struct VersionProbe {
    runner: Arc<dyn ProcessRunner>,
    timeout: Duration,
}

impl VersionProbe {
    /// Create a probe that runs candidates through `runner`.
    pub fn new(runner: Arc<dyn ProcessRunner>, timeout: Duration) -> Self {
        Self { runner, timeout }
    }

    /// The per-probe timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Ask `path` for its version.
    ///
    /// Spawn failures, non-zero exits, timeouts, and unrecognizable output
    /// all yield `None`.
    pub async fn probe(&self, path: &Path) -> Option<RuntimeVersion> {
        let spec = CommandSpec::new(path).arg("--version");
        match self.runner.run(&spec, self.timeout).await {
            Ok(result) if result.success => {
                let version = parse_version_output(&result.combined_output());
                if version.is_none() {
                    tracing::debug!(
                        "Unrecognized version output from {}: {:?}",
                        path.display(),
                        result.combined_output().trim()
                    );
                }
                version
            }
            Ok(result) => {
                tracing::debug!(
                    "{} --version exited with {:?}",
                    path.display(),
                    result.exit_code
                );
                None
            }
            Err(e) => {
                tracing::debug!("Version probe of {} failed: {}", path.display(), e);
                None
            }
        }
    }

    /// Probe `path` and require at least `minimum`.
    pub async fn check(&self, path: &Path, minimum: MinimumVersion) -> Result<RuntimeVersion> {
        let version = self
            .probe(path)
            .await
            .ok_or_else(|| RunwayError::VersionInvalid {
                path: path.to_path_buf(),
            })?;

        if minimum.accepts(&version) {
            Ok(version)
        } else {
            Err(RunwayError::VersionTooOld {
                path: path.to_path_buf(),
                found: version.to_string(),
                required: minimum.to_string(),
            })
        }
    }
}

impl fmt::Debug for VersionProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionProbe")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::{MockResponse, MockRunner};
    use std::path::PathBuf;

    fn v(major: u32, minor: u32, patch: u32) -> RuntimeVersion {
        RuntimeVersion::new(major, minor, Some(patch))
    }

    #[test]
    fn accepts_matches_at_least_rule() {
        let min = MinimumVersion::new(3, 11);
        assert!(min.accepts(&v(3, 11, 0)));
        assert!(!min.accepts(&v(3, 10, 9)));
        assert!(min.accepts(&v(4, 0, 0)));
        assert!(min.accepts(&v(3, 12, 1)));
        assert!(!min.accepts(&v(2, 99, 0)));
    }

    #[test]
    fn accepts_agrees_with_formula_over_grid() {
        for min_major in 2..=4 {
            for min_minor in 0..=13 {
                let min = MinimumVersion::new(min_major, min_minor);
                for major in 1..=5 {
                    for minor in 0..=14 {
                        let version = v(major, minor, 0);
                        let expected =
                            major > min_major || (major == min_major && minor >= min_minor);
                        assert_eq!(min.accepts(&version), expected, "{} vs {}", version, min);
                    }
                }
            }
        }
    }

    #[test]
    fn parses_standard_output() {
        assert_eq!(parse_version_output("Python 3.12.1\n"), Some(v(3, 12, 1)));
    }

    #[test]
    fn parses_two_component_and_prerelease() {
        assert_eq!(
            parse_version_output("Python 3.11"),
            Some(RuntimeVersion::new(3, 11, None))
        );
        assert_eq!(parse_version_output("Python 3.13.0rc1"), Some(v(3, 13, 0)));
    }

    #[test]
    fn parses_with_surrounding_noise() {
        let out = "Could not find platform dependent libraries\nPython 3.10.4 (main)\n";
        assert_eq!(parse_version_output(out), Some(v(3, 10, 4)));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_version_output("\0\0\0CORRUPTED"), None);
        assert_eq!(parse_version_output("node v20.1.0"), None);
        assert_eq!(parse_version_output(""), None);
    }

    #[test]
    fn minimum_version_from_str() {
        assert_eq!(
            "3.11".parse::<MinimumVersion>(),
            Ok(MinimumVersion::new(3, 11))
        );
        assert_eq!("3".parse::<MinimumVersion>(), Ok(MinimumVersion::new(3, 0)));
        assert!("3.x".parse::<MinimumVersion>().is_err());
        assert!("3.11.2".parse::<MinimumVersion>().is_err());
        assert!("".parse::<MinimumVersion>().is_err());
    }

    #[test]
    fn display_formats() {
        assert_eq!(v(3, 12, 1).to_string(), "3.12.1");
        assert_eq!(RuntimeVersion::new(3, 12, None).to_string(), "3.12");
        assert_eq!(MinimumVersion::new(3, 11).to_string(), "3.11");
    }

    fn probe_with(response: MockResponse) -> (VersionProbe, Arc<MockRunner>) {
        let runner = Arc::new(MockRunner::new());
        runner.on("/opt/py --version", response);
        (
            VersionProbe::new(runner.clone(), Duration::from_millis(50)),
            runner,
        )
    }

    #[tokio::test]
    async fn probe_reads_stderr_output() {
        let (probe, _) = probe_with(MockResponse::success("").with_stderr("Python 3.11.2"));
        assert_eq!(probe.probe(Path::new("/opt/py")).await, Some(v(3, 11, 2)));
    }

    #[tokio::test]
    async fn probe_treats_timeout_as_invalid() {
        let (probe, _) = probe_with(MockResponse::timeout());
        assert_eq!(probe.probe(Path::new("/opt/py")).await, None);
    }

    #[tokio::test]
    async fn probe_treats_nonzero_exit_as_invalid() {
        let (probe, _) = probe_with(MockResponse::failure(1, "Python 3.12.0"));
        assert_eq!(probe.probe(Path::new("/opt/py")).await, None);
    }

    #[tokio::test]
    async fn check_rejects_old_version() {
        let (probe, _) = probe_with(MockResponse::success("Python 3.9.6"));
        let err = probe
            .check(Path::new("/opt/py"), MinimumVersion::new(3, 11))
            .await
            .unwrap_err();
        match err {
            RunwayError::VersionTooOld {
                path,
                found,
                required,
            } => {
                assert_eq!(path, PathBuf::from("/opt/py"));
                assert_eq!(found, "3.9.6");
                assert_eq!(required, "3.11");
            }
            other => panic!("Expected VersionTooOld, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn check_reports_invalid_output() {
        let (probe, _) = probe_with(MockResponse::success("garbage"));
        let err = probe
            .check(Path::new("/opt/py"), MinimumVersion::new(3, 11))
            .await
            .unwrap_err();
        assert!(matches!(err, RunwayError::VersionInvalid { .. }));
    }

    #[tokio::test]
    async fn check_spawns_exactly_one_process() {
        let (probe, runner) = probe_with(MockResponse::success("Python 3.12.1"));
        probe
            .check(Path::new("/opt/py"), MinimumVersion::new(3, 11))
            .await
            .unwrap();
        assert_eq!(runner.invocations().len(), 1);
    }
}
