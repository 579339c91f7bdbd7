//! Output verbosity.

use std::str::FromStr;

/// How much the CLI prints while provisioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Print every provisioning log line, including tool output.
    Verbose,
    /// Spinner with the latest log line, then the final status.
    #[default]
    Normal,
    /// Final status only.
    Quiet,
}

impl FromStr for OutputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "verbose" => Ok(Self::Verbose),
            "normal" => Ok(Self::Normal),
            "quiet" => Ok(Self::Quiet),
            _ => Err(format!("unknown output mode: {}", s)),
        }
    }
}

impl OutputMode {
    /// Pick a mode from the global `--verbose` and `--quiet` flags.
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        if quiet {
            Self::Quiet
        } else if verbose {
            Self::Verbose
        } else {
            Self::Normal
        }
    }

    pub fn shows_log_lines(&self) -> bool {
        matches!(self, Self::Verbose)
    }

    pub fn shows_spinner(&self) -> bool {
        matches!(self, Self::Verbose | Self::Normal)
    }
}
