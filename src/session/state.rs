//! Provisioning session lifecycle.

use serde::Serialize;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Uninitialized,
    ResolvingRuntime,
    AuditingPackages,
    Installing,
    Ready,
    Degraded,
    Failed,
}

impl SessionState {
    /// Whether a run has finished in this state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready | Self::Degraded | Self::Failed)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Uninitialized => "uninitialized",
            Self::ResolvingRuntime => "resolving runtime",
            Self::AuditingPackages => "auditing packages",
            Self::Installing => "installing",
            Self::Ready => "ready",
            Self::Degraded => "degraded",
            Self::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}
