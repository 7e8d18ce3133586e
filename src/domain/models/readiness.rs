//! Model readiness state machine

use serde::{Deserialize, Serialize};

/// Lifecycle of the process-wide generation model.
///
/// `NotLoaded -> Loading -> Ready` on success and `Loading -> Failed` on error.
/// `Failed -> Loading` is only reachable through an explicit load call; nothing
/// retries automatically. `Ready` is terminal: there is no hot swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessState {
    NotLoaded,
    Loading,
    Ready,
    Failed,
}

impl ReadinessState {
    pub const fn is_ready(self) -> bool {
        matches!(self, Self::Ready)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotLoaded => "not_loaded",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }

    /// Check if a transition to `next` is allowed
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::NotLoaded | Self::Failed, Self::Loading)
                | (Self::Loading, Self::Ready | Self::Failed)
        )
    }
}

impl Default for ReadinessState {
    fn default() -> Self {
        Self::NotLoaded
    }
}

impl std::fmt::Display for ReadinessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
