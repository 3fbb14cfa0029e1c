//! Strategy settings governing how branches integrate updates.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// How feature branches integrate updates from their tracking branch and
/// their parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStrategy {
    Merge,
    Rebase,
}

impl SyncStrategy {
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        match text {
            "merge" | "" => Ok(SyncStrategy::Merge),
            "rebase" => Ok(SyncStrategy::Rebase),
            _ => Err(ConfigError::UnknownSyncStrategy(text.to_string())),
        }
    }
}

impl std::fmt::Display for SyncStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncStrategy::Merge => write!(f, "merge"),
            SyncStrategy::Rebase => write!(f, "rebase"),
        }
    }
}

/// How perennial branches integrate updates from their tracking branch.
/// Defaults to rebase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PullBranchStrategy {
    Merge,
    Rebase,
}

impl PullBranchStrategy {
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        match text {
            "merge" => Ok(PullBranchStrategy::Merge),
            "rebase" | "" => Ok(PullBranchStrategy::Rebase),
            _ => Err(ConfigError::UnknownPullBranchStrategy(text.to_string())),
        }
    }

    /// The equivalent sync strategy, for the shared branch-update steps.
    pub fn as_sync_strategy(&self) -> SyncStrategy {
        match self {
            PullBranchStrategy::Merge => SyncStrategy::Merge,
            PullBranchStrategy::Rebase => SyncStrategy::Rebase,
        }
    }
}

impl std::fmt::Display for PullBranchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PullBranchStrategy::Merge => write!(f, "merge"),
            PullBranchStrategy::Rebase => write!(f, "rebase"),
        }
    }
}
