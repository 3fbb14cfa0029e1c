//! The repository handle steps run against: Git runner plus configuration.

use crate::config::ProjectConfig;
use crate::git::GitRunner;
use crate::subprocess::SubprocessManager;
use crate::Result;
use std::path::Path;

/// Aggregates the two capabilities every step receives. There is no
/// process-wide singleton; commands construct one handle and pass it down.
pub struct Repo {
    pub git: GitRunner,
    pub config: ProjectConfig,
}

impl Repo {
    /// A handle operating in the process working directory.
    pub async fn new(subprocess: &SubprocessManager) -> Self {
        Self {
            git: GitRunner::new(subprocess.runner()),
            config: ProjectConfig::load(subprocess.runner(), None).await,
        }
    }

    /// A handle pinned to an explicit directory (used by tests).
    pub async fn with_workdir(subprocess: &SubprocessManager, workdir: &Path) -> Self {
        Self {
            git: GitRunner::with_workdir(subprocess.runner(), workdir),
            config: ProjectConfig::load(subprocess.runner(), Some(workdir)).await,
        }
    }

    /// Change the process working directory to the repository root.
    pub async fn navigate_to_root(&self) -> Result<()> {
        let root = self.git.root_directory().await?;
        let current = std::env::current_dir()?;
        if current != root {
            std::env::set_current_dir(&root)?;
        }
        Ok(())
    }
}
