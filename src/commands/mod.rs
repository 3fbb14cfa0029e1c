//! Per-command configuration gathering and step-list builders.
//!
//! Every command follows the same shape: validate the repository, gather a
//! command config from the current repository state, build the step list
//! with a pure builder, and hand the resulting run state to the executor.
//! Builder errors surface as typed failures before any step runs.

pub mod config_cmds;
pub mod rename_branch;
pub mod resume;
pub mod ship;
pub mod sync;

use crate::dialog::UserDialog;
use crate::error::EngineError;
use crate::hosting::{self, Connector};
use crate::repo::Repo;
use crate::runstate;
use crate::Result;

/// Fail unless the working directory is inside a Git repository.
pub async fn ensure_is_repository(repo: &Repo) -> Result<()> {
    if repo.git.is_repository().await {
        Ok(())
    } else {
        Err(EngineError::Precondition(
            "this is not a git repository".to_string(),
        ))
    }
}

/// Fail unless the main branch is configured.
pub fn ensure_is_configured(repo: &Repo) -> Result<()> {
    if repo.config.main_branch().is_empty() {
        return Err(EngineError::Precondition(
            "towline is not configured for this repository; \
             run \"towline config main-branch <name>\" first"
                .to_string(),
        ));
    }
    Ok(())
}

/// The on-disk run state acts as a coarse lock: mutating commands refuse to
/// start while a previous command is unfinished.
pub async fn ensure_no_unfinished_state(repo: &Repo) -> Result<()> {
    let git_dir = repo.git.git_dir().await?;
    if let Some(run_state) = runstate::load(&git_dir).await? {
        if run_state.is_unfinished() {
            return Err(EngineError::Precondition(format!(
                "the previous \"{}\" command did not finish; \
                 run \"towline continue\", \"towline abort\", or \"towline skip\" first",
                run_state.command
            )));
        }
    }
    Ok(())
}

/// Make sure every branch in `branches` has a complete ancestry: ask the
/// user for the parent of any feature branch without a lineage entry,
/// walking up until the chain reaches main or a perennial branch.
pub async fn ensure_knows_parent_branches(
    repo: &mut Repo,
    dialog: &dyn UserDialog,
    branches: &[String],
) -> Result<()> {
    let main_branch = repo.config.main_branch();
    for branch in branches {
        let mut current = branch.clone();
        loop {
            let parent = match repo.config.parent_branch(&current) {
                Some(parent) => parent,
                None => {
                    if !repo.config.is_feature_branch(&current) {
                        break;
                    }
                    let candidates: Vec<String> = repo
                        .git
                        .local_branches_main_first(&main_branch)
                        .await?
                        .into_iter()
                        .filter(|candidate| candidate != &current)
                        .collect();
                    let parent = dialog.select_parent_branch(&current, &candidates).await?;
                    repo.config.set_parent_branch(&current, &parent).await?;
                    parent
                }
            };
            if parent == main_branch || repo.config.is_perennial_branch(&parent) {
                break;
            }
            current = parent;
        }
    }
    Ok(())
}

/// The hosting connector for this repository, if its origin is recognized.
pub async fn connector_for(repo: &Repo) -> Result<Option<Box<dyn Connector>>> {
    let origin_url = repo.git.remote_url("origin").await;
    hosting::new_connector(
        &repo.config,
        origin_url.as_deref(),
        Box::new(|action| println!("{action}")),
    )
}
