//! The `rename-branch` command: rename a branch locally and on origin.

use super::ensure_no_unfinished_state;
use crate::dialog::UserDialog;
use crate::error::EngineError;
use crate::executor;
use crate::git::Verbosity;
use crate::repo::Repo;
use crate::runstate::{RunState, StepList, WrapOptions};
use crate::steps::Step;
use crate::Result;

#[derive(Debug, Clone, Default)]
pub struct RenameBranchOptions {
    /// Branch to rename; defaults to the current branch.
    pub old_branch: Option<String>,
    pub new_branch: String,
    /// Renaming perennial branches requires explicit confirmation.
    pub force: bool,
}

#[derive(Debug, Clone)]
pub struct RenameBranchConfig {
    pub old_branch: String,
    pub new_branch: String,
    pub initial_branch: String,
    pub is_old_branch_perennial: bool,
    pub old_parent: Option<String>,
    pub old_children: Vec<String>,
    pub old_has_tracking_branch: bool,
    pub is_offline: bool,
    pub no_push_hook: bool,
    pub initial_branch_name_before: Option<String>,
}

pub async fn rename_branch(
    repo: &mut Repo,
    dialog: &dyn UserDialog,
    options: RenameBranchOptions,
) -> Result<()> {
    ensure_no_unfinished_state(repo).await?;
    let config = determine_rename_branch_config(repo, options).await?;
    let step_list = rename_branch_steps(&config);
    let run_state = RunState::new("rename-branch", step_list);
    executor::execute(run_state, repo, None, dialog).await
}

pub async fn determine_rename_branch_config(
    repo: &mut Repo,
    options: RenameBranchOptions,
) -> Result<RenameBranchConfig> {
    let initial_branch = repo.git.current_branch().await?;
    let old_branch = options.old_branch.unwrap_or_else(|| initial_branch.clone());
    let new_branch = options.new_branch;

    if repo.config.is_main_branch(&old_branch) {
        return Err(EngineError::Precondition(
            "the main branch cannot be renamed".to_string(),
        ));
    }
    let is_old_branch_perennial = repo.config.is_perennial_branch(&old_branch);
    if is_old_branch_perennial && !options.force {
        return Err(EngineError::Precondition(format!(
            "{old_branch:?} is a perennial branch; renaming a perennial branch typically \
             requires other updates, use \"--force\" if you are sure"
        )));
    }
    if old_branch == new_branch {
        return Err(EngineError::Precondition(
            "cannot rename branch to current name".to_string(),
        ));
    }
    let is_offline = repo.config.is_offline()?;
    if repo.git.has_origin().await? && !is_offline {
        repo.git.fetch(Verbosity::Logging).await?;
    }
    if !repo.git.has_local_branch(&old_branch).await? {
        return Err(EngineError::Precondition(format!(
            "there is no branch named {old_branch:?}"
        )));
    }
    if !repo.git.is_branch_in_sync(&old_branch).await? {
        return Err(EngineError::Precondition(format!(
            "{old_branch:?} is not in sync with its tracking branch, \
             please sync the branches before renaming"
        )));
    }
    if repo.git.has_local_or_origin_branch(&new_branch).await? {
        return Err(EngineError::Precondition(format!(
            "a branch named {new_branch:?} already exists"
        )));
    }

    Ok(RenameBranchConfig {
        old_parent: repo.config.parent_branch(&old_branch),
        old_children: repo.config.child_branches(&old_branch),
        old_has_tracking_branch: repo.git.has_tracking_branch(&old_branch).await?,
        no_push_hook: !repo.config.push_hook()?,
        initial_branch_name_before: repo.git.previously_checked_out_branch().await,
        old_branch,
        new_branch,
        initial_branch,
        is_old_branch_perennial,
        is_offline,
    })
}

/// The step list for the rename-branch command. Pure over the config.
pub fn rename_branch_steps(config: &RenameBranchConfig) -> StepList {
    let mut list = StepList::new();
    list.append(Step::CreateBranch {
        branch: config.new_branch.clone(),
        starting_point: config.old_branch.clone(),
    });
    if config.initial_branch == config.old_branch {
        list.append(Step::checkout(&config.new_branch));
    }
    if config.is_old_branch_perennial {
        list.append(Step::RemoveFromPerennialBranches {
            branch: config.old_branch.clone(),
        });
        list.append(Step::AddToPerennialBranches {
            branch: config.new_branch.clone(),
        });
    } else {
        list.append(Step::DeleteParentBranch {
            branch: config.old_branch.clone(),
            previous_parent: None,
        });
        if let Some(parent) = &config.old_parent {
            list.append(Step::SetParentBranch {
                branch: config.new_branch.clone(),
                parent: parent.clone(),
                previous_parent: None,
            });
        }
    }
    for child in &config.old_children {
        list.append(Step::SetParentBranch {
            branch: child.clone(),
            parent: config.new_branch.clone(),
            previous_parent: None,
        });
    }
    if config.old_has_tracking_branch && !config.is_offline {
        list.append(Step::CreateTrackingBranch {
            branch: config.new_branch.clone(),
            no_push_hook: config.no_push_hook,
        });
        list.append(Step::DeleteOriginBranch {
            branch: config.old_branch.clone(),
            is_tracking: true,
            no_push_hook: config.no_push_hook,
            branch_sha: None,
        });
    }
    list.append(Step::DeleteLocalBranch {
        branch: config.old_branch.clone(),
        force: false,
        branch_sha: None,
    });
    list.wrap(&WrapOptions {
        run_in_git_root: false,
        stash_open_changes: false,
        has_open_changes: false,
        initial_branch: &config.initial_branch,
        previous_branch: config.initial_branch_name_before.as_deref(),
    });
    list
}
