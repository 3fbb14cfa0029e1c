//! The `ship` command: deliver a completed feature branch.
//!
//! Squash-merges the branch into its parent, resulting in linear history.
//! When the hosting connector can merge the branch's proposal via the API,
//! the squash happens remotely and the parent is pulled afterwards.

use super::sync::{update_branch_steps, SyncContext};
use super::{connector_for, ensure_knows_parent_branches, ensure_no_unfinished_state};
use crate::dialog::UserDialog;
use crate::error::EngineError;
use crate::executor;
use crate::git::Verbosity;
use crate::hosting::ProposalInfo;
use crate::repo::Repo;
use crate::runstate::{RunState, StepList, WrapOptions};
use crate::steps::Step;
use crate::Result;

#[derive(Debug, Clone, Default)]
pub struct ShipOptions {
    /// Branch to ship; defaults to the current branch.
    pub branch: Option<String>,
    /// Commit message for the squash commit; the editor opens without one.
    pub message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ShipConfig {
    pub branch_to_ship: String,
    pub branch_to_merge_into: String,
    pub initial_branch: String,
    pub is_shipping_initial_branch: bool,
    pub has_tracking_branch: bool,
    pub commit_message: Option<String>,
    pub proposal: Option<ProposalInfo>,
    pub should_delete_remote_branch: bool,
    pub child_branches: Vec<String>,
    pub has_open_changes: bool,
    pub previous_branch: Option<String>,
    pub context: SyncContext,
}

impl ShipConfig {
    fn can_ship_with_api(&self) -> bool {
        self.proposal
            .as_ref()
            .map(|proposal| proposal.can_merge_with_api)
            .unwrap_or(false)
    }
}

pub async fn ship(repo: &mut Repo, dialog: &dyn UserDialog, options: ShipOptions) -> Result<()> {
    ensure_no_unfinished_state(repo).await?;
    let connector = connector_for(repo).await?;
    let config = determine_ship_config(repo, dialog, connector.as_deref(), options).await?;
    let step_list = ship_steps(&config);
    repo.navigate_to_root().await?;
    let run_state = RunState::new("ship", step_list);
    executor::execute(run_state, repo, connector.as_deref(), dialog).await
}

pub async fn determine_ship_config(
    repo: &mut Repo,
    dialog: &dyn UserDialog,
    connector: Option<&dyn crate::hosting::Connector>,
    options: ShipOptions,
) -> Result<ShipConfig> {
    let initial_branch = repo.git.current_branch().await?;
    let branch_to_ship = options.branch.unwrap_or_else(|| initial_branch.clone());
    let is_shipping_initial_branch = branch_to_ship == initial_branch;
    let has_open_changes = repo.git.has_open_changes().await?;
    if is_shipping_initial_branch && has_open_changes {
        return Err(EngineError::Precondition(
            "you have uncommitted changes; did you mean to commit them before shipping?"
                .to_string(),
        ));
    }
    let has_origin = repo.git.has_origin().await?;
    let is_offline = repo.config.is_offline()?;
    if has_origin && !is_offline {
        repo.git.fetch(Verbosity::Logging).await?;
    }
    if !is_shipping_initial_branch && !repo.git.has_local_or_origin_branch(&branch_to_ship).await? {
        return Err(EngineError::Precondition(format!(
            "there is no branch named {branch_to_ship:?}"
        )));
    }
    if !repo.config.is_feature_branch(&branch_to_ship) {
        return Err(EngineError::Precondition(format!(
            "the branch {branch_to_ship:?} is not a feature branch; only feature branches can be shipped"
        )));
    }
    ensure_knows_parent_branches(repo, dialog, std::slice::from_ref(&branch_to_ship)).await?;
    ensure_parent_is_main_or_perennial(repo, &branch_to_ship)?;
    let branch_to_merge_into = repo
        .config
        .parent_branch(&branch_to_ship)
        .unwrap_or_else(|| repo.config.main_branch());

    let proposal = match connector {
        Some(connector) if has_origin && !is_offline => {
            connector
                .load_proposal_info(&branch_to_ship, &branch_to_merge_into)
                .await?
        }
        _ => None,
    };

    let context = SyncContext::gather(
        repo,
        &[branch_to_merge_into.clone(), branch_to_ship.clone()],
    )
    .await?;
    Ok(ShipConfig {
        has_tracking_branch: context.has_tracking_branch(&branch_to_ship),
        branch_to_ship: branch_to_ship.clone(),
        branch_to_merge_into,
        initial_branch,
        is_shipping_initial_branch,
        commit_message: options.message,
        proposal,
        should_delete_remote_branch: repo.config.should_ship_delete_remote_branch()?,
        child_branches: repo.config.child_branches(&branch_to_ship),
        has_open_changes,
        previous_branch: repo.git.previously_checked_out_branch().await,
        context,
    })
}

/// Only branches whose parent is main or perennial ship directly; nested
/// branches must ship their ancestry bottom-up.
fn ensure_parent_is_main_or_perennial(repo: &Repo, branch: &str) -> Result<()> {
    let parent = repo.config.parent_branch(branch).unwrap_or_default();
    if repo.config.is_main_branch(&parent) || repo.config.is_perennial_branch(&parent) {
        return Ok(());
    }
    let ancestors = repo.config.ancestor_branches(branch);
    // The first entry is the non-feature root; everything after it ships first.
    let intermediate = &ancestors[1..];
    let oldest = intermediate.first().cloned().unwrap_or_default();
    Err(EngineError::Precondition(format!(
        "shipping this branch would ship {} as well; please ship {oldest:?} first",
        intermediate.join(", ")
    )))
}

/// The step list for the ship command. Pure over the gathered config.
pub fn ship_steps(config: &ShipConfig) -> StepList {
    let context = &config.context;
    let branch = &config.branch_to_ship;
    let parent = &config.branch_to_merge_into;
    let mut list = StepList::new();

    update_branch_steps(&mut list, parent, true, context);
    update_branch_steps(&mut list, branch, false, context);
    list.append(Step::EnsureHasShippableChanges {
        branch: branch.clone(),
    });
    list.append(Step::checkout(parent));

    match config
        .proposal
        .as_ref()
        .filter(|proposal| proposal.can_merge_with_api)
    {
        Some(proposal) => {
            list.append(Step::push(branch));
            list.append(Step::ConnectorMergeProposal {
                branch: branch.clone(),
                proposal_number: proposal.number,
                commit_message: config.commit_message.clone(),
                default_proposal_message: proposal.default_proposal_message.clone(),
                entered_empty_commit_message: false,
                merge_sha: None,
            });
            list.append(Step::PullBranch {
                branch: parent.clone(),
            });
        }
        None => {
            list.append(Step::SquashMerge {
                branch: branch.clone(),
                commit_message: config.commit_message.clone(),
                merge_sha: None,
            });
        }
    }

    if context.has_origin && !context.is_offline {
        list.append(Step::PushBranch {
            branch: parent.clone(),
            force: false,
            force_with_lease: false,
            no_push_hook: false,
            undoable: true,
        });
    }

    // Shipping via the API guarantees a tracking branch, updated child
    // proposals, and an online connection; otherwise all three conditions
    // are probed locally.
    let can_delete_remote = config.can_ship_with_api()
        || (config.has_tracking_branch && config.child_branches.is_empty() && !context.is_offline);
    if can_delete_remote && config.should_delete_remote_branch {
        list.append(Step::DeleteOriginBranch {
            branch: branch.clone(),
            is_tracking: true,
            no_push_hook: !context.push_hook,
            branch_sha: None,
        });
    }

    list.append(Step::DeleteLocalBranch {
        branch: branch.clone(),
        force: false,
        branch_sha: None,
    });
    list.append(Step::DeleteParentBranch {
        branch: branch.clone(),
        previous_parent: None,
    });
    for child in &config.child_branches {
        list.append(Step::SetParentBranch {
            branch: child.clone(),
            parent: parent.clone(),
            previous_parent: None,
        });
    }
    if !config.is_shipping_initial_branch {
        list.append(Step::checkout(&config.initial_branch));
    }

    list.wrap(&WrapOptions {
        run_in_git_root: true,
        stash_open_changes: !config.is_shipping_initial_branch,
        has_open_changes: config.has_open_changes,
        initial_branch: &config.initial_branch,
        previous_branch: config.previous_branch.as_deref(),
    });
    list
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::sync::tests::context;

    fn ship_config() -> ShipConfig {
        ShipConfig {
            branch_to_ship: "feature".to_string(),
            branch_to_merge_into: "main".to_string(),
            initial_branch: "feature".to_string(),
            is_shipping_initial_branch: true,
            has_tracking_branch: true,
            commit_message: Some("ship feature".to_string()),
            proposal: None,
            should_delete_remote_branch: true,
            child_branches: vec![],
            has_open_changes: false,
            previous_branch: None,
            context: context(),
        }
    }

    #[test]
    fn test_local_squash_merge_path() {
        let config = ship_config();
        let list = ship_steps(&config);
        assert!(list.list.contains(&Step::SquashMerge {
            branch: "feature".to_string(),
            commit_message: Some("ship feature".to_string()),
            merge_sha: None,
        }));
        assert!(!list
            .list
            .iter()
            .any(|step| matches!(step, Step::ConnectorMergeProposal { .. })));
        // The branch is removed locally and from origin, and unlinked.
        assert!(list.list.contains(&Step::DeleteOriginBranch {
            branch: "feature".to_string(),
            is_tracking: true,
            no_push_hook: false,
            branch_sha: None,
        }));
        assert!(list.list.contains(&Step::DeleteLocalBranch {
            branch: "feature".to_string(),
            force: false,
            branch_sha: None,
        }));
    }

    #[test]
    fn test_api_path_pushes_then_merges_remotely() {
        let mut config = ship_config();
        config.proposal = Some(ProposalInfo {
            can_merge_with_api: true,
            default_proposal_message: "feature (#12)".to_string(),
            number: 12,
        });
        let list = ship_steps(&config);

        let api_step_index = list
            .list
            .iter()
            .position(|step| matches!(step, Step::ConnectorMergeProposal { .. }))
            .unwrap();
        assert_eq!(list.list[api_step_index - 1], Step::push("feature"));
        assert_eq!(
            list.list[api_step_index + 1],
            Step::PullBranch {
                branch: "main".to_string(),
            }
        );
        assert!(!list
            .list
            .iter()
            .any(|step| matches!(step, Step::SquashMerge { .. })));
    }

    #[test]
    fn test_children_are_reparented_to_merge_target() {
        let mut config = ship_config();
        config.child_branches = vec!["sub".to_string()];
        // A shipped branch with children keeps its remote branch.
        let list = ship_steps(&config);
        assert!(list.list.contains(&Step::SetParentBranch {
            branch: "sub".to_string(),
            parent: "main".to_string(),
            previous_parent: None,
        }));
        assert!(!list
            .list
            .iter()
            .any(|step| matches!(step, Step::DeleteOriginBranch { .. })));
    }

    #[test]
    fn test_shipping_other_branch_returns_to_initial() {
        let mut config = ship_config();
        config.branch_to_ship = "feature".to_string();
        config.initial_branch = "main".to_string();
        config.is_shipping_initial_branch = false;
        let list = ship_steps(&config);

        let delete_index = list
            .list
            .iter()
            .position(|step| matches!(step, Step::DeleteParentBranch { .. }))
            .unwrap();
        assert_eq!(list.list[delete_index + 1], Step::checkout("main"));
    }
}
