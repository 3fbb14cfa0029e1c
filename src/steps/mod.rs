//! The closed set of primitive operations the executor performs.
//!
//! Every step knows how to run itself and how to derive its own continue,
//! abort, and undo counterparts. Undo derivation is pure: it reads only the
//! fields the step memoized while running, never the repository. Both the
//! parameters and the memoized fields serialize, so a persisted plan can
//! rebuild its undo steps after a restart.

use serde::{Deserialize, Serialize};

use crate::config::SyncStrategy;
use crate::dialog::UserDialog;
use crate::error::EngineError;
use crate::git::{PushArgs, Verbosity};
use crate::hosting::Connector;
use crate::repo::Repo;
use crate::Result;

/// One primitive, reversible (where meaningful) repository operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "kebab-case")]
pub enum Step {
    /// Make the branch the current branch.
    CheckoutBranch {
        branch: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        previous_branch: Option<String>,
    },
    /// Create a local branch at the given ref.
    CreateBranch {
        branch: String,
        starting_point: String,
    },
    /// Push the branch to origin, establishing its upstream.
    CreateTrackingBranch { branch: String, no_push_hook: bool },
    /// Push a specific SHA as a new remote ref.
    CreateRemoteBranch {
        branch: String,
        sha: String,
        no_push_hook: bool,
    },
    DeleteLocalBranch {
        branch: String,
        force: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        branch_sha: Option<String>,
    },
    DeleteOriginBranch {
        branch: String,
        is_tracking: bool,
        no_push_hook: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        branch_sha: Option<String>,
    },
    DeleteParentBranch {
        branch: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        previous_parent: Option<String>,
    },
    SetParentBranch {
        branch: String,
        parent: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        previous_parent: Option<String>,
    },
    AddToPerennialBranches { branch: String },
    RemoveFromPerennialBranches { branch: String },
    /// `git merge --no-edit <branch>` into the current branch.
    Merge {
        branch: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        previous_sha: Option<String>,
    },
    /// `git rebase <branch>` onto the current branch.
    RebaseBranch {
        branch: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        previous_sha: Option<String>,
    },
    /// Finish an in-progress merge, if one is still in progress.
    ContinueMerge,
    /// Finish an in-progress rebase, if one is still in progress.
    ContinueRebase,
    AbortMerge,
    AbortRebase,
    /// Squash-merge the branch into the current branch.
    SquashMerge {
        branch: String,
        commit_message: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        merge_sha: Option<String>,
    },
    /// Squash-merge the branch's proposal via the hosting connector.
    ConnectorMergeProposal {
        branch: String,
        proposal_number: u64,
        commit_message: Option<String>,
        default_proposal_message: String,
        #[serde(default)]
        entered_empty_commit_message: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        merge_sha: Option<String>,
    },
    PushBranch {
        branch: String,
        #[serde(default)]
        force: bool,
        #[serde(default)]
        force_with_lease: bool,
        #[serde(default)]
        no_push_hook: bool,
        #[serde(default)]
        undoable: bool,
    },
    PushTags,
    PullBranch { branch: String },
    ResetToSha { sha: String, hard: bool },
    RevertCommit { sha: String },
    /// Commit all open changes with an automatic message.
    CommitOpenChanges {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        previous_sha: Option<String>,
    },
    StashOpenChanges,
    RestoreOpenChanges,
    /// `git reset --hard`, used by abort paths.
    DiscardOpenChanges,
    /// Restore `@{-1}` to the branch the user had before the command.
    PreserveCheckoutHistory {
        initial_branch: String,
        #[serde(default)]
        initial_previous_branch: String,
    },
    /// Fail if the branch holds no changes over its parent.
    EnsureHasShippableChanges { branch: String },
    FetchUpstream { branch: String },
    CreateProposal { branch: String },
    /// Control-flow marker: drop the undo steps of the current branch.
    SkipCurrentBranchSteps,
    /// Control-flow marker: defer a push to the end of the current branch's
    /// undo block.
    PushBranchAfterCurrentBranchSteps,
}

impl Step {
    /// Execute this step, memoizing whatever its undo step will need.
    pub async fn run(
        &mut self,
        repo: &mut Repo,
        connector: Option<&dyn Connector>,
        dialog: &dyn UserDialog,
    ) -> Result<()> {
        match self {
            Step::CheckoutBranch {
                branch,
                previous_branch,
            } => {
                let current = repo.git.current_branch().await?;
                *previous_branch = Some(current.clone());
                if current != *branch {
                    repo.git.checkout_branch(branch, Verbosity::Logging).await?;
                }
                Ok(())
            }
            Step::CreateBranch {
                branch,
                starting_point,
            } => {
                repo.git
                    .create_branch(branch, starting_point, Verbosity::Logging)
                    .await?;
                Ok(())
            }
            Step::CreateTrackingBranch {
                branch,
                no_push_hook,
            } => {
                repo.git
                    .create_tracking_branch(branch, *no_push_hook, Verbosity::Logging)
                    .await?;
                Ok(())
            }
            Step::CreateRemoteBranch {
                branch,
                sha,
                no_push_hook,
            } => {
                repo.git
                    .create_remote_branch(sha, branch, *no_push_hook, Verbosity::Logging)
                    .await?;
                Ok(())
            }
            Step::DeleteLocalBranch {
                branch,
                force,
                branch_sha,
            } => {
                *branch_sha = Some(repo.git.sha_for_branch(branch).await?);
                let main = repo.config.main_branch();
                let has_unmerged = repo.git.branch_has_unmerged_commits(branch, &main).await?;
                repo.git
                    .delete_local_branch(branch, *force || has_unmerged, Verbosity::Logging)
                    .await?;
                Ok(())
            }
            Step::DeleteOriginBranch {
                branch,
                is_tracking,
                branch_sha,
                ..
            } => {
                if !*is_tracking {
                    let tracking = repo.git.tracking_branch(branch);
                    *branch_sha = Some(repo.git.sha_for_branch(&tracking).await?);
                }
                repo.git
                    .delete_remote_branch(branch, Verbosity::Logging)
                    .await?;
                Ok(())
            }
            Step::DeleteParentBranch {
                branch,
                previous_parent,
            } => {
                *previous_parent = repo.config.parent_branch(branch);
                repo.config.remove_parent_branch(branch).await?;
                Ok(())
            }
            Step::SetParentBranch {
                branch,
                parent,
                previous_parent,
            } => {
                *previous_parent = repo.config.parent_branch(branch);
                repo.config.set_parent_branch(branch, parent).await?;
                Ok(())
            }
            Step::AddToPerennialBranches { branch } => {
                repo.config.add_perennial_branch(branch).await?;
                Ok(())
            }
            Step::RemoveFromPerennialBranches { branch } => {
                repo.config.remove_perennial_branch(branch).await?;
                Ok(())
            }
            Step::Merge {
                branch,
                previous_sha,
            } => {
                *previous_sha = Some(repo.git.current_sha().await?);
                repo.git
                    .merge_branch_no_edit(branch, Verbosity::Logging)
                    .await?;
                Ok(())
            }
            Step::RebaseBranch {
                branch,
                previous_sha,
            } => {
                *previous_sha = Some(repo.git.current_sha().await?);
                let result = repo.git.rebase(branch, Verbosity::Logging).await;
                if result.is_err() {
                    // A failed rebase can leave HEAD detached.
                    repo.git.invalidate_current_branch();
                }
                result?;
                Ok(())
            }
            Step::ContinueMerge => {
                if repo.git.has_merge_in_progress().await? {
                    repo.git.commit_no_edit(Verbosity::Logging).await?;
                }
                Ok(())
            }
            Step::ContinueRebase => {
                if repo.git.has_rebase_in_progress().await? {
                    repo.git.continue_rebase(Verbosity::Logging).await?;
                }
                Ok(())
            }
            Step::AbortMerge => {
                repo.git.abort_merge(Verbosity::Logging).await?;
                Ok(())
            }
            Step::AbortRebase => {
                repo.git.abort_rebase(Verbosity::Logging).await?;
                Ok(())
            }
            Step::SquashMerge {
                branch,
                commit_message,
                merge_sha,
            } => {
                repo.git.squash_merge(branch, Verbosity::Logging).await?;
                let author = determine_squash_author(repo, dialog, branch).await?;
                repo.git.comment_out_squash_commit_message(None).await?;
                repo.git
                    .commit(commit_message.as_deref(), author.as_deref(), Verbosity::Logging)
                    .await?;
                *merge_sha = Some(repo.git.current_sha().await?);
                Ok(())
            }
            Step::ConnectorMergeProposal {
                branch,
                proposal_number,
                commit_message,
                default_proposal_message,
                entered_empty_commit_message,
                merge_sha,
            } => {
                let connector = connector.ok_or_else(|| {
                    EngineError::Hosting(
                        "shipping via the hosting API requires a connector".to_string(),
                    )
                })?;
                let mut message = commit_message.clone().unwrap_or_default();
                if message.is_empty() {
                    // Let the user enter the commit message as if shipping
                    // without a connector, then drop the local commit; the
                    // connector performs the actual squash merge.
                    *entered_empty_commit_message = true;
                    repo.git.squash_merge(branch, Verbosity::Logging).await?;
                    repo.git
                        .comment_out_squash_commit_message(Some(&format!(
                            "{default_proposal_message}\n\n"
                        )))
                        .await?;
                    repo.git.start_commit(Verbosity::Logging).await?;
                    message = repo.git.last_commit_message().await?;
                    repo.git.delete_last_commit(Verbosity::Logging).await?;
                    *entered_empty_commit_message = false;
                }
                let sha = connector
                    .squash_merge_proposal(*proposal_number, &message)
                    .await?;
                *merge_sha = Some(sha);
                Ok(())
            }
            Step::PushBranch {
                branch,
                force,
                force_with_lease,
                no_push_hook,
                ..
            } => {
                if !repo.git.is_dry_run() && !repo.git.should_push_branch(branch).await? {
                    return Ok(());
                }
                let current = repo.git.current_branch().await?;
                let remote = if current == *branch {
                    None
                } else {
                    Some("origin".to_string())
                };
                repo.git
                    .push_branch(
                        PushArgs {
                            branch: branch.clone(),
                            force: *force,
                            force_with_lease: *force_with_lease,
                            no_push_hook: *no_push_hook,
                            remote,
                        },
                        Verbosity::Logging,
                    )
                    .await?;
                Ok(())
            }
            Step::PushTags => {
                repo.git.push_tags(Verbosity::Logging).await?;
                Ok(())
            }
            Step::PullBranch { .. } => {
                repo.git.pull(Verbosity::Logging).await?;
                Ok(())
            }
            Step::ResetToSha { sha, hard } => {
                if repo.git.current_sha().await? == *sha {
                    return Ok(());
                }
                repo.git.reset_to_sha(sha, *hard, Verbosity::Logging).await?;
                Ok(())
            }
            Step::RevertCommit { sha } => {
                repo.git.revert_commit(sha, Verbosity::Logging).await?;
                Ok(())
            }
            Step::CommitOpenChanges { previous_sha } => {
                *previous_sha = Some(repo.git.current_sha().await?);
                repo.git.stage_files("-A", Verbosity::Logging).await?;
                let current = repo.git.current_branch().await?;
                repo.git
                    .commit_staged_changes(&format!("WIP on {current}"), Verbosity::Logging)
                    .await?;
                Ok(())
            }
            Step::StashOpenChanges => {
                repo.git.stash(Verbosity::Logging).await?;
                Ok(())
            }
            Step::RestoreOpenChanges => repo
                .git
                .pop_stash(Verbosity::Logging)
                .await
                .map_err(|_| EngineError::UncommittedChangesConflict),
            Step::DiscardOpenChanges => {
                repo.git.discard_open_changes(Verbosity::Logging).await?;
                Ok(())
            }
            Step::PreserveCheckoutHistory {
                initial_branch,
                initial_previous_branch,
            } => {
                let main = repo.config.main_branch();
                let expected = repo
                    .git
                    .expected_previously_checked_out_branch(
                        initial_previous_branch,
                        initial_branch,
                        &main,
                    )
                    .await?;
                // A missing reflog entry is not a failure condition here.
                let previous = repo.git.previously_checked_out_branch().await;
                if previous.as_deref() == Some(expected.as_str()) {
                    return Ok(());
                }
                let current = repo.git.current_branch().await?;
                repo.git.checkout_branch(&expected, Verbosity::Silent).await?;
                repo.git.checkout_branch(&current, Verbosity::Silent).await?;
                Ok(())
            }
            Step::EnsureHasShippableChanges { branch } => {
                let parent = repo
                    .config
                    .parent_branch(branch)
                    .unwrap_or_else(|| repo.config.main_branch());
                if !repo.git.has_shippable_changes(branch, &parent).await? {
                    return Err(EngineError::NoShippableChanges(branch.clone()));
                }
                Ok(())
            }
            Step::FetchUpstream { branch } => {
                repo.git.fetch_upstream(branch, Verbosity::Logging).await?;
                Ok(())
            }
            Step::CreateProposal { branch } => {
                let connector = connector.ok_or_else(|| {
                    EngineError::Hosting(
                        "cannot create a proposal without a hosting connector".to_string(),
                    )
                })?;
                let parent = repo
                    .config
                    .parent_branch(branch)
                    .unwrap_or_else(|| repo.config.main_branch());
                let url = connector.new_proposal_url(branch, &parent);
                println!("Open a proposal at: {url}");
                Ok(())
            }
            // Markers are interpreted by the executor; reaching run is a no-op.
            Step::SkipCurrentBranchSteps | Step::PushBranchAfterCurrentBranchSteps => Ok(()),
        }
    }

    /// The step to install at the head of the plan when this step pauses.
    pub fn create_continue_step(&self) -> Option<Step> {
        match self {
            Step::Merge { .. } | Step::ContinueMerge => Some(Step::ContinueMerge),
            Step::RebaseBranch { .. } | Step::ContinueRebase => Some(Step::ContinueRebase),
            _ => None,
        }
    }

    /// The step that cleans up this step's in-flight state on abort.
    pub fn create_abort_step(&self) -> Option<Step> {
        match self {
            Step::Merge { .. } => Some(Step::AbortMerge),
            Step::RebaseBranch { .. } | Step::ContinueRebase => Some(Step::AbortRebase),
            Step::SquashMerge { .. } => Some(Step::DiscardOpenChanges),
            Step::ConnectorMergeProposal {
                entered_empty_commit_message,
                ..
            } => {
                if *entered_empty_commit_message {
                    Some(Step::DiscardOpenChanges)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Derive the inverse of this step from its memoized state.
    ///
    /// Pure: never queries the repository. A variant whose memo is missing
    /// reports an invariant violation instead of guessing.
    pub fn create_undo_step(&self) -> Result<Option<Step>> {
        match self {
            Step::CheckoutBranch {
                previous_branch, ..
            } => {
                let previous = previous_branch
                    .clone()
                    .ok_or_else(|| missing_memo("CheckoutBranch", "previous_branch"))?;
                Ok(Some(Step::CheckoutBranch {
                    branch: previous,
                    previous_branch: None,
                }))
            }
            Step::CreateBranch { branch, .. } => Ok(Some(Step::DeleteLocalBranch {
                branch: branch.clone(),
                force: true,
                branch_sha: None,
            })),
            Step::DeleteLocalBranch { branch, branch_sha, .. } => {
                let sha = branch_sha
                    .clone()
                    .ok_or_else(|| missing_memo("DeleteLocalBranch", "branch_sha"))?;
                Ok(Some(Step::CreateBranch {
                    branch: branch.clone(),
                    starting_point: sha,
                }))
            }
            Step::DeleteOriginBranch {
                branch,
                is_tracking,
                no_push_hook,
                branch_sha,
            } => {
                if *is_tracking {
                    return Ok(Some(Step::CreateTrackingBranch {
                        branch: branch.clone(),
                        no_push_hook: *no_push_hook,
                    }));
                }
                let sha = branch_sha
                    .clone()
                    .ok_or_else(|| missing_memo("DeleteOriginBranch", "branch_sha"))?;
                Ok(Some(Step::CreateRemoteBranch {
                    branch: branch.clone(),
                    sha,
                    no_push_hook: *no_push_hook,
                }))
            }
            Step::DeleteParentBranch {
                branch,
                previous_parent,
            } => Ok(previous_parent.clone().map(|parent| Step::SetParentBranch {
                branch: branch.clone(),
                parent,
                previous_parent: None,
            })),
            Step::SetParentBranch {
                branch,
                previous_parent,
                ..
            } => match previous_parent {
                Some(parent) => Ok(Some(Step::SetParentBranch {
                    branch: branch.clone(),
                    parent: parent.clone(),
                    previous_parent: None,
                })),
                None => Ok(Some(Step::DeleteParentBranch {
                    branch: branch.clone(),
                    previous_parent: None,
                })),
            },
            Step::AddToPerennialBranches { branch } => {
                Ok(Some(Step::RemoveFromPerennialBranches {
                    branch: branch.clone(),
                }))
            }
            Step::RemoveFromPerennialBranches { branch } => {
                Ok(Some(Step::AddToPerennialBranches {
                    branch: branch.clone(),
                }))
            }
            Step::Merge { previous_sha, .. } | Step::RebaseBranch { previous_sha, .. } => {
                let sha = previous_sha
                    .clone()
                    .ok_or_else(|| missing_memo("Merge/RebaseBranch", "previous_sha"))?;
                Ok(Some(Step::ResetToSha { sha, hard: true }))
            }
            Step::SquashMerge { merge_sha, .. } => {
                let sha = merge_sha
                    .clone()
                    .ok_or_else(|| missing_memo("SquashMerge", "merge_sha"))?;
                Ok(Some(Step::RevertCommit { sha }))
            }
            Step::ConnectorMergeProposal { merge_sha, .. } => {
                let sha = merge_sha
                    .clone()
                    .ok_or_else(|| missing_memo("ConnectorMergeProposal", "merge_sha"))?;
                Ok(Some(Step::RevertCommit { sha }))
            }
            Step::PushBranch { undoable, .. } => {
                if *undoable {
                    Ok(Some(Step::PushBranchAfterCurrentBranchSteps))
                } else {
                    Ok(Some(Step::SkipCurrentBranchSteps))
                }
            }
            Step::CommitOpenChanges { previous_sha } => {
                let sha = previous_sha
                    .clone()
                    .ok_or_else(|| missing_memo("CommitOpenChanges", "previous_sha"))?;
                Ok(Some(Step::ResetToSha { sha, hard: false }))
            }
            Step::StashOpenChanges => Ok(Some(Step::RestoreOpenChanges)),
            Step::RestoreOpenChanges => Ok(Some(Step::StashOpenChanges)),
            _ => Ok(None),
        }
    }

    /// Whether a failure of this step runs the abort path unattended.
    pub fn should_auto_abort(&self) -> bool {
        matches!(
            self,
            Step::SquashMerge { .. }
                | Step::ConnectorMergeProposal { .. }
                | Step::EnsureHasShippableChanges { .. }
        )
    }

    /// The message to report for an automatic abort, when the step has a
    /// more specific one than its run error.
    pub fn automatic_abort_message(&self) -> Option<String> {
        match self {
            Step::SquashMerge { .. } => {
                Some("aborted because commit exited with error".to_string())
            }
            Step::ConnectorMergeProposal {
                entered_empty_commit_message: true,
                ..
            } => Some("aborted because commit exited with error".to_string()),
            _ => None,
        }
    }

    /// Whether a pause on this step may be skipped. Only the per-branch
    /// integration points of a multi-branch sync qualify.
    pub fn can_skip(&self) -> bool {
        matches!(self, Step::Merge { .. } | Step::RebaseBranch { .. })
    }

    /// Checkout steps delimit the per-branch blocks of a plan.
    pub fn is_checkout(&self) -> bool {
        matches!(self, Step::CheckoutBranch { .. })
    }

    /// A short human-readable label naming this step in messages.
    pub fn description(&self) -> String {
        match self {
            Step::CheckoutBranch { branch, .. } => format!("checkout {branch}"),
            Step::CreateBranch { branch, .. } => format!("create branch {branch}"),
            Step::CreateTrackingBranch { branch, .. } => {
                format!("create tracking branch for {branch}")
            }
            Step::CreateRemoteBranch { branch, .. } => format!("create remote branch {branch}"),
            Step::DeleteLocalBranch { branch, .. } => format!("delete local branch {branch}"),
            Step::DeleteOriginBranch { branch, .. } => format!("delete origin branch {branch}"),
            Step::DeleteParentBranch { branch, .. } => format!("delete parent of {branch}"),
            Step::SetParentBranch { branch, parent, .. } => {
                format!("set parent of {branch} to {parent}")
            }
            Step::AddToPerennialBranches { branch } => {
                format!("add {branch} to perennial branches")
            }
            Step::RemoveFromPerennialBranches { branch } => {
                format!("remove {branch} from perennial branches")
            }
            Step::Merge { branch, .. } => format!("merge {branch}"),
            Step::RebaseBranch { branch, .. } => format!("rebase against {branch}"),
            Step::ContinueMerge => "continue merge".to_string(),
            Step::ContinueRebase => "continue rebase".to_string(),
            Step::AbortMerge => "abort merge".to_string(),
            Step::AbortRebase => "abort rebase".to_string(),
            Step::SquashMerge { branch, .. } => format!("squash-merge {branch}"),
            Step::ConnectorMergeProposal {
                branch,
                proposal_number,
                ..
            } => format!("merge proposal #{proposal_number} for {branch}"),
            Step::PushBranch { branch, .. } => format!("push {branch}"),
            Step::PushTags => "push tags".to_string(),
            Step::PullBranch { branch } => format!("pull {branch}"),
            Step::ResetToSha { sha, .. } => format!("reset to {sha}"),
            Step::RevertCommit { sha } => format!("revert commit {sha}"),
            Step::CommitOpenChanges { .. } => "commit open changes".to_string(),
            Step::StashOpenChanges => "stash open changes".to_string(),
            Step::RestoreOpenChanges => "restore open changes".to_string(),
            Step::DiscardOpenChanges => "discard open changes".to_string(),
            Step::PreserveCheckoutHistory { .. } => "preserve checkout history".to_string(),
            Step::EnsureHasShippableChanges { branch } => {
                format!("check {branch} for shippable changes")
            }
            Step::FetchUpstream { branch } => format!("fetch upstream {branch}"),
            Step::CreateProposal { branch } => format!("create proposal for {branch}"),
            Step::SkipCurrentBranchSteps => "skip current branch steps".to_string(),
            Step::PushBranchAfterCurrentBranchSteps => {
                "push branch after current branch steps".to_string()
            }
        }
    }

    /// Convenience constructor for the sync builders: the step that
    /// integrates `branch` into the current branch under a strategy.
    pub fn integrate(branch: &str, strategy: SyncStrategy) -> Step {
        match strategy {
            SyncStrategy::Merge => Step::Merge {
                branch: branch.to_string(),
                previous_sha: None,
            },
            SyncStrategy::Rebase => Step::RebaseBranch {
                branch: branch.to_string(),
                previous_sha: None,
            },
        }
    }

    /// Convenience constructor: a checkout without memoized state.
    pub fn checkout(branch: &str) -> Step {
        Step::CheckoutBranch {
            branch: branch.to_string(),
            previous_branch: None,
        }
    }

    /// Convenience constructor: a plain push without force or undo marker.
    pub fn push(branch: &str) -> Step {
        Step::PushBranch {
            branch: branch.to_string(),
            force: false,
            force_with_lease: false,
            no_push_hook: false,
            undoable: false,
        }
    }
}

async fn determine_squash_author(
    repo: &mut Repo,
    dialog: &dyn UserDialog,
    branch: &str,
) -> Result<Option<String>> {
    let parent = repo
        .config
        .parent_branch(branch)
        .unwrap_or_else(|| repo.config.main_branch());
    let authors = repo.git.branch_authors(branch, &parent).await?;
    let author = match authors.len() {
        0 => return Ok(None),
        1 => authors[0].clone(),
        _ => dialog.select_squash_author(branch, &authors).await?,
    };
    // The author flag is only needed when it differs from the committer.
    if author == repo.git.author().await? {
        return Ok(None);
    }
    Ok(Some(author))
}

fn missing_memo(step: &str, field: &str) -> EngineError {
    EngineError::Invariant(format!("{step}: no memoized {field} for undo"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_undo_uses_memoized_branch() {
        let step = Step::CheckoutBranch {
            branch: "feature".to_string(),
            previous_branch: Some("main".to_string()),
        };
        assert_eq!(
            step.create_undo_step().unwrap(),
            Some(Step::checkout("main"))
        );
    }

    #[test]
    fn test_undo_without_memo_is_invariant_violation() {
        let step = Step::Merge {
            branch: "main".to_string(),
            previous_sha: None,
        };
        assert!(matches!(
            step.create_undo_step(),
            Err(EngineError::Invariant(_))
        ));
    }

    #[test]
    fn test_delete_origin_branch_undo_without_memo_fails_fast() {
        let tracking = Step::DeleteOriginBranch {
            branch: "feature".to_string(),
            is_tracking: true,
            no_push_hook: false,
            branch_sha: None,
        };
        assert_eq!(
            tracking.create_undo_step().unwrap(),
            Some(Step::CreateTrackingBranch {
                branch: "feature".to_string(),
                no_push_hook: false,
            })
        );

        let non_tracking = Step::DeleteOriginBranch {
            branch: "feature".to_string(),
            is_tracking: false,
            no_push_hook: false,
            branch_sha: None,
        };
        assert!(matches!(
            non_tracking.create_undo_step(),
            Err(EngineError::Invariant(_))
        ));
    }

    #[test]
    fn test_lineage_steps_invert_each_other() {
        let set = Step::SetParentBranch {
            branch: "feature".to_string(),
            parent: "main".to_string(),
            previous_parent: None,
        };
        assert_eq!(
            set.create_undo_step().unwrap(),
            Some(Step::DeleteParentBranch {
                branch: "feature".to_string(),
                previous_parent: None,
            })
        );

        let reparent = Step::SetParentBranch {
            branch: "feature".to_string(),
            parent: "main".to_string(),
            previous_parent: Some("develop".to_string()),
        };
        assert_eq!(
            reparent.create_undo_step().unwrap(),
            Some(Step::SetParentBranch {
                branch: "feature".to_string(),
                parent: "develop".to_string(),
                previous_parent: None,
            })
        );

        let add = Step::AddToPerennialBranches {
            branch: "staging".to_string(),
        };
        assert_eq!(
            add.create_undo_step().unwrap(),
            Some(Step::RemoveFromPerennialBranches {
                branch: "staging".to_string(),
            })
        );
    }

    #[test]
    fn test_merge_derivations() {
        let step = Step::Merge {
            branch: "main".to_string(),
            previous_sha: Some("abc123".to_string()),
        };
        assert_eq!(step.create_continue_step(), Some(Step::ContinueMerge));
        assert_eq!(step.create_abort_step(), Some(Step::AbortMerge));
        assert_eq!(
            step.create_undo_step().unwrap(),
            Some(Step::ResetToSha {
                sha: "abc123".to_string(),
                hard: true,
            })
        );
        assert!(step.can_skip());
        assert!(!step.should_auto_abort());
    }

    #[test]
    fn test_continue_steps_are_their_own_continue() {
        assert_eq!(
            Step::ContinueMerge.create_continue_step(),
            Some(Step::ContinueMerge)
        );
        assert_eq!(
            Step::ContinueRebase.create_continue_step(),
            Some(Step::ContinueRebase)
        );
        // ContinueRebase additionally maps abort to AbortRebase.
        assert_eq!(
            Step::ContinueRebase.create_abort_step(),
            Some(Step::AbortRebase)
        );
        assert_eq!(Step::ContinueMerge.create_abort_step(), None);
    }

    #[test]
    fn test_push_branch_undo_markers() {
        let undoable = Step::PushBranch {
            branch: "main".to_string(),
            force: false,
            force_with_lease: false,
            no_push_hook: false,
            undoable: true,
        };
        assert_eq!(
            undoable.create_undo_step().unwrap(),
            Some(Step::PushBranchAfterCurrentBranchSteps)
        );
        assert_eq!(
            Step::push("feature").create_undo_step().unwrap(),
            Some(Step::SkipCurrentBranchSteps)
        );
    }

    #[test]
    fn test_auto_abort_set() {
        assert!(Step::SquashMerge {
            branch: "feature".to_string(),
            commit_message: None,
            merge_sha: None,
        }
        .should_auto_abort());
        assert!(Step::EnsureHasShippableChanges {
            branch: "feature".to_string()
        }
        .should_auto_abort());
        assert!(!Step::push("main").should_auto_abort());
    }

    #[test]
    fn test_stash_restore_are_mutual_inverses() {
        assert_eq!(
            Step::StashOpenChanges.create_undo_step().unwrap(),
            Some(Step::RestoreOpenChanges)
        );
        assert_eq!(
            Step::RestoreOpenChanges.create_undo_step().unwrap(),
            Some(Step::StashOpenChanges)
        );
    }
}
