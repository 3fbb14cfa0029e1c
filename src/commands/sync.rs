//! The `sync` command: update branches with all relevant changes.
//!
//! Syncing a feature branch pulls its tracking branch, integrates its
//! parent, and pushes. Syncing main or a perennial branch pulls and pushes
//! it and optionally rebases main against an `upstream` remote. Branches
//! whose tracking branch disappeared upstream are deleted locally, with
//! their children re-parented.

use std::collections::HashMap;

use super::{ensure_knows_parent_branches, ensure_no_unfinished_state};
use crate::config::{PullBranchStrategy, SyncStrategy};
use crate::dialog::UserDialog;
use crate::executor;
use crate::git::Verbosity;
use crate::lineage::Lineage;
use crate::repo::Repo;
use crate::runstate::{RunState, StepList, WrapOptions};
use crate::steps::Step;
use crate::Result;

#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    pub all: bool,
    pub dry_run: bool,
}

/// Repository facts shared by the branch-update builders of `sync` and
/// `ship`. Gathered once so the builders stay pure.
#[derive(Debug, Clone)]
pub struct SyncContext {
    pub has_origin: bool,
    pub is_offline: bool,
    pub main_branch: String,
    pub perennial_branches: Vec<String>,
    pub sync_strategy: SyncStrategy,
    pub pull_branch_strategy: PullBranchStrategy,
    pub push_hook: bool,
    pub sync_upstream: bool,
    pub has_upstream_remote: bool,
    pub lineage: Lineage,
    /// Whether each relevant branch has a tracking branch.
    pub tracking_branches: HashMap<String, bool>,
    pub branches_with_deleted_remote: Vec<String>,
}

impl SyncContext {
    pub async fn gather(repo: &mut Repo, branches: &[String]) -> Result<Self> {
        let mut tracking_branches = HashMap::new();
        for branch in branches {
            tracking_branches.insert(
                branch.clone(),
                repo.git.has_tracking_branch(branch).await?,
            );
        }
        Ok(Self {
            has_origin: repo.git.has_origin().await?,
            is_offline: repo.config.is_offline()?,
            main_branch: repo.config.main_branch(),
            perennial_branches: repo.config.perennial_branches(),
            sync_strategy: repo.config.sync_strategy()?,
            pull_branch_strategy: repo.config.pull_branch_strategy()?,
            push_hook: repo.config.push_hook()?,
            sync_upstream: repo.config.should_sync_upstream()?,
            has_upstream_remote: repo.git.has_remote("upstream").await?,
            lineage: repo.config.lineage(),
            tracking_branches,
            branches_with_deleted_remote: repo
                .git
                .local_branches_with_deleted_tracking_branches()
                .await?,
        })
    }

    pub fn is_feature_branch(&self, branch: &str) -> bool {
        branch != self.main_branch
            && !self
                .perennial_branches
                .iter()
                .any(|perennial| perennial == branch)
    }

    pub fn has_tracking_branch(&self, branch: &str) -> bool {
        self.tracking_branches.get(branch).copied().unwrap_or(false)
    }

    pub fn tracking_branch(&self, branch: &str) -> String {
        format!("origin/{branch}")
    }

    fn has_deleted_tracking_branch(&self, branch: &str) -> bool {
        self.branches_with_deleted_remote
            .iter()
            .any(|deleted| deleted == branch)
    }
}

/// Everything the sync builder needs, gathered up front.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub branches_to_sync: Vec<String>,
    pub initial_branch: String,
    pub should_push_tags: bool,
    pub has_open_changes: bool,
    pub previous_branch: Option<String>,
    pub context: SyncContext,
}

pub async fn sync(repo: &mut Repo, dialog: &dyn UserDialog, options: SyncOptions) -> Result<()> {
    ensure_no_unfinished_state(repo).await?;
    if options.dry_run {
        let current = repo.git.current_branch().await?;
        repo.git.activate_dry_run(&current);
    }
    let config = determine_sync_config(repo, dialog, options.all).await?;
    let step_list = sync_steps(&config);
    repo.navigate_to_root().await?;
    let run_state = RunState::new("sync", step_list);
    executor::execute(run_state, repo, None, dialog).await
}

pub async fn determine_sync_config(
    repo: &mut Repo,
    dialog: &dyn UserDialog,
    all: bool,
) -> Result<SyncConfig> {
    let has_origin = repo.git.has_origin().await?;
    let is_offline = repo.config.is_offline()?;
    if has_origin && !is_offline {
        repo.git.fetch(Verbosity::Logging).await?;
        let known_branches = repo.git.local_and_origin_branches().await?;
        repo.config
            .remove_outdated_configuration(&known_branches)
            .await?;
    }
    let initial_branch = repo.git.current_branch().await?;
    let main_branch = repo.config.main_branch();

    let (branches_to_sync, should_push_tags) = if all {
        let branches = repo.git.local_branches_main_first(&main_branch).await?;
        ensure_knows_parent_branches(repo, dialog, &branches).await?;
        (branches, true)
    } else {
        ensure_knows_parent_branches(repo, dialog, std::slice::from_ref(&initial_branch)).await?;
        let mut branches = repo.config.ancestor_branches(&initial_branch);
        branches.push(initial_branch.clone());
        let should_push_tags = !repo.config.is_feature_branch(&initial_branch);
        (branches, should_push_tags)
    };

    let context = SyncContext::gather(repo, &branches_to_sync).await?;
    Ok(SyncConfig {
        branches_to_sync,
        initial_branch,
        should_push_tags,
        has_open_changes: repo.git.has_open_changes().await?,
        previous_branch: repo.git.previously_checked_out_branch().await,
        context,
    })
}

/// The step list for the sync command. Pure over the gathered config.
pub fn sync_steps(config: &SyncConfig) -> StepList {
    let mut list = StepList::new();
    let context = &config.context;
    for branch in &config.branches_to_sync {
        if context.has_deleted_tracking_branch(branch) {
            delete_branch_steps(&mut list, branch, config);
        } else {
            update_branch_steps(&mut list, branch, true, context);
        }
    }
    let final_branch = if context.has_deleted_tracking_branch(&config.initial_branch) {
        &context.main_branch
    } else {
        &config.initial_branch
    };
    list.append(Step::checkout(final_branch));
    if context.has_origin && config.should_push_tags && !context.is_offline {
        list.append(Step::PushTags);
    }
    list.wrap(&WrapOptions {
        run_in_git_root: true,
        stash_open_changes: true,
        has_open_changes: config.has_open_changes,
        initial_branch: &config.initial_branch,
        previous_branch: config.previous_branch.as_deref(),
    });
    list
}

/// Delete a branch whose tracking branch disappeared upstream, re-parenting
/// its children first.
fn delete_branch_steps(list: &mut StepList, branch: &str, config: &SyncConfig) {
    let context = &config.context;
    if config.initial_branch == branch {
        list.append(Step::checkout(&context.main_branch));
    }
    if let Some(parent) = context.lineage.parent(branch) {
        for child in context.lineage.children(branch) {
            list.append(Step::SetParentBranch {
                branch: child,
                parent: parent.to_string(),
                previous_parent: None,
            });
        }
        list.append(Step::DeleteParentBranch {
            branch: branch.to_string(),
            previous_parent: None,
        });
    }
    if !context.is_feature_branch(branch) {
        list.append(Step::RemoveFromPerennialBranches {
            branch: branch.to_string(),
        });
    }
    list.append(Step::DeleteLocalBranch {
        branch: branch.to_string(),
        force: false,
        branch_sha: None,
    });
}

/// The steps that bring one branch up to date, shared by sync and ship.
pub fn update_branch_steps(
    list: &mut StepList,
    branch: &str,
    push_branch: bool,
    context: &SyncContext,
) {
    let is_feature = context.is_feature_branch(branch);
    if !context.has_origin && !is_feature {
        return;
    }
    list.append(Step::checkout(branch));
    if is_feature {
        update_feature_branch_steps(list, branch, context);
    } else {
        update_perennial_branch_steps(list, branch, context);
    }
    if push_branch && context.has_origin && !context.is_offline {
        if !context.has_tracking_branch(branch) {
            list.append(Step::CreateTrackingBranch {
                branch: branch.to_string(),
                no_push_hook: !context.push_hook,
            });
            return;
        }
        if !is_feature {
            list.append(Step::push(branch));
            return;
        }
        match context.sync_strategy {
            SyncStrategy::Merge => list.append(Step::PushBranch {
                branch: branch.to_string(),
                force: false,
                force_with_lease: false,
                no_push_hook: !context.push_hook,
                undoable: false,
            }),
            SyncStrategy::Rebase => list.append(Step::PushBranch {
                branch: branch.to_string(),
                force: false,
                force_with_lease: true,
                no_push_hook: false,
                undoable: false,
            }),
        }
    }
}

fn update_feature_branch_steps(list: &mut StepList, branch: &str, context: &SyncContext) {
    if context.has_tracking_branch(branch) {
        list.append(Step::integrate(
            &context.tracking_branch(branch),
            context.sync_strategy,
        ));
    }
    // The effective parent is the last ancestor that still has its remote.
    let ancestors = context.lineage.ancestors(branch);
    let effective_parent = ancestors
        .iter()
        .rev()
        .find(|ancestor| !context.has_deleted_tracking_branch(ancestor));
    if let Some(parent) = effective_parent {
        list.append(Step::integrate(parent, context.sync_strategy));
    }
}

fn update_perennial_branch_steps(list: &mut StepList, branch: &str, context: &SyncContext) {
    if context.has_tracking_branch(branch) {
        list.append(Step::integrate(
            &context.tracking_branch(branch),
            context.pull_branch_strategy.as_sync_strategy(),
        ));
    }
    if branch == context.main_branch && context.has_upstream_remote && context.sync_upstream {
        list.append(Step::FetchUpstream {
            branch: context.main_branch.clone(),
        });
        list.append(Step::RebaseBranch {
            branch: format!("upstream/{}", context.main_branch),
            previous_sha: None,
        });
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn context() -> SyncContext {
        let mut lineage = Lineage::new();
        lineage.set_parent("feature", "main");
        SyncContext {
            has_origin: true,
            is_offline: false,
            main_branch: "main".to_string(),
            perennial_branches: vec![],
            sync_strategy: SyncStrategy::Rebase,
            pull_branch_strategy: PullBranchStrategy::Rebase,
            push_hook: true,
            sync_upstream: true,
            has_upstream_remote: false,
            lineage,
            tracking_branches: HashMap::from([
                ("main".to_string(), true),
                ("feature".to_string(), true),
            ]),
            branches_with_deleted_remote: vec![],
        }
    }

    #[test]
    fn test_update_branch_without_origin_skips_perennials() {
        let mut ctx = context();
        ctx.has_origin = false;
        let mut list = StepList::new();
        update_branch_steps(&mut list, "main", true, &ctx);
        assert!(list.is_empty());
    }

    #[test]
    fn test_feature_branch_sync_under_merge_strategy() {
        let mut ctx = context();
        ctx.sync_strategy = SyncStrategy::Merge;
        let mut list = StepList::new();
        update_branch_steps(&mut list, "feature", true, &ctx);

        assert_eq!(
            list.list,
            vec![
                Step::checkout("feature"),
                Step::Merge {
                    branch: "origin/feature".to_string(),
                    previous_sha: None,
                },
                Step::Merge {
                    branch: "main".to_string(),
                    previous_sha: None,
                },
                Step::PushBranch {
                    branch: "feature".to_string(),
                    force: false,
                    force_with_lease: false,
                    no_push_hook: false,
                    undoable: false,
                },
            ]
        );
    }

    #[test]
    fn test_branch_without_tracking_gets_tracking_branch() {
        let mut ctx = context();
        ctx.tracking_branches.insert("feature".to_string(), false);
        let mut list = StepList::new();
        update_branch_steps(&mut list, "feature", true, &ctx);

        assert_eq!(
            list.list,
            vec![
                Step::checkout("feature"),
                Step::RebaseBranch {
                    branch: "main".to_string(),
                    previous_sha: None,
                },
                Step::CreateTrackingBranch {
                    branch: "feature".to_string(),
                    no_push_hook: false,
                },
            ]
        );
    }

    #[test]
    fn test_effective_parent_skips_deleted_ancestors() {
        let mut ctx = context();
        ctx.lineage.set_parent("child", "feature");
        ctx.branches_with_deleted_remote = vec!["feature".to_string()];
        ctx.tracking_branches.insert("child".to_string(), false);
        let mut list = StepList::new();
        update_branch_steps(&mut list, "child", false, &ctx);

        // The deleted "feature" ancestor is skipped; "main" is integrated.
        assert_eq!(
            list.list,
            vec![
                Step::checkout("child"),
                Step::RebaseBranch {
                    branch: "main".to_string(),
                    previous_sha: None,
                },
            ]
        );
    }

    #[test]
    fn test_main_with_upstream_rebases_against_upstream() {
        let mut ctx = context();
        ctx.has_upstream_remote = true;
        let mut list = StepList::new();
        update_branch_steps(&mut list, "main", false, &ctx);

        assert_eq!(
            list.list,
            vec![
                Step::checkout("main"),
                Step::RebaseBranch {
                    branch: "origin/main".to_string(),
                    previous_sha: None,
                },
                Step::FetchUpstream {
                    branch: "main".to_string(),
                },
                Step::RebaseBranch {
                    branch: "upstream/main".to_string(),
                    previous_sha: None,
                },
            ]
        );
    }
}
