//! End-to-end step sequences for the command builders.
//!
//! Each test pins the exact step list a command compiles to for a concrete
//! repository shape.

use std::collections::HashMap;

use towline::commands::rename_branch::{rename_branch_steps, RenameBranchConfig};
use towline::commands::ship::{ship_steps, ShipConfig};
use towline::commands::sync::{sync_steps, SyncConfig, SyncContext};
use towline::config::{PullBranchStrategy, SyncStrategy};
use towline::hosting::ProposalInfo;
use towline::lineage::Lineage;
use towline::steps::Step;

fn checkout(branch: &str) -> Step {
    Step::checkout(branch)
}

fn base_context() -> SyncContext {
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

/// Sync on a feature branch under the rebase strategy: both the branch and
/// its parent get rebased and pushed, wrapped in stash/restore.
#[test]
fn sync_feature_branch_with_rebase_strategy() {
    let config = SyncConfig {
        branches_to_sync: vec!["main".to_string(), "feature".to_string()],
        initial_branch: "feature".to_string(),
        should_push_tags: false,
        has_open_changes: true,
        previous_branch: None,
        context: base_context(),
    };

    let list = sync_steps(&config);
    assert_eq!(
        list.list,
        vec![
            Step::StashOpenChanges,
            checkout("main"),
            Step::RebaseBranch {
                branch: "origin/main".to_string(),
                previous_sha: None,
            },
            Step::push("main"),
            checkout("feature"),
            Step::RebaseBranch {
                branch: "origin/feature".to_string(),
                previous_sha: None,
            },
            Step::RebaseBranch {
                branch: "main".to_string(),
                previous_sha: None,
            },
            Step::PushBranch {
                branch: "feature".to_string(),
                force: false,
                force_with_lease: true,
                no_push_hook: false,
                undoable: false,
            },
            checkout("feature"),
            Step::RestoreOpenChanges,
            Step::PreserveCheckoutHistory {
                initial_branch: "feature".to_string(),
                initial_previous_branch: String::new(),
            },
        ]
    );
}

/// Sync of a branch whose tracking branch was deleted upstream: the branch
/// is unlinked and removed, and the command ends on the main branch.
#[test]
fn sync_branch_with_deleted_tracking_branch() {
    let mut context = base_context();
    context.lineage = Lineage::new();
    context.lineage.set_parent("stale", "main");
    context.tracking_branches = HashMap::from([("stale".to_string(), false)]);
    context.branches_with_deleted_remote = vec!["stale".to_string()];

    let config = SyncConfig {
        branches_to_sync: vec!["stale".to_string()],
        initial_branch: "stale".to_string(),
        should_push_tags: false,
        has_open_changes: true,
        previous_branch: None,
        context,
    };

    let list = sync_steps(&config);
    assert_eq!(
        list.list,
        vec![
            Step::StashOpenChanges,
            checkout("main"),
            Step::DeleteParentBranch {
                branch: "stale".to_string(),
                previous_parent: None,
            },
            Step::DeleteLocalBranch {
                branch: "stale".to_string(),
                force: false,
                branch_sha: None,
            },
            checkout("main"),
            Step::RestoreOpenChanges,
            Step::PreserveCheckoutHistory {
                initial_branch: "stale".to_string(),
                initial_previous_branch: String::new(),
            },
        ]
    );
}

/// Syncing all branches on a perennial branch pushes tags.
#[test]
fn sync_all_pushes_tags() {
    let mut context = base_context();
    context.tracking_branches.insert("main".to_string(), true);
    let config = SyncConfig {
        branches_to_sync: vec!["main".to_string()],
        initial_branch: "main".to_string(),
        should_push_tags: true,
        has_open_changes: false,
        previous_branch: Some("feature".to_string()),
        context,
    };

    let list = sync_steps(&config);
    assert_eq!(
        list.list,
        vec![
            checkout("main"),
            Step::RebaseBranch {
                branch: "origin/main".to_string(),
                previous_sha: None,
            },
            Step::push("main"),
            checkout("main"),
            Step::PushTags,
            Step::PreserveCheckoutHistory {
                initial_branch: "main".to_string(),
                initial_previous_branch: "feature".to_string(),
            },
        ]
    );
}

/// Ship via the hosting API: push the branch, merge the proposal remotely,
/// pull the parent, then clean up both copies of the shipped branch.
#[test]
fn ship_via_api() {
    let mut context = base_context();
    context.sync_strategy = SyncStrategy::Merge;
    context.tracking_branches = HashMap::from([
        ("main".to_string(), true),
        ("feat".to_string(), true),
    ]);
    context.lineage = Lineage::new();
    context.lineage.set_parent("feat", "main");

    let config = ShipConfig {
        branch_to_ship: "feat".to_string(),
        branch_to_merge_into: "main".to_string(),
        initial_branch: "feat".to_string(),
        is_shipping_initial_branch: true,
        has_tracking_branch: true,
        commit_message: None,
        proposal: Some(ProposalInfo {
            can_merge_with_api: true,
            default_proposal_message: "feat (#4)".to_string(),
            number: 4,
        }),
        should_delete_remote_branch: true,
        child_branches: vec![],
        has_open_changes: false,
        previous_branch: None,
        context,
    };

    let list = ship_steps(&config);
    assert_eq!(
        list.list,
        vec![
            // sync the parent
            checkout("main"),
            Step::RebaseBranch {
                branch: "origin/main".to_string(),
                previous_sha: None,
            },
            Step::push("main"),
            // sync the branch to ship, without pushing
            checkout("feat"),
            Step::Merge {
                branch: "origin/feat".to_string(),
                previous_sha: None,
            },
            Step::Merge {
                branch: "main".to_string(),
                previous_sha: None,
            },
            Step::EnsureHasShippableChanges {
                branch: "feat".to_string(),
            },
            checkout("main"),
            Step::push("feat"),
            Step::ConnectorMergeProposal {
                branch: "feat".to_string(),
                proposal_number: 4,
                commit_message: None,
                default_proposal_message: "feat (#4)".to_string(),
                entered_empty_commit_message: false,
                merge_sha: None,
            },
            Step::PullBranch {
                branch: "main".to_string(),
            },
            Step::PushBranch {
                branch: "main".to_string(),
                force: false,
                force_with_lease: false,
                no_push_hook: false,
                undoable: true,
            },
            Step::DeleteOriginBranch {
                branch: "feat".to_string(),
                is_tracking: true,
                no_push_hook: false,
                branch_sha: None,
            },
            Step::DeleteLocalBranch {
                branch: "feat".to_string(),
                force: false,
                branch_sha: None,
            },
            Step::DeleteParentBranch {
                branch: "feat".to_string(),
                previous_parent: None,
            },
            Step::PreserveCheckoutHistory {
                initial_branch: "feat".to_string(),
                initial_previous_branch: String::new(),
            },
        ]
    );
}

/// Renaming the current feature branch with a tracking branch and a child.
#[test]
fn rename_feature_branch() {
    let config = RenameBranchConfig {
        old_branch: "old".to_string(),
        new_branch: "new".to_string(),
        initial_branch: "old".to_string(),
        is_old_branch_perennial: false,
        old_parent: Some("main".to_string()),
        old_children: vec!["sub".to_string()],
        old_has_tracking_branch: true,
        is_offline: false,
        no_push_hook: false,
        initial_branch_name_before: None,
    };

    let list = rename_branch_steps(&config);
    assert_eq!(
        list.list,
        vec![
            Step::CreateBranch {
                branch: "new".to_string(),
                starting_point: "old".to_string(),
            },
            checkout("new"),
            Step::DeleteParentBranch {
                branch: "old".to_string(),
                previous_parent: None,
            },
            Step::SetParentBranch {
                branch: "new".to_string(),
                parent: "main".to_string(),
                previous_parent: None,
            },
            Step::SetParentBranch {
                branch: "sub".to_string(),
                parent: "new".to_string(),
                previous_parent: None,
            },
            Step::CreateTrackingBranch {
                branch: "new".to_string(),
                no_push_hook: false,
            },
            Step::DeleteOriginBranch {
                branch: "old".to_string(),
                is_tracking: true,
                no_push_hook: false,
                branch_sha: None,
            },
            Step::DeleteLocalBranch {
                branch: "old".to_string(),
                force: false,
                branch_sha: None,
            },
            Step::PreserveCheckoutHistory {
                initial_branch: "old".to_string(),
                initial_previous_branch: String::new(),
            },
        ]
    );
}

/// Every branch a builder references is either known at build time or
/// created earlier in the list.
#[test]
fn builders_only_reference_known_or_created_branches() {
    let known = ["main", "origin/main", "old", "origin/old", "sub"];
    let config = RenameBranchConfig {
        old_branch: "old".to_string(),
        new_branch: "new".to_string(),
        initial_branch: "old".to_string(),
        is_old_branch_perennial: false,
        old_parent: Some("main".to_string()),
        old_children: vec!["sub".to_string()],
        old_has_tracking_branch: true,
        is_offline: false,
        no_push_hook: false,
        initial_branch_name_before: None,
    };

    let mut created: Vec<String> = Vec::new();
    for step in rename_branch_steps(&config).list {
        let referenced: Vec<String> = match &step {
            Step::CreateBranch {
                branch,
                starting_point,
            } => {
                created.push(branch.clone());
                vec![starting_point.clone()]
            }
            Step::CheckoutBranch { branch, .. }
            | Step::CreateTrackingBranch { branch, .. }
            | Step::DeleteOriginBranch { branch, .. }
            | Step::DeleteLocalBranch { branch, .. }
            | Step::DeleteParentBranch { branch, .. } => vec![branch.clone()],
            Step::SetParentBranch { branch, parent, .. } => {
                vec![branch.clone(), parent.clone()]
            }
            _ => vec![],
        };
        for branch in referenced {
            assert!(
                known.contains(&branch.as_str()) || created.contains(&branch),
                "step references unknown branch {branch:?}"
            );
        }
    }
}
