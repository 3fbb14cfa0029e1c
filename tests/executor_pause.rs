//! Pause-and-resume behavior of the executor under a merge conflict.

use tempfile::TempDir;
use towline::commands::resume;
use towline::dialog::StaticDialog;
use towline::executor;
use towline::repo::Repo;
use towline::runstate::{self, RunState, StepList};
use towline::steps::Step;
use towline::subprocess::{MockProcessRunner, SubprocessManager};
use towline::EngineError;

async fn repo_with_git_dir(git_dir: &std::path::Path) -> (Repo, MockProcessRunner) {
    let (subprocess, mock) = SubprocessManager::mock();
    mock.expect_command("git")
        .with_args_prefix(&["rev-parse", "--absolute-git-dir"])
        .returns_stdout(&git_dir.display().to_string())
        .finish();
    let repo = Repo::new(&subprocess).await;
    (repo, mock)
}

fn sync_plan_for_feature() -> StepList {
    vec![
        Step::checkout("feature"),
        Step::Merge {
            branch: "main".to_string(),
            previous_sha: None,
        },
        Step::push("feature"),
        Step::checkout("feature"),
        Step::RestoreOpenChanges,
        Step::PreserveCheckoutHistory {
            initial_branch: "feature".to_string(),
            initial_previous_branch: String::new(),
        },
    ]
    .into_iter()
    .collect()
}

/// A merge conflict during sync leaves a resumable plan behind: the head of
/// the remaining plan continues the paused merge, and aborting runs the
/// merge abort followed by the accumulated inverses.
#[tokio::test]
async fn merge_conflict_during_sync_pauses_with_resumable_plan() {
    let dir = TempDir::new().unwrap();
    let (mut repo, mock) = repo_with_git_dir(dir.path()).await;
    mock.expect_command("git")
        .with_args_prefix(&["rev-parse", "--abbrev-ref", "HEAD"])
        .returns_stdout("main\n")
        .finish();
    mock.expect_command("git")
        .with_args_prefix(&["rev-parse", "HEAD"])
        .returns_stdout("abc123\n")
        .finish();
    mock.expect_command("git")
        .with_args_prefix(&["merge", "--no-edit", "main"])
        .returns_exit_code(1)
        .returns_stderr("CONFLICT (content): Merge conflict in src/lib.rs\n")
        .finish();
    mock.expect_command("git").finish();

    let run_state = RunState::new("sync", sync_plan_for_feature());
    let result = executor::execute(run_state, &mut repo, None, &StaticDialog::none()).await;

    let Err(EngineError::Paused { message }) = result else {
        panic!("expected a paused error");
    };
    assert!(message.contains("towline continue"));
    assert!(message.contains("towline abort"));
    assert!(message.contains("towline skip"));

    let saved = runstate::load(dir.path()).await.unwrap().unwrap();
    assert!(saved.is_unfinished());
    let details = saved.unfinished_details.as_ref().unwrap();
    assert_eq!(details.end_branch, "feature");
    assert!(details.can_skip);

    // The remaining plan resumes exactly at the point of failure.
    assert_eq!(
        saved.run_step_list.list,
        vec![
            Step::ContinueMerge,
            Step::push("feature"),
            Step::checkout("feature"),
            Step::RestoreOpenChanges,
            Step::PreserveCheckoutHistory {
                initial_branch: "feature".to_string(),
                initial_previous_branch: String::new(),
            },
        ]
    );

    // The paused step's continue step heads the plan.
    assert_eq!(
        saved.run_step_list.peek(),
        Some(&Step::ContinueMerge)
    );

    // Aborting would clean up the merge, then unwind the completed steps.
    assert_eq!(saved.abort_step_list.list, vec![Step::AbortMerge]);
    assert_eq!(
        saved.undo_step_list.list,
        vec![Step::checkout("main")]
    );
    let abort = saved.create_abort_run_state();
    assert_eq!(
        abort.run_step_list.list,
        vec![Step::AbortMerge, Step::checkout("main")]
    );

    // Skipping drops the rest of the paused branch and resumes at the next
    // branch boundary.
    let skip = saved.create_skip_run_state();
    assert_eq!(
        skip.run_step_list.list,
        vec![
            Step::AbortMerge,
            Step::checkout("feature"),
            Step::RestoreOpenChanges,
            Step::PreserveCheckoutHistory {
                initial_branch: "feature".to_string(),
                initial_previous_branch: String::new(),
            },
        ]
    );
}

/// Continuing with unresolved conflicts must fail without touching the
/// persisted plan.
#[tokio::test]
async fn continue_with_conflicts_is_rejected() {
    let dir = TempDir::new().unwrap();
    let mut run_state = RunState::new("sync", StepList::new());
    run_state.run_step_list.append(Step::ContinueMerge);
    run_state.mark_unfinished("feature", true);
    runstate::save(&run_state, dir.path()).await.unwrap();

    let (mut repo, mock) = repo_with_git_dir(dir.path()).await;
    mock.expect_command("git")
        .with_args_prefix(&["status", "--porcelain"])
        .returns_stdout("UU src/lib.rs\n")
        .finish();
    mock.expect_command("git").finish();

    let err = resume::continue_command(&mut repo, &StaticDialog::none())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("resolve the conflicts"));
    assert_eq!(
        runstate::load(dir.path()).await.unwrap().unwrap(),
        run_state
    );
}

/// Continuing after resolution finishes the plan: the continue step
/// concludes the merge that is still in progress, the rest runs normally.
#[tokio::test]
async fn continue_after_resolution_finishes_plan() {
    let dir = TempDir::new().unwrap();
    let mut run_state = RunState::new("sync", StepList::new());
    run_state.run_step_list.append(Step::ContinueMerge);
    run_state.run_step_list.append(Step::checkout("feature"));
    run_state.mark_unfinished("feature", true);
    runstate::save(&run_state, dir.path()).await.unwrap();

    let (mut repo, mock) = repo_with_git_dir(dir.path()).await;
    // Conflicts are resolved, the merge is still in progress.
    mock.expect_command("git")
        .with_args_prefix(&["status", "--porcelain"])
        .returns_stdout(" M src/lib.rs\n")
        .finish();
    mock.expect_command("git")
        .with_args_prefix(&["rev-parse", "-q", "--verify", "MERGE_HEAD"])
        .returns_stdout(".git/MERGE_HEAD\n")
        .finish();
    mock.expect_command("git")
        .with_args_prefix(&["rev-parse", "--abbrev-ref", "HEAD"])
        .returns_stdout("feature\n")
        .finish();
    mock.expect_command("git").finish();

    resume::continue_command(&mut repo, &StaticDialog::none())
        .await
        .unwrap();

    let saved = runstate::load(dir.path()).await.unwrap().unwrap();
    assert!(saved.is_finished());
    assert!(!saved.is_unfinished());
    // The concluded merge was committed.
    assert!(mock
        .get_call_history()
        .iter()
        .any(|cmd| cmd.args.starts_with(&["commit".to_string(), "--no-edit".to_string()])));
}
