//! The state machine that drives a run state to completion.
//!
//! Steps run strictly one at a time. A failing step is classified: steps
//! that request it switch the plan to its abort derivative and keep going
//! unattended; everything else pauses the command, persists the remaining
//! plan, and reports the resume verbs. Inverses of completed steps
//! accumulate so a finished command can be undone later.

use crate::dialog::UserDialog;
use crate::error::EngineError;
use crate::hosting::Connector;
use crate::repo::Repo;
use crate::runstate::{self, RunState};
use crate::steps::Step;
use crate::Result;

/// Drive the run state until it finishes, pauses, or fails.
pub async fn execute(
    mut run_state: RunState,
    repo: &mut Repo,
    connector: Option<&dyn Connector>,
    dialog: &dyn UserDialog,
) -> Result<()> {
    let git_dir = repo.git.git_dir().await?;
    let mut pending_auto_abort: Option<EngineError> = None;

    loop {
        let Some(mut step) = run_state.run_step_list.pop_front() else {
            run_state.mark_finished();
            if run_state.is_abort || run_state.is_undo {
                runstate::delete(&git_dir).await?;
            } else {
                runstate::save(&run_state, &git_dir).await?;
            }
            return match pending_auto_abort.take() {
                Some(error) => Err(error),
                None => Ok(()),
            };
        };

        // Control-flow markers rewrite the plan instead of running.
        match step {
            Step::SkipCurrentBranchSteps => {
                run_state.skip_current_branch_steps();
                continue;
            }
            Step::PushBranchAfterCurrentBranchSteps => {
                let current = repo.git.current_branch().await?;
                run_state.push_branch_after_current_branch_steps(&current);
                continue;
            }
            _ => {}
        }

        tracing::debug!(command = %run_state.command, "running step: {}", step.description());
        match step.run(repo, connector, dialog).await {
            Ok(()) => {
                if let Some(undo_step) = step.create_undo_step()? {
                    run_state.push_undo_step(undo_step);
                }
            }
            Err(error) => {
                run_state
                    .abort_step_list
                    .append_opt(step.create_abort_step());

                if step.should_auto_abort() {
                    let error = match step.automatic_abort_message() {
                        Some(message) => EngineError::AutoAborted(message),
                        None => error,
                    };
                    tracing::error!(
                        command = %run_state.command,
                        "step {} failed, aborting: {error}",
                        step.description()
                    );
                    eprintln!("Error: {error}");
                    // The abort path runs unattended in the same loop.
                    run_state = run_state.create_abort_run_state();
                    pending_auto_abort = Some(error);
                    continue;
                }

                // Conflict: install the continue step, persist, hand control
                // back to the user.
                run_state
                    .run_step_list
                    .prepend_opt(step.create_continue_step());
                let end_branch = repo.git.current_branch().await.unwrap_or_default();
                run_state.mark_unfinished(&end_branch, step.can_skip());
                runstate::save(&run_state, &git_dir).await?;
                return Err(EngineError::Paused {
                    message: pause_message(&run_state, &step, &error),
                });
            }
        }
    }
}

fn pause_message(run_state: &RunState, step: &Step, error: &EngineError) -> String {
    let can_skip = run_state
        .unfinished_details
        .as_ref()
        .map(|details| details.can_skip)
        .unwrap_or(false);
    let mut message = format!(
        "{error}\n\nThe \"{}\" command paused at \"{}\".\n\
         To abort, run \"towline abort\".\n\
         To continue after having resolved conflicts, run \"towline continue\".\n",
        run_state.command,
        step.description()
    );
    if can_skip {
        message.push_str("To continue by skipping the current branch, run \"towline skip\".\n");
    }
    message
}
