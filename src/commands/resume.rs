//! The resume verbs: `continue`, `abort`, `skip`, and `undo`.
//!
//! All four operate on the persisted run state of the previous command.

use super::connector_for;
use crate::dialog::UserDialog;
use crate::error::EngineError;
use crate::executor;
use crate::repo::Repo;
use crate::runstate::{self, RunState};
use crate::Result;

/// Restart the paused command after the user resolved the conflicts.
pub async fn continue_command(repo: &mut Repo, dialog: &dyn UserDialog) -> Result<()> {
    let run_state = load_unfinished(repo, "continue").await?;
    if repo.git.has_conflicts().await? {
        return Err(EngineError::Precondition(
            "you must resolve the conflicts before continuing".to_string(),
        ));
    }
    let connector = connector_for(repo).await?;
    executor::execute(run_state, repo, connector.as_deref(), dialog).await
}

/// Abort the paused command, restoring the repository.
pub async fn abort_command(repo: &mut Repo, dialog: &dyn UserDialog) -> Result<()> {
    let run_state = load_unfinished(repo, "abort").await?;
    let abort_run_state = run_state.create_abort_run_state();
    let connector = connector_for(repo).await?;
    executor::execute(abort_run_state, repo, connector.as_deref(), dialog).await
}

/// Skip the rest of the paused branch and resume with the next one.
pub async fn skip_command(repo: &mut Repo, dialog: &dyn UserDialog) -> Result<()> {
    let run_state = load_unfinished(repo, "skip").await?;
    let can_skip = run_state
        .unfinished_details
        .as_ref()
        .map(|details| details.can_skip)
        .unwrap_or(false);
    if !can_skip {
        return Err(EngineError::Precondition(
            "this part of the command cannot be skipped".to_string(),
        ));
    }
    let skip_run_state = run_state.create_skip_run_state();
    let connector = connector_for(repo).await?;
    executor::execute(skip_run_state, repo, connector.as_deref(), dialog).await
}

/// Undo the last finished command.
pub async fn undo_command(repo: &mut Repo, dialog: &dyn UserDialog) -> Result<()> {
    let git_dir = repo.git.git_dir().await?;
    let run_state = runstate::load(&git_dir)
        .await?
        .ok_or_else(|| EngineError::Precondition("nothing to undo".to_string()))?;
    if run_state.is_unfinished() {
        return Err(EngineError::Precondition(
            "cannot undo an unfinished command; run \"towline abort\" instead".to_string(),
        ));
    }
    if run_state.undo_step_list.is_empty() {
        return Err(EngineError::Precondition("nothing to undo".to_string()));
    }
    let undo_run_state = run_state.create_undo_run_state();
    let connector = connector_for(repo).await?;
    executor::execute(undo_run_state, repo, connector.as_deref(), dialog).await
}

async fn load_unfinished(repo: &Repo, verb: &str) -> Result<RunState> {
    let git_dir = repo.git.git_dir().await?;
    let run_state = runstate::load(&git_dir)
        .await?
        .ok_or_else(|| EngineError::Precondition(format!("nothing to {verb}")))?;
    if !run_state.is_unfinished() {
        return Err(EngineError::Precondition(format!("nothing to {verb}")));
    }
    Ok(run_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialog::StaticDialog;
    use crate::runstate::StepList;
    use crate::steps::Step;
    use crate::subprocess::SubprocessManager;
    use tempfile::TempDir;

    async fn repo_with_state(
        run_state: Option<&RunState>,
    ) -> (Repo, crate::subprocess::MockProcessRunner, TempDir) {
        let dir = TempDir::new().unwrap();
        if let Some(run_state) = run_state {
            runstate::save(run_state, dir.path()).await.unwrap();
        }
        let (subprocess, mock) = SubprocessManager::mock();
        mock.expect_command("git")
            .with_args_prefix(&["rev-parse", "--absolute-git-dir"])
            .returns_stdout(&dir.path().display().to_string())
            .finish();
        let repo = Repo::new(&subprocess).await;
        (repo, mock, dir)
    }

    #[tokio::test]
    async fn test_continue_without_state_fails() {
        let (mut repo, mock, _dir) = repo_with_state(None).await;
        mock.expect_command("git").finish();

        let err = continue_command(&mut repo, &StaticDialog::none())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("nothing to continue"));
    }

    #[tokio::test]
    async fn test_continue_with_conflicts_fails_without_mutating() {
        let mut run_state = RunState::new("sync", StepList::new());
        run_state.run_step_list.append(Step::ContinueMerge);
        run_state.mark_unfinished("feature", false);
        let (mut repo, mock, dir) = repo_with_state(Some(&run_state)).await;
        mock.expect_command("git")
            .with_args_prefix(&["status", "--porcelain"])
            .returns_stdout("UU src/main.rs\n")
            .finish();
        mock.expect_command("git").finish();

        let err = continue_command(&mut repo, &StaticDialog::none())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("resolve the conflicts"));
        // The persisted state is untouched.
        let saved = runstate::load(dir.path()).await.unwrap().unwrap();
        assert_eq!(saved, run_state);
    }

    #[tokio::test]
    async fn test_skip_requires_skippable_pause() {
        let mut run_state = RunState::new("ship", StepList::new());
        run_state.run_step_list.append(Step::ContinueMerge);
        run_state.mark_unfinished("feature", false);
        let (mut repo, mock, _dir) = repo_with_state(Some(&run_state)).await;
        mock.expect_command("git").finish();

        let err = skip_command(&mut repo, &StaticDialog::none())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("cannot be skipped"));
    }

    #[tokio::test]
    async fn test_undo_refuses_unfinished_state() {
        let mut run_state = RunState::new("sync", StepList::new());
        run_state.run_step_list.append(Step::ContinueMerge);
        run_state.push_undo_step(Step::checkout("main"));
        run_state.mark_unfinished("feature", true);
        let (mut repo, mock, _dir) = repo_with_state(Some(&run_state)).await;
        mock.expect_command("git").finish();

        let err = undo_command(&mut repo, &StaticDialog::none())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("abort"));
    }

    #[tokio::test]
    async fn test_undo_executes_and_deletes_state() {
        let mut run_state = RunState::new("sync", StepList::new());
        run_state.push_undo_step(Step::PushTags);
        let (mut repo, mock, dir) = repo_with_state(Some(&run_state)).await;
        mock.expect_command("git").finish();

        undo_command(&mut repo, &StaticDialog::none())
            .await
            .unwrap();
        assert!(runstate::load(dir.path()).await.unwrap().is_none());
    }
}
