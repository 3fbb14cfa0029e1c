//! The Git runner: every repository probe and mutation the engine needs.
//!
//! All invocations go through the [`ProcessRunner`](crate::subprocess::ProcessRunner)
//! abstraction so tests can substitute a mock. Probes run silently;
//! mutations take a [`Verbosity`] hint and are echoed when logging.
//!
//! The runner caches the current branch, the remote list, and the remote
//! branch list for the duration of a command. The current-branch cache must
//! be invalidated whenever an operation can leave HEAD detached (failed
//! rebases).

pub mod error;
pub mod parsers;
pub mod types;

pub use error::GitError;
pub use types::{PushArgs, Verbosity};

use crate::subprocess::{ProcessCommandBuilder, ProcessOutput, ProcessRunner};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct GitRunner {
    runner: Arc<dyn ProcessRunner>,
    workdir: Option<PathBuf>,
    dry_run: bool,
    current_branch: Option<String>,
    remotes: Option<Vec<String>>,
    remote_branches: Option<Vec<String>>,
}

impl GitRunner {
    /// Create a runner operating in the process working directory.
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            runner,
            workdir: None,
            dry_run: false,
            current_branch: None,
            remotes: None,
            remote_branches: None,
        }
    }

    /// Create a runner pinned to an explicit directory.
    pub fn with_workdir(runner: Arc<dyn ProcessRunner>, workdir: &Path) -> Self {
        Self {
            workdir: Some(workdir.to_path_buf()),
            ..Self::new(runner)
        }
    }

    /// Activate dry-run mode: mutations are echoed but not executed.
    ///
    /// The current branch at activation time seeds the branch cache so that
    /// later steps observe the checkouts a real run would have performed.
    pub fn activate_dry_run(&mut self, current_branch: &str) {
        self.dry_run = true;
        self.current_branch = Some(current_branch.to_string());
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Drop the cached current branch. Required after operations that can
    /// leave HEAD detached.
    pub fn invalidate_current_branch(&mut self) {
        self.current_branch = None;
    }

    async fn run_git(&self, args: &[&str]) -> Result<ProcessOutput, GitError> {
        let mut builder = ProcessCommandBuilder::new("git").args(args);
        if let Some(dir) = &self.workdir {
            builder = builder.current_dir(dir);
        }
        Ok(self.runner.run(builder.build()).await?)
    }

    /// Run a probe, failing on a non-zero exit.
    async fn probe(&self, args: &[&str]) -> Result<String, GitError> {
        let output = self.run_git(args).await?;
        if !output.status.success() {
            return Err(GitError::failed(args, &output.stderr));
        }
        Ok(output.stdout.trim_end().to_string())
    }

    /// Run a probe where a non-zero exit is an answer, not a failure.
    async fn probe_status(&self, args: &[&str]) -> Result<bool, GitError> {
        let output = self.run_git(args).await?;
        Ok(output.status.success())
    }

    /// Run a mutation, honoring the verbosity hint and dry-run mode.
    async fn mutate(&self, verbosity: Verbosity, args: &[&str]) -> Result<String, GitError> {
        if verbosity == Verbosity::Logging {
            println!("$ git {}", args.join(" "));
        }
        if self.dry_run {
            return Ok(String::new());
        }
        let output = self.run_git(args).await?;
        if !output.status.success() {
            return Err(GitError::failed(args, &output.stderr));
        }
        Ok(output.stdout.trim_end().to_string())
    }

    // ---------- probes ----------

    pub async fn is_repository(&self) -> bool {
        matches!(self.probe_status(&["rev-parse", "--git-dir"]).await, Ok(true))
    }

    pub async fn current_branch(&mut self) -> Result<String, GitError> {
        if let Some(branch) = &self.current_branch {
            return Ok(branch.clone());
        }
        let branch = self.probe(&["rev-parse", "--abbrev-ref", "HEAD"]).await?;
        if branch == "HEAD" {
            return Err(GitError::DetachedHead);
        }
        self.current_branch = Some(branch.clone());
        Ok(branch)
    }

    pub async fn current_sha(&self) -> Result<String, GitError> {
        self.probe(&["rev-parse", "HEAD"]).await
    }

    pub async fn sha_for_branch(&self, name: &str) -> Result<String, GitError> {
        self.probe(&["rev-parse", name]).await
    }

    pub async fn has_open_changes(&self) -> Result<bool, GitError> {
        let output = self.probe(&["status", "--porcelain"]).await?;
        Ok(!output.is_empty())
    }

    pub async fn has_conflicts(&self) -> Result<bool, GitError> {
        let output = self.probe(&["status", "--porcelain"]).await?;
        Ok(parsers::has_conflict_entries(&output))
    }

    pub async fn has_merge_in_progress(&self) -> Result<bool, GitError> {
        self.probe_status(&["rev-parse", "-q", "--verify", "MERGE_HEAD"])
            .await
    }

    pub async fn has_rebase_in_progress(&self) -> Result<bool, GitError> {
        let output = self.probe(&["status"]).await?;
        Ok(output.contains("rebase in progress"))
    }

    pub async fn has_local_branch(&self, name: &str) -> Result<bool, GitError> {
        let branch_ref = format!("refs/heads/{name}");
        self.probe_status(&["show-ref", "--verify", "--quiet", &branch_ref])
            .await
    }

    pub async fn has_local_or_origin_branch(&mut self, name: &str) -> Result<bool, GitError> {
        if self.has_local_branch(name).await? {
            return Ok(true);
        }
        self.has_tracking_branch(name).await
    }

    /// The name of the tracking branch for the given branch.
    pub fn tracking_branch(&self, name: &str) -> String {
        format!("origin/{name}")
    }

    pub async fn has_tracking_branch(&mut self, name: &str) -> Result<bool, GitError> {
        let tracking = self.tracking_branch(name);
        Ok(self.remote_branches().await?.contains(&tracking))
    }

    pub async fn remotes(&mut self) -> Result<Vec<String>, GitError> {
        if let Some(remotes) = &self.remotes {
            return Ok(remotes.clone());
        }
        let output = self.probe(&["remote"]).await?;
        let remotes: Vec<String> = output.lines().map(|line| line.trim().to_string()).collect();
        self.remotes = Some(remotes.clone());
        Ok(remotes)
    }

    pub async fn has_remote(&mut self, name: &str) -> Result<bool, GitError> {
        Ok(self.remotes().await?.iter().any(|remote| remote == name))
    }

    pub async fn has_origin(&mut self) -> Result<bool, GitError> {
        self.has_remote("origin").await
    }

    pub async fn remote_branches(&mut self) -> Result<Vec<String>, GitError> {
        if let Some(branches) = &self.remote_branches {
            return Ok(branches.clone());
        }
        let output = self
            .probe(&["branch", "-r", "--format=%(refname:short)"])
            .await?;
        let branches = parsers::parse_remote_branches(&output);
        self.remote_branches = Some(branches.clone());
        Ok(branches)
    }

    /// Whether the branch points at the same commit as its tracking branch.
    /// A branch without a tracking branch is trivially in sync.
    pub async fn is_branch_in_sync(&mut self, name: &str) -> Result<bool, GitError> {
        if !self.has_tracking_branch(name).await? {
            return Ok(true);
        }
        let local = self.sha_for_branch(name).await?;
        let remote = self.sha_for_branch(&self.tracking_branch(name)).await?;
        Ok(local == remote)
    }

    pub async fn local_branches(&self) -> Result<Vec<String>, GitError> {
        let output = self.probe(&["branch", "--format=%(refname:short)"]).await?;
        Ok(output
            .lines()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect())
    }

    pub async fn local_branches_main_first(&self, main: &str) -> Result<Vec<String>, GitError> {
        let mut branches = self.local_branches().await?;
        branches.sort();
        branches.retain(|branch| branch != main);
        branches.insert(0, main.to_string());
        Ok(branches)
    }

    /// All branch names known locally or on origin, deduplicated.
    pub async fn local_and_origin_branches(&mut self) -> Result<Vec<String>, GitError> {
        let mut branches = self.local_branches().await?;
        for remote_branch in self.remote_branches().await? {
            if let Some(name) = remote_branch.strip_prefix("origin/") {
                branches.push(name.to_string());
            }
        }
        branches.sort();
        branches.dedup();
        Ok(branches)
    }

    /// Local branches whose tracking branch was deleted on the remote.
    pub async fn local_branches_with_deleted_tracking_branches(
        &self,
    ) -> Result<Vec<String>, GitError> {
        let output = self.probe(&["branch", "-vv"]).await?;
        Ok(parsers::parse_branches_with_gone_tracking(&output))
    }

    /// Whether the branch holds commits that are not part of the parent.
    pub async fn branch_has_unmerged_commits(
        &self,
        branch: &str,
        parent: &str,
    ) -> Result<bool, GitError> {
        let range = format!("{parent}..{branch}");
        let output = self.probe(&["rev-list", "--count", &range]).await?;
        let count: u64 = output
            .parse()
            .map_err(|_| GitError::Parse(format!("rev-list count: {output:?}")))?;
        Ok(count > 0)
    }

    pub async fn root_directory(&self) -> Result<PathBuf, GitError> {
        Ok(PathBuf::from(
            self.probe(&["rev-parse", "--show-toplevel"]).await?,
        ))
    }

    pub async fn git_dir(&self) -> Result<PathBuf, GitError> {
        Ok(PathBuf::from(
            self.probe(&["rev-parse", "--absolute-git-dir"]).await?,
        ))
    }

    /// The branch that `git checkout -` would switch to, if any.
    pub async fn previously_checked_out_branch(&self) -> Option<String> {
        self.probe(&["rev-parse", "--verify", "--abbrev-ref", "@{-1}"])
            .await
            .ok()
            .filter(|branch| !branch.is_empty())
    }

    /// The branch that should be in the checkout history after a command,
    /// given the branches the user was on before it started.
    pub async fn expected_previously_checked_out_branch(
        &mut self,
        initial_previous_branch: &str,
        initial_branch: &str,
        main_branch: &str,
    ) -> Result<String, GitError> {
        if !initial_previous_branch.is_empty()
            && self.has_local_branch(initial_previous_branch).await?
        {
            if self.has_local_branch(initial_branch).await?
                && self.current_branch().await? == initial_branch
            {
                return Ok(initial_previous_branch.to_string());
            }
            return Ok(initial_branch.to_string());
        }
        Ok(main_branch.to_string())
    }

    /// The configured committer in `Name <email>` form.
    pub async fn author(&self) -> Result<String, GitError> {
        let name = self.probe(&["config", "user.name"]).await?;
        let email = self.probe(&["config", "user.email"]).await?;
        Ok(format!("{name} <{email}>"))
    }

    /// Distinct authors of the commits the branch adds over its parent,
    /// most frequent first.
    pub async fn branch_authors(
        &self,
        branch: &str,
        parent: &str,
    ) -> Result<Vec<String>, GitError> {
        let range = format!("{parent}..{branch}");
        let output = self.probe(&["shortlog", "-s", "-n", "-e", &range]).await?;
        Ok(parsers::parse_shortlog_authors(&output))
    }

    /// Whether the branch and its tracking branch have diverged, i.e.
    /// whether a push would transfer anything.
    pub async fn should_push_branch(&self, branch: &str) -> Result<bool, GitError> {
        let range = format!("{branch}...{}", self.tracking_branch(branch));
        let output = self.probe(&["rev-list", "--left-right", &range]).await?;
        Ok(!output.is_empty())
    }

    /// Whether the branch contains changes over the given parent.
    pub async fn has_shippable_changes(
        &self,
        branch: &str,
        parent: &str,
    ) -> Result<bool, GitError> {
        let range = format!("{parent}..{branch}");
        let output = self.probe(&["diff", &range]).await?;
        Ok(!output.is_empty())
    }

    pub async fn last_commit_message(&self) -> Result<String, GitError> {
        self.probe(&["log", "-1", "--format=%B"]).await
    }

    /// The URL of the given remote, if configured.
    pub async fn remote_url(&self, remote: &str) -> Option<String> {
        self.probe(&["remote", "get-url", remote])
            .await
            .ok()
            .filter(|url| !url.is_empty())
    }

    // ---------- mutations ----------

    pub async fn fetch(&self, verbosity: Verbosity) -> Result<(), GitError> {
        self.mutate(verbosity, &["fetch", "--prune", "--tags"])
            .await?;
        Ok(())
    }

    pub async fn fetch_upstream(&self, branch: &str, verbosity: Verbosity) -> Result<(), GitError> {
        self.mutate(verbosity, &["fetch", "upstream", branch])
            .await?;
        Ok(())
    }

    pub async fn checkout_branch(
        &mut self,
        name: &str,
        verbosity: Verbosity,
    ) -> Result<(), GitError> {
        match self.mutate(verbosity, &["checkout", name]).await {
            Ok(_) => {
                self.current_branch = Some(name.to_string());
                Ok(())
            }
            Err(err) => {
                self.current_branch = None;
                Err(err)
            }
        }
    }

    pub async fn create_branch(
        &self,
        name: &str,
        starting_point: &str,
        verbosity: Verbosity,
    ) -> Result<(), GitError> {
        self.mutate(verbosity, &["branch", name, starting_point])
            .await?;
        Ok(())
    }

    pub async fn create_remote_branch(
        &self,
        sha: &str,
        branch: &str,
        no_push_hook: bool,
        verbosity: Verbosity,
    ) -> Result<(), GitError> {
        let refspec = format!("{sha}:refs/heads/{branch}");
        let mut args = vec!["push"];
        if no_push_hook {
            args.push("--no-verify");
        }
        args.push("origin");
        args.push(&refspec);
        self.mutate(verbosity, &args).await?;
        Ok(())
    }

    pub async fn create_tracking_branch(
        &mut self,
        branch: &str,
        no_push_hook: bool,
        verbosity: Verbosity,
    ) -> Result<(), GitError> {
        let mut args = vec!["push"];
        if no_push_hook {
            args.push("--no-verify");
        }
        args.push("-u");
        args.push("origin");
        args.push(branch);
        self.mutate(verbosity, &args).await?;
        self.remote_branches = None;
        Ok(())
    }

    pub async fn delete_local_branch(
        &self,
        name: &str,
        force: bool,
        verbosity: Verbosity,
    ) -> Result<(), GitError> {
        let flag = if force { "-D" } else { "-d" };
        self.mutate(verbosity, &["branch", flag, name]).await?;
        Ok(())
    }

    pub async fn delete_remote_branch(
        &mut self,
        name: &str,
        verbosity: Verbosity,
    ) -> Result<(), GitError> {
        let refspec = format!(":{name}");
        self.mutate(verbosity, &["push", "origin", &refspec]).await?;
        self.remote_branches = None;
        Ok(())
    }

    pub async fn stash(&self, verbosity: Verbosity) -> Result<(), GitError> {
        self.mutate(verbosity, &["add", "-A"]).await?;
        self.mutate(verbosity, &["stash"]).await?;
        Ok(())
    }

    pub async fn pop_stash(&self, verbosity: Verbosity) -> Result<(), GitError> {
        self.mutate(verbosity, &["stash", "pop"]).await?;
        Ok(())
    }

    pub async fn stage_files(&self, pattern: &str, verbosity: Verbosity) -> Result<(), GitError> {
        self.mutate(verbosity, &["add", pattern]).await?;
        Ok(())
    }

    /// Create a commit. Without a message the user's editor is opened.
    pub async fn commit(
        &self,
        message: Option<&str>,
        author: Option<&str>,
        verbosity: Verbosity,
    ) -> Result<(), GitError> {
        if message.is_none() {
            return self.start_commit(verbosity).await;
        }
        let mut args = vec!["commit".to_string()];
        if let Some(message) = message {
            args.push("-m".to_string());
            args.push(message.to_string());
        }
        if let Some(author) = author {
            args.push(format!("--author={author}"));
        }
        let arg_refs: Vec<&str> = args.iter().map(|s| s.as_str()).collect();
        self.mutate(verbosity, &arg_refs).await?;
        Ok(())
    }

    pub async fn commit_staged_changes(
        &self,
        message: &str,
        verbosity: Verbosity,
    ) -> Result<(), GitError> {
        self.mutate(verbosity, &["commit", "-m", message]).await?;
        Ok(())
    }

    pub async fn commit_no_edit(&self, verbosity: Verbosity) -> Result<(), GitError> {
        self.mutate(verbosity, &["commit", "--no-edit"]).await?;
        Ok(())
    }

    pub async fn merge_branch_no_edit(
        &self,
        branch: &str,
        verbosity: Verbosity,
    ) -> Result<(), GitError> {
        self.mutate(verbosity, &["merge", "--no-edit", branch])
            .await?;
        Ok(())
    }

    pub async fn squash_merge(&self, branch: &str, verbosity: Verbosity) -> Result<(), GitError> {
        self.mutate(verbosity, &["merge", "--squash", branch])
            .await?;
        Ok(())
    }

    pub async fn rebase(&self, branch: &str, verbosity: Verbosity) -> Result<(), GitError> {
        self.mutate(verbosity, &["rebase", branch]).await?;
        Ok(())
    }

    pub async fn continue_rebase(&self, verbosity: Verbosity) -> Result<(), GitError> {
        self.mutate(verbosity, &["rebase", "--continue"]).await?;
        Ok(())
    }

    pub async fn abort_merge(&self, verbosity: Verbosity) -> Result<(), GitError> {
        self.mutate(verbosity, &["merge", "--abort"]).await?;
        Ok(())
    }

    pub async fn abort_rebase(&mut self, verbosity: Verbosity) -> Result<(), GitError> {
        self.mutate(verbosity, &["rebase", "--abort"]).await?;
        self.current_branch = None;
        Ok(())
    }

    pub async fn reset_to_sha(
        &self,
        sha: &str,
        hard: bool,
        verbosity: Verbosity,
    ) -> Result<(), GitError> {
        let mut args = vec!["reset"];
        if hard {
            args.push("--hard");
        }
        args.push(sha);
        self.mutate(verbosity, &args).await?;
        Ok(())
    }

    pub async fn discard_open_changes(&self, verbosity: Verbosity) -> Result<(), GitError> {
        self.mutate(verbosity, &["reset", "--hard"]).await?;
        Ok(())
    }

    pub async fn revert_commit(&self, sha: &str, verbosity: Verbosity) -> Result<(), GitError> {
        self.mutate(verbosity, &["revert", sha]).await?;
        Ok(())
    }

    pub async fn push_branch(&self, args: PushArgs, verbosity: Verbosity) -> Result<(), GitError> {
        let mut cmd_args = vec!["push".to_string()];
        if args.force {
            cmd_args.push("--force".to_string());
        }
        if args.force_with_lease {
            cmd_args.push("--force-with-lease".to_string());
        }
        if args.no_push_hook {
            cmd_args.push("--no-verify".to_string());
        }
        if let Some(remote) = &args.remote {
            cmd_args.push(remote.clone());
            cmd_args.push(args.branch.clone());
        }
        let arg_refs: Vec<&str> = cmd_args.iter().map(|s| s.as_str()).collect();
        self.mutate(verbosity, &arg_refs).await?;
        Ok(())
    }

    pub async fn push_tags(&self, verbosity: Verbosity) -> Result<(), GitError> {
        self.mutate(verbosity, &["push", "--tags"]).await?;
        Ok(())
    }

    pub async fn pull(&self, verbosity: Verbosity) -> Result<(), GitError> {
        self.mutate(verbosity, &["pull"]).await?;
        Ok(())
    }

    /// Open the user's editor to author a commit message.
    pub async fn start_commit(&self, verbosity: Verbosity) -> Result<(), GitError> {
        if verbosity == Verbosity::Logging {
            println!("$ git commit");
        }
        if self.dry_run {
            return Ok(());
        }
        let mut builder = ProcessCommandBuilder::new("git").arg("commit").interactive();
        if let Some(dir) = &self.workdir {
            builder = builder.current_dir(dir);
        }
        let output = self.runner.run(builder.build()).await?;
        if !output.status.success() {
            return Err(GitError::failed(&["commit"], &output.stderr));
        }
        Ok(())
    }

    pub async fn delete_last_commit(&self, verbosity: Verbosity) -> Result<(), GitError> {
        self.mutate(verbosity, &["reset", "--hard", "HEAD~1"])
            .await?;
        Ok(())
    }

    /// Comment out every line of the pending squash commit message,
    /// optionally prefixing new content, so the editor starts clean.
    pub async fn comment_out_squash_commit_message(
        &self,
        prefix: Option<&str>,
    ) -> Result<(), GitError> {
        if self.dry_run {
            return Ok(());
        }
        let squash_msg = self.git_dir().await?.join("SQUASH_MSG");
        let content = tokio::fs::read_to_string(&squash_msg).await?;
        let commented: String = content.lines().map(|line| format!("# {line}\n")).collect();
        let new_content = match prefix {
            Some(prefix) => format!("{prefix}{commented}"),
            None => commented,
        };
        tokio::fs::write(&squash_msg, new_content).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subprocess::SubprocessManager;

    fn runner_with_mock() -> (GitRunner, crate::subprocess::MockProcessRunner) {
        let (subprocess, mock) = SubprocessManager::mock();
        (GitRunner::new(subprocess.runner()), mock)
    }

    #[tokio::test]
    async fn test_current_branch_is_cached() {
        let (mut git, mock) = runner_with_mock();
        mock.expect_command("git")
            .with_args_prefix(&["rev-parse", "--abbrev-ref", "HEAD"])
            .returns_stdout("feature\n")
            .times(1)
            .finish();

        assert_eq!(git.current_branch().await.unwrap(), "feature");
        // Served from the cache; a second subprocess call would violate the
        // `times(1)` expectation.
        assert_eq!(git.current_branch().await.unwrap(), "feature");
    }

    #[tokio::test]
    async fn test_current_branch_detached_head() {
        let (mut git, mock) = runner_with_mock();
        mock.expect_command("git")
            .with_args_prefix(&["rev-parse", "--abbrev-ref", "HEAD"])
            .returns_stdout("HEAD\n")
            .finish();

        assert!(matches!(
            git.current_branch().await,
            Err(GitError::DetachedHead)
        ));
    }

    #[tokio::test]
    async fn test_checkout_updates_cache() {
        let (mut git, mock) = runner_with_mock();
        mock.expect_command("git")
            .with_args_prefix(&["checkout"])
            .finish();

        git.checkout_branch("main", Verbosity::Silent)
            .await
            .unwrap();
        // No rev-parse expectation configured: the value must come from the
        // cache updated by the checkout.
        assert_eq!(git.current_branch().await.unwrap(), "main");
    }

    #[tokio::test]
    async fn test_dry_run_skips_mutations() {
        let (mut git, mock) = runner_with_mock();
        git.activate_dry_run("feature");

        git.checkout_branch("main", Verbosity::Silent)
            .await
            .unwrap();
        git.fetch(Verbosity::Silent).await.unwrap();

        assert!(mock.verify_called("git", 0));
        assert_eq!(git.current_branch().await.unwrap(), "main");
    }

    #[tokio::test]
    async fn test_push_branch_args() {
        let (git, mock) = runner_with_mock();
        mock.expect_command("git")
            .with_args_prefix(&["push"])
            .finish();

        git.push_branch(
            PushArgs {
                branch: "feature".to_string(),
                force_with_lease: true,
                no_push_hook: true,
                remote: Some("origin".to_string()),
                ..Default::default()
            },
            Verbosity::Silent,
        )
        .await
        .unwrap();

        let history = mock.get_call_history();
        assert_eq!(
            history[0].args,
            vec![
                "push",
                "--force-with-lease",
                "--no-verify",
                "origin",
                "feature"
            ]
        );
    }

    #[tokio::test]
    async fn test_branch_has_unmerged_commits() {
        let (git, mock) = runner_with_mock();
        mock.expect_command("git")
            .with_args_prefix(&["rev-list", "--count"])
            .returns_stdout("3\n")
            .finish();

        assert!(git
            .branch_has_unmerged_commits("feature", "main")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_probe_failure_carries_stderr() {
        let (git, mock) = runner_with_mock();
        mock.expect_command("git")
            .with_args_prefix(&["rev-parse", "HEAD"])
            .returns_exit_code(128)
            .returns_stderr("fatal: not a git repository\n")
            .finish();

        let err = git.current_sha().await.unwrap_err();
        assert!(err.to_string().contains("not a git repository"));
    }
}
