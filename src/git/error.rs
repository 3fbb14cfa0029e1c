//! Git operation error types

use thiserror::Error;

/// Git-specific errors
#[derive(Debug, Error)]
pub enum GitError {
    #[error("not a git repository")]
    NotARepository,

    #[error("git command failed: git {command}\n{stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("repository is in detached HEAD state")]
    DetachedHead,

    #[error("cannot parse git output: {0}")]
    Parse(String),

    #[error(transparent)]
    Process(#[from] crate::subprocess::ProcessError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GitError {
    pub(crate) fn failed(args: &[&str], stderr: &str) -> Self {
        GitError::CommandFailed {
            command: args.join(" "),
            stderr: stderr.trim().to_string(),
        }
    }
}
