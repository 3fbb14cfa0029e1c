use thiserror::Error;

/// The error taxonomy of the engine.
///
/// The executor never swallows an error: it either runs the abort path
/// (`AutoAborted`), pauses (`Paused`), or returns the error to the CLI.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Validation failed before any step ran. No run state is persisted.
    #[error("{0}")]
    Precondition(String),

    /// A step hit a conflict; the remaining plan has been saved to disk.
    #[error("{message}")]
    Paused { message: String },

    /// A step requested an unattended abort; the abort path already ran.
    #[error("{0}")]
    AutoAborted(String),

    /// Restoring stashed changes conflicted with the synced branches.
    #[error("conflicts between your uncommitted changes and the main branch")]
    UncommittedChangesConflict,

    /// A code-hosting connector failed.
    #[error("hosting service error: {0}")]
    Hosting(String),

    /// The branch to ship holds no changes over its parent.
    #[error("the branch {0:?} has no shippable changes")]
    NoShippableChanges(String),

    /// A programmer error: broken invariant, missing memoized state.
    #[error("internal error: {0}")]
    Invariant(String),

    /// The user declined to provide required input.
    #[error("{0}")]
    DialogAborted(String),

    #[error(transparent)]
    Git(#[from] crate::git::GitError),

    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    #[error(transparent)]
    Process(#[from] crate::subprocess::ProcessError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    /// Whether this error ends the command without any persisted state.
    pub fn is_precondition(&self) -> bool {
        matches!(self, EngineError::Precondition(_))
    }
}
