//! Git data structures

/// Controls whether an executed mutation is echoed to the user.
///
/// Probes always run silently; mutations take a `Verbosity` hint so that
/// commands can show the Git invocations they perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Silent,
    Logging,
}

/// Arguments for pushing a branch to a remote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushArgs {
    pub branch: String,
    pub force: bool,
    pub force_with_lease: bool,
    pub no_push_hook: bool,
    /// Remote to push to. `None` pushes the current branch to its
    /// configured upstream.
    pub remote: Option<String>,
}
