//! Subprocess abstraction layer
//!
//! Provides a clean, testable abstraction over subprocess execution. Every
//! Git invocation the engine performs goes through the [`ProcessRunner`]
//! trait, so tests can substitute an expectation-based mock for the real
//! Tokio-backed runner.
//!
//! # Examples
//!
//! ```rust
//! use towline::subprocess::SubprocessManager;
//!
//! // Production subprocess manager
//! let subprocess = SubprocessManager::production();
//! let runner = subprocess.runner();
//! ```

pub mod builder;
pub mod error;
pub mod mock;
pub mod runner;

pub use builder::ProcessCommandBuilder;
pub use error::ProcessError;
pub use mock::{MockCommandConfig, MockProcessRunner};
pub use runner::{ExitStatus, ProcessCommand, ProcessOutput, ProcessRunner, TokioProcessRunner};

use std::sync::Arc;

/// Central entry point for subprocess execution.
///
/// Uses dependency injection with the [`ProcessRunner`] trait, allowing
/// different implementations for production and testing.
#[derive(Clone)]
pub struct SubprocessManager {
    runner: Arc<dyn ProcessRunner>,
}

impl SubprocessManager {
    /// Create a subprocess manager with the given process runner.
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self { runner }
    }

    /// Create a production subprocess manager backed by Tokio processes.
    pub fn production() -> Self {
        Self::new(Arc::new(runner::TokioProcessRunner))
    }

    /// Create a mock subprocess manager for testing.
    ///
    /// Returns both the manager and the mock runner, so tests can configure
    /// expected process calls and their responses.
    pub fn mock() -> (Self, MockProcessRunner) {
        let mock = MockProcessRunner::new();
        let runner = Arc::new(mock.clone()) as Arc<dyn ProcessRunner>;
        (Self::new(runner), mock)
    }

    /// The underlying process runner.
    pub fn runner(&self) -> Arc<dyn ProcessRunner> {
        Arc::clone(&self.runner)
    }
}
