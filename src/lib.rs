//! # Towline
//!
//! A transactional, resumable Git workflow engine.
//!
//! Towline translates high-level intents (`sync`, `ship`, `rename-branch`)
//! into ordered lists of primitive Git operations ([`steps::Step`]), executes
//! them one at a time, and — when a step fails mid-flight on a merge or
//! rebase conflict — persists the remaining plan so the user can resolve the
//! conflict by hand and then `continue`, `abort`, or `skip` from the exact
//! point of failure. Completed commands keep an inverse plan around for
//! `undo`.
//!
//! ## Modules
//!
//! - `subprocess` - Trait-based subprocess layer with a Tokio runner and an
//!   expectation-based mock
//! - `git` - Every Git probe and mutation the engine needs, over `subprocess`
//! - `config` - Typed settings cached from `git config` (local + global)
//! - `lineage` - The parent/child branch relation model
//! - `steps` - The closed set of primitive operations
//! - `runstate` - Step lists and the persisted execution plan
//! - `executor` - The state machine that drives a run state
//! - `hosting` - Code-hosting connectors (proposal lookup and squash-merge)
//! - `dialog` - Interactive prompts for missing lineage and squash authors
//! - `commands` - Per-command config gathering and step-list builders

pub mod commands;
pub mod config;
pub mod dialog;
pub mod error;
pub mod executor;
pub mod git;
pub mod hosting;
pub mod lineage;
pub mod repo;
pub mod runstate;
pub mod steps;
pub mod subprocess;

pub use error::EngineError;

/// Standard result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
