//! Step lists and the persisted execution plan.
//!
//! A [`RunState`] is the unit of persistence: the remaining steps of a
//! command, the inverses of the steps already completed, and the cleanup
//! steps an abort would need. One run state exists per repository; on disk
//! it acts as a coarse lock that keeps other mutating commands out while a
//! command is unfinished.

pub mod persistence;

pub use persistence::{delete, load, runstate_path, save};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::steps::Step;

/// An ordered, finite sequence of steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepList {
    pub list: Vec<Step>,
}

impl StepList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn append(&mut self, step: Step) {
        self.list.push(step);
    }

    pub fn append_opt(&mut self, step: Option<Step>) {
        if let Some(step) = step {
            self.list.push(step);
        }
    }

    pub fn append_list(&mut self, other: StepList) {
        self.list.extend(other.list);
    }

    pub fn prepend(&mut self, step: Step) {
        self.list.insert(0, step);
    }

    pub fn prepend_opt(&mut self, step: Option<Step>) {
        if let Some(step) = step {
            self.prepend(step);
        }
    }

    /// Insert the steps of `other` at the front, preserving their order.
    pub fn prepend_list(&mut self, other: StepList) {
        let mut list = other.list;
        list.append(&mut self.list);
        self.list = list;
    }

    pub fn pop_front(&mut self) -> Option<Step> {
        if self.list.is_empty() {
            None
        } else {
            Some(self.list.remove(0))
        }
    }

    pub fn peek(&self) -> Option<&Step> {
        self.list.first()
    }

    /// Finalize a builder's list: stash open changes around the command if
    /// requested, and restore the user's checkout history afterwards. The
    /// builders themselves end with the checkout back to the final branch.
    pub fn wrap(&mut self, options: &WrapOptions) {
        if options.stash_open_changes && options.has_open_changes {
            self.prepend(Step::StashOpenChanges);
            self.append(Step::RestoreOpenChanges);
        }
        self.append(Step::PreserveCheckoutHistory {
            initial_branch: options.initial_branch.to_string(),
            initial_previous_branch: options.previous_branch.unwrap_or_default().to_string(),
        });
    }
}

impl FromIterator<Step> for StepList {
    fn from_iter<I: IntoIterator<Item = Step>>(iter: I) -> Self {
        Self {
            list: iter.into_iter().collect(),
        }
    }
}

/// Options for [`StepList::wrap`].
#[derive(Debug, Clone, Copy, Default)]
pub struct WrapOptions<'a> {
    /// Whether the command must run from the repository root. Honored by
    /// the command entry point before any step runs.
    pub run_in_git_root: bool,
    pub stash_open_changes: bool,
    pub has_open_changes: bool,
    pub initial_branch: &'a str,
    pub previous_branch: Option<&'a str>,
}

/// Details recorded when a command pauses on a conflict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnfinishedDetails {
    pub end_branch: String,
    pub end_time: DateTime<Utc>,
    pub can_skip: bool,
}

/// The persisted, resumable execution plan of one command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    pub command: String,
    #[serde(default)]
    pub is_abort: bool,
    #[serde(default)]
    pub is_undo: bool,
    pub run_step_list: StepList,
    /// Inverses of the completed steps, most recent first.
    #[serde(default)]
    pub undo_step_list: StepList,
    /// Cleanup steps an abort must run before the undo steps.
    #[serde(default)]
    pub abort_step_list: StepList,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unfinished_details: Option<UnfinishedDetails>,
}

impl RunState {
    pub fn new(command: &str, run_step_list: StepList) -> Self {
        Self {
            command: command.to_string(),
            is_abort: false,
            is_undo: false,
            run_step_list,
            undo_step_list: StepList::new(),
            abort_step_list: StepList::new(),
            unfinished_details: None,
        }
    }

    /// A run state is finished when no steps remain. A finished run state
    /// may still hold undo steps to enable a later `undo`.
    pub fn is_finished(&self) -> bool {
        self.run_step_list.is_empty()
    }

    pub fn is_unfinished(&self) -> bool {
        self.unfinished_details.is_some()
    }

    pub fn mark_unfinished(&mut self, end_branch: &str, can_skip: bool) {
        self.unfinished_details = Some(UnfinishedDetails {
            end_branch: end_branch.to_string(),
            end_time: Utc::now(),
            can_skip,
        });
    }

    pub fn mark_finished(&mut self) {
        self.unfinished_details = None;
    }

    /// Record the inverse of a completed step. The undo list is LIFO: the
    /// most recently completed step's inverse sits at the head.
    pub fn push_undo_step(&mut self, step: Step) {
        self.undo_step_list.prepend(step);
    }

    /// The plan that aborts this one: cleanup steps, then every accumulated
    /// inverse in LIFO order.
    pub fn create_abort_run_state(&self) -> RunState {
        let mut run_step_list = self.abort_step_list.clone();
        run_step_list.append_list(self.undo_step_list.clone());
        RunState {
            is_abort: true,
            ..RunState::new(&self.command, run_step_list)
        }
    }

    /// The plan that undoes this finished one.
    pub fn create_undo_run_state(&self) -> RunState {
        RunState {
            is_undo: true,
            ..RunState::new(&self.command, self.undo_step_list.clone())
        }
    }

    /// The plan that skips the rest of the paused branch: cleanup steps,
    /// the inverses accumulated on the current branch, then the remaining
    /// plan from the next branch boundary onward.
    pub fn create_skip_run_state(&self) -> RunState {
        let mut run_step_list = self.abort_step_list.clone();
        for step in &self.undo_step_list.list {
            if step.is_checkout() {
                break;
            }
            run_step_list.append(step.clone());
        }
        let mut skipping = true;
        for step in &self.run_step_list.list {
            if step.is_checkout() {
                skipping = false;
            }
            if !skipping {
                run_step_list.append(step.clone());
            }
        }
        RunState::new(&self.command, run_step_list)
    }

    /// Marker handling: drop the remaining steps of the current branch,
    /// up to (excluding) the next checkout.
    pub fn skip_current_branch_steps(&mut self) {
        while let Some(step) = self.run_step_list.peek() {
            if step.is_checkout() {
                break;
            }
            self.run_step_list.pop_front();
        }
    }

    /// Marker handling: insert a push of the current branch after its
    /// remaining steps, right before the next checkout.
    pub fn push_branch_after_current_branch_steps(&mut self, current_branch: &str) {
        let mut popped = StepList::new();
        while matches!(self.run_step_list.peek(), Some(step) if !step.is_checkout()) {
            if let Some(step) = self.run_step_list.pop_front() {
                popped.append(step);
            }
        }
        self.run_step_list.prepend(Step::push(current_branch));
        self.run_step_list.prepend_list(popped);
    }
}
