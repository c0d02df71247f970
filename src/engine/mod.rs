// src/engine/mod.rs

//! Plan execution engine for execkit.
//!
//! A plan is an ordered list of named steps. The [`runner`] feeds them one
//! by one to an `ExecutorBackend`:
//! - synchronous steps block the plan until they finish;
//! - asynchronous steps are started and left running;
//! - the first failing step stops the plan, later steps are skipped;
//! - at the end the backend's shutdown pass terminates detached processes
//!   that asked for cleanup.

use crate::exec::Completion;
use crate::exec::ShutdownReport;

/// Canonical step name type used throughout the engine.
pub type StepName = String;

/// What happened to one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Synchronous step exited with an accepted code.
    Succeeded { exit_code: i32 },
    /// Asynchronous step was started; its end was not observed.
    Detached,
    /// Asynchronous step that was waited for before shutdown.
    DetachedFinished(Completion),
    /// The step could not be launched or exited with a rejected code.
    Failed {
        exit_code: Option<i32>,
        message: String,
    },
    /// An earlier step failed, so this one never ran.
    Skipped,
}

impl StepOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, StepOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepResult {
    pub name: StepName,
    pub outcome: StepOutcome,
}

/// Result of running a whole plan.
#[derive(Debug, Clone, Default)]
pub struct PlanReport {
    pub steps: Vec<StepResult>,
    pub shutdown: ShutdownReport,
    /// The host was interrupted (Ctrl-C) before the plan finished.
    pub interrupted: bool,
}

impl PlanReport {
    /// True when no step failed. Detached steps never count as failures.
    pub fn is_success(&self) -> bool {
        !self.interrupted && !self.steps.iter().any(|s| s.outcome.is_failure())
    }

    /// Process exit status for the CLI: 0 ok, 1 failed, 130 interrupted.
    pub fn exit_status(&self) -> i32 {
        if self.interrupted {
            130
        } else if self.is_success() {
            0
        } else {
            1
        }
    }

    pub fn outcome_of(&self, name: &str) -> Option<&StepOutcome> {
        self.steps
            .iter()
            .find(|s| s.name == name)
            .map(|s| &s.outcome)
    }

    pub fn first_failure(&self) -> Option<&StepResult> {
        self.steps.iter().find(|s| s.outcome.is_failure())
    }
}

/// Options for the plan runner.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunnerOptions {
    /// Wait for detached steps to finish before the shutdown pass.
    pub wait_detached: bool,
}

pub mod runner;

pub use runner::PlanRunner;
