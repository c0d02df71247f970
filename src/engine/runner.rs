// src/engine/runner.rs

use std::fmt;

use tracing::{debug, info, warn};

use crate::config::PlannedStep;
use crate::exec::{CompletionHandle, Execution, ExecutorBackend};

use super::{PlanReport, RunnerOptions, StepOutcome, StepResult};

/// Runs the steps of a plan in order through an `ExecutorBackend`.
pub struct PlanRunner<E: ExecutorBackend> {
    executor: E,
    options: RunnerOptions,
}

impl<E: ExecutorBackend> fmt::Debug for PlanRunner<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlanRunner")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> PlanRunner<E> {
    pub fn new(executor: E, options: RunnerOptions) -> Self {
        Self { executor, options }
    }

    /// Execute every step, then run the backend's shutdown pass.
    ///
    /// Never returns early on step failure: failures are recorded in the
    /// report, and every later step is marked `Skipped`.
    pub async fn run(mut self, steps: &[PlannedStep]) -> PlanReport {
        info!(steps = steps.len(), "execkit plan started");

        let mut report = PlanReport::default();
        let mut detached: Vec<(usize, CompletionHandle)> = Vec::new();
        let mut failed = false;

        for step in steps {
            if failed {
                debug!(step = %step.name, "skipping step after earlier failure");
                report.steps.push(StepResult {
                    name: step.name.clone(),
                    outcome: StepOutcome::Skipped,
                });
                continue;
            }

            info!(step = %step.name, mode = ?step.request.mode, "running step");

            let outcome = match self.executor.execute(&step.request).await {
                Ok(Execution::Completed { exit_code }) => StepOutcome::Succeeded { exit_code },
                Ok(Execution::Detached(handle)) => {
                    detached.push((report.steps.len(), handle));
                    StepOutcome::Detached
                }
                Err(e) => {
                    warn!(step = %step.name, error = %e, "step failed");
                    failed = true;
                    StepOutcome::Failed {
                        exit_code: e.exit_code(),
                        message: e.to_string(),
                    }
                }
            };

            report.steps.push(StepResult {
                name: step.name.clone(),
                outcome,
            });
        }

        if self.options.wait_detached {
            for (index, handle) in detached {
                debug!(cmd = %handle.command(), "waiting for detached step");
                let completion = handle.wait().await;
                report.steps[index].outcome = StepOutcome::DetachedFinished(completion);
            }
        }

        report.shutdown = self.executor.shutdown().await;

        info!(
            success = report.is_success(),
            terminated = report.shutdown.terminated,
            "execkit plan finished"
        );

        report
    }
}
