//! Pipeline execution
//!
//! Drives an ordered list of steps strictly one after another: step k+1 is
//! invoked only after step k has finished. Each finished step is classified
//! as succeeded, failed hard, or failed but tolerated, and folded into a
//! [`PipelineRunResult`].

use openrisk_core::domain::pipeline::{
    PipelineRunResult, StepOutcome, StepState, StepTransitionError,
};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::step::Step;

/// Everything known about one finished step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub label: String,
    pub outcome: StepOutcome,
    /// `None` when the process was never started or died on a signal
    pub exit_code: Option<i32>,
    pub output: String,
}

impl StepReport {
    pub fn ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Sequential pipeline runner
///
/// Stateless; one instance can serve concurrent runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineRunner;

impl PipelineRunner {
    pub fn new() -> Self {
        Self
    }

    /// Runs every step in order and returns the combined result
    ///
    /// A failing step does not stop the run; later steps still execute.
    pub async fn run(&self, steps: &[Arc<dyn Step>]) -> PipelineRunResult {
        let mut result = PipelineRunResult::new();

        for (idx, step) in steps.iter().enumerate() {
            info!(
                "Executing step {}/{}: {}",
                idx + 1,
                steps.len(),
                step.label()
            );

            let report = self.run_step(step.as_ref()).await;
            result.record(report.label, report.outcome, report.output);
        }

        if result.ok {
            info!(
                "Pipeline finished: {} step(s), {} warning(s)",
                result.steps.len(),
                result.warnings.len()
            );
        } else {
            warn!("Pipeline finished with failures");
        }

        result
    }

    /// Runs one step and classifies it
    pub async fn run_step(&self, step: &dyn Step) -> StepReport {
        let mut state = StepState::Pending;
        state = advance(state.start(), state);

        let (exited_ok, exit_code, output, matched) = match step.invoke().await {
            Ok(out) => (out.success, out.exit_code, out.output, out.benign),
            Err(e) => {
                error!("Step '{}' could not run: {}", step.label(), e);
                (false, None, e.to_string(), false)
            }
        };

        // `matched` covers output that has already left the tail
        let benign = !exited_ok
            && step.soft_fail()
            && (matched || step.is_benign_failure(&output));
        let outcome = StepOutcome::classify(exited_ok, step.soft_fail(), benign);
        state = advance(state.finish(outcome), state);

        match outcome {
            StepOutcome::Succeeded => info!("Step '{}' succeeded", step.label()),
            StepOutcome::FailedSoftTolerated => warn!(
                "Step '{}' failed with a benign condition (exit {:?}), continuing",
                step.label(),
                exit_code
            ),
            StepOutcome::FailedHard => error!(
                "Step '{}' failed (exit {:?})",
                step.label(),
                exit_code
            ),
        }
        debug_assert!(state.is_terminal());

        StepReport {
            label: step.label().to_string(),
            outcome,
            exit_code,
            output,
        }
    }
}

/// Applies a transition, staying put (and logging) if it was invalid
fn advance(next: Result<StepState, StepTransitionError>, current: StepState) -> StepState {
    next.unwrap_or_else(|e| {
        error!("{}", e);
        current
    })
}
