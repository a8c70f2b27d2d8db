//! Pipeline domain types
//!
//! A pipeline run is an ordered list of external steps executed one after
//! another. These types describe the steps and their results; execution
//! lives in the runner crate.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Captured output beyond this many characters keeps only its tail
pub const OUTPUT_TAIL_CHARS: usize = 8000;

/// Program and arguments of one external step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl StepCommand {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for StepCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Definition of one pipeline step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStepSpec {
    pub label: String,
    pub command: StepCommand,
    /// A failing soft-fail step may be tolerated when its output is benign
    #[serde(default)]
    pub soft_fail: bool,
    /// Regex matched against captured output of a failed soft-fail step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub benign_failure_pattern: Option<String>,
}

impl PipelineStepSpec {
    /// A hard-fail step
    pub fn new(label: impl Into<String>, command: StepCommand) -> Self {
        Self {
            label: label.into(),
            command,
            soft_fail: false,
            benign_failure_pattern: None,
        }
    }

    /// Marks the step soft-fail, tolerated when output matches `pattern`
    pub fn soft_fail(mut self, pattern: impl Into<String>) -> Self {
        self.soft_fail = true;
        self.benign_failure_pattern = Some(pattern.into());
        self
    }
}

/// Terminal outcome of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepOutcome {
    Succeeded,
    FailedHard,
    FailedSoftTolerated,
}

impl StepOutcome {
    /// Classifies a finished step
    ///
    /// A failed soft-fail step is tolerated only when its output was judged
    /// benign; every other failure is hard.
    pub fn classify(exited_ok: bool, soft_fail: bool, benign_output: bool) -> Self {
        if exited_ok {
            StepOutcome::Succeeded
        } else if soft_fail && benign_output {
            StepOutcome::FailedSoftTolerated
        } else {
            StepOutcome::FailedHard
        }
    }

    /// Whether the run may treat this step as passing
    pub fn is_ok(&self) -> bool {
        !matches!(self, StepOutcome::FailedHard)
    }
}

/// Lifecycle of a single step within a run
///
/// `Pending -> Running -> Finished(outcome)`; no retries, no re-entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    Pending,
    Running,
    Finished(StepOutcome),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid step transition from {from:?} to {to}")]
pub struct StepTransitionError {
    pub from: StepState,
    pub to: &'static str,
}

impl StepState {
    pub fn start(self) -> Result<Self, StepTransitionError> {
        match self {
            StepState::Pending => Ok(StepState::Running),
            from => Err(StepTransitionError { from, to: "Running" }),
        }
    }

    pub fn finish(self, outcome: StepOutcome) -> Result<Self, StepTransitionError> {
        match self {
            StepState::Running => Ok(StepState::Finished(outcome)),
            from => Err(StepTransitionError { from, to: "Finished" }),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StepState::Finished(_))
    }
}

/// Result of one executed step, as returned to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStepResult {
    pub label: String,
    pub ok: bool,
    /// Combined stdout/stderr, at most [`OUTPUT_TAIL_CHARS`] trailing characters
    pub output: String,
}

/// Result of a whole pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRunResult {
    /// True iff no step finished as [`StepOutcome::FailedHard`]
    pub ok: bool,
    pub steps: Vec<PipelineStepResult>,
    /// Labels of soft-fail steps that failed but were tolerated
    pub warnings: Vec<String>,
}

impl PipelineRunResult {
    pub fn new() -> Self {
        Self {
            ok: true,
            steps: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Appends a finished step and folds its outcome into the run
    pub fn record(&mut self, label: impl Into<String>, outcome: StepOutcome, output: String) {
        let label = label.into();

        match outcome {
            StepOutcome::Succeeded => {}
            StepOutcome::FailedSoftTolerated => self.warnings.push(label.clone()),
            StepOutcome::FailedHard => self.ok = false,
        }

        self.steps.push(PipelineStepResult {
            label,
            ok: outcome.is_ok(),
            output,
        });
    }

    /// Appends the steps of a later run over the same request
    pub fn extend(&mut self, later: PipelineRunResult) {
        self.ok &= later.ok;
        self.steps.extend(later.steps);
        self.warnings.extend(later.warnings);
    }
}
