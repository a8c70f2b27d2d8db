//! Step capability
//!
//! The runner never spawns anything itself; it drives [`Step`]s. A step knows
//! its label, how to invoke its work and which failures are benign. The
//! local-process backend is [`ProcessStep`]; other backends (containers,
//! remote jobs) plug in by implementing the same trait.

use async_trait::async_trait;
use openrisk_core::domain::pipeline::{OUTPUT_TAIL_CHARS, PipelineStepSpec};
use regex::Regex;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{Result, StepError};
use crate::process::{ProcessOutput, run_process};

/// Decides whether a failed step's output describes a benign condition
pub trait FailurePolicy: Send + Sync {
    fn is_benign(&self, output: &str) -> bool;
}

impl<F> FailurePolicy for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_benign(&self, output: &str) -> bool {
        self(output)
    }
}

/// No failure is benign
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverBenign;

impl FailurePolicy for NeverBenign {
    fn is_benign(&self, _output: &str) -> bool {
        false
    }
}

/// Benign when the output matches a regex anywhere
#[derive(Debug, Clone)]
pub struct PatternPolicy {
    regex: Regex,
}

impl PatternPolicy {
    pub fn new(regex: Regex) -> Self {
        Self { regex }
    }
}

impl FailurePolicy for PatternPolicy {
    fn is_benign(&self, output: &str) -> bool {
        self.regex.is_match(output)
    }
}

/// A unit of work in a pipeline run
#[async_trait]
pub trait Step: Send + Sync {
    fn label(&self) -> &str;

    /// Whether a benign failure of this step is tolerated
    fn soft_fail(&self) -> bool;

    /// Runs the step to completion
    ///
    /// `Err` means the work could not be started or observed; a step that ran
    /// and failed returns `Ok` with an unsuccessful [`ProcessOutput`].
    async fn invoke(&self) -> Result<ProcessOutput>;

    /// Judges captured output; consulted when [`ProcessOutput::benign`] is unset
    fn is_benign_failure(&self, output: &str) -> bool;
}

/// A step backed by a local process
pub struct ProcessStep {
    spec: PipelineStepSpec,
    working_dir: PathBuf,
    output_limit: usize,
    policy: Arc<dyn FailurePolicy>,
}

impl ProcessStep {
    /// Builds a step from its spec
    ///
    /// The spec's `benign_failure_pattern` becomes a [`PatternPolicy`]; without
    /// one no failure is benign.
    pub fn from_spec(spec: PipelineStepSpec, working_dir: impl Into<PathBuf>) -> Result<Self> {
        let policy: Arc<dyn FailurePolicy> = match &spec.benign_failure_pattern {
            Some(pattern) => {
                let regex = Regex::new(pattern).map_err(|source| StepError::InvalidPattern {
                    label: spec.label.clone(),
                    source,
                })?;
                Arc::new(PatternPolicy::new(regex))
            }
            None => Arc::new(NeverBenign),
        };

        Ok(Self {
            spec,
            working_dir: working_dir.into(),
            output_limit: OUTPUT_TAIL_CHARS,
            policy,
        })
    }

    /// Replaces the failure policy
    pub fn with_policy(mut self, policy: Arc<dyn FailurePolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn spec(&self) -> &PipelineStepSpec {
        &self.spec
    }
}

#[async_trait]
impl Step for ProcessStep {
    fn label(&self) -> &str {
        &self.spec.label
    }

    fn soft_fail(&self) -> bool {
        self.spec.soft_fail
    }

    async fn invoke(&self) -> Result<ProcessOutput> {
        run_process(
            &self.spec.command,
            &self.working_dir,
            self.output_limit,
            self.policy.as_ref(),
        )
        .await
    }

    fn is_benign_failure(&self, output: &str) -> bool {
        self.policy.is_benign(output)
    }
}
