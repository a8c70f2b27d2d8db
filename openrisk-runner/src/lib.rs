//! OpenRisk Runner
//!
//! Executes pipeline runs: ordered lists of external steps, strictly one after
//! another.
//!
//! Architecture:
//! - Step: the capability interface a runner drives (`label`, `invoke`,
//!   `is_benign_failure`), with a local-process implementation
//! - Process: spawning and combined stdout/stderr capture
//! - Output: tail-bounded capture buffer
//! - Execution: sequencing, soft-fail classification, run result assembly

pub mod error;
pub mod execution;
pub mod output;
pub mod process;
pub mod step;

pub use error::StepError;
pub use execution::{PipelineRunner, StepReport};
pub use output::TailBuffer;
pub use process::ProcessOutput;
pub use step::{FailurePolicy, NeverBenign, PatternPolicy, ProcessStep, Step};
