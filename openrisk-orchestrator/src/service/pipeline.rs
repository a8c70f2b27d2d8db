//! Pipeline Service
//!
//! Business logic for pipeline runs. Turns catalog step lists into runnable
//! steps rooted at the project directory, takes the matching run lock and
//! hands the steps to the runner.
//!
//! Once its lock is held a run executes on its own task. A caller that goes
//! away (a dropped request) does not cancel it: the run goes on to its last
//! step and only then releases its locks and scoped registry file.

use openrisk_core::domain::pipeline::{PipelineRunResult, PipelineStepSpec};
use openrisk_core::domain::registry::{RepoName, RepoNameError};
use openrisk_runner::{ProcessStep, Step, StepError, StepReport};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OwnedMutexGuard;
use tokio::task::JoinError;

use crate::repository::registry::RegistryError;
use crate::repository::registry_repository;
use crate::repository::scoped::ScopedRegistryFile;
use crate::service::locks::{GLOBAL_KEY, RunInProgress};
use crate::state::AppState;

/// Service error type
///
/// Apart from `Task`, every variant is raised before the first step is
/// spawned.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    InvalidName(#[from] RepoNameError),

    #[error(transparent)]
    Busy(#[from] RunInProgress),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("failed to write scoped registry: {0}")]
    ScopedRegistry(#[source] std::io::Error),

    #[error(transparent)]
    InvalidStep(#[from] StepError),

    #[error("pipeline task failed: {0}")]
    Task(#[from] JoinError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

type RunLock = OwnedMutexGuard<()>;

fn process_steps(state: &AppState, specs: Vec<PipelineStepSpec>) -> Result<Vec<Arc<dyn Step>>> {
    specs
        .into_iter()
        .map(|spec| -> Result<Arc<dyn Step>> {
            let step = ProcessStep::from_spec(spec, state.config.project_root.clone())?;
            Ok(Arc::new(step) as Arc<dyn Step>)
        })
        .collect()
}

/// Runs `work` on its own task and waits for it
async fn detached<T, F>(work: F) -> Result<T>
where
    F: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(work).await?
}

/// Runs one step, holding `lock` until it has finished
async fn run_single(
    state: &AppState,
    spec: PipelineStepSpec,
    lock: Option<RunLock>,
) -> Result<StepReport> {
    let step = ProcessStep::from_spec(spec, state.config.project_root.clone())?;
    let runner = state.runner;

    detached(async move {
        let _lock = lock;
        Ok(runner.run_step(&step).await)
    })
    .await
}

/// Ingest one repository end to end
///
/// The fetch step reads a scoped registry naming only this repository and
/// runs under the repository lock. The steps after it read the full registry
/// and rewrite the shared reports, so they also wait for [`GLOBAL_KEY`]. The
/// scoped file is removed once the fetch phase is over, on every path.
pub async fn ingest(state: &AppState, repo_name: &str) -> Result<PipelineRunResult> {
    let name: RepoName = repo_name.parse()?;
    let repo_lock = state.locks.acquire(&name.key()).await?;

    let state = state.clone();
    detached(async move {
        let _repo_lock = repo_lock;
        run_ingest(&state, &name).await
    })
    .await
}

async fn run_ingest(state: &AppState, name: &RepoName) -> Result<PipelineRunResult> {
    tracing::info!("Ingest started for {}", name);

    let registry = registry_repository::read(&state.config.sources_path()).await?;
    let scoped = ScopedRegistryFile::create(
        &state.config.scoped_dir_path(),
        &registry.defaults,
        name,
    )
    .await
    .map_err(PipelineError::ScopedRegistry)?;

    // Steps run inside the project root; hand them a path relative to it
    let scoped_arg = scoped
        .path()
        .strip_prefix(&state.config.project_root)
        .unwrap_or(scoped.path());

    let plan = state.catalog.ingest(name, scoped_arg);
    let scoped_steps = process_steps(state, plan.scoped)?;
    let shared_steps = process_steps(state, plan.shared)?;

    let mut result = state.runner.run(&scoped_steps).await;
    drop(scoped);

    // Already under way: wait for the shared lock even under the reject policy
    let _shared = state.locks.wait(GLOBAL_KEY).await;
    result.extend(state.runner.run(&shared_steps).await);

    tracing::info!(
        "Ingest finished for {}: ok={}, warnings={:?}",
        name,
        result.ok,
        result.warnings
    );
    Ok(result)
}

/// Train a model
pub async fn train(state: &AppState, model_type: &str) -> Result<StepReport> {
    let global = state.locks.acquire(GLOBAL_KEY).await?;
    tracing::info!("Training model '{}'", model_type);
    run_single(state, state.catalog.train(model_type), Some(global)).await
}

/// Rebuild and export risk reports with the given model
pub async fn predict(state: &AppState, model_type: &str) -> Result<PipelineRunResult> {
    let global = state.locks.acquire(GLOBAL_KEY).await?;
    tracing::info!("Building risk reports with model '{}'", model_type);

    let steps = process_steps(state, state.catalog.predict(model_type))?;
    let runner = state.runner;

    detached(async move {
        let _global = global;
        Ok(runner.run(&steps).await)
    })
    .await
}

/// Recompute signals for every registered repository
pub async fn run_signals(state: &AppState) -> Result<StepReport> {
    let global = state.locks.acquire(GLOBAL_KEY).await?;
    run_single(state, state.catalog.signals(), Some(global)).await
}

/// Model status report; read-only, takes no lock
pub async fn status(state: &AppState) -> Result<StepReport> {
    run_single(state, state.catalog.status(), None).await
}

/// Stored predictions for a model type; read-only, takes no lock
pub async fn predictions(state: &AppState, model_type: &str) -> Result<StepReport> {
    run_single(state, state.catalog.predictions(model_type), None).await
}
