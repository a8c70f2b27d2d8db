//! Shared application state
//!
//! One [`AppState`] is built at startup and cloned into every handler.

use openrisk_client::{CompletionProvider, ProviderClient};
use openrisk_runner::PipelineRunner;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::service::catalog::{ScriptCatalog, StepCatalog};
use crate::service::locks::RunLocks;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Per-repository (and global) run locks
    pub locks: RunLocks,
    /// Serialises appends to the registry document
    pub registry_write: Arc<Mutex<()>>,
    pub catalog: Arc<dyn StepCatalog>,
    pub runner: PipelineRunner,
    pub provider: Arc<dyn CompletionProvider>,
}

impl AppState {
    /// Builds the production state: script catalog and HTTP provider
    pub fn new(config: Config) -> Self {
        let catalog = Arc::new(ScriptCatalog::from_config(&config));
        let provider = Arc::new(ProviderClient::new(
            config.llm_base_url.clone(),
            config.llm_api_key.clone(),
            config.llm_model.clone(),
        ));

        Self {
            locks: RunLocks::new(config.overlap_policy),
            config: Arc::new(config),
            registry_write: Arc::default(),
            catalog,
            runner: PipelineRunner::new(),
            provider,
        }
    }

    pub fn with_catalog(mut self, catalog: Arc<dyn StepCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_provider(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.provider = provider;
        self
    }
}
