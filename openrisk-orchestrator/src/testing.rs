//! Test doubles shared by service and router tests

use async_trait::async_trait;
use openrisk_client::{ChatMessage, ClientError, CompletionProvider};
use openrisk_core::domain::pipeline::{PipelineStepSpec, StepCommand};
use openrisk_core::domain::registry::RepoName;
use std::path::Path;
use std::sync::Mutex;

use crate::service::catalog::{IngestPlan, NO_PREDICTIONS_PATTERN};

/// A `sh -c` step; `soft` marks it soft-fail with the no-predictions pattern
#[derive(Debug, Clone)]
pub struct ShellStep {
    pub label: String,
    pub script: String,
    pub soft: bool,
}

impl ShellStep {
    pub fn new(label: &str, script: &str) -> Self {
        Self {
            label: label.to_string(),
            script: script.to_string(),
            soft: false,
        }
    }

    pub fn soft(mut self) -> Self {
        self.soft = true;
        self
    }

    /// `$0` is the label, followed by `extra` as `$1`, `$2`, ...
    fn spec(&self, extra: &[String]) -> PipelineStepSpec {
        let mut args = vec!["-c".to_string(), self.script.clone(), self.label.clone()];
        args.extend_from_slice(extra);

        let spec = PipelineStepSpec::new(&self.label, StepCommand::new("sh", args));
        if self.soft {
            spec.soft_fail(NO_PREDICTIONS_PATTERN)
        } else {
            spec
        }
    }
}

/// Catalog whose steps are shell snippets
///
/// Ingest steps receive the scoped registry path, org and repo as `$1..$3`;
/// the first one is the scoped phase and the rest are shared, as in the
/// script suite. Single-step operations all run `single`, labelled as the
/// real ones are.
#[derive(Debug, Clone)]
pub struct ShellCatalog {
    ingest: Vec<ShellStep>,
    predict: Vec<ShellStep>,
    single: String,
}

impl Default for ShellCatalog {
    fn default() -> Self {
        Self {
            ingest: Vec::new(),
            predict: Vec::new(),
            single: "true".to_string(),
        }
    }
}

impl ShellCatalog {
    pub fn with_ingest(mut self, steps: Vec<ShellStep>) -> Self {
        self.ingest = steps;
        self
    }

    pub fn with_predict(mut self, steps: Vec<ShellStep>) -> Self {
        self.predict = steps;
        self
    }

    pub fn with_single(mut self, script: &str) -> Self {
        self.single = script.to_string();
        self
    }

    fn single(&self, label: &str) -> PipelineStepSpec {
        ShellStep::new(label, &self.single).spec(&[])
    }
}

impl crate::service::catalog::StepCatalog for ShellCatalog {
    fn ingest(&self, name: &RepoName, scoped_sources: &Path) -> IngestPlan {
        let extra = [
            scoped_sources.display().to_string(),
            name.org.clone(),
            name.repo.clone(),
        ];
        let mut specs = self.ingest.iter().map(|s| s.spec(&extra));

        IngestPlan {
            scoped: specs.next().into_iter().collect(),
            shared: specs.collect(),
        }
    }

    fn train(&self, _model_type: &str) -> PipelineStepSpec {
        self.single("train")
    }

    fn predict(&self, model_type: &str) -> Vec<PipelineStepSpec> {
        let extra = [model_type.to_string()];
        self.predict.iter().map(|s| s.spec(&extra)).collect()
    }

    fn signals(&self) -> PipelineStepSpec {
        self.single("signal_engine")
    }

    fn status(&self) -> PipelineStepSpec {
        self.single("model_status")
    }

    fn predictions(&self, _model_type: &str) -> PipelineStepSpec {
        self.single("model_predictions")
    }
}

/// Provider that records prompts and answers with a canned reply
#[derive(Debug)]
pub struct FakeProvider {
    has_key: bool,
    reply: Result<String, (u16, String)>,
    pub calls: Mutex<Vec<(Vec<ChatMessage>, f64)>>,
}

impl FakeProvider {
    pub fn answering(reply: &str) -> Self {
        Self {
            has_key: true,
            reply: Ok(reply.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(status: u16, message: &str) -> Self {
        Self {
            has_key: true,
            reply: Err((status, message.to_string())),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn without_key() -> Self {
        Self {
            has_key: false,
            ..Self::answering("")
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionProvider for FakeProvider {
    fn has_api_key(&self) -> bool {
        self.has_key
    }

    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        temperature: f64,
    ) -> openrisk_client::Result<String> {
        if !self.has_key {
            return Err(ClientError::MissingApiKey);
        }
        self.calls.lock().unwrap().push((messages, temperature));
        self.reply
            .clone()
            .map_err(|(status, message)| ClientError::api_error(status, message))
    }
}
