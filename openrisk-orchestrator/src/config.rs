//! Orchestrator configuration
//!
//! Every setting comes from an `OPENRISK_*` environment variable with a
//! default. Relative paths are resolved against the project root, which is
//! also the working directory of every spawned step.

use std::path::{Path, PathBuf};

use crate::service::locks::OverlapPolicy;

pub const DEFAULT_LLM_BASE_URL: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";
pub const DEFAULT_LLM_MODEL: &str = "qwen3-max";

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Listen address (e.g., "127.0.0.1:8080")
    pub bind_addr: String,

    pub project_root: PathBuf,

    /// Registry document
    pub sources: PathBuf,

    pub metrics_config: PathBuf,
    pub signals_config: PathBuf,
    pub model_config: PathBuf,

    /// Candidate repository list read by the sample endpoint
    pub repo_list: PathBuf,

    /// Where scoped registry files are created during ingestion
    pub scoped_dir: PathBuf,

    /// Generated reports, served read-only
    pub docs_dir: PathBuf,

    /// Interpreter used for every pipeline script
    pub python: String,

    pub overlap_policy: OverlapPolicy,

    /// Provider credential; advisory endpoints refuse to run without it
    pub llm_api_key: Option<String>,
    pub llm_base_url: String,
    pub llm_model: String,
}

impl Config {
    /// Creates configuration from environment variables
    ///
    /// Recognised variables (all optional):
    /// - OPENRISK_BIND_ADDR (default: 127.0.0.1:8080)
    /// - OPENRISK_PROJECT_ROOT (default: .)
    /// - OPENRISK_SOURCES (default: configs/sources.yaml)
    /// - OPENRISK_METRICS_CONFIG, OPENRISK_SIGNALS_CONFIG, OPENRISK_MODEL_CONFIG
    /// - OPENRISK_REPO_LIST (default: repo_list.csv)
    /// - OPENRISK_SCOPED_DIR (default: data/tmp)
    /// - OPENRISK_DOCS_DIR (default: docs)
    /// - OPENRISK_PYTHON (default: python)
    /// - OPENRISK_OVERLAP_POLICY (serialize | reject, default: serialize)
    /// - OPENRISK_LLM_API_KEY, OPENRISK_LLM_BASE_URL, OPENRISK_LLM_MODEL
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let path = |key: &str, fallback: PathBuf| var(key).map(PathBuf::from).unwrap_or(fallback);

        let overlap_policy = match var("OPENRISK_OVERLAP_POLICY") {
            Some(value) => value.parse()?,
            None => defaults.overlap_policy,
        };

        Ok(Self {
            bind_addr: var("OPENRISK_BIND_ADDR").unwrap_or(defaults.bind_addr),
            project_root: path("OPENRISK_PROJECT_ROOT", defaults.project_root),
            sources: path("OPENRISK_SOURCES", defaults.sources),
            metrics_config: path("OPENRISK_METRICS_CONFIG", defaults.metrics_config),
            signals_config: path("OPENRISK_SIGNALS_CONFIG", defaults.signals_config),
            model_config: path("OPENRISK_MODEL_CONFIG", defaults.model_config),
            repo_list: path("OPENRISK_REPO_LIST", defaults.repo_list),
            scoped_dir: path("OPENRISK_SCOPED_DIR", defaults.scoped_dir),
            docs_dir: path("OPENRISK_DOCS_DIR", defaults.docs_dir),
            python: var("OPENRISK_PYTHON").unwrap_or(defaults.python),
            overlap_policy,
            llm_api_key: var("OPENRISK_LLM_API_KEY"),
            llm_base_url: var("OPENRISK_LLM_BASE_URL").unwrap_or(defaults.llm_base_url),
            llm_model: var("OPENRISK_LLM_MODEL").unwrap_or(defaults.llm_model),
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bind_addr.trim().is_empty() {
            anyhow::bail!("bind_addr cannot be empty");
        }

        if self.python.trim().is_empty() {
            anyhow::bail!("python cannot be empty");
        }

        if !self.llm_base_url.starts_with("http://") && !self.llm_base_url.starts_with("https://")
        {
            anyhow::bail!("llm_base_url must start with http:// or https://");
        }

        Ok(())
    }

    /// Resolves a configured path against the project root
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.project_root.join(path)
    }

    pub fn sources_path(&self) -> PathBuf {
        self.resolve(&self.sources)
    }

    pub fn repo_list_path(&self) -> PathBuf {
        self.resolve(&self.repo_list)
    }

    pub fn scoped_dir_path(&self) -> PathBuf {
        self.resolve(&self.scoped_dir)
    }

    pub fn docs_dir_path(&self) -> PathBuf {
        self.resolve(&self.docs_dir)
    }

    /// Location of the exported risk report document
    pub fn risk_report_path(&self) -> PathBuf {
        self.docs_dir_path().join("risk_report.json")
    }

    /// Rooted at `project_root` for tests and embedding
    pub fn with_project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = root.into();
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            project_root: PathBuf::from("."),
            sources: PathBuf::from("configs/sources.yaml"),
            metrics_config: PathBuf::from("configs/metrics.yaml"),
            signals_config: PathBuf::from("configs/signals.yaml"),
            model_config: PathBuf::from("configs/model.yaml"),
            repo_list: PathBuf::from("repo_list.csv"),
            scoped_dir: PathBuf::from("data/tmp"),
            docs_dir: PathBuf::from("docs"),
            python: "python".to_string(),
            overlap_policy: OverlapPolicy::Serialize,
            llm_api_key: None,
            llm_base_url: DEFAULT_LLM_BASE_URL.to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
        }
    }
}
