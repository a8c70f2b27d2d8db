//! Step catalog
//!
//! Maps each pipeline operation to its ordered step list. The orchestrator
//! only ever asks the catalog for steps; what those steps run is opaque to it.

use openrisk_core::domain::pipeline::{PipelineStepSpec, StepCommand};
use openrisk_core::domain::registry::RepoName;
use std::path::Path;

use crate::config::Config;

/// Output of the risk report steps that means "no predictions exist yet"
pub const NO_PREDICTIONS_PATTERN: &str = "(?i)no risk_predictions";

/// Ingestion steps, split by what they touch
#[derive(Debug, Clone, Default)]
pub struct IngestPlan {
    /// Steps that read only the scoped registry of the repository
    pub scoped: Vec<PipelineStepSpec>,
    /// Steps over the full registry that rewrite the shared reports
    pub shared: Vec<PipelineStepSpec>,
}

/// Builds step lists for pipeline operations
pub trait StepCatalog: Send + Sync {
    /// Full ingestion of one repository; `scoped_sources` is the scoped
    /// registry document, relative to the working directory where possible
    fn ingest(&self, name: &RepoName, scoped_sources: &Path) -> IngestPlan;

    fn train(&self, model_type: &str) -> PipelineStepSpec;

    fn predict(&self, model_type: &str) -> Vec<PipelineStepSpec>;

    fn signals(&self) -> PipelineStepSpec;

    fn status(&self) -> PipelineStepSpec;

    fn predictions(&self, model_type: &str) -> PipelineStepSpec;
}

/// The script suite shipped with the project, run through one interpreter
#[derive(Debug, Clone)]
pub struct ScriptCatalog {
    python: String,
    sources: String,
    metrics: String,
    signals: String,
    model: String,
    docs: String,
}

impl ScriptCatalog {
    pub fn from_config(config: &Config) -> Self {
        let show = |p: &Path| p.display().to_string();
        Self {
            python: config.python.clone(),
            sources: show(&config.sources),
            metrics: show(&config.metrics_config),
            signals: show(&config.signals_config),
            model: show(&config.model_config),
            docs: show(&config.docs_dir),
        }
    }

    fn step<I, S>(&self, label: &str, args: I) -> PipelineStepSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PipelineStepSpec::new(label, StepCommand::new(self.python.clone(), args))
    }

    fn doc(&self, file: &str) -> String {
        format!("{}/{}", self.docs.trim_end_matches('/'), file)
    }

    fn signal_engine(&self) -> PipelineStepSpec {
        self.step(
            "signal_engine",
            [
                "scripts/signal_engine.py",
                "--sources",
                self.sources.as_str(),
                "--metrics",
                self.metrics.as_str(),
                "--signals",
                self.signals.as_str(),
            ],
        )
    }

    fn build_risk_reports(&self, model_type: Option<&str>) -> PipelineStepSpec {
        let mut args = vec![
            "scripts/build_risk_explanations.py".to_string(),
            "--sources".to_string(),
            self.sources.clone(),
            "--model".to_string(),
            self.model.clone(),
            "--signals".to_string(),
            self.signals.clone(),
        ];
        if let Some(model_type) = model_type {
            args.extend(["--model-type".to_string(), model_type.to_string()]);
        }
        args.push("--replace".to_string());
        self.step("build_risk_reports", args)
    }

    fn export_risk_reports(&self, model_type: Option<&str>) -> PipelineStepSpec {
        let mut args = vec![
            "scripts/export_riskreports.py".to_string(),
            "--sources".to_string(),
            self.sources.clone(),
        ];
        if let Some(model_type) = model_type {
            args.extend(["--model-type".to_string(), model_type.to_string()]);
        }
        args.extend([
            "--output-json".to_string(),
            self.doc("risk_report.json"),
            "--output-md".to_string(),
            self.doc("risk_report.md"),
        ]);
        self.step("export_risk_reports", args)
    }
}

impl StepCatalog for ScriptCatalog {
    fn ingest(&self, _name: &RepoName, scoped_sources: &Path) -> IngestPlan {
        let scoped = scoped_sources.display().to_string();
        let quality_json = self.doc("data_quality_report.json");

        let fetch = self.step(
            "ingest",
            [
                "-m",
                "services.ingestion.run_ingest",
                "--sources",
                scoped.as_str(),
                "--metrics",
                self.metrics.as_str(),
            ],
        );

        let shared = vec![
            self.step(
                "derive_features",
                [
                    "scripts/derive_features.py",
                    "--sources",
                    self.sources.as_str(),
                    "--period-type",
                    "month",
                    "--windows",
                    "3,6,12",
                ],
            ),
            self.step(
                "quality_report",
                [
                    "scripts/quality_report.py",
                    "--sources",
                    self.sources.as_str(),
                    "--metrics",
                    self.metrics.as_str(),
                    "--json-output",
                    quality_json.as_str(),
                ],
            ),
            self.signal_engine(),
            self.build_risk_reports(None).soft_fail(NO_PREDICTIONS_PATTERN),
            self.export_risk_reports(None).soft_fail(NO_PREDICTIONS_PATTERN),
        ];

        IngestPlan {
            scoped: vec![fetch],
            shared,
        }
    }

    fn train(&self, model_type: &str) -> PipelineStepSpec {
        if model_type == "transformer" {
            self.step(
                "train",
                [
                    "scripts/train_transformer.py",
                    "--sources",
                    self.sources.as_str(),
                    "--model",
                    self.model.as_str(),
                    "--replace",
                    "--write-predictions",
                ],
            )
        } else {
            self.step(
                "train",
                [
                    "scripts/train_predictor.py",
                    "--sources",
                    self.sources.as_str(),
                    "--model",
                    self.model.as_str(),
                    "--model-type",
                    "baseline",
                    "--replace",
                    "--write-predictions",
                ],
            )
        }
    }

    fn predict(&self, model_type: &str) -> Vec<PipelineStepSpec> {
        vec![
            self.build_risk_reports(Some(model_type)),
            self.export_risk_reports(Some(model_type)),
        ]
    }

    fn signals(&self) -> PipelineStepSpec {
        self.signal_engine()
    }

    fn status(&self) -> PipelineStepSpec {
        self.step(
            "model_status",
            [
                "scripts/model_status.py",
                "--sources",
                self.sources.as_str(),
                "--model",
                self.model.as_str(),
            ],
        )
    }

    fn predictions(&self, model_type: &str) -> PipelineStepSpec {
        self.step(
            "model_predictions",
            [
                "scripts/model_predictions.py",
                "--sources",
                self.sources.as_str(),
                "--model-type",
                model_type,
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> ScriptCatalog {
        ScriptCatalog::from_config(&Config::default())
    }

    fn labels(specs: &[PipelineStepSpec]) -> Vec<&str> {
        specs.iter().map(|s| s.label.as_str()).collect()
    }

    #[test]
    fn test_ingest_steps() {
        let name: RepoName = "acme/widgets".parse().unwrap();
        let plan = catalog().ingest(&name, Path::new("data/tmp/sources_acme_widgets_x.yaml"));
        assert_eq!(labels(&plan.scoped), vec!["ingest"]);
        assert!(
            plan.shared
                .iter()
                .all(|s| s.command.args.windows(2).any(|w| w == ["--sources", "configs/sources.yaml"]))
        );

        let steps: Vec<_> = plan.scoped.iter().chain(&plan.shared).cloned().collect();
        assert_eq!(
            labels(&steps),
            vec![
                "ingest",
                "derive_features",
                "quality_report",
                "signal_engine",
                "build_risk_reports",
                "export_risk_reports"
            ]
        );
        assert_eq!(
            steps[0].command.to_string(),
            "python -m services.ingestion.run_ingest --sources data/tmp/sources_acme_widgets_x.yaml --metrics configs/metrics.yaml"
        );
        assert!(steps[..4].iter().all(|s| !s.soft_fail));
        assert!(steps[4..].iter().all(|s| s.soft_fail));
        assert_eq!(
            steps[5].benign_failure_pattern.as_deref(),
            Some(NO_PREDICTIONS_PATTERN)
        );
        assert!(steps[5].command.args.contains(&"docs/risk_report.json".to_string()));
    }

    #[test]
    fn test_train_selects_script() {
        let transformer = catalog().train("transformer");
        assert_eq!(transformer.command.args[0], "scripts/train_transformer.py");

        let baseline = catalog().train("anything-else");
        assert_eq!(baseline.command.args[0], "scripts/train_predictor.py");
        assert!(baseline.command.args.windows(2).any(|w| w == ["--model-type", "baseline"]));
    }

    #[test]
    fn test_predict_is_hard_fail_with_model_type() {
        let steps = catalog().predict("transformer");
        assert_eq!(labels(&steps), vec!["build_risk_reports", "export_risk_reports"]);
        for step in &steps {
            assert!(!step.soft_fail);
            assert!(step.command.args.windows(2).any(|w| w == ["--model-type", "transformer"]));
        }
    }

    #[test]
    fn test_interpreter_from_config() {
        let config = Config {
            python: "python3".to_string(),
            ..Config::default()
        };
        let status = ScriptCatalog::from_config(&config).status();
        assert_eq!(status.label, "model_status");
        assert_eq!(status.command.program, "python3");
    }
}
