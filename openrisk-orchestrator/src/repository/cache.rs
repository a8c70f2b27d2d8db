//! Cache Repository
//!
//! Reads the per-repository metric cache written by the ingestion step.
//! Layout: `{cache_dir}/{platform}/{org}/{repo}/{metric}.json`, each file a
//! JSON object of `period -> value`.

use openrisk_core::domain::metric::{MetricSeriesPoint, MetricSummary, SERIES_TAIL_LEN};
use openrisk_core::domain::registry::RepoName;
use regex::Regex;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, warn};

/// Keys with this suffix hold unaggregated data and never enter a summary
const RAW_KEY_SUFFIX: &str = "-raw";

static MONTH_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}$").expect("month key pattern is valid"));

#[derive(Debug, Error)]
pub enum CacheError {
    /// The repository has no cache directory at all
    #[error("cache directory {0} not found")]
    NotFound(String),

    #[error("failed to list cache directory {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Directory holding one repository's metric files
pub fn repo_dir(cache_root: &Path, platform: &str, name: &RepoName) -> PathBuf {
    cache_root.join(platform).join(&name.org).join(&name.repo)
}

/// Summarises one metric's `period -> value` map
///
/// Raw keys are dropped. If any month-shaped keys remain only those are used,
/// otherwise all remaining keys. Keys sort lexicographically, which is
/// chronological for `YYYY-MM`.
pub fn summarize_map(name: &str, map: Map<String, Value>) -> MetricSummary {
    let mut entries: Vec<(String, Value)> = map
        .into_iter()
        .filter(|(key, _)| !key.ends_with(RAW_KEY_SUFFIX))
        .collect();

    if entries.iter().any(|(key, _)| MONTH_KEY.is_match(key)) {
        entries.retain(|(key, _)| MONTH_KEY.is_match(key));
    }
    entries.sort_by(|(a, _), (b, _)| a.cmp(b));

    let points = entries.len();
    let latest = entries.last().cloned();
    let series = entries
        .into_iter()
        .skip(points.saturating_sub(SERIES_TAIL_LEN))
        .map(|(period, value)| MetricSeriesPoint { period, value })
        .collect();

    MetricSummary {
        name: name.to_string(),
        latest_period: latest.as_ref().map(|(period, _)| period.clone()),
        latest_value: latest.map(|(_, value)| value),
        points,
        series,
    }
}

/// Summarises a metric file's content
///
/// Empty content counts as an empty object. Anything that is not a JSON
/// object yields a degraded summary.
pub fn summarize(name: &str, content: &str) -> MetricSummary {
    let content = if content.trim().is_empty() { "{}" } else { content };

    match serde_json::from_str::<Value>(content) {
        Ok(Value::Object(map)) => summarize_map(name, map),
        Ok(_) => {
            warn!("Metric file '{}' is not a JSON object", name);
            MetricSummary::degraded(name)
        }
        Err(e) => {
            warn!("Metric file '{}' failed to parse: {}", name, e);
            MetricSummary::degraded(name)
        }
    }
}

/// Projects every metric file in `dir`
///
/// Returns [`CacheError::NotFound`] when the directory is absent, which is
/// distinct from an existing but empty directory (`Ok(vec![])`). One broken
/// file never prevents the others from being summarised. Order is unspecified.
pub async fn project(dir: &Path) -> Result<Vec<MetricSummary>, CacheError> {
    let io_err = |source| CacheError::Io {
        path: dir.display().to_string(),
        source,
    };

    match tokio::fs::metadata(dir).await {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => return Err(CacheError::NotFound(dir.display().to_string())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(CacheError::NotFound(dir.display().to_string()));
        }
        Err(e) => return Err(io_err(e)),
    }

    let mut entries = tokio::fs::read_dir(dir).await.map_err(io_err)?;
    let mut metrics = Vec::new();

    while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
        let file_name = entry.file_name().to_string_lossy().to_string();
        let Some(name) = file_name.strip_suffix(".json") else {
            continue;
        };

        let summary = match tokio::fs::read_to_string(entry.path()).await {
            Ok(content) => summarize(name, &content),
            Err(e) => {
                warn!("Failed to read metric file {}: {}", file_name, e);
                MetricSummary::degraded(name)
            }
        };
        metrics.push(summary);
    }

    debug!("Projected {} metric(s) from {}", metrics.len(), dir.display());
    Ok(metrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_summary_drops_raw_keys() {
        let summary = summarize("stars", r#"{"2024-01":1,"2024-01-raw":99,"2024-02":2}"#);
        assert_eq!(summary.points, 2);
        assert_eq!(summary.latest_period.as_deref(), Some("2024-02"));
        assert_eq!(summary.latest_value, Some(json!(2)));
        assert_eq!(summary.series.len(), 2);
        assert_eq!(summary.series[0].period, "2024-01");
    }

    #[test]
    fn test_month_keys_win_over_others() {
        let summary = summarize("activity", r#"{"2023Q4":5,"2024-02":2,"2024-01":1,"all":7}"#);
        assert_eq!(summary.points, 2);
        assert_eq!(summary.latest_period.as_deref(), Some("2024-02"));
    }

    #[test]
    fn test_non_month_keys_used_when_no_months() {
        let summary = summarize("yearly", r#"{"2023":10,"2021":3,"2022":"n/a"}"#);
        assert_eq!(summary.points, 3);
        assert_eq!(summary.latest_period.as_deref(), Some("2023"));
        assert_eq!(summary.series[1].value, json!("n/a"));
    }

    #[test]
    fn test_series_keeps_last_twelve() {
        let mut map = Map::new();
        for month in 1..=12 {
            map.insert(format!("2023-{month:02}"), json!(month));
        }
        for month in 1..=6 {
            map.insert(format!("2024-{month:02}"), json!(100 + month));
        }

        let summary = summarize_map("openrank", map);
        assert_eq!(summary.points, 18);
        assert_eq!(summary.series.len(), 12);
        assert_eq!(summary.series[0].period, "2023-07");
        assert_eq!(summary.series[11].period, "2024-06");
        assert_eq!(summary.latest_value, Some(json!(106)));
    }

    #[test]
    fn test_null_values_are_kept() {
        let summary = summarize("issues", r#"{"2024-01":null}"#);
        assert_eq!(summary.points, 1);
        assert_eq!(summary.latest_value, Some(Value::Null));
    }

    #[test]
    fn test_empty_and_broken_content() {
        let empty = summarize("empty", "");
        assert_eq!(empty.points, 0);
        assert!(empty.latest_period.is_none());

        let broken = summarize("broken", "{not json");
        assert_eq!(broken, MetricSummary::degraded("broken"));

        let array = summarize("array", "[1,2,3]");
        assert_eq!(array, MetricSummary::degraded("array"));
    }

    #[tokio::test]
    async fn test_missing_dir_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let result = project(&dir.path().join("github/acme/widgets")).await;
        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_empty_dir_is_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        let metrics = project(dir.path()).await.unwrap();
        assert!(metrics.is_empty());
    }

    #[tokio::test]
    async fn test_broken_file_does_not_abort_projection() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("stars.json"), r#"{"2024-01":1,"2024-02":2}"#).unwrap();
        std::fs::write(dir.path().join("forks.json"), "{{{").unwrap();
        std::fs::write(dir.path().join("README.md"), "not a metric").unwrap();

        let mut metrics = project(dir.path()).await.unwrap();
        metrics.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics[0], MetricSummary::degraded("forks"));
        assert_eq!(metrics[1].name, "stars");
        assert_eq!(metrics[1].points, 2);
    }

    #[test]
    fn test_repo_dir_layout() {
        let name: RepoName = "acme/widgets".parse().unwrap();
        let dir = repo_dir(Path::new("data/cache"), "github", &name);
        assert_eq!(dir, PathBuf::from("data/cache/github/acme/widgets"));
    }
}
