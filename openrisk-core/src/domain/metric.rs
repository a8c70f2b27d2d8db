//! Metric domain types

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Number of trailing points kept in a summary's series
pub const SERIES_TAIL_LEN: usize = 12;

/// One `(period, value)` pair of a cached metric series
///
/// `value` is whatever the cache file holds: a number, a string or null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSeriesPoint {
    pub period: String,
    pub value: Value,
}

/// Derived view of one cached metric
///
/// Built per request, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub name: String,
    pub latest_period: Option<String>,
    pub latest_value: Option<Value>,
    pub points: usize,
    pub series: Vec<MetricSeriesPoint>,
}

impl MetricSummary {
    /// Summary for a metric whose file could not be parsed
    pub fn degraded(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            latest_period: None,
            latest_value: None,
            points: 0,
            series: Vec::new(),
        }
    }
}
