//! Cache projection DTOs

use serde::{Deserialize, Serialize};

use crate::domain::metric::MetricSummary;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawCacheQuery {
    /// `org/repo`
    pub repo: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawCacheResponse {
    pub ok: bool,
    pub repo: String,
    pub metrics: Vec<MetricSummary>,
}
