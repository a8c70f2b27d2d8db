//! Candidate list domain types

use serde::{Deserialize, Serialize};

/// One row of the candidate repository list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleRow {
    pub id: String,
    pub platform: String,
    pub repo_name: String,
}

/// Default number of rows returned by a sample read
pub const DEFAULT_SAMPLE_LIMIT: usize = 300;
/// Upper bound on rows returned by a sample read
pub const MAX_SAMPLE_LIMIT: usize = 1000;

/// Normalises a raw `limit` query value
///
/// Missing, blank or non-finite input gives [`DEFAULT_SAMPLE_LIMIT`]. Any
/// other number, fractional or in exponent form, is clamped to
/// `[1, MAX_SAMPLE_LIMIT]`. Rows are read until at least that many are
/// collected, so a fractional limit rounds up.
pub fn clamp_sample_limit(raw: Option<&str>) -> usize {
    let parsed = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|n| n.is_finite());

    let Some(limit) = parsed else {
        return DEFAULT_SAMPLE_LIMIT;
    };

    limit.clamp(1.0, MAX_SAMPLE_LIMIT as f64).ceil() as usize
}
