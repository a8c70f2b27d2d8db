//! Risk Report Repository
//!
//! Read-only access to the risk report document produced by the export step.
//! The document is either a list of report items or an object with an
//! `items` list; each item names its repository under `repo`.

use serde_json::{Map, Value, json};
use std::path::Path;
use tracing::debug;

/// Loads the report item for `repo`, projected to the fields the advisory
/// context uses
///
/// Any absence (missing file, unparsable document, no matching item) is
/// `None`.
pub async fn find_item(path: &Path, repo: &str) -> Option<Value> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) => {
            debug!("Risk report {} unavailable: {}", path.display(), e);
            return None;
        }
    };

    let document: Value = match serde_json::from_str(&content) {
        Ok(document) => document,
        Err(e) => {
            debug!("Risk report {} failed to parse: {}", path.display(), e);
            return None;
        }
    };

    let items = match &document {
        Value::Array(items) => items,
        Value::Object(obj) => obj.get("items")?.as_array()?,
        _ => return None,
    };

    items
        .iter()
        .filter_map(Value::as_object)
        .find(|item| item.get("repo").and_then(Value::as_str) == Some(repo))
        .map(project)
}

fn project(item: &Map<String, Value>) -> Value {
    let field = |key: &str| item.get(key).cloned().unwrap_or(Value::Null);
    let as_of_month = item
        .get("as_of_month")
        .filter(|v| !v.is_null())
        .or_else(|| item.get("as_of"))
        .cloned()
        .unwrap_or(Value::Null);

    json!({
        "risk_level": field("risk_level"),
        "risk_score": field("risk_score"),
        "data_quality": field("data_quality"),
        "main_signals": field("main_signals"),
        "as_of_month": as_of_month,
    })
}
