//! JSONPath evaluation shared by the resolver and the node actions.
//!
//! Paths written without a leading `$` are treated as relative to the root,
//! so `user.name` and `$.user.name` select the same value.

use serde_json::Value;
use serde_json_path::JsonPath;

use crate::{FlowError, Result};

/// Normalize an editor path into a rooted JSONPath expression.
pub fn normalize(path: &str) -> String {
    let path = path.trim();
    if path.is_empty() {
        "$".to_string()
    } else if path.starts_with('$') {
        path.to_string()
    } else if path.starts_with('[') {
        format!("${}", path)
    } else {
        format!("$.{}", path)
    }
}

/// Parse a path after normalizing it.
pub fn parse(path: &str) -> Result<JsonPath> {
    let normalized = normalize(path);
    JsonPath::parse(&normalized).map_err(|err| FlowError::JsonPath {
        path: path.to_string(),
        message: err.to_string(),
    })
}

/// Every value matched by `path`, in document order.
pub fn query(
    path: &str,
    value: &Value,
) -> Result<Vec<Value>> {
    let json_path = parse(path)?;
    Ok(json_path.query(value).all().into_iter().cloned().collect())
}

/// Collapse matches the way an unwrapped query result reads:
/// nothing for no match, the value itself for one match, an array otherwise.
pub fn unwrap_matches(mut matches: Vec<Value>) -> Option<Value> {
    match matches.len() {
        0 => None,
        1 => matches.pop(),
        _ => Some(Value::Array(matches)),
    }
}

/// First match of `path`, where a lone array match yields its first element.
pub fn first_match(
    path: &str,
    value: &Value,
) -> Result<Option<Value>> {
    let matches = query(path, value)?;
    Ok(match unwrap_matches(matches) {
        Some(Value::Array(items)) => items.into_iter().next(),
        other => other,
    })
}
