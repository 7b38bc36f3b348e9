use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::error::ImportError;

/// Parse import text holding either one rule object or an array of rules.
///
/// A single object is the shape produced when one rule is copied or shared;
/// arrays come from collection exports.
pub fn parse_rules<E: DeserializeOwned>(text: &str) -> Result<Vec<E>, ImportError> {
    let value: Value = serde_json::from_str(text.trim())
        .map_err(|e| ImportError::Format(format!("not valid JSON: {}", e)))?;

    match value {
        Value::Object(_) => Ok(vec![serde_json::from_value(value)?]),
        Value::Array(values) => values
            .into_iter()
            .map(|v| serde_json::from_value(v).map_err(ImportError::from))
            .collect(),
        _ => Err(ImportError::Format(
            "expected a rule object or an array of rules".to_string(),
        )),
    }
}

/// Serialize one rule as a standalone JSON object.
pub fn to_single_json<E: Serialize>(rule: &E) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(rule)
}
