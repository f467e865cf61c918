use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error body returned by the simulation service on a non-success status.
///
/// `detail` is a plain string for application errors and a list of field errors
/// for request validation failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Value,
}

impl ErrorBody {
    pub fn describe(&self) -> String {
        match &self.detail {
            Value::String(detail) => detail.clone(),
            Value::Null => "no detail provided".to_string(),
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.get("msg")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(|| item.to_string())
                })
                .collect::<Vec<_>>()
                .join("; "),
            other => other.to_string(),
        }
    }
}
