//! Stable machine-readable result shape for every lifecycle action.

use serde::Serialize;
use serde_json::Value;

/// `{success, action, data, timestamp}` as consumed by the tool layer.
/// Errors travel inside `data`, not as exceptions.
#[derive(Clone, Debug, Serialize)]
pub struct Outcome {
    pub success: bool,
    pub action: String,
    pub data: Value,
    pub timestamp: String,
}

fn iso(now_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(now_ms)
        .unwrap_or_else(chrono::Utc::now)
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

impl Outcome {
    pub fn ok(action: &str, data: Value, now_ms: i64) -> Self {
        Self {
            success: true,
            action: action.to_string(),
            data,
            timestamp: iso(now_ms),
        }
    }

    pub fn rejected(action: &str, data: Value, now_ms: i64) -> Self {
        Self {
            success: false,
            action: action.to_string(),
            data,
            timestamp: iso(now_ms),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}
