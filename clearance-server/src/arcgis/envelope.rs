//! Error envelope detection.
//!
//! ArcGIS Server reports request failures as
//! `{"error": {"code": 400, "message": "...", "details": [...]}}` while still
//! answering with HTTP 200. Such a body must never be read as data.

use serde_json::Value;

use super::error::FeatureServiceError;

const UNKNOWN_MESSAGE: &str = "unknown service error";

/// Fail with [`FeatureServiceError::Service`] if `body` is an error envelope.
pub fn classify(url: &str, body: &Value) -> Result<(), FeatureServiceError> {
    let Some(error) = body.as_object().and_then(|o| o.get("error")) else {
        return Ok(());
    };

    let code = error.get("code").and_then(Value::as_i64).unwrap_or(0);
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .unwrap_or(UNKNOWN_MESSAGE)
        .to_string();
    let details = error
        .get("details")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .filter(|d| !d.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Err(FeatureServiceError::Service {
        url: url.to_string(),
        code,
        message,
        details,
    })
}
