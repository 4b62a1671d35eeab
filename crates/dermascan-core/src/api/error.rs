//! Request failure type and message extraction.

use serde_json::Value;
use thiserror::Error;

use super::Operation;

/// A failed call to the diagnostic service.
///
/// Network, HTTP status and decoding failures all collapse into one shape:
/// a human-readable message. `status` is kept for logging only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("{message}")]
    RequestFailed {
        status: Option<u16>,
        message: String,
    },
}

impl ApiError {
    pub fn request_failed(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::RequestFailed {
            status,
            message: message.into(),
        }
    }

    /// Builds an error from a non-success response body.
    pub fn from_response(operation: Operation, status: u16, body: &str) -> Self {
        Self::request_failed(Some(status), extract_message(body, operation.fallback_message()))
    }

    pub fn message(&self) -> &str {
        match self {
            Self::RequestFailed { message, .. } => message,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RequestFailed { status, .. } => *status,
        }
    }
}

/// Pulls a human-readable message out of an error body.
///
/// Order: `detail` field, then `field: value` pairs of an object body
/// (validation errors), then `fallback`.
pub fn extract_message(body: &str, fallback: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return fallback.to_string();
    };

    let Value::Object(map) = value else {
        return fallback.to_string();
    };

    if let Some(detail) = map.get("detail").map(render_value)
        && !detail.is_empty()
    {
        return detail;
    }

    let mut fields: Vec<_> = map.iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));
    let joined = fields
        .into_iter()
        .map(|(key, value)| format!("{key}: {}", render_value(value)))
        .collect::<Vec<_>>()
        .join(", ");

    if joined.is_empty() {
        fallback.to_string()
    } else {
        joined
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) => items
            .iter()
            .map(render_value)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
