//! Request Validation
//!
//! Checks the optional fields of an inbound chat request body. Fields are
//! only inspected when present; a trimmed `pipeline_name` is written back.

use axum::http::StatusCode;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

/// Inclusive bounds for the lookback window, in hours
pub const MIN_HOURS_BACK: f64 = 1.0;
pub const MAX_HOURS_BACK: f64 = 168.0;

pub const MAX_MESSAGE_CHARS: usize = 5000;
pub const MAX_PIPELINE_NAME_CHARS: usize = 100;

/// Characters allowed in pipeline names (common in AWS resource names)
pub static PIPELINE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_\-./:]+$").expect("static pattern"));

/// Validation error for chat requests
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ApiValidationError {
    #[error("hours_back must be between 1 and 168 (7 days)")]
    HoursBackOutOfRange,

    #[error("message must be a string")]
    MessageNotString,

    #[error("message exceeds maximum length of 5000 characters")]
    MessageTooLong,

    #[error("pipeline_name must be a string")]
    PipelineNameNotString,

    #[error("pipeline_name exceeds maximum length of 100 characters")]
    PipelineNameTooLong,

    #[error("pipeline_name contains invalid characters: '{invalid}'. Only alphanumeric, hyphens (-), underscores (_), dots (.), slashes (/), and colons (:) are allowed. Received: '{received}'")]
    PipelineNameInvalidChars { invalid: String, received: String },
}

impl ApiValidationError {
    pub fn status(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }
}

pub fn is_allowed_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/' | ':')
}

/// Whether `name` is non-empty and made only of allowed characters
pub fn is_valid_pipeline_name(name: &str) -> bool {
    PIPELINE_NAME_RE.is_match(name)
}

/// Offending characters, deduplicated, in first-seen order
fn invalid_chars(name: &str) -> String {
    let mut seen: Vec<char> = Vec::new();
    for c in name.chars().filter(|c| !is_allowed_name_char(*c)) {
        if !seen.contains(&c) {
            seen.push(c);
        }
    }
    if seen.is_empty() {
        return "unknown".to_string();
    }
    seen.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(", ")
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Validate request body parameters, trimming `pipeline_name` in place
pub fn validate_request_body(body: &mut Map<String, Value>) -> Result<(), ApiValidationError> {
    if let Some(hours_back) = body.get("hours_back") {
        match hours_back.as_f64() {
            Some(h) if (MIN_HOURS_BACK..=MAX_HOURS_BACK).contains(&h) => {}
            _ => return Err(ApiValidationError::HoursBackOutOfRange),
        }
    }

    if let Some(message) = body.get("message") {
        let message = message.as_str().ok_or(ApiValidationError::MessageNotString)?;
        if message.chars().count() > MAX_MESSAGE_CHARS {
            return Err(ApiValidationError::MessageTooLong);
        }
    }

    let trimmed = match body.get("pipeline_name") {
        Some(value) if is_truthy(value) => {
            let name = value.as_str().ok_or(ApiValidationError::PipelineNameNotString)?;
            name.trim().to_string()
        }
        _ => return Ok(()),
    };

    if !trimmed.is_empty() {
        if trimmed.chars().count() > MAX_PIPELINE_NAME_CHARS {
            return Err(ApiValidationError::PipelineNameTooLong);
        }
        if !is_valid_pipeline_name(&trimmed) {
            return Err(ApiValidationError::PipelineNameInvalidChars {
                invalid: invalid_chars(&trimmed),
                received: trimmed,
            });
        }
    }

    body.insert("pipeline_name".to_string(), Value::String(trimmed));
    Ok(())
}
