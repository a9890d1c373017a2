//! Handler-level errors and their HTTP rendering.

use axum::body::Body;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::models::ErrorResponse;
use crate::security::{preflight_headers, security_headers};
use crate::validation::ApiValidationError;

/// Message returned for any failure that is not the caller's fault
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error. Please try again later.";

/// Terminal failure of one invocation
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Invalid JSON format in request body")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Request body must be a JSON object")]
    NotAnObject,

    #[error(transparent)]
    Validation(#[from] ApiValidationError),

    #[error("Method {0} is not allowed")]
    MethodNotAllowed(String),
}

impl AgentError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidJson(_) | Self::NotAnObject => StatusCode::BAD_REQUEST,
            Self::Validation(err) => err.status(),
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
        }
    }

    pub fn to_response(&self) -> AgentResponse {
        AgentResponse::json(
            self.status(),
            &ErrorResponse {
                error: self.to_string(),
            },
        )
    }
}

/// Status, headers and body of one handler response
#[derive(Debug, Clone)]
pub struct AgentResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl AgentResponse {
    /// JSON body with the security header set
    pub fn json<T: Serialize>(status: StatusCode, payload: &T) -> Self {
        match serde_json::to_string(payload) {
            Ok(body) => Self {
                status,
                headers: security_headers(),
                body,
            },
            Err(err) => {
                tracing::error!("Failed to serialize response body: {}", err);
                Self::internal_error()
            }
        }
    }

    /// Generic 500, built without serialization so it cannot fail
    pub fn internal_error() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            headers: security_headers(),
            body: format!(r#"{{"error":"{}"}}"#, INTERNAL_ERROR_MESSAGE),
        }
    }

    /// Empty 200 for CORS preflight
    pub fn preflight() -> Self {
        Self {
            status: StatusCode::OK,
            headers: preflight_headers(),
            body: String::new(),
        }
    }
}

impl IntoResponse for AgentResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}
