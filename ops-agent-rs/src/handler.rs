//! The request handler: parse, resolve, gather, synthesize, enhance, persist.

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::enhancer::Enhancer;
use crate::error::{AgentError, AgentResponse};
use crate::evidence::EvidenceGatherer;
use crate::models::{ChatRequest, ChatResponse, ConversationRecord, Report, DEFAULT_HOURS_BACK};
use crate::report::{format_report, synthesize_report};
use crate::resolver::resolve_pipeline_name;
use crate::services::ConversationStore;
use crate::validation::validate_request_body;

/// Parse and validate a raw request body. An empty body counts as `{}`.
pub fn parse_request(body: &[u8]) -> Result<ChatRequest, AgentError> {
    let value: Value = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Object(Default::default())
    } else {
        serde_json::from_slice(body).map_err(AgentError::InvalidJson)?
    };

    let Value::Object(mut fields) = value else {
        return Err(AgentError::NotAnObject);
    };

    validate_request_body(&mut fields)?;

    let text = |key: &str| fields.get(key).and_then(Value::as_str).unwrap_or_default().to_string();

    // non-string ids are kept in their JSON text form
    let conversation_id = match fields.get("conversation_id") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(id)) => id.clone(),
        Some(other) => other.to_string(),
    };
    let conversation_id = if conversation_id.is_empty() {
        Uuid::new_v4().to_string()
    } else {
        conversation_id
    };

    // validated to lie in [1, 168]; fractional hours are truncated
    let hours_back = fields
        .get("hours_back")
        .and_then(Value::as_f64)
        .map(|h| h as u32)
        .unwrap_or(DEFAULT_HOURS_BACK);

    Ok(ChatRequest {
        message: text("message"),
        conversation_id,
        pipeline_name: text("pipeline_name"),
        hours_back,
    })
}

/// Operations agent request handler
#[derive(Clone)]
pub struct OpsAgent {
    gatherer: EvidenceGatherer,
    enhancer: Enhancer,
    conversations: Option<Arc<dyn ConversationStore>>,
}

impl OpsAgent {
    pub fn new(
        gatherer: EvidenceGatherer,
        enhancer: Enhancer,
        conversations: Option<Arc<dyn ConversationStore>>,
    ) -> Self {
        Self { gatherer, enhancer, conversations }
    }

    pub fn enhancer(&self) -> &Enhancer {
        &self.enhancer
    }

    pub fn has_conversation_store(&self) -> bool {
        self.conversations.is_some()
    }

    /// Handle one invocation
    pub async fn handle(&self, method: &Method, body: &[u8]) -> AgentResponse {
        tracing::info!("Received request: {}", method);

        if method == Method::OPTIONS {
            return AgentResponse::preflight();
        }
        if method != Method::POST {
            return AgentError::MethodNotAllowed(method.to_string()).to_response();
        }

        match self.process(body).await {
            Ok(response) => AgentResponse::json(StatusCode::OK, &response),
            Err(err) => {
                match &err {
                    AgentError::InvalidJson(source) => {
                        tracing::error!("Invalid JSON in request body: {}", source)
                    }
                    other => tracing::warn!("Invalid request: {}", other),
                }
                err.to_response()
            }
        }
    }

    async fn process(&self, body: &[u8]) -> Result<ChatResponse, AgentError> {
        let request = parse_request(body)?;

        let pipeline_name =
            resolve_pipeline_name(&request.pipeline_name, &request.message).unwrap_or_default();

        let response_text = if pipeline_name.is_empty() {
            self.enhancer.answer_without_target(&request.message).await
        } else {
            let report = self.analyze(&pipeline_name, request.hours_back).await;
            let text = format_report(&report);
            self.enhancer.enhance_report(&request.message, &text).await
        };

        self.save_conversation(&request.conversation_id, &request.message, &response_text)
            .await;

        tracing::info!(
            "Successfully processed request for conversation_id: {}",
            request.conversation_id
        );

        Ok(ChatResponse {
            conversation_id: request.conversation_id,
            response: response_text,
            pipeline_name,
        })
    }

    /// Gather evidence and synthesize the report for one pipeline
    pub async fn analyze(&self, pipeline_name: &str, hours_back: u32) -> Report {
        let gathered = self.gatherer.gather(pipeline_name, hours_back).await;
        let log_group = gathered.log_group().map(str::to_string);
        synthesize_report(pipeline_name, hours_back, log_group.as_deref(), gathered.items)
    }

    async fn save_conversation(&self, conversation_id: &str, message: &str, response: &str) {
        let Some(store) = &self.conversations else {
            return;
        };
        let record = ConversationRecord::new(conversation_id, message, response, Utc::now());
        if let Err(err) = store.append(&record).await {
            tracing::error!("Error saving conversation: {}", err);
        }
    }
}
