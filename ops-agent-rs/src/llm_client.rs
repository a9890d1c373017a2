// ops-agent-rs/src/llm_client.rs
//
// Text-generation backends used to rephrase diagnostic reports.
//
// This module provides:
// - `TextGenerator`, the seam the enhancer talks to
// - An OpenAI-compatible chat-completions client over reqwest
// - A Bedrock client using the Anthropic messages body
//
// Calls are made once; there is no retry. Callers treat any error as
// "no enhancement".

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_bedrockruntime::error::DisplayErrorContext;
use aws_sdk_bedrockruntime::primitives::Blob;
use ops_config::{BedrockSettings, OpenAiSettings};
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// A prompt for a text backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub system: Option<String>,
    pub prompt: String,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self { system: None, prompt: prompt.into() }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

// Error type for text-generation calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    InvalidRequest(String), // 400, 401, 403, 404
    RateLimitExceeded(String), // 429
    ServerError(String), // 5xx
    NetworkError(String), // connection issues, timeouts
    ParseError(String),
    EmptyResponse,
    UnknownError(String),
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            LlmError::RateLimitExceeded(msg) => write!(f, "Rate limit exceeded: {}", msg),
            LlmError::ServerError(msg) => write!(f, "Server error: {}", msg),
            LlmError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            LlmError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            LlmError::EmptyResponse => write!(f, "Empty response"),
            LlmError::UnknownError(msg) => write!(f, "Unknown error: {}", msg),
        }
    }
}

impl std::error::Error for LlmError {}

/// A text-generation backend
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &str;

    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: u32,
}

/// OpenAI-compatible chat-completions client
#[derive(Debug, Clone)]
pub struct OpenAiChatClient {
    client: Client,
    api_key: String,
    api_url: String,
    model: String,
}

impl OpenAiChatClient {
    pub const TEMPERATURE: f32 = 0.3;
    pub const MAX_TOKENS: u32 = 1000;

    pub fn new(settings: &OpenAiSettings) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_key: settings.api_key.clone(),
            api_url: settings.api_url.clone(),
            model: settings.model.clone(),
        }
    }

    fn build_body(&self, request: &GenerationRequest) -> ChatCompletionRequest {
        let mut messages = Vec::new();
        if let Some(system) = &request.system {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: request.prompt.clone(),
        });

        ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: Self::TEMPERATURE,
            max_tokens: Self::MAX_TOKENS,
        }
    }
}

#[async_trait]
impl TextGenerator for OpenAiChatClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        let body = self.build_body(request);

        tracing::info!("Sending LLM request to {} (model: {})", self.api_url, self.model);

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    LlmError::NetworkError(format!("Request timed out: {}", err))
                } else if err.is_connect() {
                    LlmError::NetworkError(format!("Connection failed: {}", err))
                } else {
                    LlmError::NetworkError(format!("Network error: {}", err))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                400 => LlmError::InvalidRequest(format!("Bad request: {}", text)),
                401 => LlmError::InvalidRequest(format!("Unauthorized: {}", text)),
                403 => LlmError::InvalidRequest(format!("Forbidden: {}", text)),
                404 => LlmError::InvalidRequest(format!("Not found: {}", text)),
                429 => LlmError::RateLimitExceeded(text),
                500..=599 => LlmError::ServerError(format!("Server error ({}): {}", status, text)),
                _ => LlmError::UnknownError(format!("Unknown error ({}): {}", status, text)),
            });
        }

        let data: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|err| LlmError::ParseError(format!("Failed to parse response: {}", err)))?;

        if let Some(usage) = &data.usage {
            tracing::info!("LLM request completed. Used {} tokens", usage.total_tokens);
        }

        let content = data
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::ParseError("No choices returned in response".to_string()))?
            .message
            .content
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(content)
    }
}

/// Bedrock `InvokeModel` client for Anthropic models
#[derive(Debug, Clone)]
pub struct BedrockClient {
    client: aws_sdk_bedrockruntime::Client,
    model_id: String,
}

impl BedrockClient {
    pub const ANTHROPIC_VERSION: &'static str = "bedrock-2023-05-31";
    pub const MAX_TOKENS: u32 = 1024;

    pub fn new(client: aws_sdk_bedrockruntime::Client, settings: &BedrockSettings) -> Self {
        Self { client, model_id: settings.model_id.clone() }
    }
}

/// Anthropic messages body as accepted by Bedrock
pub fn bedrock_body(request: &GenerationRequest, max_tokens: u32) -> serde_json::Value {
    let mut body = serde_json::json!({
        "anthropic_version": BedrockClient::ANTHROPIC_VERSION,
        "max_tokens": max_tokens,
        "messages": [
            { "role": "user", "content": request.prompt }
        ]
    });
    if let Some(system) = &request.system {
        body["system"] = serde_json::Value::String(system.clone());
    }
    body
}

/// Text of the first content block of an Anthropic response
pub fn parse_bedrock_text(raw: &[u8]) -> Result<String, LlmError> {
    let value: serde_json::Value = serde_json::from_slice(raw)
        .map_err(|err| LlmError::ParseError(format!("Failed to parse response: {}", err)))?;
    let text = value["content"][0]["text"].as_str().unwrap_or_default();
    if text.trim().is_empty() {
        return Err(LlmError::EmptyResponse);
    }
    Ok(text.to_string())
}

#[async_trait]
impl TextGenerator for BedrockClient {
    fn name(&self) -> &str {
        "bedrock"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        let body = serde_json::to_vec(&bedrock_body(request, Self::MAX_TOKENS))
            .map_err(|err| LlmError::InvalidRequest(err.to_string()))?;

        tracing::info!("Invoking Bedrock model {}", self.model_id);

        let output = self
            .client
            .invoke_model()
            .model_id(&self.model_id)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(body))
            .send()
            .await
            .map_err(|err| LlmError::ServerError(DisplayErrorContext(&err).to_string()))?;

        parse_bedrock_text(output.body().as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(server: &MockServer) -> OpenAiSettings {
        OpenAiSettings {
            api_key: "test-key".to_string(),
            api_url: format!("{}/v1/chat/completions", server.uri()),
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn test_openai_generate_sends_system_and_user_turns() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .and(body_partial_json(json!({
                "model": "gpt-4o-mini",
                "max_tokens": 1000,
                "messages": [
                    { "role": "system", "content": "be brief" },
                    { "role": "user", "content": "hello" }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [ { "message": { "role": "assistant", "content": "1) Summary\n- ok" } } ],
                "usage": { "total_tokens": 12 }
            })))
            .mount(&server)
            .await;

        let client = OpenAiChatClient::new(&settings(&server));
        let text = client
            .generate(&GenerationRequest::new("hello").with_system("be brief"))
            .await
            .unwrap();
        assert_eq!(text, "1) Summary\n- ok");
    }

    #[tokio::test]
    async fn test_openai_error_classification() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let client = OpenAiChatClient::new(&settings(&server));
        let err = client.generate(&GenerationRequest::new("hi")).await.unwrap_err();
        assert_eq!(err, LlmError::RateLimitExceeded("slow down".to_string()));
    }

    #[tokio::test]
    async fn test_openai_server_error_and_empty_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "messages": [ { "role": "user", "content": "boom" } ] })))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "messages": [ { "role": "user", "content": "empty" } ] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [ { "message": { "role": "assistant", "content": "" } } ]
            })))
            .mount(&server)
            .await;

        let client = OpenAiChatClient::new(&settings(&server));
        assert!(matches!(
            client.generate(&GenerationRequest::new("boom")).await,
            Err(LlmError::ServerError(_))
        ));
        assert_eq!(
            client.generate(&GenerationRequest::new("empty")).await,
            Err(LlmError::EmptyResponse)
        );
    }

    #[test]
    fn test_bedrock_body_and_parse() {
        let body = bedrock_body(&GenerationRequest::new("Enhance this"), 1024);
        assert_eq!(body["anthropic_version"], "bedrock-2023-05-31");
        assert_eq!(body["max_tokens"], 1024);
        assert_eq!(body["messages"][0]["content"], "Enhance this");
        assert!(body.get("system").is_none());

        let raw = br#"{"content":[{"type":"text","text":"better"}]}"#;
        assert_eq!(parse_bedrock_text(raw).unwrap(), "better");
        assert_eq!(parse_bedrock_text(br#"{"content":[]}"#), Err(LlmError::EmptyResponse));
        assert!(matches!(parse_bedrock_text(b"nope"), Err(LlmError::ParseError(_))));
    }
}
