// ops-agent-rs/src/lib.rs
// Operations support agent: pipeline diagnostics over chat.
//
// A request names (or mentions) a pipeline. The agent gathers error
// evidence from logs and workflow executions, synthesizes a fixed-layout
// report, optionally rewrites it through a language model, persists the
// exchange and answers with a fixed set of security headers.

use std::any::Any;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Request, State},
    http::{header::X_FRAME_OPTIONS, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde::Serialize;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

pub mod enhancer;
pub mod error;
pub mod evidence;
pub mod handler;
pub mod llm_client;
pub mod logging;
pub mod models;
pub mod report;
pub mod resolver;
pub mod security;
pub mod services;
pub mod validation;

pub use enhancer::{Enhancer, EnhancerConfig};
pub use error::{AgentError, AgentResponse};
pub use evidence::EvidenceGatherer;
pub use handler::OpsAgent;
pub use models::{ChatRequest, ChatResponse, Report};

use models::ErrorResponse;
use security::security_headers;

use llm_client::{BedrockClient, OpenAiChatClient, TextGenerator};
use ops_config::AgentConfig;
use services::aws::{
    load_sdk_config, CloudWatchLogSearch, DynamoConversationStore, DynamoPipelineCatalog,
    StepFunctionsHistory,
};
use services::{ConversationStore, PipelineCatalog};

/// Maximum accepted request body size in bytes (1MB)
pub const MAX_PAYLOAD_SIZE: usize = 1024 * 1024;

/// Service name reported by the health endpoint
pub const SERVICE_NAME: &str = "ops-agent";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub service_name: String,
    pub status: String,
    pub enhancer_configured: bool,
    pub conversation_store_configured: bool,
}

/// POST|OPTIONS / and /chat - one agent invocation
async fn chat_handler(
    State(agent): State<Arc<OpsAgent>>,
    method: Method,
    body: Bytes,
) -> impl IntoResponse {
    agent.handle(&method, &body).await
}

/// GET /health - liveness and wiring report
async fn health_handler(State(agent): State<Arc<OpsAgent>>) -> impl IntoResponse {
    Json(HealthResponse {
        healthy: true,
        service_name: SERVICE_NAME.to_string(),
        status: "SERVING".to_string(),
        enhancer_configured: agent.enhancer().is_configured(),
        conversation_store_configured: agent.has_conversation_store(),
    })
}

/// Unknown paths answer with the JSON error shape
async fn not_found_handler() -> impl IntoResponse {
    AgentResponse::json(
        StatusCode::NOT_FOUND,
        &ErrorResponse {
            error: "Not Found".to_string(),
        },
    )
}

/// Decorates responses built outside the handler (body limit, method
/// routing, health). Handler responses already carry the security set and
/// a successful preflight keeps its own headers.
async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let preflight = request.method() == Method::OPTIONS;
    let mut response = next.run(request).await;

    if response.headers().contains_key(X_FRAME_OPTIONS) {
        return response;
    }
    let status = response.status();
    if preflight && status.is_success() {
        return response;
    }

    if status.is_client_error() || status.is_server_error() {
        let error = status.canonical_reason().unwrap_or("Request failed").to_string();
        return AgentResponse::json(status, &ErrorResponse { error }).into_response();
    }

    let headers = response.headers_mut();
    for (name, value) in security_headers() {
        if let Some(name) = name {
            headers.entry(name).or_insert(value);
        }
    }
    response
}

/// Panics inside a handler still produce the generic 500 with security headers
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!("Error handling request: {}", detail);
    AgentResponse::internal_error().into_response()
}

/// Build the HTTP router around an agent
pub fn create_router(agent: Arc<OpsAgent>) -> Router {
    Router::new()
        .route("/", any(chat_handler))
        .route("/chat", any(chat_handler))
        .route("/health", get(health_handler))
        .fallback(not_found_handler)
        .layer(RequestBodyLimitLayer::new(MAX_PAYLOAD_SIZE))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(agent)
}

/// Wire the production collaborators described by the configuration.
///
/// Unset table names disable the catalog and conversation persistence.
/// Unset language-model settings leave the deterministic report as the answer.
pub async fn build_agent(config: &AgentConfig) -> OpsAgent {
    let sdk_config = load_sdk_config(&config.region).await;
    let dynamo = aws_sdk_dynamodb::Client::new(&sdk_config);

    let catalog: Option<Arc<dyn PipelineCatalog>> = match &config.pipelines_table {
        Some(table) => {
            tracing::info!("Using pipeline catalog table: {}", table);
            Some(Arc::new(DynamoPipelineCatalog::new(dynamo.clone(), table.clone())))
        }
        None => {
            tracing::warn!("DDB_PIPELINES_TABLE not set, pipeline metadata lookups disabled");
            None
        }
    };

    let conversations: Option<Arc<dyn ConversationStore>> = match &config.conversations_table {
        Some(table) => {
            tracing::info!("Using conversations table: {}", table);
            Some(Arc::new(DynamoConversationStore::new(dynamo, table.clone())))
        }
        None => {
            tracing::warn!("DDB_CONVERSATIONS_TABLE not set, conversation history disabled");
            None
        }
    };

    let gatherer = EvidenceGatherer::new(
        catalog,
        Arc::new(CloudWatchLogSearch::new(aws_sdk_cloudwatchlogs::Client::new(&sdk_config))),
        Arc::new(StepFunctionsHistory::new(aws_sdk_sfn::Client::new(&sdk_config))),
    );

    let primary = config.openai.as_ref().map(|settings| {
        tracing::info!("Primary language model: {} via {}", settings.model, settings.api_url);
        Arc::new(OpenAiChatClient::new(settings)) as Arc<dyn TextGenerator>
    });

    let secondary = match &config.bedrock {
        Some(settings) => {
            tracing::info!("Secondary language model: Bedrock {}", settings.model_id);
            let bedrock_config = if settings.region == config.region {
                sdk_config.clone()
            } else {
                load_sdk_config(&settings.region).await
            };
            let client = aws_sdk_bedrockruntime::Client::new(&bedrock_config);
            Some(Arc::new(BedrockClient::new(client, settings)) as Arc<dyn TextGenerator>)
        }
        None => None,
    };

    if primary.is_none() && secondary.is_none() {
        tracing::warn!("No language model configured, responses are deterministic reports");
    }

    OpsAgent::new(
        gatherer,
        Enhancer::new(EnhancerConfig { primary, secondary }),
        conversations,
    )
}
