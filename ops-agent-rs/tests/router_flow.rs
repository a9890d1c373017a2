// End-to-end tests driving the HTTP router with in-memory collaborators.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ops_agent::enhancer::USAGE_MESSAGE;
use ops_agent::llm_client::{OpenAiChatClient, TextGenerator};
use ops_agent::models::PipelineInfo;
use ops_agent::report::format_report;
use ops_agent::services::memory::{
    InMemoryCatalog, InMemoryConversationStore, InMemoryExecutionHistory, InMemoryLogSearch,
    Unavailable,
};
use ops_agent::services::{ConversationStore, ExecutionSummary, LogEvent};
use ops_agent::{create_router, Enhancer, EnhancerConfig, EvidenceGatherer, OpsAgent};
use ops_config::OpenAiSettings;

const LOG_GROUP: &str = "/aws/glue/nightly-etl";
const STATE_MACHINE: &str = "arn:aws:states:us-east-1:123456789012:stateMachine:nightly-etl";

fn noisy_gatherer() -> EvidenceGatherer {
    let now = Utc::now();
    let events = (0..15)
        .map(|i| LogEvent {
            timestamp: now - Duration::minutes(10 + i),
            message: format!("ERROR task {} failed: connection refused", i),
        })
        .collect();
    let executions = (0..7)
        .map(|i| ExecutionSummary {
            execution_id: format!("{}:run-{}", STATE_MACHINE, i),
            status: "FAILED".to_string(),
            start_time: Some(now - Duration::hours(1)),
        })
        .collect();

    let catalog = InMemoryCatalog::new().with_pipeline(PipelineInfo {
        pipeline_name: "nightly-etl".to_string(),
        log_group: Some(LOG_GROUP.to_string()),
        log_filter_pattern: None,
        state_machine_arn: Some(STATE_MACHINE.to_string()),
    });

    EvidenceGatherer::new(
        Some(Arc::new(catalog)),
        Arc::new(InMemoryLogSearch::new().with_events(LOG_GROUP, events)),
        Arc::new(InMemoryExecutionHistory::new().with_executions(STATE_MACHINE, executions)),
    )
}

fn router_with(
    enhancer: Enhancer,
    conversations: Option<Arc<dyn ConversationStore>>,
) -> (Router, Arc<OpsAgent>) {
    let agent = Arc::new(OpsAgent::new(noisy_gatherer(), enhancer, conversations));
    (create_router(agent.clone()), agent)
}

async fn send(router: Router, method: Method, uri: &str, body: &str) -> (StatusCode, Value, axum::http::HeaderMap) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value, headers)
}

#[tokio::test]
async fn test_report_is_capped_and_persisted() {
    let store = Arc::new(InMemoryConversationStore::new());
    let (router, agent) = router_with(Enhancer::default(), Some(store.clone()));

    let (status, body, headers) = send(
        router,
        Method::POST,
        "/chat",
        r#"{"message": "why did it break?", "pipeline_name": "nightly-etl", "conversation_id": "conv-1"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["content-type"], "application/json");
    assert_eq!(headers["x-frame-options"], "DENY");

    let text = body["response"].as_str().unwrap();
    assert_eq!(text.lines().filter(|l| l.starts_with("- Log error at ")).count(), 10);
    assert_eq!(text.lines().filter(|l| l.starts_with("- Workflow failure: ")).count(), 5);
    assert!(text.contains(
        "- Found 10 log errors and 5 failed workflow executions in the last 24 hours."
    ));
    assert!(text.contains(&format!("- Review logs in log group: {}", LOG_GROUP)));

    let report = agent.analyze("nightly-etl", 24).await;
    assert_eq!(report.evidence.len(), 15);
    assert_eq!(format_report(&report).lines().count(), text.lines().count());

    let records = store.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].conversation_id, "conv-1");
    assert_eq!(records[0].user_message, "why did it break?");
    assert_eq!(records[0].agent_response, text);
}

#[tokio::test]
async fn test_pipeline_extracted_from_message() {
    let (router, _) = router_with(Enhancer::default(), None);

    let (status, body, _) = send(
        router,
        Method::POST,
        "/",
        r#"{"message": "Analyze pipeline nightly-etl please", "hours_back": 6}"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pipeline_name"], "nightly-etl");
    assert!(body["response"]
        .as_str()
        .unwrap()
        .contains("in the last 6 hours."));
    assert!(!body["conversation_id"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_usage_text_without_target() {
    let (router, _) = router_with(Enhancer::default(), None);

    let (status, body, _) = send(router, Method::POST, "/chat", r#"{"message": "hello there"}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], USAGE_MESSAGE);
    assert_eq!(body["pipeline_name"], "");
}

#[tokio::test]
async fn test_preflight_and_method_handling() {
    let (router, _) = router_with(Enhancer::default(), None);

    let (status, body, headers) = send(router.clone(), Method::OPTIONS, "/chat", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Null);
    assert_eq!(headers["access-control-max-age"], "300");
    assert!(headers.get("content-type").is_none());
    assert!(headers.get("x-frame-options").is_none());
    assert_eq!(
        headers["access-control-allow-headers"],
        "Content-Type, Authorization, X-Amz-Date, X-Api-Key"
    );

    let (status, _, headers) = send(router, Method::PUT, "/chat", "{}").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(headers["x-content-type-options"], "nosniff");
}

#[tokio::test]
async fn test_validation_errors_are_reported() {
    let (router, _) = router_with(Enhancer::default(), None);

    let cases = [
        ("{\"message\": ", "Invalid JSON format in request body"),
        (r#"{"hours_back": 500}"#, "hours_back must be between 1 and 168 (7 days)"),
        (r#"["not", "an", "object"]"#, "Request body must be a JSON object"),
    ];

    for (payload, expected) in cases {
        let (status, body, headers) = send(router.clone(), Method::POST, "/chat", payload).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "payload: {}", payload);
        assert_eq!(body["error"], expected);
        assert_eq!(headers["cache-control"], "no-store, no-cache, must-revalidate, private");
    }
}

#[tokio::test]
async fn test_unavailable_collaborators_still_answer() {
    let gatherer = EvidenceGatherer::new(
        Some(Arc::new(Unavailable::new("catalog"))),
        Arc::new(Unavailable::new("logs")),
        Arc::new(Unavailable::new("executions")),
    );
    let agent = Arc::new(OpsAgent::new(
        gatherer,
        Enhancer::default(),
        Some(Arc::new(Unavailable::new("conversations"))),
    ));

    let (status, body, _) = send(
        create_router(agent),
        Method::POST,
        "/chat",
        r#"{"pipeline_name": "nightly-etl"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["response"]
        .as_str()
        .unwrap()
        .starts_with("1) Summary\n- No errors found in the last 24 hours."));
}

#[tokio::test]
async fn test_openai_enhancement_through_router() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "1) Summary\n- Glue job is out of connections"}}],
            "usage": {"total_tokens": 42}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let primary: Arc<dyn TextGenerator> = Arc::new(OpenAiChatClient::new(&OpenAiSettings {
        api_key: "test-key".to_string(),
        api_url: format!("{}/v1/chat/completions", mock_server.uri()),
        model: "gpt-4o-mini".to_string(),
        timeout_secs: 5,
    }));
    let enhancer = Enhancer::new(EnhancerConfig { primary: Some(primary), secondary: None });
    let (router, _) = router_with(enhancer, None);

    let (status, body, _) = send(
        router,
        Method::POST,
        "/chat",
        r#"{"message": "what's wrong with nightly-etl?"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pipeline_name"], "nightly-etl");
    assert_eq!(body["response"], "1) Summary\n- Glue job is out of connections");
}

#[tokio::test]
async fn test_failed_enhancement_falls_back_to_report() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&mock_server)
        .await;

    let primary: Arc<dyn TextGenerator> = Arc::new(OpenAiChatClient::new(&OpenAiSettings {
        api_key: "test-key".to_string(),
        api_url: format!("{}/v1/chat/completions", mock_server.uri()),
        model: "gpt-4o-mini".to_string(),
        timeout_secs: 5,
    }));
    let enhancer = Enhancer::new(EnhancerConfig { primary: Some(primary), secondary: None });
    let (router, _) = router_with(enhancer, None);

    let (status, body, _) = send(
        router,
        Method::POST,
        "/chat",
        r#"{"pipeline_name": "nightly-etl"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["response"].as_str().unwrap().starts_with("1) Summary\n- Found 10 log errors"));
}

#[tokio::test]
async fn test_oversized_body_carries_security_headers() {
    let (router, _) = router_with(Enhancer::default(), None);
    let oversized = format!(r#"{{"message": "{}"}}"#, "x".repeat(2 * 1024 * 1024));

    let request = Request::builder()
        .method(Method::POST)
        .uri("/chat")
        .header("content-type", "application/json")
        .header("content-length", oversized.len())
        .body(Body::from(oversized))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let headers = response.headers().clone();
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["cache-control"], "no-store, no-cache, must-revalidate, private");
    assert_eq!(headers["content-type"], "application/json");

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "Payload Too Large");
}

#[tokio::test]
async fn test_routing_errors_carry_security_headers() {
    let (router, _) = router_with(Enhancer::default(), None);

    let (status, body, headers) = send(router.clone(), Method::POST, "/nowhere", "{}").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not Found");
    assert_eq!(headers["strict-transport-security"], "max-age=31536000; includeSubDomains");

    let (status, body, headers) = send(router.clone(), Method::POST, "/health", "{}").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["error"], "Method Not Allowed");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["content-type"], "application/json");

    let (status, _, headers) = send(router, Method::GET, "/health", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["x-xss-protection"], "1; mode=block");
}

#[tokio::test]
async fn test_health_reports_wiring() {
    let store: Arc<dyn ConversationStore> = Arc::new(InMemoryConversationStore::new());
    let (router, _) = router_with(Enhancer::default(), Some(store));

    let (status, body, _) = send(router, Method::GET, "/health", "").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["healthy"], true);
    assert_eq!(body["service_name"], "ops-agent");
    assert_eq!(body["enhancer_configured"], false);
    assert_eq!(body["conversation_store_configured"], true);
}
