//! Request, catalog, evidence and report types shared across the agent.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Lookback window applied when the request does not carry `hours_back`
pub const DEFAULT_HOURS_BACK: u32 = 24;

/// Catalog record for a pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineInfo {
    pub pipeline_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_filter_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_machine_arn: Option<String>,
}

/// A single observed signal supporting a diagnosis
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EvidenceItem {
    LogError {
        timestamp: DateTime<Utc>,
        message: String,
    },
    WorkflowFailure {
        execution_id: String,
        status: String,
        start_time: Option<DateTime<Utc>>,
    },
}

impl EvidenceItem {
    pub fn is_log_error(&self) -> bool {
        matches!(self, EvidenceItem::LogError { .. })
    }

    pub fn is_workflow_failure(&self) -> bool {
        matches!(self, EvidenceItem::WorkflowFailure { .. })
    }
}

/// Structured diagnosis for one pipeline over one window
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub pipeline_name: String,
    pub time_range_hours: u32,
    pub summary: String,
    pub evidence: Vec<EvidenceItem>,
    pub probable_cause: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Append-only record of one exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationRecord {
    pub conversation_id: String,
    /// Creation time, epoch milliseconds
    pub timestamp: i64,
    pub user_message: String,
    pub agent_response: String,
    /// Expiry, epoch seconds
    pub expiry: i64,
}

impl ConversationRecord {
    /// Days a conversation is retained before the store may expire it
    pub const RETENTION_DAYS: i64 = 30;

    pub fn new(
        conversation_id: impl Into<String>,
        user_message: impl Into<String>,
        agent_response: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let expiry = now + chrono::Duration::days(Self::RETENTION_DAYS);
        Self {
            conversation_id: conversation_id.into(),
            timestamp: now.timestamp_millis(),
            user_message: user_message.into(),
            agent_response: agent_response.into(),
            expiry: expiry.timestamp(),
        }
    }
}

/// Validated request fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub message: String,
    pub conversation_id: String,
    pub pipeline_name: String,
    pub hours_back: u32,
}

/// Successful response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub conversation_id: String,
    pub response: String,
    pub pipeline_name: String,
}

/// Error response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// RFC 3339 UTC with second precision, used wherever evidence is rendered
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Keep at most `max` characters of `text`
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
