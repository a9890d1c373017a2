//! External collaborators of the agent
//!
//! Each monitoring or storage backend is reached through one of the traits
//! below. Production adapters live in [`aws`], in-memory ones in [`memory`].
//! Adapters return `ServiceError`; callers decide whether a failure is
//! absorbed or surfaced.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{ConversationRecord, PipelineInfo};

pub mod aws;
pub mod memory;

/// Result type for collaborator calls
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Failure of an external dependency
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Transport or SDK level failure
    #[error("Backend error ({service}): {message}")]
    Backend { service: &'static str, message: String },

    /// Requested resource does not exist
    #[error("Not found ({service}): {message}")]
    NotFound { service: &'static str, message: String },
}

impl ServiceError {
    pub fn backend(service: &'static str, message: impl Into<String>) -> Self {
        ServiceError::Backend { service, message: message.into() }
    }

    pub fn not_found(service: &'static str, message: impl Into<String>) -> Self {
        ServiceError::NotFound { service, message: message.into() }
    }
}

/// Parameters for a log search over one window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
    pub log_group: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub filter_pattern: String,
    pub limit: usize,
}

/// A matching log line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

/// Execution status filter for workflow lookups; diagnosis only asks for failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Failed => "FAILED",
        }
    }
}

/// One workflow execution as listed by the execution backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionSummary {
    pub execution_id: String,
    pub status: String,
    pub start_time: Option<DateTime<Utc>>,
}

/// Pipeline metadata catalog
#[async_trait]
pub trait PipelineCatalog: Send + Sync {
    async fn get_pipeline(&self, pipeline_name: &str) -> Result<Option<PipelineInfo>>;
}

/// Log search backend
#[async_trait]
pub trait LogSearch: Send + Sync {
    async fn search(&self, query: &LogQuery) -> Result<Vec<LogEvent>>;
}

/// Workflow execution status backend
#[async_trait]
pub trait ExecutionHistory: Send + Sync {
    /// Most recent executions first
    async fn list_executions(
        &self,
        state_machine_arn: &str,
        status_filter: ExecutionStatus,
        limit: usize,
    ) -> Result<Vec<ExecutionSummary>>;
}

/// Append-only conversation persistence
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn append(&self, record: &ConversationRecord) -> Result<()>;
}
