//! In-memory collaborators for tests and local runs.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{
    ConversationStore, ExecutionHistory, ExecutionStatus, ExecutionSummary, LogEvent, LogQuery,
    LogSearch, PipelineCatalog, Result, ServiceError,
};
use crate::models::{ConversationRecord, PipelineInfo};

/// Catalog backed by a map of pipeline name to record
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    pipelines: HashMap<String, PipelineInfo>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pipeline(mut self, info: PipelineInfo) -> Self {
        self.pipelines.insert(info.pipeline_name.clone(), info);
        self
    }
}

#[async_trait]
impl PipelineCatalog for InMemoryCatalog {
    async fn get_pipeline(&self, pipeline_name: &str) -> Result<Option<PipelineInfo>> {
        Ok(self.pipelines.get(pipeline_name).cloned())
    }
}

/// Log search over a fixed set of events per log group.
/// Queries are recorded so tests can inspect the window and pattern used.
#[derive(Debug, Default)]
pub struct InMemoryLogSearch {
    events: HashMap<String, Vec<LogEvent>>,
    queries: Mutex<Vec<LogQuery>>,
}

impl InMemoryLogSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(mut self, log_group: impl Into<String>, events: Vec<LogEvent>) -> Self {
        self.events.insert(log_group.into(), events);
        self
    }

    pub fn queries(&self) -> Vec<LogQuery> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LogSearch for InMemoryLogSearch {
    async fn search(&self, query: &LogQuery) -> Result<Vec<LogEvent>> {
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(query.clone());
        }
        match self.events.get(&query.log_group) {
            Some(events) => Ok(events
                .iter()
                .filter(|e| e.timestamp >= query.start && e.timestamp <= query.end)
                .cloned()
                .collect()),
            None => Err(ServiceError::not_found(
                "logs",
                format!("log group {} does not exist", query.log_group),
            )),
        }
    }
}

/// Execution history keyed by state machine ARN
#[derive(Debug, Default)]
pub struct InMemoryExecutionHistory {
    executions: HashMap<String, Vec<ExecutionSummary>>,
}

impl InMemoryExecutionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_executions(
        mut self,
        state_machine_arn: impl Into<String>,
        executions: Vec<ExecutionSummary>,
    ) -> Self {
        self.executions.insert(state_machine_arn.into(), executions);
        self
    }
}

#[async_trait]
impl ExecutionHistory for InMemoryExecutionHistory {
    async fn list_executions(
        &self,
        state_machine_arn: &str,
        status_filter: ExecutionStatus,
        limit: usize,
    ) -> Result<Vec<ExecutionSummary>> {
        let executions = self.executions.get(state_machine_arn).ok_or_else(|| {
            ServiceError::not_found("executions", format!("state machine {} does not exist", state_machine_arn))
        })?;
        Ok(executions
            .iter()
            .filter(|e| e.status == status_filter.as_str())
            .take(limit)
            .cloned()
            .collect())
    }
}

/// Conversation store that keeps every appended record
#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    records: Mutex<Vec<ConversationRecord>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<ConversationRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn append(&self, record: &ConversationRecord) -> Result<()> {
        self.records
            .lock()
            .map_err(|_| ServiceError::backend("conversations", "store lock poisoned"))?
            .push(record.clone());
        Ok(())
    }
}

/// Collaborator whose every call fails; exercises fail-soft paths
#[derive(Debug, Clone)]
pub struct Unavailable {
    pub service: &'static str,
}

impl Unavailable {
    pub fn new(service: &'static str) -> Self {
        Self { service }
    }

    fn error(&self) -> ServiceError {
        ServiceError::backend(self.service, "service unavailable")
    }
}

#[async_trait]
impl PipelineCatalog for Unavailable {
    async fn get_pipeline(&self, _pipeline_name: &str) -> Result<Option<PipelineInfo>> {
        Err(self.error())
    }
}

#[async_trait]
impl LogSearch for Unavailable {
    async fn search(&self, _query: &LogQuery) -> Result<Vec<LogEvent>> {
        Err(self.error())
    }
}

#[async_trait]
impl ExecutionHistory for Unavailable {
    async fn list_executions(
        &self,
        _state_machine_arn: &str,
        _status_filter: ExecutionStatus,
        _limit: usize,
    ) -> Result<Vec<ExecutionSummary>> {
        Err(self.error())
    }
}

#[async_trait]
impl ConversationStore for Unavailable {
    async fn append(&self, _record: &ConversationRecord) -> Result<()> {
        Err(self.error())
    }
}
