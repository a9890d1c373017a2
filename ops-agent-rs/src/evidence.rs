//! Evidence gathering for one pipeline over one window.
//!
//! Every dependency failure is logged and folded into an empty result here,
//! so the synthesizer only ever sees plain data.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::models::{truncate_chars, EvidenceItem, PipelineInfo};
use crate::services::{
    ExecutionHistory, ExecutionStatus, LogQuery, LogSearch, PipelineCatalog,
};

/// Filter used when the catalog does not carry one
pub const DEFAULT_LOG_FILTER_PATTERN: &str = r#"ERROR Exception "error" "failed" "failure""#;

pub const MAX_LOG_EVIDENCE: usize = 10;
pub const MAX_WORKFLOW_EVIDENCE: usize = 5;
pub const MAX_LOG_MESSAGE_CHARS: usize = 500;

/// What was found for a pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatheredEvidence {
    /// Catalog record, when the pipeline is known
    pub pipeline: Option<PipelineInfo>,
    /// Log errors first, then workflow failures
    pub items: Vec<EvidenceItem>,
}

impl GatheredEvidence {
    pub fn log_group(&self) -> Option<&str> {
        self.pipeline.as_ref().and_then(|p| p.log_group.as_deref())
    }
}

/// Collects evidence from the catalog, log search and execution history
#[derive(Clone)]
pub struct EvidenceGatherer {
    catalog: Option<Arc<dyn PipelineCatalog>>,
    logs: Arc<dyn LogSearch>,
    executions: Arc<dyn ExecutionHistory>,
}

impl EvidenceGatherer {
    pub fn new(
        catalog: Option<Arc<dyn PipelineCatalog>>,
        logs: Arc<dyn LogSearch>,
        executions: Arc<dyn ExecutionHistory>,
    ) -> Self {
        Self { catalog, logs, executions }
    }

    /// Gather evidence ending now
    pub async fn gather(&self, pipeline_name: &str, hours_back: u32) -> GatheredEvidence {
        self.gather_at(pipeline_name, hours_back, Utc::now()).await
    }

    /// Gather evidence for the window `[now - hours_back, now]`
    pub async fn gather_at(
        &self,
        pipeline_name: &str,
        hours_back: u32,
        now: DateTime<Utc>,
    ) -> GatheredEvidence {
        let Some(pipeline) = self.lookup(pipeline_name).await else {
            tracing::info!("No catalog metadata for pipeline {}", pipeline_name);
            return GatheredEvidence::default();
        };

        let mut items = Vec::new();

        if let Some(log_group) = pipeline.log_group.as_deref() {
            let filter_pattern = pipeline
                .log_filter_pattern
                .clone()
                .unwrap_or_else(|| DEFAULT_LOG_FILTER_PATTERN.to_string());
            let query = LogQuery {
                log_group: log_group.to_string(),
                start: now - Duration::hours(i64::from(hours_back)),
                end: now,
                filter_pattern,
                limit: MAX_LOG_EVIDENCE,
            };
            items.extend(self.log_errors(&query).await);
        }

        if let Some(arn) = pipeline.state_machine_arn.as_deref() {
            items.extend(self.workflow_failures(arn).await);
        }

        tracing::debug!(
            pipeline = pipeline_name,
            evidence = items.len(),
            "Evidence gathered"
        );

        GatheredEvidence { pipeline: Some(pipeline), items }
    }

    async fn lookup(&self, pipeline_name: &str) -> Option<PipelineInfo> {
        let catalog = self.catalog.as_ref()?;
        match catalog.get_pipeline(pipeline_name).await {
            Ok(info) => info,
            Err(err) => {
                tracing::error!("Error getting pipeline info: {}", err);
                None
            }
        }
    }

    async fn log_errors(&self, query: &LogQuery) -> Vec<EvidenceItem> {
        match self.logs.search(query).await {
            Ok(events) => events
                .into_iter()
                .take(MAX_LOG_EVIDENCE)
                .map(|event| EvidenceItem::LogError {
                    timestamp: event.timestamp,
                    message: truncate_chars(&event.message, MAX_LOG_MESSAGE_CHARS),
                })
                .collect(),
            Err(err) => {
                tracing::error!("Error searching logs: {}", err);
                Vec::new()
            }
        }
    }

    async fn workflow_failures(&self, state_machine_arn: &str) -> Vec<EvidenceItem> {
        match self
            .executions
            .list_executions(state_machine_arn, ExecutionStatus::Failed, MAX_WORKFLOW_EVIDENCE)
            .await
        {
            Ok(executions) => executions
                .into_iter()
                .take(MAX_WORKFLOW_EVIDENCE)
                .map(|execution| EvidenceItem::WorkflowFailure {
                    execution_id: execution.execution_id,
                    status: execution.status,
                    start_time: execution.start_time,
                })
                .collect(),
            Err(err) => {
                tracing::error!("Error listing executions: {}", err);
                Vec::new()
            }
        }
    }
}
