//! AWS-backed collaborators
//!
//! - DynamoDB: pipeline catalog and conversation history
//! - CloudWatch Logs: error search over a log group
//! - Step Functions: failed execution listing

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_cloudwatchlogs::error::DisplayErrorContext as LogsErrorContext;
use aws_sdk_dynamodb::error::DisplayErrorContext as DynamoErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_sfn::error::DisplayErrorContext as SfnErrorContext;
use chrono::{DateTime, TimeZone, Utc};

use super::{
    ConversationStore, ExecutionHistory, ExecutionStatus, ExecutionSummary, LogEvent, LogQuery,
    LogSearch, PipelineCatalog, Result, ServiceError,
};
use crate::models::{ConversationRecord, PipelineInfo};

/// Load the shared SDK configuration for a region
pub async fn load_sdk_config(region: &str) -> aws_config::SdkConfig {
    aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(region.to_string()))
        .load()
        .await
}

fn string_attr(item: &HashMap<String, AttributeValue>, key: &str) -> Option<String> {
    item.get(key)
        .and_then(|v| v.as_s().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Catalog item to `PipelineInfo`. A stored empty filter pattern means
/// "search without a filter" and is kept, unlike the other blank attributes.
fn pipeline_from_item(pipeline_name: &str, item: &HashMap<String, AttributeValue>) -> PipelineInfo {
    PipelineInfo {
        pipeline_name: string_attr(item, "pipeline_name").unwrap_or_else(|| pipeline_name.to_string()),
        log_group: string_attr(item, "log_group"),
        log_filter_pattern: item
            .get("log_filter_pattern")
            .and_then(|v| v.as_s().ok())
            .map(|s| s.trim().to_string()),
        state_machine_arn: string_attr(item, "state_machine_arn"),
    }
}

/// Pipeline catalog stored in a DynamoDB table keyed by `pipeline_name`
#[derive(Debug, Clone)]
pub struct DynamoPipelineCatalog {
    client: aws_sdk_dynamodb::Client,
    table: String,
}

impl DynamoPipelineCatalog {
    pub fn new(client: aws_sdk_dynamodb::Client, table: impl Into<String>) -> Self {
        Self { client, table: table.into() }
    }
}

#[async_trait]
impl PipelineCatalog for DynamoPipelineCatalog {
    async fn get_pipeline(&self, pipeline_name: &str) -> Result<Option<PipelineInfo>> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table)
            .key("pipeline_name", AttributeValue::S(pipeline_name.to_string()))
            .send()
            .await
            .map_err(|e| ServiceError::backend("catalog", DynamoErrorContext(&e).to_string()))?;

        Ok(output.item().map(|item| pipeline_from_item(pipeline_name, item)))
    }
}

/// Conversation history in a DynamoDB table with a `ttl` expiry attribute
#[derive(Debug, Clone)]
pub struct DynamoConversationStore {
    client: aws_sdk_dynamodb::Client,
    table: String,
}

impl DynamoConversationStore {
    pub fn new(client: aws_sdk_dynamodb::Client, table: impl Into<String>) -> Self {
        Self { client, table: table.into() }
    }
}

#[async_trait]
impl ConversationStore for DynamoConversationStore {
    async fn append(&self, record: &ConversationRecord) -> Result<()> {
        self.client
            .put_item()
            .table_name(&self.table)
            .item("conversation_id", AttributeValue::S(record.conversation_id.clone()))
            .item("timestamp", AttributeValue::N(record.timestamp.to_string()))
            .item("user_message", AttributeValue::S(record.user_message.clone()))
            .item("agent_response", AttributeValue::S(record.agent_response.clone()))
            .item("ttl", AttributeValue::N(record.expiry.to_string()))
            .send()
            .await
            .map_err(|e| ServiceError::backend("conversations", DynamoErrorContext(&e).to_string()))?;
        Ok(())
    }
}

/// CloudWatch Logs `FilterLogEvents` search
#[derive(Debug, Clone)]
pub struct CloudWatchLogSearch {
    client: aws_sdk_cloudwatchlogs::Client,
}

impl CloudWatchLogSearch {
    pub fn new(client: aws_sdk_cloudwatchlogs::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LogSearch for CloudWatchLogSearch {
    async fn search(&self, query: &LogQuery) -> Result<Vec<LogEvent>> {
        let limit = i32::try_from(query.limit).unwrap_or(i32::MAX);
        let mut request = self
            .client
            .filter_log_events()
            .log_group_name(&query.log_group)
            .start_time(query.start.timestamp_millis())
            .end_time(query.end.timestamp_millis())
            .limit(limit);
        if !query.filter_pattern.is_empty() {
            request = request.filter_pattern(&query.filter_pattern);
        }

        let output = request
            .send()
            .await
            .map_err(|e| ServiceError::backend("logs", LogsErrorContext(&e).to_string()))?;

        Ok(output
            .events()
            .iter()
            .filter_map(|event| {
                let timestamp = Utc.timestamp_millis_opt(event.timestamp()?).single()?;
                Some(LogEvent {
                    timestamp,
                    message: event.message().unwrap_or_default().to_string(),
                })
            })
            .collect())
    }
}

/// Step Functions `ListExecutions` lookup
#[derive(Debug, Clone)]
pub struct StepFunctionsHistory {
    client: aws_sdk_sfn::Client,
}

impl StepFunctionsHistory {
    pub fn new(client: aws_sdk_sfn::Client) -> Self {
        Self { client }
    }
}

fn sfn_status(status: ExecutionStatus) -> aws_sdk_sfn::types::ExecutionStatus {
    use aws_sdk_sfn::types::ExecutionStatus as Sfn;
    match status {
        ExecutionStatus::Failed => Sfn::Failed,
    }
}

fn to_chrono(ts: &aws_sdk_sfn::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(ts.secs(), ts.subsec_nanos())
}

#[async_trait]
impl ExecutionHistory for StepFunctionsHistory {
    async fn list_executions(
        &self,
        state_machine_arn: &str,
        status_filter: ExecutionStatus,
        limit: usize,
    ) -> Result<Vec<ExecutionSummary>> {
        let max_results = i32::try_from(limit).unwrap_or(i32::MAX);
        let output = self
            .client
            .list_executions()
            .state_machine_arn(state_machine_arn)
            .status_filter(sfn_status(status_filter))
            .max_results(max_results)
            .send()
            .await
            .map_err(|e| ServiceError::backend("executions", SfnErrorContext(&e).to_string()))?;

        Ok(output
            .executions()
            .iter()
            .map(|execution| ExecutionSummary {
                execution_id: execution.execution_arn().to_string(),
                status: execution.status().as_str().to_string(),
                start_time: to_chrono(execution.start_date()),
            })
            .collect())
    }
}
