//! Optional language-model pass over the deterministic report.
//!
//! The primary backend is always tried first. The secondary backend is only
//! consulted when the primary is absent or fails. When neither yields text,
//! the deterministic report is returned unchanged.

use std::sync::Arc;

use crate::llm_client::{GenerationRequest, TextGenerator};

/// Persona and output structure for the primary backend
pub const SYSTEM_PROMPT: &str = "You are an AWS Operations Support Agent specialized in data platforms, SQL pipelines, and cloud workflows.

Your role is to help engineers understand operational state and troubleshoot issues.

Be concise, technical, and objective. Base conclusions only on provided evidence.
If information is missing, ask for minimum required detail (pipeline name, time range, environment).

Always structure your response as:
1) Summary - One or two sentences describing the current situation
2) Evidence - Bullet points with concrete signals (errors, timestamps, execution status)
3) Probable cause - Hypothesis based strictly on the evidence
4) Recommended next steps - Clear, actionable steps

Write in the same language as the user.";

/// Context sent with free-form questions when no pipeline was resolved
pub const GENERAL_CONTEXT: &str = "You are an AWS Operations Agent. Help the user analyze pipelines, check logs, and troubleshoot issues.";

/// Returned when no pipeline could be resolved and no backend answered
pub const USAGE_MESSAGE: &str = r#"Please provide a pipeline name to analyze. Usage: {"message": "analyze pipeline <name>", "pipeline_name": "<name>"}"#;

/// Backends in priority order
#[derive(Clone, Default)]
pub struct EnhancerConfig {
    pub primary: Option<Arc<dyn TextGenerator>>,
    pub secondary: Option<Arc<dyn TextGenerator>>,
}

#[derive(Clone, Default)]
pub struct Enhancer {
    config: EnhancerConfig,
}

fn primary_prompt(context: &str, question: &str) -> String {
    format!("Context: {}\n\nUser question: {}", context, question)
}

impl Enhancer {
    pub fn new(config: EnhancerConfig) -> Self {
        Self { config }
    }

    pub fn is_configured(&self) -> bool {
        self.config.primary.is_some() || self.config.secondary.is_some()
    }

    async fn call(backend: &dyn TextGenerator, request: &GenerationRequest) -> Option<String> {
        match backend.generate(request).await {
            Ok(text) if !text.trim().is_empty() => Some(text),
            Ok(_) => {
                tracing::warn!("Backend {} returned an empty response", backend.name());
                None
            }
            Err(err) => {
                tracing::error!("Error invoking {}: {}", backend.name(), err);
                None
            }
        }
    }

    /// Rephrase a formatted report. `message` is the user's original text.
    pub async fn enhance_report(&self, message: &str, report_text: &str) -> String {
        if let Some(primary) = &self.config.primary {
            let question = if message.is_empty() {
                format!("Analyze this pipeline report: {}", report_text)
            } else {
                message.to_string()
            };
            let request = GenerationRequest::new(primary_prompt(report_text, &question))
                .with_system(SYSTEM_PROMPT);
            if let Some(text) = Self::call(primary.as_ref(), &request).await {
                return text;
            }
        }

        if let Some(secondary) = &self.config.secondary {
            let request =
                GenerationRequest::new(format!("Enhance this technical analysis: {}", report_text));
            if let Some(text) = Self::call(secondary.as_ref(), &request).await {
                return text;
            }
        }

        report_text.to_string()
    }

    /// Answer a message that did not name a pipeline
    pub async fn answer_without_target(&self, message: &str) -> String {
        if message.is_empty() {
            return USAGE_MESSAGE.to_string();
        }
        if let Some(primary) = &self.config.primary {
            let request = GenerationRequest::new(primary_prompt(GENERAL_CONTEXT, message))
                .with_system(SYSTEM_PROMPT);
            if let Some(text) = Self::call(primary.as_ref(), &request).await {
                return text;
            }
        }
        USAGE_MESSAGE.to_string()
    }
}
