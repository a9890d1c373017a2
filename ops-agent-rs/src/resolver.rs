//! Target-name resolution from free text.
//!
//! This is a best-effort heuristic, not a parser: an ordered list of rules is
//! tried against the lower-cased message and the first rule that matches
//! wins. Ambiguous or novel phrasings legitimately resolve to nothing.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::validation::{is_valid_pipeline_name, MAX_PIPELINE_NAME_CHARS};

const EDGE_PUNCTUATION: &[char] = &['.', ',', '!', '?', ';', ':'];

/// One extraction rule; capture group 1 holds the candidate text
pub struct ExtractionRule {
    pub name: &'static str,
    pattern: Regex,
}

impl ExtractionRule {
    fn new(name: &'static str, pattern: &str) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).expect("static pattern"),
        }
    }

    fn capture<'a>(&self, text: &'a str) -> Option<&'a str> {
        self.pattern
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }
}

/// Evaluated in order, first match wins
pub static EXTRACTION_RULES: Lazy<Vec<ExtractionRule>> = Lazy::new(|| {
    vec![
        // "analyze pipeline <name>", "what is failing in pipeline <name>"
        ExtractionRule::new(
            "verb_then_pipeline",
            r"\b(?:analyze|check|show|get|find|what|how)\b.*?pipeline\s+(\S+(?:\s+\S+)*)",
        ),
        // "pipeline <name>"
        ExtractionRule::new("pipeline_keyword", r"pipeline\s+(\S+(?:\s+\S+)*)"),
        // "logs for <name>", "errors in <name>", "status of <name>"
        ExtractionRule::new(
            "signal_for_target",
            r"\b(?:logs|errors|status)\b.*?\b(?:for|in|of)\s+(\S+(?:\s+\S+)*)",
        ),
        // "check <name>", "what's wrong with <name>", "how is <name>"
        ExtractionRule::new(
            "verb_then_token",
            r"\b(?:analyze|check|show|get|find|what|how|explain)(?:'s|’s|\s+is|\s+are)?\s+(?:(?:wrong|going\s+on|up|happening)\s+(?:with|in|to)\s+)?([a-z0-9_\-./:]+)",
        ),
    ]
});

/// Find the raw candidate text and the rule that produced it
pub fn match_candidate(message: &str) -> Option<(&'static str, String)> {
    let lowered = message.to_lowercase();
    EXTRACTION_RULES.iter().find_map(|rule| {
        rule.capture(&lowered)
            .map(|text| (rule.name, text.trim().to_string()))
    })
}

/// Reduce the candidate to its first token, trimmed of edge punctuation.
/// A hyphenated first token (e.g. `nightly-etl`) stays whole.
pub fn first_token(candidate: &str) -> String {
    let trimmed = candidate.trim().trim_matches(EDGE_PUNCTUATION);
    let token = trimmed.split_whitespace().next().unwrap_or_default();
    token.trim_matches(EDGE_PUNCTUATION).to_string()
}

/// Sanitize and validate an extracted pipeline name
pub fn sanitize_pipeline_name(name: &str) -> Option<String> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    if name.chars().count() > MAX_PIPELINE_NAME_CHARS {
        tracing::warn!("Pipeline name too long: {} chars", name.chars().count());
        return None;
    }

    if !is_valid_pipeline_name(name) {
        tracing::warn!("Invalid characters in extracted pipeline name: {}", name);
        return None;
    }

    Some(name.to_string())
}

/// Try to extract a pipeline name from a chat message
pub fn extract_pipeline_name(message: &str) -> Option<String> {
    tracing::info!("Attempting to extract pipeline name from message: {}", message);

    let Some((rule, candidate)) = match_candidate(message) else {
        tracing::warn!("Could not extract pipeline name from message: {}", message);
        return None;
    };

    let token = first_token(&candidate);
    match sanitize_pipeline_name(&token) {
        Some(name) => {
            tracing::info!(rule, "Extracted pipeline name: {}", name);
            Some(name)
        }
        None => {
            tracing::warn!(rule, "Failed to sanitize extracted pipeline name: {}", token);
            None
        }
    }
}

/// Use the explicit name when given, otherwise fall back to extraction
pub fn resolve_pipeline_name(explicit: &str, message: &str) -> Option<String> {
    if !explicit.is_empty() {
        return Some(explicit.to_string());
    }
    if message.is_empty() {
        return None;
    }
    extract_pipeline_name(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verb_then_pipeline() {
        assert_eq!(extract_pipeline_name("analyze pipeline nightly-etl").as_deref(), Some("nightly-etl"));
        assert_eq!(
            extract_pipeline_name("Can you check the pipeline Orders_Daily for me?").as_deref(),
            Some("orders_daily")
        );
        assert_eq!(match_candidate("analyze pipeline nightly-etl").map(|(r, _)| r), Some("verb_then_pipeline"));
    }

    #[test]
    fn test_pipeline_keyword_alone() {
        assert_eq!(extract_pipeline_name("pipeline billing.sync is slow").as_deref(), Some("billing.sync"));
        assert_eq!(match_candidate("pipeline x").map(|(r, _)| r), Some("pipeline_keyword"));
    }

    #[test]
    fn test_signal_for_target() {
        assert_eq!(extract_pipeline_name("show me the logs for ingest-raw").as_deref(), Some("ingest-raw"));
        assert_eq!(extract_pipeline_name("any errors in payments?").as_deref(), Some("payments"));
    }

    #[test]
    fn test_verb_then_token() {
        assert_eq!(extract_pipeline_name("what's wrong with billing-sync").as_deref(), Some("billing-sync"));
        assert_eq!(extract_pipeline_name("check orders-v2!").as_deref(), Some("orders-v2"));
        assert_eq!(match_candidate("what's wrong with billing-sync").map(|(r, _)| r), Some("verb_then_token"));
    }

    #[test]
    fn test_first_match_wins() {
        // both rule 1 and rule 4 could apply; rule 1 is tried first
        let (rule, candidate) = match_candidate("check pipeline alpha then check beta").unwrap();
        assert_eq!(rule, "verb_then_pipeline");
        assert_eq!(first_token(&candidate), "alpha");
    }

    #[test]
    fn test_no_recognizable_pattern() {
        assert_eq!(extract_pipeline_name("hello there"), None);
        assert_eq!(extract_pipeline_name(""), None);
    }

    #[test]
    fn test_first_token_trims_punctuation() {
        assert_eq!(first_token("nightly-etl, please"), "nightly-etl");
        assert_eq!(first_token("etl."), "etl");
        assert_eq!(first_token("  ?!  "), "");
    }

    #[test]
    fn test_sanitize_rejects_bad_candidates() {
        assert_eq!(sanitize_pipeline_name(""), None);
        assert_eq!(sanitize_pipeline_name("a#b"), None);
        assert_eq!(sanitize_pipeline_name(&"a".repeat(101)), None);
        assert_eq!(sanitize_pipeline_name(" ok "), Some("ok".to_string()));
    }

    #[test]
    fn test_resolve_prefers_explicit_name() {
        assert_eq!(resolve_pipeline_name("given", "analyze pipeline other").as_deref(), Some("given"));
        assert_eq!(resolve_pipeline_name("", "analyze pipeline other").as_deref(), Some("other"));
        assert_eq!(resolve_pipeline_name("", ""), None);
    }
}
