//! ops-config-rs/lib.rs
//! Environment-driven configuration for the operations agent.
//! Provides bind address resolution and the optional backend settings.

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

/// Default port for the operations agent HTTP listener
pub const DEFAULT_PORT: u16 = 8080;

/// Service name used to derive `<NAME>_SERVICE_ADDR` / `<NAME>_SERVICE_PORT`
pub const SERVICE_NAME: &str = "OPS_AGENT";

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 60;

/// Load a `.env` file if one exists. Missing files are not an error.
pub fn load_dotenv() {
    if dotenv::dotenv().is_ok() {
        log::debug!("Loaded environment from .env");
    }
}

/// Get service port from environment variables with proper fallback
///
/// # Arguments
/// * `service_name` - The name of the service (e.g., "OPS_AGENT")
/// * `default_port` - The default port to use if not specified in environment
pub fn get_service_port(service_name: &str, default_port: u16) -> u16 {
    let var_name = format!("{}_SERVICE_PORT", service_name.to_uppercase());
    match env::var(&var_name) {
        Ok(value) => value.parse::<u16>().unwrap_or_else(|_| {
            log::warn!("Invalid port in {}, using default {}", var_name, default_port);
            default_port
        }),
        Err(_) => default_port,
    }
}

/// Create a SocketAddr for binding a service
///
/// `<NAME>_SERVICE_ADDR` wins when it parses, either as `host:port` or as
/// `http(s)://host:port`. Otherwise binds `0.0.0.0` on the resolved port.
pub fn get_bind_address(service_name: &str, default_port: u16) -> SocketAddr {
    let var_name = format!("{}_SERVICE_ADDR", service_name.to_uppercase());

    if let Ok(addr_str) = env::var(&var_name) {
        if let Some(addr) = parse_socket_addr(&addr_str) {
            return addr;
        }
        log::warn!("Invalid address format in {}, using default", var_name);
    }

    let port = get_service_port(service_name, default_port);
    SocketAddr::from(([0, 0, 0, 0], port))
}

fn parse_socket_addr(value: &str) -> Option<SocketAddr> {
    if let Ok(addr) = value.parse::<SocketAddr>() {
        return Some(addr);
    }
    value
        .split_once("://")
        .and_then(|(_, rest)| rest.trim_end_matches('/').parse::<SocketAddr>().ok())
}

/// Read an environment variable, treating unset and blank values alike
fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.trim().parse::<T>().unwrap_or_else(|_| {
            log::warn!("Invalid value in {}, using default", name);
            default
        }),
        Err(_) => default,
    }
}

/// Settings for the OpenAI-compatible primary text backend
#[derive(Debug, Clone, PartialEq)]
pub struct OpenAiSettings {
    pub api_key: String,
    pub api_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

/// Settings for the Bedrock secondary text backend
#[derive(Debug, Clone, PartialEq)]
pub struct BedrockSettings {
    pub model_id: String,
    pub region: String,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Log format selected by `LOG_FORMAT`; read before the rest of the
/// configuration so that configuration warnings are captured.
pub fn log_format_from_env() -> LogFormat {
    match non_empty_var("LOG_FORMAT").as_deref() {
        Some(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
        _ => LogFormat::Text,
    }
}

/// Full agent configuration
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub bind_address: SocketAddr,
    pub region: String,
    pub conversations_table: Option<String>,
    pub pipelines_table: Option<String>,
    pub openai: Option<OpenAiSettings>,
    pub bedrock: Option<BedrockSettings>,
    pub log_format: LogFormat,
}

impl AgentConfig {
    /// Build the configuration from the process environment.
    ///
    /// Reads:
    /// - DDB_CONVERSATIONS_TABLE / DDB_PIPELINES_TABLE: optional table names
    /// - DEFAULT_REGION: AWS region (default: us-east-1)
    /// - OPENAI_API_KEY, or the legacy OPEN_AI_AGENT: enables the primary backend
    /// - OPENAI_API_URL / OPENAI_MODEL / LLM_TIMEOUT_SECS: primary backend tuning
    /// - BEDROCK_MODEL_ID: enables the secondary backend
    /// - LOG_FORMAT: "json" for JSON log lines, anything else for text
    pub fn from_env() -> Self {
        let region = non_empty_var("DEFAULT_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string());

        let openai = non_empty_var("OPENAI_API_KEY")
            .or_else(|| non_empty_var("OPEN_AI_AGENT"))
            .map(|api_key| OpenAiSettings {
                api_key,
                api_url: non_empty_var("OPENAI_API_URL")
                    .unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string()),
                model: non_empty_var("OPENAI_MODEL")
                    .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
                timeout_secs: parse_var("LLM_TIMEOUT_SECS", DEFAULT_LLM_TIMEOUT_SECS),
            });

        let bedrock = non_empty_var("BEDROCK_MODEL_ID").map(|model_id| BedrockSettings {
            model_id,
            region: region.clone(),
        });

        Self {
            bind_address: get_bind_address(SERVICE_NAME, DEFAULT_PORT),
            region,
            conversations_table: non_empty_var("DDB_CONVERSATIONS_TABLE"),
            pipelines_table: non_empty_var("DDB_PIPELINES_TABLE"),
            openai,
            bedrock,
            log_format: log_format_from_env(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Each test uses its own variable names, so they can run in parallel.

    #[test]
    fn test_get_service_port() {
        std::env::set_var("PORTTEST_SERVICE_PORT", "9000");
        assert_eq!(get_service_port("PORTTEST", 8000), 9000);

        std::env::set_var("PORTTEST_SERVICE_PORT", "not-a-port");
        assert_eq!(get_service_port("PORTTEST", 8000), 8000);

        std::env::remove_var("UNKNOWN_SERVICE_PORT");
        assert_eq!(get_service_port("UNKNOWN", 8000), 8000);
    }

    #[test]
    fn test_get_bind_address() {
        std::env::set_var("BINDTEST_SERVICE_ADDR", "127.0.0.1:7000");
        assert_eq!(get_bind_address("BINDTEST", 8000), "127.0.0.1:7000".parse().unwrap());

        std::env::set_var("BINDTEST_SERVICE_ADDR", "http://127.0.0.1:7001");
        assert_eq!(get_bind_address("BINDTEST", 8000), "127.0.0.1:7001".parse().unwrap());

        std::env::set_var("BINDTEST_SERVICE_ADDR", "garbage");
        assert_eq!(get_bind_address("BINDTEST", 8000), "0.0.0.0:8000".parse().unwrap());
    }

    #[test]
    fn test_parse_var_falls_back() {
        std::env::set_var("PARSETEST_TIMEOUT", "abc");
        assert_eq!(parse_var("PARSETEST_TIMEOUT", 60u64), 60);
        std::env::set_var("PARSETEST_TIMEOUT", " 15 ");
        assert_eq!(parse_var("PARSETEST_TIMEOUT", 60u64), 15);
    }

    #[test]
    fn test_non_empty_var() {
        std::env::set_var("BLANKTEST_VAR", "   ");
        assert_eq!(non_empty_var("BLANKTEST_VAR"), None);
        std::env::set_var("BLANKTEST_VAR", " table ");
        assert_eq!(non_empty_var("BLANKTEST_VAR").as_deref(), Some("table"));
    }
}
