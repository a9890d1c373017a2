// ops-agent-rs/src/main.rs
// Operations Agent - HTTP entry point
// Port 8080 by default, see OPS_AGENT_SERVICE_ADDR / OPS_AGENT_SERVICE_PORT

use std::sync::Arc;

use ops_agent::logging::init_logging;
use ops_agent::{build_agent, create_router};
use ops_config::{load_dotenv, log_format_from_env, AgentConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file before anything reads the environment
    load_dotenv();
    init_logging(log_format_from_env());

    let config = AgentConfig::from_env();
    tracing::info!("Using AWS region: {}", config.region);

    let agent = Arc::new(build_agent(&config).await);
    let app = create_router(agent);

    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    tracing::info!("Operations agent listening on {}", config.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
