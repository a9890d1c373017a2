//! # Structured Logging
//!
//! Installs the global `tracing` subscriber. `RUST_LOG` overrides the default
//! `info` filter; `LOG_FORMAT=json` switches to one JSON object per line.

use ops_config::LogFormat;
use tracing_subscriber::EnvFilter;

/// Initializes logging. Calling it twice is harmless.
pub fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = match format {
        LogFormat::Json => builder.json().with_current_span(false).try_init(),
        LogFormat::Text => builder.try_init(),
    };

    if let Err(err) = result {
        tracing::debug!("Logging already initialized: {}", err);
    }
}
