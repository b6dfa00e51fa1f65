use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::ParseError;

use crate::config::TelemetryConfig;

/// Level applied to dependencies (hyper, axum) when only a bare level is
/// configured for this crate.
const DEPENDENCY_LEVEL: &str = "warn";

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid CARCOST_LOG_LEVEL '{value}'")]
    LogLevel { value: String, source: ParseError },
    #[error("could not install log subscriber: {0}")]
    Subscriber(Box<dyn std::error::Error + Send + Sync>),
}

/// Installs the global subscriber on stderr, keeping stdout for command
/// output. `RUST_LOG` wins over the configured level.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => configured_filter(&config.log_level)?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(TelemetryError::Subscriber)
}

fn configured_filter(level: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(filter_directives(level)).map_err(|source| TelemetryError::LogLevel {
        value: level.to_string(),
        source,
    })
}

/// A bare level such as `debug` scopes to this crate; full directive lists
/// (`carcost=debug,tower_http=info`) pass through untouched.
fn filter_directives(level: &str) -> String {
    let level = level.trim();
    if level.contains('=') || level.contains(',') {
        level.to_string()
    } else {
        format!("{DEPENDENCY_LEVEL},carcost={level}")
    }
}
