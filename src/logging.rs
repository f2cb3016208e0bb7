//! Tracing subscriber setup.
//!
//! Filter precedence (highest wins): `SHELLGATE_LOG`, `RUST_LOG`, the
//! `[logging] filter` config key, then `info`. Output goes to stderr so it
//! never mixes with a command's captured stdout.

use crate::config::LoggingConfig;
use crate::error::ConfigError;
use tracing_subscriber::EnvFilter;

/// Crate-specific filter override.
pub const LOG_ENV_VAR: &str = "SHELLGATE_LOG";

const FALLBACK_FILTER: &str = "info";

/// Pick the filter directive string from env and config.
pub fn resolve_filter(
    config: &LoggingConfig,
    env_lookup: impl Fn(&str) -> Option<String>,
) -> String {
    [LOG_ENV_VAR, "RUST_LOG"]
        .into_iter()
        .filter_map(&env_lookup)
        .chain(std::iter::once(config.filter.clone()))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .unwrap_or_else(|| FALLBACK_FILTER.to_string())
}

/// Parse a directive string into an [`EnvFilter`].
pub fn build_filter(directives: &str) -> Result<EnvFilter, ConfigError> {
    EnvFilter::try_new(directives)
        .map_err(|e| ConfigError::Invalid(format!("logging filter `{directives}`: {e}")))
}

/// Install the global subscriber. A second call is a no-op.
pub fn init_logging(config: &LoggingConfig) -> Result<(), ConfigError> {
    let directives = resolve_filter(config, |key| std::env::var(key).ok());
    let filter = build_filter(&directives)?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
    Ok(())
}
