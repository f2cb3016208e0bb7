//! Configuration data model.
//!
//! Struct/enum definitions plus default values. Source resolution and env
//! overrides stay in `config::mod`.

use serde::Deserialize;
use std::time::Duration;

use super::defaults::{
    owned_names, DEFAULT_APPROVAL_MODE, DEFAULT_CONTINUATION_TTL_SECS, DEFAULT_DANGEROUS_COMMANDS,
    DEFAULT_KNOWN_SAFE_COMMANDS, DEFAULT_LOG_FILTER, DEFAULT_SHELL, DEFAULT_SWEEP_INTERVAL_SECS,
    DEFAULT_TIMEOUT_MS,
};
use crate::approval::ApprovalMode;

/// Top-level runtime configuration.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Command classification and execution settings.
    pub bash_helper: BashHelperConfig,
    /// Pause/resume bookkeeping.
    pub continuation: ContinuationConfig,
    pub logging: LoggingConfig,
}

/// Settings under `[bash_helper]`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct BashHelperConfig {
    /// Base command names that never need approval.
    pub known_safe_commands: Vec<String>,
    /// Base command names that always need approval under `on_request`.
    pub dangerous_commands: Vec<String>,
    /// Subprocess timeout in milliseconds.
    pub default_timeout: u64,
    pub default_approval_mode: ApprovalMode,
    /// Whether "approve for session" grants are remembered.
    pub session_approvals: bool,
    /// Shell binary invoked as `<shell> -c <command>`.
    pub shell: String,
}

impl Default for BashHelperConfig {
    fn default() -> Self {
        Self {
            known_safe_commands: owned_names(DEFAULT_KNOWN_SAFE_COMMANDS),
            dangerous_commands: owned_names(DEFAULT_DANGEROUS_COMMANDS),
            default_timeout: DEFAULT_TIMEOUT_MS,
            default_approval_mode: DEFAULT_APPROVAL_MODE,
            session_approvals: true,
            shell: DEFAULT_SHELL.to_string(),
        }
    }
}

impl BashHelperConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout.max(1))
    }
}

/// Settings under `[continuation]`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ContinuationConfig {
    /// Lifetime of a paused execution awaiting a decision; `0` disables expiry.
    pub ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for ContinuationConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_CONTINUATION_TTL_SECS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}

impl ContinuationConfig {
    /// Entry time-to-live, or `None` when expiry is disabled.
    pub fn ttl(&self) -> Option<Duration> {
        (self.ttl_secs > 0).then(|| Duration::from_secs(self.ttl_secs))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

/// Settings under `[logging]`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing-subscriber` env-filter directive.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}
