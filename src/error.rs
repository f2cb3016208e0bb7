//! Unified error types for the approval gate.
//!
//! Denials and subprocess failures are ordinary data (see
//! [`crate::exec::BashExecutionResult`]); only configuration problems and
//! failed continuation round-trips surface as errors.

use crate::continuation::ExecutionId;
use std::fmt;
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors when loading or parsing configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Toml(toml::de::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Toml(e) => write!(f, "toml: {e}"),
            Self::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml(e)
    }
}

// ---------------------------------------------------------------------------
// ProcessError
// ---------------------------------------------------------------------------

/// Failures from the subprocess layer.
///
/// The executor converts every variant into a `BashExecutionResult`; callers
/// of the public execution API never see this type.
#[derive(Debug)]
pub enum ProcessError {
    /// The shell could not be started.
    Spawn(String),
    /// Reading output or waiting on the child failed.
    Io(String),
    /// The child outlived its deadline and was killed.
    TimedOut(Duration),
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spawn(msg) => write!(f, "spawn failed: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
            Self::TimedOut(limit) => write!(f, "timed out after {}ms", limit.as_millis()),
        }
    }
}

impl std::error::Error for ProcessError {}

// ---------------------------------------------------------------------------
// ControllerError
// ---------------------------------------------------------------------------

/// Error raised by the agent controller while continuing a resumed turn.
#[derive(Debug)]
pub struct ControllerError {
    message: String,
}

impl ControllerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ControllerError {}

// ---------------------------------------------------------------------------
// ContinuationError: pause/resume protocol
// ---------------------------------------------------------------------------

/// Errors from the pause/resume protocol.
///
/// Both resume-side variants are terminal for the execution id: the registry
/// entry is gone and is never restored.
#[derive(Debug)]
pub enum ContinuationError {
    /// Resume was called with an unknown or already-consumed execution id.
    NotFound(ExecutionId),
    /// Pause was called with a result list holding no unregistered approval request.
    NoPendingApproval,
    /// The controller failed while continuing the resumed turn.
    ControllerFailed(ControllerError),
}

impl fmt::Display for ContinuationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "no paused execution found for {id}"),
            Self::NoPendingApproval => {
                write!(f, "result list contains no unregistered approval request")
            }
            Self::ControllerFailed(e) => write!(f, "continuation failed: {e}"),
        }
    }
}

impl std::error::Error for ContinuationError {}

impl From<ControllerError> for ContinuationError {
    fn from(e: ControllerError) -> Self {
        Self::ControllerFailed(e)
    }
}
