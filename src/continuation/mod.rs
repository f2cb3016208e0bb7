//! Pause/resume of agent turns waiting on an approval decision.
//!
//! When a turn hits a command that needs a human decision, the controller
//! hands its pending results and turn state to
//! [`ContinuationRegistry::pause`], which snapshots them under a fresh
//! [`ExecutionId`]. The remote caller later answers with that id, and
//! [`ContinuationRegistry::resume`] substitutes the decision's result for the
//! pending request and re-enters the controller on the original stream.
//!
//! Lifecycle of an entry: paused (in the registry) → resumed (removed before
//! the controller runs) or swept as abandoned once its TTL passes.

use crate::approval::ApprovalRequest;
use crate::error::ControllerError;
use crate::exec::BashExecutionResult;
use crate::types::Message;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

mod context;
mod message;
mod registry;

pub use context::{ExecutionContext, TurnState};
pub use message::{
    build_continuation_message, substitute_decision, HELPERS_RESULT_CLOSE, HELPERS_RESULT_OPEN,
};
pub use registry::ContinuationRegistry;

/// Field-set version of [`ContinuationRequest`].
pub const CONTINUATION_REQUEST_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Execution ids
// ---------------------------------------------------------------------------

/// Opaque, globally unique token joining a paused turn to its decision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(String);

impl ExecutionId {
    /// Generate a random UUIDv4 id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ExecutionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ExecutionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// ---------------------------------------------------------------------------
// Turn results
// ---------------------------------------------------------------------------

/// One item produced by a turn's helper/tool execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
pub enum ResultItem {
    Text(String),
    Bash(BashExecutionResult),
    /// Pending-approval sentinel; replaced on resume.
    ApprovalRequest(ApprovalRequest),
    Data(serde_json::Value),
}

impl ResultItem {
    /// Execution id of a registered approval sentinel.
    pub fn pending_execution_id(&self) -> Option<&ExecutionId> {
        match self {
            Self::ApprovalRequest(request) => request.execution_id.as_ref(),
            _ => None,
        }
    }

    /// Text form used inside the continuation message.
    pub fn render(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Bash(result) => result.combined_output(),
            Self::ApprovalRequest(request) => {
                format!("Approval pending for command: {}", request.command)
            }
            Self::Data(value) => value.to_string(),
        }
    }
}

impl From<BashExecutionResult> for ResultItem {
    fn from(result: BashExecutionResult) -> Self {
        Self::Bash(result)
    }
}

impl From<ApprovalRequest> for ResultItem {
    fn from(request: ApprovalRequest) -> Self {
        Self::ApprovalRequest(request)
    }
}

impl From<String> for ResultItem {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

// ---------------------------------------------------------------------------
// Turn parameters and runtime state
// ---------------------------------------------------------------------------

/// How the controller shrinks history that overflows the context window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionMode {
    #[default]
    Auto,
    Lifo,
    Similarity,
    MapReduce,
    Summary,
}

/// Request parameters captured at pause time and replayed on resume.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionParams {
    pub thread_id: u64,
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: Option<u32>,
    pub compression: CompressionMode,
    pub cookies: Vec<serde_json::Map<String, serde_json::Value>>,
    /// Names of the helpers/tools available to the turn.
    pub helpers: Vec<String>,
    pub template_args: BTreeMap<String, serde_json::Value>,
    pub thinking: bool,
}

/// Interpreter state the controller carries between turns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeState {
    pub variables: BTreeMap<String, serde_json::Value>,
}

/// Runtime state is shared by reference, not copied, across a pause.
pub type SharedRuntimeState = Arc<Mutex<RuntimeState>>;

// ---------------------------------------------------------------------------
// Streaming + controller seam
// ---------------------------------------------------------------------------

/// Items observed by the remote caller on a turn's stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum StreamEvent {
    Text(String),
    /// The turn paused; carries the stamped request.
    ApprovalRequired(ApprovalRequest),
    Result(ResultItem),
    Error(String),
    Done,
}

/// Destination of a turn's stream. Cloning keeps the same channel.
pub type StreamSink = mpsc::UnboundedSender<StreamEvent>;

/// Everything the controller needs to continue a resumed turn.
#[derive(Debug, Clone)]
pub struct ContinuationRequest {
    /// Always [`CONTINUATION_REQUEST_VERSION`].
    pub version: u32,
    pub execution_id: ExecutionId,
    /// Snapshot history with the continuation message appended.
    pub messages: Vec<Message>,
    pub params: ExecutionParams,
    pub runtime_state: SharedRuntimeState,
    /// The sink that was live when the turn paused.
    pub sink: StreamSink,
}

/// The agent controller's "continue this turn" entrypoint.
#[async_trait]
pub trait TurnController: Send + Sync {
    /// Run the turn to completion; returns the messages it produced.
    async fn continue_turn(
        &self,
        request: ContinuationRequest,
    ) -> Result<Vec<Message>, ControllerError>;
}
