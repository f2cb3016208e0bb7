//! Snapshot of a paused turn and its one-shot resumption.

use super::{
    build_continuation_message, substitute_decision, ContinuationRequest, ExecutionId,
    ExecutionParams, ResultItem, SharedRuntimeState, StreamSink, TurnController,
    CONTINUATION_REQUEST_VERSION,
};
use crate::approval::ApprovalRequest;
use crate::error::ContinuationError;
use crate::textutil::command_preview;
use crate::types::Message;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Borrowed view of a live turn, handed to `pause`.
///
/// Slices and parameters are copied into the snapshot; the runtime state,
/// sink, and controller are kept by reference.
#[derive(Clone, Copy)]
pub struct TurnState<'a> {
    /// Session whose approval allow-list applies to this turn.
    pub session_id: &'a str,
    pub messages: &'a [Message],
    pub params: &'a ExecutionParams,
    pub runtime_state: &'a SharedRuntimeState,
    pub sink: &'a StreamSink,
    pub controller: &'a Arc<dyn TurnController>,
}

/// Immutable snapshot of everything needed to resume a paused turn.
pub struct ExecutionContext {
    execution_id: ExecutionId,
    approval_request: ApprovalRequest,
    session_id: String,
    pending_results: Vec<ResultItem>,
    messages: Vec<Message>,
    params: ExecutionParams,
    runtime_state: SharedRuntimeState,
    sink: StreamSink,
    controller: Arc<dyn TurnController>,
    paused_at: Instant,
}

impl ExecutionContext {
    pub(super) fn capture(
        execution_id: ExecutionId,
        approval_request: ApprovalRequest,
        pending_results: &[ResultItem],
        turn: TurnState<'_>,
    ) -> Self {
        Self {
            execution_id,
            approval_request,
            session_id: turn.session_id.to_string(),
            pending_results: pending_results.to_vec(),
            messages: turn.messages.to_vec(),
            params: turn.params.clone(),
            runtime_state: Arc::clone(turn.runtime_state),
            sink: turn.sink.clone(),
            controller: Arc::clone(turn.controller),
            paused_at: Instant::now(),
        }
    }

    pub fn execution_id(&self) -> &ExecutionId {
        &self.execution_id
    }

    /// The stamped request that was forwarded to the remote caller.
    pub fn approval_request(&self) -> &ApprovalRequest {
        &self.approval_request
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn pending_results(&self) -> &[ResultItem] {
        &self.pending_results
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn params(&self) -> &ExecutionParams {
        &self.params
    }

    pub fn sink(&self) -> &StreamSink {
        &self.sink
    }

    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.paused_at)
    }

    /// Substitute `decision`, append the continuation message, and re-enter
    /// the controller on the original sink.
    ///
    /// Consumes the snapshot: a failed continuation cannot be retried.
    pub async fn resume_with(self, decision: ResultItem) -> Result<Vec<Message>, ContinuationError> {
        let Self {
            execution_id,
            approval_request,
            pending_results,
            mut messages,
            params,
            runtime_state,
            sink,
            controller,
            ..
        } = self;

        let (results, replaced) = substitute_decision(pending_results, &execution_id, &decision);
        if replaced == 0 {
            tracing::warn!(
                %execution_id,
                command = %command_preview(&approval_request.command),
                "decision matched no pending approval; continuing with unmodified results"
            );
        } else {
            tracing::debug!(%execution_id, replaced, "substituted decision into pending results");
        }

        messages.push(build_continuation_message(&results));
        let request = ContinuationRequest {
            version: CONTINUATION_REQUEST_VERSION,
            execution_id: execution_id.clone(),
            messages,
            params,
            runtime_state,
            sink,
        };

        tracing::info!(%execution_id, history_len = request.messages.len(), "resuming paused turn");
        match controller.continue_turn(request).await {
            Ok(produced) => {
                tracing::info!(%execution_id, produced = produced.len(), "resumed turn completed");
                Ok(produced)
            }
            Err(error) => {
                tracing::error!(%execution_id, error = ?error, "continuation failed; execution is terminal");
                Err(ContinuationError::ControllerFailed(error))
            }
        }
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("execution_id", &self.execution_id)
            .field("approval_request", &self.approval_request)
            .field("session_id", &self.session_id)
            .field("pending_results", &self.pending_results.len())
            .field("messages", &self.messages.len())
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}
