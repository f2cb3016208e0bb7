//! Keyed store of paused turns.

use super::{ExecutionContext, ExecutionId, ResultItem, StreamEvent, TurnState};
use crate::config::ContinuationConfig;
use crate::error::ContinuationError;
use crate::textutil::command_preview;
use crate::types::Message;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Maps execution ids to paused turn snapshots.
///
/// Owned by the hosting service and shared by reference. Each id is inserted
/// once and claimed at most once; the claim is a single remove under the lock,
/// so concurrent resumes of one id see exactly one winner.
#[derive(Debug, Default)]
pub struct ContinuationRegistry {
    pending: Mutex<HashMap<ExecutionId, ExecutionContext>>,
    /// Paused entries older than this are swept; `None` keeps them forever.
    ttl: Option<Duration>,
}

impl ContinuationRegistry {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn from_config(config: &ContinuationConfig) -> Self {
        Self::new(config.ttl())
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Snapshot a turn that hit an approval-requiring action.
    ///
    /// Stamps a fresh id into the first unregistered approval request in
    /// `pending_results` (the caller's copy too, so it can forward the
    /// stamped request), then stores deep copies of the mutable inputs.
    pub fn pause(
        &self,
        pending_results: &mut [ResultItem],
        turn: TurnState<'_>,
    ) -> Result<ExecutionId, ContinuationError> {
        let execution_id = ExecutionId::generate();

        let request = pending_results
            .iter_mut()
            .find_map(|item| match item {
                ResultItem::ApprovalRequest(request) if !request.is_registered() => Some(request),
                _ => None,
            })
            .ok_or(ContinuationError::NoPendingApproval)?;
        request.execution_id = Some(execution_id.clone());
        let request = request.clone();

        let context =
            ExecutionContext::capture(execution_id.clone(), request, pending_results, turn);
        tracing::info!(
            %execution_id,
            command = %command_preview(&context.approval_request().command),
            session = %context.session_id(),
            "paused execution awaiting approval"
        );
        self.lock().insert(execution_id.clone(), context);
        Ok(execution_id)
    }

    /// Atomically remove and return the snapshot for `execution_id`.
    pub fn take(&self, execution_id: &ExecutionId) -> Result<ExecutionContext, ContinuationError> {
        self.lock().remove(execution_id).ok_or_else(|| {
            tracing::error!(%execution_id, "no paused execution found");
            ContinuationError::NotFound(execution_id.clone())
        })
    }

    /// Resume a paused turn with the decision's result.
    ///
    /// The entry is removed before the controller runs, so a failed
    /// continuation is terminal and a second resume reports `NotFound`.
    pub async fn resume(
        &self,
        execution_id: &ExecutionId,
        decision: impl Into<ResultItem>,
    ) -> Result<Vec<Message>, ContinuationError> {
        let context = self.take(execution_id)?;
        context.resume_with(decision.into()).await
    }

    pub fn contains(&self, execution_id: &ExecutionId) -> bool {
        self.lock().contains_key(execution_id)
    }

    pub fn pending_count(&self) -> usize {
        self.lock().len()
    }

    /// Purge entries older than the TTL and tell their streams.
    pub fn sweep_expired(&self) -> Vec<ExecutionId> {
        self.sweep_expired_at(Instant::now())
    }

    pub(crate) fn sweep_expired_at(&self, now: Instant) -> Vec<ExecutionId> {
        let Some(ttl) = self.ttl else {
            return Vec::new();
        };

        let expired: Vec<ExecutionContext> = {
            let mut pending = self.lock();
            let ids: Vec<ExecutionId> = pending
                .iter()
                .filter(|(_, context)| context.age(now) >= ttl)
                .map(|(id, _)| id.clone())
                .collect();
            ids.iter().filter_map(|id| pending.remove(id)).collect()
        };

        expired
            .into_iter()
            .map(|context| {
                let execution_id = context.execution_id().clone();
                tracing::warn!(
                    %execution_id,
                    command = %command_preview(&context.approval_request().command),
                    age_secs = context.age(now).as_secs(),
                    "abandoned paused execution; no decision arrived"
                );
                let _ = context.sink().send(StreamEvent::Error(format!(
                    "approval for execution {execution_id} expired without a decision"
                )));
                execution_id
            })
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ExecutionId, ExecutionContext>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
