//! Session-scoped approval allow-list.

use super::{ApprovalChoice, ApprovalRequest, DecisionSource};
use crate::textutil::command_preview;
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

/// Exact command strings approved "for this session".
///
/// Owned by one session; never shared across unrelated sessions and never
/// persisted.
#[derive(Debug)]
pub struct ApprovalSession {
    id: String,
    /// When false, approve-for-session behaves like approve-once.
    remember: bool,
    approved: Mutex<HashSet<String>>,
}

impl ApprovalSession {
    pub fn new(id: impl Into<String>, remember: bool) -> Self {
        Self {
            id: id.into(),
            remember,
            approved: Mutex::new(HashSet::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn remembers_approvals(&self) -> bool {
        self.remember
    }

    /// True when `command` was previously approved for this session.
    pub fn is_approved(&self, command: &str) -> bool {
        self.remember && self.lock().contains(command)
    }

    /// Record `command` as approved for the rest of the session.
    ///
    /// Returns false when session approvals are disabled.
    pub fn remember(&self, command: &str) -> bool {
        if !self.remember {
            return false;
        }
        self.lock().insert(command.to_string());
        true
    }

    pub fn approved_count(&self) -> usize {
        self.lock().len()
    }

    /// Resolve a flagged command: allow-list first, then `source`.
    pub async fn request_approval(
        &self,
        request: &ApprovalRequest,
        source: &dyn DecisionSource,
    ) -> bool {
        if self.is_approved(&request.command) {
            tracing::debug!(
                session = %self.id,
                command = %command_preview(&request.command),
                "command already approved for session"
            );
            return true;
        }

        let choice = source.decide(request).await;
        match choice {
            ApprovalChoice::ApproveOnce => {}
            ApprovalChoice::ApproveForSession => {
                if self.remember(&request.command) {
                    tracing::info!(
                        session = %self.id,
                        command = %command_preview(&request.command),
                        "command approved for session"
                    );
                }
            }
            ApprovalChoice::Deny => {
                tracing::info!(session = %self.id, command = %command_preview(&request.command), "command denied");
            }
        }
        choice.is_approved()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.approved.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
