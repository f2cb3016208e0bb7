//! Approval wire contract.
//!
//! [`ApprovalRequest`] is what the remote caller receives when a turn pauses;
//! [`ApprovalResponse`] is what it sends back. Field names are part of the
//! contract and must not change.

use crate::continuation::ExecutionId;
use serde::{Deserialize, Serialize};

/// A privileged action waiting on a human decision.
///
/// `execution_id` stays empty until the request is registered with the
/// continuation registry, which stamps it in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApprovalRequest {
    pub command: String,
    pub working_directory: String,
    #[serde(default)]
    pub justification: Option<String>,
    #[serde(default)]
    pub execution_id: Option<ExecutionId>,
}

impl ApprovalRequest {
    pub fn new(
        command: impl Into<String>,
        working_directory: impl Into<String>,
        justification: Option<String>,
    ) -> Self {
        Self {
            command: command.into(),
            working_directory: working_directory.into(),
            justification,
            execution_id: None,
        }
    }

    /// True once the registry has stamped an execution id into the request.
    pub fn is_registered(&self) -> bool {
        self.execution_id.is_some()
    }
}

/// The remote caller's decision for one paused execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApprovalResponse {
    pub execution_id: ExecutionId,
    pub approved: bool,
    /// Echoed for correlation with the stored request.
    pub command: String,
    pub working_directory: String,
    #[serde(default)]
    pub justification: Option<String>,
    /// Grant approve-for-session instead of approve-once.
    #[serde(default)]
    pub remember_for_session: bool,
}

impl ApprovalResponse {
    /// Build a response echoing the fields of `request`.
    ///
    /// Returns `None` if the request was never registered.
    pub fn for_request(request: &ApprovalRequest, approved: bool) -> Option<Self> {
        Some(Self {
            execution_id: request.execution_id.clone()?,
            approved,
            command: request.command.clone(),
            working_directory: request.working_directory.clone(),
            justification: request.justification.clone(),
            remember_for_session: false,
        })
    }

    /// True when the echoed fields match the stored request.
    pub fn matches(&self, request: &ApprovalRequest) -> bool {
        self.command == request.command
            && self.working_directory == request.working_directory
            && self.justification == request.justification
    }
}
