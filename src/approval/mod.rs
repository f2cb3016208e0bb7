//! Approval policy and decision sources.
//!
//! [`ApprovalPolicy`] decides whether a command needs a human decision at
//! all. When it does, a [`DecisionSource`] supplies one: the terminal prompt,
//! a UI broker, a remote decision replayed on resume, or the headless default
//! which always denies.

use crate::safety::{SafetyAssessor, SafetyClassification};
use crate::textutil::command_preview;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tokio::sync::{mpsc, oneshot};

pub mod prompt;
mod schema;
mod session;

pub use schema::{ApprovalRequest, ApprovalResponse};
pub use session::ApprovalSession;

// ---------------------------------------------------------------------------
// Mode + policy
// ---------------------------------------------------------------------------

/// When commands require a human decision.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalMode {
    /// Never ask.
    Never,
    /// Ask for dangerous and unknown commands.
    #[default]
    OnRequest,
    /// Run first. Asking after a failed attempt is not implemented, so this
    /// currently never asks.
    OnFailure,
    /// Ask for everything that is not known-safe.
    UnlessTrusted,
}

impl ApprovalMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Never => "never",
            Self::OnRequest => "on_request",
            Self::OnFailure => "on_failure",
            Self::UnlessTrusted => "unless_trusted",
        }
    }
}

impl fmt::Display for ApprovalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApprovalMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "never" => Ok(Self::Never),
            "on_request" => Ok(Self::OnRequest),
            "on_failure" => Ok(Self::OnFailure),
            "unless_trusted" => Ok(Self::UnlessTrusted),
            other => Err(format!(
                "unknown approval mode `{other}` (expected never, on_request, on_failure, unless_trusted)"
            )),
        }
    }
}

/// Decides whether a command needs a human decision under a given mode.
#[derive(Debug, Clone, Default)]
pub struct ApprovalPolicy {
    assessor: SafetyAssessor,
}

impl ApprovalPolicy {
    pub fn new(assessor: SafetyAssessor) -> Self {
        Self { assessor }
    }

    pub fn assessor(&self) -> &SafetyAssessor {
        &self.assessor
    }

    pub fn classify(&self, command: &str) -> SafetyClassification {
        self.assessor.classify(command)
    }

    pub fn needs_approval(&self, command: &str, mode: ApprovalMode) -> bool {
        // Skip classification entirely when the mode never asks.
        if matches!(mode, ApprovalMode::Never | ApprovalMode::OnFailure) {
            return false;
        }
        requires_approval(self.classify(command), mode)
    }
}

/// The approval matrix.
pub fn requires_approval(classification: SafetyClassification, mode: ApprovalMode) -> bool {
    match mode {
        ApprovalMode::Never | ApprovalMode::OnFailure => false,
        ApprovalMode::UnlessTrusted => classification != SafetyClassification::Safe,
        ApprovalMode::OnRequest => matches!(
            classification,
            SafetyClassification::Dangerous | SafetyClassification::Unknown
        ),
    }
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

/// A human (or replayed) answer to an approval request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalChoice {
    ApproveOnce,
    ApproveForSession,
    Deny,
}

impl ApprovalChoice {
    pub fn is_approved(self) -> bool {
        !matches!(self, Self::Deny)
    }

    /// Map a remote yes/no decision onto a choice.
    pub fn from_remote(approved: bool, remember_for_session: bool) -> Self {
        match (approved, remember_for_session) {
            (false, _) => Self::Deny,
            (true, false) => Self::ApproveOnce,
            (true, true) => Self::ApproveForSession,
        }
    }
}

/// Supplies decisions for commands the policy flagged.
#[async_trait]
pub trait DecisionSource: Send + Sync {
    async fn decide(&self, request: &ApprovalRequest) -> ApprovalChoice;
}

/// Decision source for contexts with no way to ask a human: always denies.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadlessDenial;

#[async_trait]
impl DecisionSource for HeadlessDenial {
    async fn decide(&self, request: &ApprovalRequest) -> ApprovalChoice {
        tracing::warn!(
            command = %command_preview(&request.command),
            "approval required but no interaction channel is available; denying"
        );
        ApprovalChoice::Deny
    }
}

/// Replays a decision that was already made elsewhere (e.g. by a remote caller).
#[derive(Debug, Clone, Copy)]
pub struct FixedDecision(pub ApprovalChoice);

#[async_trait]
impl DecisionSource for FixedDecision {
    async fn decide(&self, _request: &ApprovalRequest) -> ApprovalChoice {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Broker: hand requests to a foreground UI over a channel
// ---------------------------------------------------------------------------

/// Approval request handed to a UI task, with a reply slot.
#[derive(Debug)]
pub struct PendingApproval {
    request: ApprovalRequest,
    response: oneshot::Sender<ApprovalChoice>,
}

impl PendingApproval {
    pub fn request(&self) -> &ApprovalRequest {
        &self.request
    }

    pub fn resolve(self, choice: ApprovalChoice) {
        let _ = self.response.send(choice);
    }

    pub fn approve(self) {
        self.resolve(ApprovalChoice::ApproveOnce);
    }

    pub fn deny(self) {
        self.resolve(ApprovalChoice::Deny);
    }
}

/// Sender side for UI approval requests.
///
/// A closed channel or a dropped reply slot counts as a denial.
#[derive(Clone, Debug)]
pub struct ApprovalBroker {
    tx: mpsc::UnboundedSender<PendingApproval>,
}

impl ApprovalBroker {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<PendingApproval>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl DecisionSource for ApprovalBroker {
    async fn decide(&self, request: &ApprovalRequest) -> ApprovalChoice {
        let (response_tx, response_rx) = oneshot::channel();
        let pending = PendingApproval {
            request: request.clone(),
            response: response_tx,
        };
        if self.tx.send(pending).is_err() {
            tracing::warn!(command = %command_preview(&request.command), "approval UI is unavailable; denying");
            return ApprovalChoice::Deny;
        }
        match response_rx.await {
            Ok(choice) => choice,
            Err(_) => {
                tracing::warn!(
                    command = %command_preview(&request.command),
                    "approval request was cancelled before resolution; denying"
                );
                ApprovalChoice::Deny
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_MODES: [ApprovalMode; 4] = [
        ApprovalMode::Never,
        ApprovalMode::OnRequest,
        ApprovalMode::OnFailure,
        ApprovalMode::UnlessTrusted,
    ];

    fn request(command: &str) -> ApprovalRequest {
        ApprovalRequest::new(command, "/tmp", None)
    }

    #[test]
    fn never_mode_never_requires_approval() {
        let policy = ApprovalPolicy::default();
        for command in ["ls -la", "rm -rf /", "curl x", "'broken"] {
            assert!(!policy.needs_approval(command, ApprovalMode::Never), "{command}");
        }
    }

    #[test]
    fn on_request_asks_for_dangerous_and_unknown_only() {
        let policy = ApprovalPolicy::default();
        assert_eq!(policy.classify("ls -la"), SafetyClassification::Safe);
        assert!(!policy.needs_approval("ls -la", ApprovalMode::OnRequest));
        assert_eq!(policy.classify("rm -rf /"), SafetyClassification::Dangerous);
        assert!(policy.needs_approval("rm -rf /", ApprovalMode::OnRequest));
        assert!(policy.needs_approval("make install", ApprovalMode::OnRequest));
    }

    #[test]
    fn unless_trusted_asks_for_everything_not_safe() {
        let policy = ApprovalPolicy::default();
        assert!(!policy.needs_approval("cat README", ApprovalMode::UnlessTrusted));
        assert!(policy.needs_approval("make", ApprovalMode::UnlessTrusted));
        assert!(policy.needs_approval("sudo ls", ApprovalMode::UnlessTrusted));
    }

    #[test]
    fn on_failure_never_asks_up_front() {
        let policy = ApprovalPolicy::default();
        assert!(!policy.needs_approval("rm -rf /", ApprovalMode::OnFailure));
    }

    #[test]
    fn matrix_is_consistent_with_policy() {
        let policy = ApprovalPolicy::default();
        for mode in ALL_MODES {
            for command in ["ls", "rm x", "frobnicate", ""] {
                assert_eq!(
                    policy.needs_approval(command, mode),
                    requires_approval(policy.classify(command), mode),
                    "{mode} / {command}"
                );
            }
        }
    }

    #[test]
    fn mode_parses_and_displays() {
        for mode in ALL_MODES {
            assert_eq!(mode.as_str().parse::<ApprovalMode>(), Ok(mode));
        }
        assert_eq!("On-Request".parse::<ApprovalMode>(), Ok(ApprovalMode::OnRequest));
        assert!("always".parse::<ApprovalMode>().is_err());
    }

    #[test]
    fn mode_deserializes_from_snake_case() {
        let mode: ApprovalMode = serde_json::from_str("\"unless_trusted\"").unwrap();
        assert_eq!(mode, ApprovalMode::UnlessTrusted);
    }

    #[test]
    fn remote_choice_mapping() {
        assert_eq!(ApprovalChoice::from_remote(false, true), ApprovalChoice::Deny);
        assert_eq!(ApprovalChoice::from_remote(true, false), ApprovalChoice::ApproveOnce);
        assert_eq!(
            ApprovalChoice::from_remote(true, true),
            ApprovalChoice::ApproveForSession
        );
    }

    #[tokio::test]
    async fn headless_source_denies() {
        assert_eq!(
            HeadlessDenial.decide(&request("rm x")).await,
            ApprovalChoice::Deny
        );
    }

    #[tokio::test]
    async fn broker_relays_ui_decision() {
        let (broker, mut rx) = ApprovalBroker::channel();
        let join = tokio::spawn(async move { broker.decide(&request("rm approved")).await });

        let pending = rx.recv().await.expect("approval request expected");
        assert_eq!(pending.request().command, "rm approved");
        pending.resolve(ApprovalChoice::ApproveForSession);

        assert_eq!(join.await.unwrap(), ApprovalChoice::ApproveForSession);
    }

    #[tokio::test]
    async fn broker_denies_when_ui_is_gone() {
        let (broker, rx) = ApprovalBroker::channel();
        drop(rx);
        assert_eq!(broker.decide(&request("rm x")).await, ApprovalChoice::Deny);
    }

    #[tokio::test]
    async fn broker_denies_when_reply_slot_is_dropped() {
        let (broker, mut rx) = ApprovalBroker::channel();
        let join = tokio::spawn(async move { broker.decide(&request("rm x")).await });
        let pending = rx.recv().await.expect("approval request expected");
        drop(pending);
        assert_eq!(join.await.unwrap(), ApprovalChoice::Deny);
    }

    #[cfg(feature = "fuzz-tests")]
    mod prop_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn never_mode_never_asks(command in "\\PC{0,40}") {
                let policy = ApprovalPolicy::default();
                prop_assert!(!policy.needs_approval(&command, ApprovalMode::Never));
            }

            #[test]
            fn safe_commands_never_need_approval(idx in 0usize..4, args in "[a-z -]{0,20}") {
                let mode = ALL_MODES[idx];
                let command = format!("ls {args}");
                prop_assert!(!ApprovalPolicy::default().needs_approval(&command, mode));
            }
        }
    }
}
