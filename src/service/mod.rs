//! Host-facing service that ties policy, execution, and pause/resume together.
//!
//! A server owns one [`GateService`] and hands it every request: commands a
//! turn wants to run ([`GateService::attempt`]), turns that must wait on a
//! human ([`GateService::pause_turn`]), and decisions coming back from the
//! remote caller ([`GateService::handle_decision`]).

use crate::approval::prompt::TerminalPrompt;
use crate::approval::{ApprovalChoice, ApprovalMode, ApprovalResponse, ApprovalSession};
use crate::config::{Config, ContinuationConfig};
use crate::continuation::{ContinuationRegistry, ExecutionId, ResultItem, StreamEvent, TurnState};
use crate::error::ContinuationError;
use crate::exec::{BashExecutionResult, CommandExecutor, ShellCommand};
use crate::textutil::command_preview;
use crate::types::Message;
use std::collections::HashMap;
use std::io::{self, IsTerminal};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

pub mod sweeper;

pub use sweeper::spawn_sweeper;

/// Approval gate shared by every request handler of one host.
pub struct GateService {
    executor: CommandExecutor,
    registry: Arc<ContinuationRegistry>,
    sessions: Mutex<HashMap<String, Arc<ApprovalSession>>>,
    /// Whether new sessions keep approve-for-session allow-lists.
    session_approvals: bool,
    sweep_interval: Duration,
}

impl GateService {
    pub fn new(
        executor: CommandExecutor,
        registry: Arc<ContinuationRegistry>,
        session_approvals: bool,
    ) -> Self {
        Self {
            executor,
            registry,
            sessions: Mutex::new(HashMap::new()),
            session_approvals,
            sweep_interval: ContinuationConfig::default().sweep_interval(),
        }
    }

    pub fn with_sweep_interval(mut self, every: Duration) -> Self {
        self.sweep_interval = every;
        self
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            CommandExecutor::from_config(&config.bash_helper),
            Arc::new(ContinuationRegistry::from_config(&config.continuation)),
            config.bash_helper.session_approvals,
        )
        .with_sweep_interval(config.continuation.sweep_interval())
    }

    pub fn executor(&self) -> &CommandExecutor {
        &self.executor
    }

    pub fn registry(&self) -> &Arc<ContinuationRegistry> {
        &self.registry
    }

    /// Start the background TTL sweep over this service's registry.
    ///
    /// Returns `None` when the registry keeps entries forever.
    pub fn start_sweeper(&self) -> Option<JoinHandle<()>> {
        self.registry.ttl()?;
        Some(spawn_sweeper(Arc::clone(&self.registry), self.sweep_interval))
    }

    /// Get or create the approval session named `id`.
    pub fn session(&self, id: &str) -> Arc<ApprovalSession> {
        let mut sessions = self.lock_sessions();
        Arc::clone(
            sessions
                .entry(id.to_string())
                .or_insert_with(|| Arc::new(ApprovalSession::new(id, self.session_approvals))),
        )
    }

    /// Run `command` if nothing stands in the way, otherwise hand back an
    /// approval sentinel without spawning anything.
    ///
    /// The sentinel is unregistered; put it in the turn's pending results and
    /// call [`GateService::pause_turn`].
    pub async fn attempt(&self, session_id: &str, command: &ShellCommand) -> ResultItem {
        let session = self.session(session_id);
        if self.executor.needs_approval(&command.command, None)
            && !session.is_approved(&command.command)
        {
            tracing::info!(
                session = session_id,
                command = %command_preview(&command.command),
                classification = %self.executor.policy().classify(&command.command),
                "command needs a remote decision"
            );
            return ResultItem::ApprovalRequest(command.to_approval_request());
        }

        // Cleared by policy or allow-list, so the decision source is never asked.
        let result = self
            .executor
            .execute_decided(command, None, ApprovalChoice::ApproveOnce, &session)
            .await;
        ResultItem::Bash(result)
    }

    /// Register a paused turn and announce the stamped request on its stream.
    pub fn pause_turn(
        &self,
        pending_results: &mut [ResultItem],
        turn: TurnState<'_>,
    ) -> Result<ExecutionId, ContinuationError> {
        let execution_id = self.registry.pause(pending_results, turn)?;
        let stamped = pending_results.iter().find_map(|item| match item {
            ResultItem::ApprovalRequest(request)
                if request.execution_id.as_ref() == Some(&execution_id) =>
            {
                Some(request.clone())
            }
            _ => None,
        });
        if let Some(request) = stamped {
            let _ = turn.sink.send(StreamEvent::ApprovalRequired(request));
        }
        Ok(execution_id)
    }

    /// Apply a remote decision to its paused turn and resume it.
    ///
    /// The entry is claimed before anything runs. A denial never spawns; an
    /// approval runs the stored command (not the echoed one). The command's
    /// result is streamed, then substituted into the turn.
    pub async fn handle_decision(
        &self,
        response: ApprovalResponse,
    ) -> Result<Vec<Message>, ContinuationError> {
        let context = self.registry.take(&response.execution_id)?;
        let request = context.approval_request().clone();

        let choice = if response.approved && !response.matches(&request) {
            tracing::warn!(
                execution_id = %response.execution_id,
                stored = %command_preview(&request.command),
                echoed = %command_preview(&response.command),
                "approval does not match the paused request; treating as denial"
            );
            ApprovalChoice::Deny
        } else {
            ApprovalChoice::from_remote(response.approved, response.remember_for_session)
        };

        let session = self.session(context.session_id());
        let command = ShellCommand::from(&request);
        let result = self
            .executor
            .execute_decided(&command, None, choice, &session)
            .await;
        let _ = context
            .sink()
            .send(StreamEvent::Result(ResultItem::Bash(result.clone())));

        context.resume_with(ResultItem::Bash(result)).await
    }

    /// Local path: gate `command` with the terminal prompt and run it.
    ///
    /// Without a terminal the prompt denies anything the policy flags.
    pub async fn run_interactive(
        &self,
        session_id: &str,
        command: &ShellCommand,
        timeout: Option<Duration>,
        mode: Option<ApprovalMode>,
    ) -> BashExecutionResult {
        let session = self.session(session_id);
        let prompt = TerminalPrompt::new(io::stderr().is_terminal());
        self.executor
            .execute(command, timeout, mode, &session, &prompt)
            .await
    }

    fn lock_sessions(&self) -> MutexGuard<'_, HashMap<String, Arc<ApprovalSession>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
