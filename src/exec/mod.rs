//! Policy-gated shell command execution.
//!
//! [`CommandExecutor::execute`] classifies a command, asks for a decision when
//! the policy requires one, and only then spawns it. Every outcome (denial,
//! timeout, spawn failure, nonzero exit) comes back as a
//! [`BashExecutionResult`]; nothing here returns an error to the caller.

use crate::approval::{
    ApprovalChoice, ApprovalMode, ApprovalPolicy, ApprovalRequest, ApprovalSession, DecisionSource,
};
use crate::config::BashHelperConfig;
use crate::error::ProcessError;
use crate::safety::SafetyAssessor;
use crate::textutil::command_preview;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

mod process;

pub use process::{ExecOutput, LocalShell, ProcessRunner};

/// Stderr text of a denied command.
pub const DENIED_MESSAGE: &str = "Command denied by user";
/// Conventional exit code for a command killed at its deadline.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// A command submitted for execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    pub command: String,
    pub working_directory: PathBuf,
    pub justification: Option<String>,
}

impl ShellCommand {
    pub fn new(command: impl Into<String>, working_directory: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            working_directory: working_directory.into(),
            justification: None,
        }
    }

    /// Build a command that runs in the process's current directory.
    pub fn in_current_dir(command: impl Into<String>) -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::new(command, cwd)
    }

    pub fn with_justification(mut self, justification: impl Into<String>) -> Self {
        self.justification = Some(justification.into());
        self
    }

    /// Unregistered approval request describing this command.
    pub fn to_approval_request(&self) -> ApprovalRequest {
        ApprovalRequest::new(
            self.command.clone(),
            self.working_directory.display().to_string(),
            self.justification.clone(),
        )
    }
}

impl From<&ApprovalRequest> for ShellCommand {
    fn from(request: &ApprovalRequest) -> Self {
        Self {
            command: request.command.clone(),
            working_directory: PathBuf::from(&request.working_directory),
            justification: request.justification.clone(),
        }
    }
}

/// Outcome of one executed (or denied) command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BashExecutionResult {
    pub command: String,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration_ms: u64,
    pub was_approved: bool,
}

impl BashExecutionResult {
    /// Result for a command the user declined; no process was spawned.
    pub fn denied(command: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            command: command.into(),
            stdout: String::new(),
            stderr: DENIED_MESSAGE.to_string(),
            exit_code: 1,
            duration_ms: millis(elapsed),
            was_approved: false,
        }
    }

    fn from_output(command: &str, output: ExecOutput, elapsed: Duration) -> Self {
        Self {
            command: command.to_string(),
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: output.exit_code,
            duration_ms: millis(elapsed),
            was_approved: true,
        }
    }

    fn from_process_error(command: &str, error: ProcessError, elapsed: Duration) -> Self {
        let (stderr, exit_code) = match error {
            ProcessError::TimedOut(limit) => (
                format!("Command timed out after {}ms", limit.as_millis()),
                TIMEOUT_EXIT_CODE,
            ),
            ProcessError::Spawn(msg) | ProcessError::Io(msg) => {
                (format!("Execution error: {msg}"), 1)
            }
        };
        Self {
            command: command.to_string(),
            stdout: String::new(),
            stderr,
            exit_code,
            duration_ms: millis(elapsed),
            was_approved: true,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }

    pub fn timed_out(&self) -> bool {
        self.was_approved && self.exit_code == TIMEOUT_EXIT_CODE
    }

    /// Stdout followed by stderr (when present) as shown to the model.
    pub fn combined_output(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else {
            format!("{}\nSTDERR:\n{}", self.stdout, self.stderr)
        }
    }
}

fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// Runs commands only after the approval policy clears them.
#[derive(Clone)]
pub struct CommandExecutor {
    policy: ApprovalPolicy,
    runner: Arc<dyn ProcessRunner>,
    default_timeout: Duration,
    default_mode: ApprovalMode,
}

impl CommandExecutor {
    pub fn new(
        policy: ApprovalPolicy,
        runner: Arc<dyn ProcessRunner>,
        default_timeout: Duration,
        default_mode: ApprovalMode,
    ) -> Self {
        Self {
            policy,
            runner,
            default_timeout,
            default_mode,
        }
    }

    /// Local-shell executor using the configured sets, timeout, and mode.
    pub fn from_config(config: &BashHelperConfig) -> Self {
        Self::new(
            ApprovalPolicy::new(SafetyAssessor::from_config(config)),
            Arc::new(LocalShell::new(config.shell.clone())),
            config.default_timeout(),
            config.default_approval_mode,
        )
    }

    pub fn policy(&self) -> &ApprovalPolicy {
        &self.policy
    }

    pub fn default_mode(&self) -> ApprovalMode {
        self.default_mode
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Whether `command` needs a decision under `mode` (or the default mode).
    pub fn needs_approval(&self, command: &str, mode: Option<ApprovalMode>) -> bool {
        self.policy
            .needs_approval(command, mode.unwrap_or(self.default_mode))
    }

    /// Classify, gate, and run `command`.
    ///
    /// `timeout` and `mode` fall back to the executor defaults. When a
    /// decision is needed the session allow-list is consulted before
    /// `decisions`; a denial returns without spawning anything.
    pub async fn execute(
        &self,
        command: &ShellCommand,
        timeout: Option<Duration>,
        mode: Option<ApprovalMode>,
        session: &ApprovalSession,
        decisions: &dyn DecisionSource,
    ) -> BashExecutionResult {
        let started = Instant::now();
        let mode = mode.unwrap_or(self.default_mode);

        if self.policy.needs_approval(&command.command, mode) {
            let request = command.to_approval_request();
            if !session.request_approval(&request, decisions).await {
                tracing::info!(command = %command_preview(&command.command), %mode, "command denied; not spawning");
                return BashExecutionResult::denied(&command.command, started.elapsed());
            }
        }

        self.spawn(command, timeout, started).await
    }

    /// Run `command` under a decision that was already made elsewhere.
    ///
    /// The policy and allow-list are not consulted: a denial returns without
    /// spawning, an approval runs, and approve-for-session is recorded in
    /// `session`.
    pub async fn execute_decided(
        &self,
        command: &ShellCommand,
        timeout: Option<Duration>,
        choice: ApprovalChoice,
        session: &ApprovalSession,
    ) -> BashExecutionResult {
        let started = Instant::now();
        match choice {
            ApprovalChoice::Deny => {
                tracing::info!(command = %command_preview(&command.command), "command denied by remote decision");
                return BashExecutionResult::denied(&command.command, started.elapsed());
            }
            ApprovalChoice::ApproveForSession => {
                session.remember(&command.command);
            }
            ApprovalChoice::ApproveOnce => {}
        }
        self.spawn(command, timeout, started).await
    }

    async fn spawn(
        &self,
        command: &ShellCommand,
        timeout: Option<Duration>,
        started: Instant,
    ) -> BashExecutionResult {
        let limit = timeout.unwrap_or(self.default_timeout);
        tracing::info!(
            command = %command_preview(&command.command),
            cwd = %command.working_directory.display(),
            timeout_ms = millis(limit),
            "running command"
        );

        let outcome = self
            .runner
            .run(&command.command, working_dir(command), limit)
            .await;
        let result = match outcome {
            Ok(output) => BashExecutionResult::from_output(&command.command, output, started.elapsed()),
            Err(error) => {
                tracing::warn!(command = %command_preview(&command.command), %error, "command did not complete");
                BashExecutionResult::from_process_error(&command.command, error, started.elapsed())
            }
        };
        tracing::debug!(
            command = %command_preview(&command.command),
            exit_code = result.exit_code,
            duration_ms = result.duration_ms,
            "command finished"
        );
        result
    }
}

fn working_dir(command: &ShellCommand) -> &Path {
    if command.working_directory.as_os_str().is_empty() {
        Path::new(".")
    } else {
        &command.working_directory
    }
}
