//! CLI argument parsing via clap.

use clap::Parser;
use shellgate::approval::ApprovalMode;
use std::path::PathBuf;

/// Run a shell command behind an approval gate.
#[derive(Debug, Parser)]
#[command(name = "shellgate", version)]
pub struct Args {
    /// Path to config file (default: ./shellgate.toml or ~/.config/shellgate/shellgate.toml).
    #[arg(short = 'c', long = "config")]
    pub config: Option<String>,

    /// Approval mode: never, on_request, on_failure, unless_trusted.
    #[arg(short = 'm', long = "mode")]
    pub mode: Option<ApprovalMode>,

    /// Timeout in milliseconds (default from config).
    #[arg(short = 't', long = "timeout-ms")]
    pub timeout_ms: Option<u64>,

    /// Working directory for the command.
    #[arg(long = "cwd", value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Why the command should run; shown in the approval prompt.
    #[arg(short = 'j', long = "justification")]
    pub justification: Option<String>,

    /// Treat approve-for-session as approve-once.
    #[arg(long = "no-session-approvals")]
    pub no_session_approvals: bool,

    /// Print the command's safety classification and exit without running it.
    #[arg(long = "classify")]
    pub classify: bool,

    /// Command to run. Multiple words are joined with spaces.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

impl Args {
    pub fn command_line(&self) -> String {
        self.command.join(" ")
    }
}
