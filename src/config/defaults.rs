//! Default configuration constants.
//!
//! These are also the hardcoded fallbacks used when no configuration file is
//! available at all.

use crate::approval::ApprovalMode;

/// Commands auto-approved under `on_request`/`unless_trusted`.
pub(crate) const DEFAULT_KNOWN_SAFE_COMMANDS: &[&str] = &[
    "ls", "cat", "head", "tail", "grep", "find", "pwd", "echo", "which", "whereis", "date",
    "whoami", "id", "uname", "uptime",
];
/// Commands that always require a human decision under `on_request`.
pub(crate) const DEFAULT_DANGEROUS_COMMANDS: &[&str] = &[
    "rm", "rmdir", "mv", "cp", "dd", "mkfs", "fdisk", "mount", "umount", "chmod", "chown", "su",
    "sudo", "passwd",
];
/// Default subprocess timeout.
pub(super) const DEFAULT_TIMEOUT_MS: u64 = 10_000;
/// Default approval mode.
pub(super) const DEFAULT_APPROVAL_MODE: ApprovalMode = ApprovalMode::OnRequest;
/// Shell used to run commands (`<shell> -c <command>`).
pub(super) const DEFAULT_SHELL: &str = "sh";
/// Paused executions older than this are swept as abandoned.
pub(super) const DEFAULT_CONTINUATION_TTL_SECS: u64 = 3600;
/// Interval between abandoned-execution sweeps.
pub(super) const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;
/// Default `tracing` filter directive.
pub(super) const DEFAULT_LOG_FILTER: &str = "info";

pub(super) fn owned_names(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| (*name).to_string()).collect()
}
