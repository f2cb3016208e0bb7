//! Subprocess spawning with a hard deadline.

use crate::error::ProcessError;
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::time::{timeout_at, Duration, Instant};

/// Raw outcome of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Runs a shell command line. The seam tests replace to observe spawns.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(
        &self,
        command: &str,
        cwd: &Path,
        limit: Duration,
    ) -> Result<ExecOutput, ProcessError>;
}

/// Runs commands locally as `<shell> -c <command>`.
#[derive(Debug, Clone)]
pub struct LocalShell {
    shell: String,
}

impl LocalShell {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl Default for LocalShell {
    fn default() -> Self {
        Self::new("sh")
    }
}

#[async_trait]
impl ProcessRunner for LocalShell {
    async fn run(
        &self,
        command: &str,
        cwd: &Path,
        limit: Duration,
    ) -> Result<ExecOutput, ProcessError> {
        run_sh_process(&self.shell, command, cwd, limit).await
    }
}

/// Longest deadline honored; larger limits are clamped so the deadline
/// arithmetic cannot overflow.
const MAX_LIMIT: Duration = Duration::from_secs(60 * 60 * 24 * 365);

/// Spawn `<shell> -c <command>` in `cwd` and collect its output.
///
/// The shell runs as the leader of its own process group. The whole group is
/// killed on deadline and when the returned future is dropped, so commands
/// the shell forked do not outlive the call.
pub(crate) async fn run_sh_process(
    shell: &str,
    command: &str,
    cwd: &Path,
    limit: Duration,
) -> Result<ExecOutput, ProcessError> {
    let deadline = Instant::now() + limit.min(MAX_LIMIT);

    let mut cmd = Command::new(shell);
    cmd.kill_on_drop(true);
    cmd.arg("-c")
        .arg(command)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = cmd
        .spawn()
        .map_err(|e| ProcessError::Spawn(format!("{shell}: {e}")))?;
    // Declared after `child` so it drops first: the group dies before
    // `kill_on_drop` reaps the leader.
    let mut group = GroupGuard::new(&child);
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let collected = timeout_at(deadline, async {
        tokio::join!(child.wait(), read_pipe(stdout), read_pipe(stderr))
    })
    .await;

    match collected {
        Ok((status, stdout, stderr)) => {
            // The leader is reaped; its id may be reused from here on.
            group.disarm();
            let status = status.map_err(|e| ProcessError::Io(format!("{shell}: {e}")))?;
            Ok(ExecOutput {
                exit_code: status.code().unwrap_or(-1),
                stdout: String::from_utf8_lossy(&stdout).to_string(),
                stderr: String::from_utf8_lossy(&stderr).to_string(),
            })
        }
        Err(_) => {
            group.kill();
            if let Err(e) = child.kill().await {
                tracing::debug!(error = %e, "child already exited before kill");
            }
            Err(ProcessError::TimedOut(limit))
        }
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf).await;
    }
    buf
}

/// SIGKILLs a child's process group when dropped, unless disarmed.
struct GroupGuard {
    leader: Option<u32>,
}

impl GroupGuard {
    fn new(child: &Child) -> Self {
        Self { leader: child.id() }
    }

    fn disarm(&mut self) {
        self.leader = None;
    }

    fn kill(&mut self) {
        if let Some(leader) = self.leader.take() {
            kill_process_group(leader);
        }
    }
}

impl Drop for GroupGuard {
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(unix)]
fn kill_process_group(leader: u32) {
    let Ok(pgid) = libc::pid_t::try_from(leader) else {
        tracing::warn!(leader, "process id out of range; group not killed");
        return;
    };
    // SAFETY: killpg only sends a signal. The group was created for this
    // child by `process_group(0)`, and its id is not reused while any
    // member is still alive.
    if unsafe { libc::killpg(pgid, libc::SIGKILL) } != 0 {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            tracing::warn!(pgid, error = %err, "failed to kill process group");
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_leader: u32) {}
