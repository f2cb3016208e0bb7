//! Interactive terminal fallback for approval decisions.
//!
//! Only used when no remote approval channel exists. Without a terminal on
//! both ends the prompt denies instead of asking.

use super::{ApprovalChoice, ApprovalRequest, DecisionSource, HeadlessDenial};
use async_trait::async_trait;
use crossterm::style::{Color, Stylize};
use std::io::{self, BufRead, IsTerminal, Write};
use std::sync::OnceLock;
use tokio::sync::{mpsc, Mutex};

/// Asks on stderr, reads the answer from stdin.
#[derive(Debug, Clone, Copy)]
pub struct TerminalPrompt {
    color: bool,
}

impl TerminalPrompt {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    /// True when both stdin and stderr are attached to a terminal.
    pub fn is_interactive() -> bool {
        io::stdin().is_terminal() && io::stderr().is_terminal()
    }
}

#[async_trait]
impl DecisionSource for TerminalPrompt {
    async fn decide(&self, request: &ApprovalRequest) -> ApprovalChoice {
        if !Self::is_interactive() {
            return HeadlessDenial.decide(request).await;
        }

        let mut lines = stdin_lines().lock().await;
        // Answers must be typed after the request is shown.
        while lines.try_recv().is_ok() {}

        if render_approval_request(&mut io::stderr(), request, self.color).is_err() {
            return ApprovalChoice::Deny;
        }

        let mut err = io::stderr();
        tokio::select! {
            choice = read_choice(&mut lines, &mut err) => choice,
            _ = tokio::signal::ctrl_c() => {
                eprintln!("\nOperation cancelled.");
                ApprovalChoice::Deny
            }
        }
    }
}

/// Lines from stdin, read by one thread for the life of the process.
///
/// A cancelled prompt leaves that read pending; the line it eventually
/// returns stays queued here instead of being lost with the prompt.
fn stdin_lines() -> &'static Mutex<mpsc::UnboundedReceiver<String>> {
    static LINES: OnceLock<Mutex<mpsc::UnboundedReceiver<String>>> = OnceLock::new();
    LINES.get_or_init(|| {
        let (tx, rx) = mpsc::unbounded_channel();
        let spawned = std::thread::Builder::new()
            .name("stdin-reader".into())
            .spawn(move || {
                let stdin = io::stdin();
                loop {
                    let mut line = String::new();
                    match stdin.lock().read_line(&mut line) {
                        Ok(0) | Err(_) => break,
                        Ok(_) => {
                            if tx.send(line).is_err() {
                                break;
                            }
                        }
                    }
                }
            });
        if let Err(e) = spawned {
            tracing::error!(error = %e, "failed to start stdin reader; prompts will deny");
        }
        Mutex::new(rx)
    })
}

/// Loop until a valid choice is read. End of input (a closed channel)
/// counts as a denial.
pub async fn read_choice<W: Write>(
    lines: &mut mpsc::UnboundedReceiver<String>,
    out: &mut W,
) -> ApprovalChoice {
    loop {
        let _ = write!(out, "Your choice [a/s/d]: ");
        let _ = out.flush();

        let Some(line) = lines.recv().await else {
            let _ = writeln!(out, "\nOperation cancelled.");
            return ApprovalChoice::Deny;
        };
        if let Some(choice) = parse_choice(&line) {
            return choice;
        }
        let _ = writeln!(out, "Please enter 'a', 's', or 'd'");
    }
}

/// Render the approval block shown before the choice prompt.
pub fn render_approval_request(
    out: &mut dyn Write,
    request: &ApprovalRequest,
    color: bool,
) -> io::Result<()> {
    let title = "Bash Command Approval Required";
    if color {
        writeln!(out, "\n{}", title.with(Color::Red).bold())?;
    } else {
        writeln!(out, "\n{title}")?;
    }
    writeln!(out, "Command: {}", format_approval_command_block(&request.command))?;
    writeln!(out, "Working Directory: {}", request.working_directory)?;
    if let Some(reason) = request
        .justification
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        writeln!(out, "Justification: {reason}")?;
    }
    writeln!(out, "\nOptions:")?;
    writeln!(out, "  (a)pprove - Execute this command once")?;
    writeln!(out, "  (s)ession - Execute and auto-approve for this session")?;
    writeln!(out, "  (d)eny - Do not execute this command")?;
    out.flush()
}

/// Parse one answer line (single letter or long form, case-insensitive).
pub fn parse_choice(line: &str) -> Option<ApprovalChoice> {
    match line.trim().to_ascii_lowercase().as_str() {
        "a" | "approve" => Some(ApprovalChoice::ApproveOnce),
        "s" | "session" => Some(ApprovalChoice::ApproveForSession),
        "d" | "deny" => Some(ApprovalChoice::Deny),
        _ => None,
    }
}

/// Format command text as a shell snippet block.
pub fn format_approval_command_block(command: &str) -> String {
    if command.trim().is_empty() {
        return "$".to_string();
    }

    let mut out = String::new();
    for (idx, line) in command.lines().enumerate() {
        if idx > 0 {
            out.push('\n');
            out.push_str("  ");
        } else {
            out.push_str("$ ");
        }
        out.push_str(line);
    }
    out
}
