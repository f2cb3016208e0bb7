//! CLI entry point for shellgate.

mod cli;

use clap::Parser;
use crossterm::style::{Color, Stylize};
use shellgate::config::load_config_with_warnings;
use shellgate::exec::ShellCommand;
use shellgate::logging::init_logging;
use shellgate::service::GateService;
use std::io::{self, IsTerminal, Write};
use std::time::Duration;

/// Session id used for the single local invocation.
const LOCAL_SESSION_ID: &str = "local";

/// Exit status after an interrupt, as shells report SIGINT.
const INTERRUPTED_EXIT_CODE: i32 = 130;

#[tokio::main]
async fn main() {
    let args = cli::Args::parse();
    // The command runs in its own process group, out of reach of the
    // terminal's SIGINT. Dropping `run` here kills that group.
    let code = tokio::select! {
        code = run(args) => code,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("\ninterrupted");
            INTERRUPTED_EXIT_CODE
        }
    };
    std::process::exit(code);
}

async fn run(args: cli::Args) -> i32 {
    let color = io::stderr().is_terminal();

    let loaded = match load_config_with_warnings(args.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("error: {e}");
            return 2;
        }
    };
    if let Err(e) = init_logging(&loaded.config.logging) {
        eprintln!("error: {e}");
        return 2;
    }
    for warning in &loaded.warnings {
        warn(color, warning);
    }
    if let Some(source) = &loaded.source {
        tracing::debug!(path = %source.display(), "loaded config");
    }

    let mut config = loaded.config;
    if args.no_session_approvals {
        config.bash_helper.session_approvals = false;
    }

    let service = GateService::from_config(&config);
    let command_line = args.command_line();

    if args.classify {
        let classification = service.executor().policy().classify(&command_line);
        let mode = args.mode.unwrap_or(config.bash_helper.default_approval_mode);
        println!(
            "{classification} (approval {} under {mode})",
            if service.executor().needs_approval(&command_line, Some(mode)) {
                "required"
            } else {
                "not required"
            }
        );
        return 0;
    }

    let mut command = match &args.cwd {
        Some(dir) => ShellCommand::new(command_line, dir.clone()),
        None => ShellCommand::in_current_dir(command_line),
    };
    if let Some(justification) = &args.justification {
        command = command.with_justification(justification.clone());
    }

    let result = service
        .run_interactive(
            LOCAL_SESSION_ID,
            &command,
            args.timeout_ms.map(Duration::from_millis),
            args.mode,
        )
        .await;

    let mut stdout = io::stdout();
    let _ = stdout.write_all(result.stdout.as_bytes());
    let _ = stdout.flush();
    if !result.stderr.is_empty() {
        let mut stderr = io::stderr();
        let _ = stderr.write_all(result.stderr.as_bytes());
        if !result.stderr.ends_with('\n') {
            let _ = stderr.write_all(b"\n");
        }
    }
    if !result.was_approved {
        warn(color, "command was not run");
    }
    result.exit_code
}

fn warn(color: bool, message: &str) {
    if color {
        eprintln!("{} {message}", "warning:".with(Color::Yellow).bold());
    } else {
        eprintln!("warning: {message}");
    }
}
