//! Shellgate: policy-gated shell execution with approval pause/resume.
//!
//! An agent asks to run shell commands. Each command is classified from its
//! base executable, checked against an approval mode and the session's
//! allow-list, and only then spawned under a hard timeout. When a human has
//! to decide, the agent's turn is snapshotted under an execution id, the
//! request goes out to the remote caller, and the turn resumes on the same
//! stream once the decision comes back.
//!
//! # Quick start
//!
//! ```no_run
//! use shellgate::config::load_config;
//! use shellgate::exec::ShellCommand;
//! use shellgate::service::GateService;
//!
//! # async fn example() -> Result<(), shellgate::error::ConfigError> {
//! let config = load_config(None)?;
//! let service = GateService::from_config(&config);
//! let result = service
//!     .run_interactive("local", &ShellCommand::in_current_dir("ls -la"), None, None)
//!     .await;
//! println!("{}", result.combined_output());
//! # Ok(())
//! # }
//! ```

pub mod approval;
pub mod config;
pub mod continuation;
pub mod error;
pub mod exec;
pub mod logging;
pub mod safety;
pub mod service;
#[cfg(test)]
pub mod testsupport;
pub mod textutil;
pub mod types;
