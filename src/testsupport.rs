//! Shared test fixtures for execution and continuation test modules.
//!
//! Stand-ins for the two seams the crate talks through (process spawning
//! and the turn controller), plus a scratch directory helper.

use crate::approval::ApprovalRequest;
use crate::continuation::{
    ContinuationRequest, ExecutionParams, ResultItem, RuntimeState, SharedRuntimeState,
    StreamEvent, StreamSink, TurnController, TurnState,
};
use crate::error::{ControllerError, ProcessError};
use crate::exec::{ExecOutput, ProcessRunner};
use crate::types::Message;
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;

static TEST_DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Temporary directory fixture with best-effort cleanup.
#[derive(Debug)]
pub struct TestTempDir {
    path: PathBuf,
}

impl TestTempDir {
    pub fn new(prefix: &str) -> Self {
        let suffix = TEST_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let dir = std::env::temp_dir().join(format!("shellgate-{prefix}-{millis}-{suffix}"));
        fs::create_dir_all(&dir).expect("failed to create temporary fixture directory");
        Self { path: dir }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write UTF-8 text to a child path, creating parent directories as needed.
    pub fn write_text(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.path.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create parent directories for fixture");
        }
        fs::write(&path, content).expect("failed to write fixture file");
        path
    }
}

impl Drop for TestTempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

/// Process runner that never spawns anything and counts its calls.
#[derive(Debug, Default)]
pub struct CountingRunner {
    stdout: String,
    calls: AtomicUsize,
}

impl CountingRunner {
    /// Every run exits 0 with `stdout`.
    pub fn succeeding(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn invocations(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProcessRunner for CountingRunner {
    async fn run(
        &self,
        _command: &str,
        _cwd: &Path,
        _limit: Duration,
    ) -> Result<ExecOutput, ProcessError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ExecOutput {
            exit_code: 0,
            stdout: self.stdout.clone(),
            stderr: String::new(),
        })
    }
}

/// Turn controller that records every continuation it is handed.
///
/// On success it streams its reply on the request's sink, then `Done`.
#[derive(Debug, Clone)]
pub struct RecordingController {
    outcome: Result<String, String>,
    seen: Arc<Mutex<Vec<ContinuationRequest>>>,
}

impl RecordingController {
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            outcome: Ok(reply.into()),
            seen: Arc::default(),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            outcome: Err(message.into()),
            seen: Arc::default(),
        }
    }

    pub fn requests(&self) -> Vec<ContinuationRequest> {
        self.seen.lock().expect("recording lock").clone()
    }
}

#[async_trait]
impl TurnController for RecordingController {
    async fn continue_turn(
        &self,
        request: ContinuationRequest,
    ) -> Result<Vec<Message>, ControllerError> {
        self.seen.lock().expect("recording lock").push(request.clone());
        match &self.outcome {
            Ok(reply) => {
                let _ = request.sink.send(StreamEvent::Text(reply.clone()));
                let _ = request.sink.send(StreamEvent::Done);
                Ok(vec![Message::assistant(reply.clone())])
            }
            Err(message) => Err(ControllerError::new(message.clone())),
        }
    }
}

/// Owned state of one live turn, lent out as a [`TurnState`].
pub struct TurnFixture {
    pub session_id: String,
    pub messages: Vec<Message>,
    pub params: ExecutionParams,
    pub runtime_state: SharedRuntimeState,
    pub sink: StreamSink,
    pub events: mpsc::UnboundedReceiver<StreamEvent>,
    pub controller: Arc<dyn TurnController>,
}

impl TurnFixture {
    pub fn new(controller: impl TurnController + 'static) -> Self {
        let (sink, events) = mpsc::unbounded_channel();
        Self {
            session_id: "session-1".to_string(),
            messages: vec![
                Message::system("You are a helpful assistant."),
                Message::user("clean the build directory"),
                Message::assistant("I'll remove it."),
            ],
            params: ExecutionParams {
                thread_id: 7,
                model: "test-model".to_string(),
                temperature: 0.2,
                max_output_tokens: Some(512),
                helpers: vec!["bash".to_string()],
                ..ExecutionParams::default()
            },
            runtime_state: Arc::new(tokio::sync::Mutex::new(RuntimeState::default())),
            sink,
            events,
            controller: Arc::new(controller),
        }
    }

    pub fn turn(&self) -> TurnState<'_> {
        TurnState {
            session_id: &self.session_id,
            messages: &self.messages,
            params: &self.params,
            runtime_state: &self.runtime_state,
            sink: &self.sink,
            controller: &self.controller,
        }
    }

    /// A text result followed by an unregistered approval sentinel for `command`.
    pub fn pending_results(&self, command: &str) -> Vec<ResultItem> {
        vec![
            ResultItem::Text("checked build directory".to_string()),
            ResultItem::ApprovalRequest(ApprovalRequest::new(
                command,
                "/tmp",
                Some("cleanup requested by user".to_string()),
            )),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_dir_fixture_writes_and_cleans_up() {
        let root;
        {
            let fixture = TestTempDir::new("fixture");
            let file = fixture.write_text("nested/file.txt", "hello");
            assert_eq!(fs::read_to_string(file).unwrap(), "hello");
            root = fixture.path().to_path_buf();
        }
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn counting_runner_counts_without_spawning() {
        let runner = CountingRunner::succeeding("hi");
        let out = runner
            .run("rm -rf /", Path::new("/"), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(out.stdout, "hi");
        assert_eq!(runner.invocations(), 1);
    }
}
