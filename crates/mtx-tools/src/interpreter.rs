//! The seam between the tool surface and a text-generation service.

use std::io::ErrorKind;
use std::process::Stdio;
use std::sync::Mutex;

use async_trait::async_trait;
use mtx_types::{FlatMap, PageId};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use crate::error::{ToolError, ToolResult};
use crate::prompt::{parse_proposals, render_prompt};

/// Everything an interpreter sees for one instruction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterpretRequest {
    pub page_id: PageId,
    pub instruction: String,
    /// Every leaf of the page, in document order.
    pub content: FlatMap,
}

/// One edit proposed by an interpreter.
///
/// `expected_old_value` is the value the interpreter based the edit on;
/// `None` means the field is expected not to exist yet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposedChange {
    pub path: String,
    #[serde(default)]
    pub expected_old_value: Option<String>,
    pub new_value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

impl ProposedChange {
    pub fn new(
        path: impl Into<String>,
        expected_old_value: Option<&str>,
        new_value: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            expected_old_value: expected_old_value.map(str::to_string),
            new_value: new_value.into(),
            rationale: None,
        }
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }
}

/// Turns a natural-language instruction into an ordered list of edits.
#[async_trait]
pub trait Interpreter: Send + Sync {
    async fn interpret(&self, request: &InterpretRequest) -> ToolResult<Vec<ProposedChange>>;
}

// ---------------------------------------------------------------------------
// FixedInterpreter
// ---------------------------------------------------------------------------

/// Returns the same proposals for every request and remembers what it was
/// asked.
#[derive(Debug, Default)]
pub struct FixedInterpreter {
    proposals: Vec<ProposedChange>,
    requests: Mutex<Vec<InterpretRequest>>,
}

impl FixedInterpreter {
    pub fn new(proposals: Vec<ProposedChange>) -> Self {
        Self {
            proposals,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Build from a raw model reply, as [`parse_proposals`] reads it.
    pub fn from_reply(reply: &str) -> ToolResult<Self> {
        Ok(Self::new(parse_proposals(reply)?))
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<InterpretRequest> {
        self.requests.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl Interpreter for FixedInterpreter {
    async fn interpret(&self, request: &InterpretRequest) -> ToolResult<Vec<ProposedChange>> {
        self.requests
            .lock()
            .expect("lock poisoned")
            .push(request.clone());
        Ok(self.proposals.clone())
    }
}

// ---------------------------------------------------------------------------
// CommandInterpreter
// ---------------------------------------------------------------------------

/// Runs an external program for each request.
///
/// The rendered prompt is written to the program's stdin and its stdout is
/// parsed as the reply. A non-zero exit is an [`ToolError::Interpreter`].
#[derive(Clone, Debug)]
pub struct CommandInterpreter {
    program: String,
    args: Vec<String>,
}

impl CommandInterpreter {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build from `[program, args...]`.
    pub fn from_argv(argv: &[String]) -> ToolResult<Self> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| ToolError::Validation("interpreter command is empty".into()))?;
        Ok(Self::new(program.clone(), args.to_vec()))
    }
}

#[async_trait]
impl Interpreter for CommandInterpreter {
    async fn interpret(&self, request: &InterpretRequest) -> ToolResult<Vec<ProposedChange>> {
        let prompt = render_prompt(request);
        let spawn_err =
            |e: std::io::Error| ToolError::Interpreter(format!("{}: {e}", self.program));

        let mut child = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(spawn_err)?;

        // Feed stdin while stdout is drained so neither pipe can fill up.
        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(prompt.as_bytes()).await?;
            }
            Ok::<_, std::io::Error>(())
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output.map_err(spawn_err)?;
        if !output.status.success() {
            return Err(ToolError::Interpreter(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        match fed {
            Err(e) if e.kind() != ErrorKind::BrokenPipe => return Err(spawn_err(e)),
            _ => {}
        }

        tracing::debug!(
            program = %self.program,
            bytes = output.stdout.len(),
            "interpreter replied"
        );
        parse_proposals(&String::from_utf8_lossy(&output.stdout))
    }
}
