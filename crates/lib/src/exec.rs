//! Subprocess execution for skill scripts. Each skill runs inside its own
//! uv-managed project environment. No shell is used; arguments are passed as
//! a discrete list to avoid injection.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::SkillError;

/// Environment variable that switches an entry point into introspection mode:
/// when set, the script must print its argument schema to stdout and exit 0
/// without performing its normal action.
pub const SCHEMA_ENV_VAR: &str = "SATCHEL_PRINT_SCHEMA";

/// One bounded invocation of a skill script.
#[derive(Debug, Clone)]
pub struct RunSpec {
    /// Skill unit directory; doubles as the uv project for dependency isolation.
    pub project_dir: PathBuf,
    /// Path of the script file to run.
    pub script: PathBuf,
    /// Caller-supplied arguments, appended verbatim.
    pub argv: Vec<String>,
    /// When Some, piped to the child's stdin; when None, stdin is closed
    /// (never inherited, so a script reading stdin cannot block the broker).
    pub stdin: Option<String>,
    /// Introspection mode: sets [`SCHEMA_ENV_VAR`] on the child only.
    pub emit_schema: bool,
}

/// Outcome of a run. A nonzero exit code is data, not an error.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub command: Vec<String>,
    pub returncode: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Narrow capability interface over subprocess execution so discovery,
/// rendering, and the broker can be tested against a fake runner.
#[async_trait]
pub trait ScriptRunner: Send + Sync {
    async fn run(&self, spec: RunSpec) -> Result<ExecutionResult, SkillError>;
}

/// Runs scripts via `uv run --project <skill dir> python <script> [argv...]`.
pub struct UvScriptRunner {
    uv_bin: String,
    timeout: Option<Duration>,
}

impl UvScriptRunner {
    pub fn new(uv_bin: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            uv_bin: uv_bin.into(),
            timeout,
        }
    }
}

impl Default for UvScriptRunner {
    fn default() -> Self {
        Self::new("uv", Some(Duration::from_secs(120)))
    }
}

#[async_trait]
impl ScriptRunner for UvScriptRunner {
    async fn run(&self, spec: RunSpec) -> Result<ExecutionResult, SkillError> {
        let label = spec
            .script
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("script")
            .to_string();
        let command = build_command(&self.uv_bin, &spec);
        run_command(command, spec.stdin, spec.emit_schema, self.timeout, &label).await
    }
}

/// Invocation shape: isolated-environment wrapper, the unit's own project,
/// the script file, then the caller's argv tokens unmodified.
fn build_command(uv_bin: &str, spec: &RunSpec) -> Vec<String> {
    let mut command = vec![
        uv_bin.to_string(),
        "run".to_string(),
        "--project".to_string(),
        spec.project_dir.display().to_string(),
        "python".to_string(),
        spec.script.display().to_string(),
    ];
    command.extend(spec.argv.iter().cloned());
    command
}

/// Spawn `command`, wire stdio, wait for exit, and capture output fully.
/// The child is killed when the deadline expires or the caller is cancelled.
async fn run_command(
    command: Vec<String>,
    stdin: Option<String>,
    emit_schema: bool,
    timeout: Option<Duration>,
    label: &str,
) -> Result<ExecutionResult, SkillError> {
    let mut cmd = Command::new(&command[0]);
    cmd.args(&command[1..])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .kill_on_drop(true);
    if emit_schema {
        cmd.env(SCHEMA_ENV_VAR, "1");
    }

    let mut child = cmd.spawn().map_err(|e| SkillError::Spawn {
        program: command[0].clone(),
        source: e,
    })?;

    if let Some(text) = stdin {
        if let Some(mut pipe) = child.stdin.take() {
            // Written concurrently with the wait below so a child that fills
            // its stdout pipe before draining stdin cannot deadlock us.
            tokio::spawn(async move {
                let _ = pipe.write_all(text.as_bytes()).await;
                let _ = pipe.shutdown().await;
            });
        }
    }

    let wait = child.wait_with_output();
    let output = match timeout {
        Some(limit) => match tokio::time::timeout(limit, wait).await {
            Ok(res) => res,
            // Dropping the wait future drops the child, which kills it.
            Err(_) => {
                return Err(SkillError::Timeout {
                    script: label.to_string(),
                    timeout_secs: limit.as_secs(),
                })
            }
        },
        None => wait.await,
    }
    .map_err(|e| SkillError::io(&command[0], e))?;

    Ok(ExecutionResult {
        command,
        returncode: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}
