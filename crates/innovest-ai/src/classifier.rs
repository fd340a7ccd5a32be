//! Text classifiers the advisor can consult.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::AdvisorError;

/// Prompt in, raw completion text out.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Identifier of the underlying model; part of every cache key.
    fn model(&self) -> &str;

    async fn complete(&self, prompt: &str) -> Result<String, AdvisorError>;
}

/// Runs a local command with the prompt on stdin and takes its stdout as the
/// completion.
#[derive(Debug, Clone)]
pub struct CommandClassifier {
    program: String,
    args: Vec<String>,
    model: String,
}

impl CommandClassifier {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        let program = program.into();
        Self {
            model: program.clone(),
            program,
            args,
        }
    }

    /// Split a whitespace-separated command line. `None` when it is blank.
    pub fn from_command_line(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self::new(program, parts.collect()))
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl Classifier for CommandClassifier {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, AdvisorError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| AdvisorError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        // A command that exits without reading its input is judged by its status.
        if let Some(mut stdin) = child.stdin.take()
            && let Err(e) = stdin.write_all(prompt.as_bytes()).await
            && e.kind() != std::io::ErrorKind::BrokenPipe
        {
            return Err(e.into());
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(AdvisorError::CommandFailed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        debug!(program = %self.program, bytes = output.stdout.len(), "classifier responded");
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
