//! Running external command-line tools (tesseract, pdftotext, ocrmypdf).
//!
//! Every invocation carries a timeout and kills the child when the future is
//! dropped, so an abandoned request never leaves a tool running.

use std::ffi::OsStr;
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Errors from an external tool invocation.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("External tool not found: {0}")]
    NotFound(String),

    #[error("{tool} failed: {stderr}")]
    Failed { tool: String, stderr: String },

    #[error("{tool} timed out after {secs}s")]
    TimedOut { tool: String, secs: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A command-line tool with its install hint.
#[derive(Debug, Clone, Copy)]
pub struct Tool {
    pub program: &'static str,
    pub install_hint: &'static str,
}

pub const TESSERACT: Tool = Tool {
    program: "tesseract",
    install_hint: "tesseract (install tesseract-ocr)",
};

pub const PDFTOTEXT: Tool = Tool {
    program: "pdftotext",
    install_hint: "pdftotext (install poppler-utils)",
};

pub const OCRMYPDF: Tool = Tool {
    program: "ocrmypdf",
    install_hint: "ocrmypdf (install ocrmypdf)",
};

impl Tool {
    /// Run the tool, optionally feeding `stdin`, and return its stdout.
    pub async fn run<I, S>(
        &self,
        args: I,
        stdin: Option<&[u8]>,
        timeout: Duration,
    ) -> Result<String, ToolError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(self.program);
        cmd.args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let run = async {
            let mut child = cmd.spawn().map_err(|e| self.spawn_error(e))?;

            if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
                pipe.write_all(input).await?;
                // Dropping the pipe closes stdin so the tool sees EOF.
            }

            let output = child.wait_with_output().await?;
            if output.status.success() {
                Ok(String::from_utf8_lossy(&output.stdout).to_string())
            } else {
                Err(ToolError::Failed {
                    tool: self.program.to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                })
            }
        };

        match tokio::time::timeout(timeout, run).await {
            Ok(result) => result,
            Err(_) => Err(ToolError::TimedOut {
                tool: self.program.to_string(),
                secs: timeout.as_secs(),
            }),
        }
    }

    fn spawn_error(&self, e: std::io::Error) -> ToolError {
        if e.kind() == std::io::ErrorKind::NotFound {
            ToolError::NotFound(self.install_hint.to_string())
        } else {
            ToolError::Io(e)
        }
    }
}
