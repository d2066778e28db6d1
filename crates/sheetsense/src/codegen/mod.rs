//! External code-generation tool invocation.
//!
//! The tool is an opaque executable with the command-line contract
//! `<tool> pythonPrompt -p <prompt> -o <output file>`; success is a zero
//! exit code plus an output file on disk.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::error::SynthesisError;

/// Subcommand the tool exposes for prompt-driven code generation.
const GENERATE_SUBCOMMAND: &str = "pythonPrompt";

/// Poll granularity while waiting for the tool to exit.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Generates a code artifact from a natural-language prompt. Implemented by
/// the external tool in production and by stubs in tests.
pub trait CodeSynthesizer: Send + Sync {
    fn synthesize(&self, prompt: &str) -> Result<String, SynthesisError>;
}

/// Drives the configured external executable.
///
/// The output path is fixed per process and rewritten on every call, so
/// synthesis must stay sequential within a run.
pub struct ExternalToolSynthesizer {
    tool_path: PathBuf,
    output_path: PathBuf,
    timeout: Duration,
}

impl ExternalToolSynthesizer {
    pub fn new(tool_path: impl Into<PathBuf>, timeout: Duration) -> Self {
        let output_dir = std::env::temp_dir().join("sheetsense");
        Self {
            tool_path: tool_path.into(),
            output_path: output_dir.join("checkpoint.py"),
            timeout,
        }
    }

    /// Overrides the fixed output file location.
    pub fn with_output_path(
        tool_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Self {
        Self {
            tool_path: tool_path.into(),
            output_path: output_path.into(),
            timeout,
        }
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }
}

impl CodeSynthesizer for ExternalToolSynthesizer {
    fn synthesize(&self, prompt: &str) -> Result<String, SynthesisError> {
        if let Some(dir) = self.output_path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| SynthesisError::Io {
                path: dir.to_path_buf(),
                source: e,
            })?;
        }
        // Stale output from a previous item must not masquerade as success.
        let _ = std::fs::remove_file(&self.output_path);

        debug!(
            "Running {} {} -o {}",
            self.tool_path.display(),
            GENERATE_SUBCOMMAND,
            self.output_path.display()
        );

        let mut child = Command::new(&self.tool_path)
            .arg(GENERATE_SUBCOMMAND)
            .arg("-p")
            .arg(prompt)
            .arg("-o")
            .arg(&self.output_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| SynthesisError::Spawn {
                tool: self.tool_path.clone(),
                source: e,
            })?;

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if Instant::now() >= deadline {
                        warn!(
                            "Code generation tool exceeded {}s, killing",
                            self.timeout.as_secs()
                        );
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(SynthesisError::TimedOut {
                            secs: self.timeout.as_secs(),
                        });
                    }
                    std::thread::sleep(WAIT_POLL_INTERVAL);
                }
                Err(e) => {
                    return Err(SynthesisError::Spawn {
                        tool: self.tool_path.clone(),
                        source: e,
                    })
                }
            }
        };

        if !status.success() {
            return Err(SynthesisError::NonZeroExit {
                code: status.code(),
            });
        }

        if !self.output_path.is_file() {
            return Err(SynthesisError::MissingOutput(self.output_path.clone()));
        }

        std::fs::read_to_string(&self.output_path).map_err(|e| SynthesisError::Io {
            path: self.output_path.clone(),
            source: e,
        })
    }
}
