//! External tool invocation (openssl, certutil).

use std::ffi::OsStr;
use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::error::{Result, StoreError};

/// Captured result of one external tool run.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// Stdout of a successful run; a non-zero exit becomes `StoreError::Tool`.
    pub fn into_stdout(self, program: &Path) -> Result<String> {
        if self.success {
            Ok(self.stdout)
        } else {
            Err(StoreError::tool(
                program.display().to_string(),
                failure_detail(&self.stderr),
            ))
        }
    }
}

/// Trait for running an external program and capturing its output.
pub trait ToolRunner: Send + Sync {
    /// Run `program` with `args` until it exits.
    fn run(&self, program: &Path, args: &[&OsStr]) -> Result<ToolOutput>;
}

/// Runs tools as real child processes.
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn run(&self, program: &Path, args: &[&OsStr]) -> Result<ToolOutput> {
        debug!(program = %program.display(), ?args, "running tool");
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| StoreError::tool(program.display().to_string(), e.to_string()))?;
        Ok(ToolOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

pub(crate) fn failure_detail(stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        "exited with non-zero status".to_string()
    } else {
        stderr.lines().next().unwrap_or(stderr).to_string()
    }
}
