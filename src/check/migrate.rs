//! Migration tool invocation

use anyhow::{anyhow, Result};
use std::process::Command;
use tracing::info;

use super::error::CheckError;

/// Output of a finished migration run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationOutput {
    pub stdout: String,
}

/// Applies all pending migrations with the declarative migration tool
pub trait MigrationRunner {
    fn apply_pending(&self) -> Result<MigrationOutput, CheckError>;
}

/// Runs the migration tool as a subprocess
#[derive(Debug, Clone)]
pub struct CommandRunner {
    program: String,
    args: Vec<String>,
}

impl CommandRunner {
    /// Build a runner from a whitespace-separated command line
    pub fn from_command_line(command: &str) -> Result<Self> {
        let mut parts = command.split_whitespace().map(|s| s.to_string());
        let program = parts
            .next()
            .ok_or_else(|| anyhow!("Migration command is empty"))?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }

    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(|s| s.as_str()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl MigrationRunner for CommandRunner {
    fn apply_pending(&self) -> Result<MigrationOutput, CheckError> {
        info!("running `{}`", self.command_line());

        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .map_err(|e| {
                CheckError::Migration(format!("Failed to run `{}`: {}", self.command_line(), e))
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = if stderr.trim().is_empty() {
                stdout.trim()
            } else {
                stderr.trim()
            };
            let code = output
                .status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            return Err(CheckError::Migration(format!(
                "`{}` exited with {}: {}",
                self.command_line(),
                code,
                detail
            )));
        }

        Ok(MigrationOutput { stdout })
    }
}
