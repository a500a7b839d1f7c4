//! Structured results returned by every interlock operation.

use std::path::PathBuf;

use serde::Serialize;

use crate::core::types::{ExecutionMode, FatigueReading, ImpactReport, Status};
use crate::io::process::CommandOutput;

/// Captured result of a live command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl From<&CommandOutput> for ExecutionReport {
    fn from(output: &CommandOutput) -> Self {
        Self {
            exit_code: output.exit_code,
            stdout: output.stdout_text(),
            stderr: output.stderr_text(),
            timed_out: output.timed_out,
        }
    }
}

/// Result of a check, execution or write.
///
/// Always carries the fatigue reading that produced it, so a block or override
/// explains itself without the logs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    pub status: Status,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    pub fatigue: FatigueReading,
    pub execution_mode: ExecutionMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution: Option<ExecutionReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impact: Option<ImpactReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub override_instruction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub override_reason: Option<String>,
}

impl Outcome {
    pub fn new(
        status: Status,
        message: impl Into<String>,
        fatigue: FatigueReading,
        execution_mode: ExecutionMode,
    ) -> Self {
        Self {
            status,
            message: message.into(),
            warning: None,
            fatigue,
            execution_mode,
            command: None,
            matched_pattern: None,
            execution: None,
            path: None,
            impact: None,
            review_path: None,
            override_instruction: None,
            override_reason: None,
        }
    }

    pub fn with_warning(mut self, warning: Option<String>) -> Self {
        self.warning = warning;
        self
    }

    pub fn with_command(mut self, command: &str, matched_pattern: Option<&str>) -> Self {
        self.command = Some(command.to_string());
        self.matched_pattern = matched_pattern.map(str::to_string);
        self
    }

    pub fn with_execution(mut self, execution: ExecutionReport) -> Self {
        self.execution = Some(execution);
        self
    }

    pub fn with_write(mut self, path: PathBuf, impact: Option<ImpactReport>) -> Self {
        self.path = Some(path);
        self.impact = impact;
        self
    }

    pub fn with_review_path(mut self, review_path: Option<PathBuf>) -> Self {
        self.review_path = review_path;
        self
    }

    pub fn with_override_instruction(mut self, instruction: String) -> Self {
        self.override_instruction = Some(instruction);
        self
    }

    pub fn with_override_reason(mut self, reason: &str) -> Self {
        self.override_reason = Some(reason.to_string());
        self
    }
}
