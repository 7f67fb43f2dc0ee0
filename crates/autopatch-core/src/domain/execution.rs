//! Command execution results and per-attempt records.

use serde::{Deserialize, Serialize};

use crate::domain::strategy::ValidationStrategy;

/// Synthetic exit code recorded for a timed-out command (shell `timeout`
/// convention), so timeouts stay distinguishable from ordinary failures.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// Which phase of an attempt a command belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CommandCategory {
    Build,
    Test,
}

impl CommandCategory {
    /// Lowercase label for logs and reports.
    pub fn label(&self) -> &'static str {
        match self {
            CommandCategory::Build => "build",
            CommandCategory::Test => "test",
        }
    }
}

/// Outcome of one command run inside the validation container.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandExecutionResult {
    /// The command as declared in the strategy.
    pub command: String,

    /// Build or test phase.
    pub category: CommandCategory,

    /// Whether the command exited 0.
    pub success: bool,

    /// Exit code; [`TIMEOUT_EXIT_CODE`] for timeouts, -1 when no code exists.
    pub exit_code: i32,

    /// Captured stdout, split into lines.
    pub stdout: Vec<String>,

    /// Captured stderr, split into lines.
    pub stderr: Vec<String>,

    /// Wall-clock duration in seconds.
    pub duration_seconds: f64,
}

impl CommandExecutionResult {
    /// Build a result from captured process output.
    pub fn from_captured(
        command: impl Into<String>,
        category: CommandCategory,
        exit_code: i32,
        stdout: &str,
        stderr: &str,
        duration_seconds: f64,
    ) -> Self {
        Self {
            command: command.into(),
            category,
            success: exit_code == 0,
            exit_code,
            stdout: split_lines(stdout),
            stderr: split_lines(stderr),
            duration_seconds,
        }
    }

    /// Build the synthetic failed result recorded for a timeout.
    pub fn timed_out(
        command: impl Into<String>,
        category: CommandCategory,
        timeout_secs: u64,
    ) -> Self {
        let command = command.into();
        let note = format!(
            "command '{}' timed out after {} seconds",
            command, timeout_secs
        );
        Self {
            command,
            category,
            success: false,
            exit_code: TIMEOUT_EXIT_CODE,
            stdout: Vec::new(),
            stderr: vec![note],
            duration_seconds: timeout_secs as f64,
        }
    }
}

fn split_lines(text: &str) -> Vec<String> {
    if text.is_empty() {
        Vec::new()
    } else {
        text.lines().map(str::to_string).collect()
    }
}

/// Everything one validation attempt produced, kept for diagnosis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttemptRecord {
    /// Attempt number, 1-based.
    pub attempt: u32,

    /// The strategy this attempt executed (fixes produce new strategies,
    /// so each record keeps its own).
    pub strategy: ValidationStrategy,

    /// Whether the container image built successfully.
    pub image_built: bool,

    /// Per-command results in execution order.
    pub results: Vec<CommandExecutionResult>,
}

impl AttemptRecord {
    /// Whether the image built and every executed command succeeded.
    pub fn all_passed(&self) -> bool {
        self.image_built && self.results.iter().all(|r| r.success)
    }

    /// Results for one category, in execution order.
    pub fn results_for(&self, category: CommandCategory) -> Vec<&CommandExecutionResult> {
        self.results
            .iter()
            .filter(|r| r.category == category)
            .collect()
    }

    /// Failed results across both categories.
    pub fn failures(&self) -> Vec<&CommandExecutionResult> {
        self.results.iter().filter(|r| !r.success).collect()
    }
}
