//! Domain-level error taxonomy for autopatch.

use thiserror::Error;

/// How many characters of raw model output an error may carry for logging.
pub const RAW_PREVIEW_LIMIT: usize = 240;

/// Autopatch domain errors.
#[derive(Debug, Error)]
pub enum AutopatchError {
    /// Model output could not be parsed into a typed document.
    ///
    /// Always fatal to the current attempt; the caller retries the upstream
    /// model request instead of proceeding with degraded data.
    #[error("plan parse failed: {message} (response preview: {raw_preview:?})")]
    PlanParse {
        message: String,
        raw_preview: String,
    },

    /// The plan's `depends_on` graph contains a cycle.
    #[error("dependency cycle involving changes {change_ids:?}")]
    CyclicDependency { change_ids: Vec<String> },

    /// A single change failed to apply; the rest of the plan was aborted.
    #[error("failed to apply change '{change_id}' to {file_path}: {reason}")]
    PatchApplication {
        change_id: String,
        file_path: String,
        reason: String,
    },

    /// A command exceeded its per-command timeout.
    ///
    /// Recorded as a failed execution result by the executor; never fatal
    /// to the pipeline on its own.
    #[error("command '{command}' timed out after {timeout_secs} seconds")]
    CommandTimeout { command: String, timeout_secs: u64 },

    /// The container runtime is not usable; validation is skipped.
    #[error("container runtime unavailable: {0}")]
    ContainerUnavailable(String),

    /// The fix-and-reexecute budget is exhausted.
    #[error("retry limit exceeded after {attempts} attempts: {last_error}")]
    RetryLimitExceeded { attempts: u32, last_error: String },

    /// The caller-supplied overall deadline expired.
    #[error("pipeline deadline of {deadline_secs} seconds exceeded")]
    DeadlineExceeded { deadline_secs: u64 },

    /// A structurally valid document that violates plan invariants.
    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    /// The model request itself failed (transport, HTTP status, empty body).
    #[error("model request failed: {0}")]
    Model(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AutopatchError {
    /// Build a [`AutopatchError::PlanParse`] carrying a truncated copy of the
    /// offending model output.
    pub fn plan_parse(message: impl Into<String>, raw: &str) -> Self {
        AutopatchError::PlanParse {
            message: message.into(),
            raw_preview: truncate_preview(raw, RAW_PREVIEW_LIMIT),
        }
    }
}

/// Truncate text to `limit` characters for inclusion in errors and logs.
pub fn truncate_preview(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        text.to_string()
    } else {
        let head: String = text.chars().take(limit).collect();
        format!("{head}...")
    }
}

/// Result type for autopatch domain operations.
pub type Result<T> = std::result::Result<T, AutopatchError>;
