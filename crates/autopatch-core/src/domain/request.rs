//! Inbound pipeline request.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::error::{AutopatchError, Result};

/// Default cap on the number of changes a plan may propose.
pub const DEFAULT_MAX_CHANGES: usize = 10;

/// One modification request, as submitted by the session layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineRequest {
    /// Root of the project copy the session is working against.
    pub session_path: PathBuf,

    /// Natural-language change instructions.
    pub instructions: String,

    /// Paths (relative to the session root) the caller scoped the change to.
    pub file_scope: Option<Vec<String>>,

    /// Whether containerized validation should run at all.
    pub enable_validation: bool,

    /// Cap on the number of changes the plan may contain.
    pub max_changes: usize,

    /// Skip validation even when the runtime is available.
    pub force_skip_validation: bool,
}

impl PipelineRequest {
    /// Create a request with default validation settings.
    pub fn new(session_path: impl Into<PathBuf>, instructions: impl Into<String>) -> Self {
        Self {
            session_path: session_path.into(),
            instructions: instructions.into(),
            file_scope: None,
            enable_validation: true,
            max_changes: DEFAULT_MAX_CHANGES,
            force_skip_validation: false,
        }
    }

    /// Restrict the change to the given relative paths.
    pub fn with_file_scope(mut self, scope: Vec<String>) -> Self {
        self.file_scope = Some(scope);
        self
    }

    /// Set the plan-size cap.
    pub fn with_max_changes(mut self, max_changes: usize) -> Self {
        self.max_changes = max_changes;
        self
    }

    /// Disable containerized validation.
    pub fn without_validation(mut self) -> Self {
        self.enable_validation = false;
        self
    }

    /// Skip validation regardless of runtime availability.
    pub fn force_skip(mut self) -> Self {
        self.force_skip_validation = true;
        self
    }

    /// Check request invariants before the pipeline starts.
    pub fn validate(&self) -> Result<()> {
        if self.instructions.trim().is_empty() {
            return Err(AutopatchError::InvalidPlan(
                "request instructions cannot be empty".to_string(),
            ));
        }
        if self.max_changes == 0 {
            return Err(AutopatchError::InvalidPlan(
                "max_changes must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let request = PipelineRequest::new("/tmp/session", "rename the config module");
        assert!(request.enable_validation);
        assert!(!request.force_skip_validation);
        assert_eq!(request.max_changes, DEFAULT_MAX_CHANGES);
        assert!(request.file_scope.is_none());
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_request_builders() {
        let request = PipelineRequest::new("/tmp/session", "add retry logic")
            .with_file_scope(vec!["src/client.rs".to_string()])
            .with_max_changes(3)
            .without_validation();
        assert_eq!(request.max_changes, 3);
        assert!(!request.enable_validation);
        assert_eq!(
            request.file_scope.as_deref(),
            Some(&["src/client.rs".to_string()][..])
        );
    }

    #[test]
    fn test_request_rejects_empty_instructions() {
        let request = PipelineRequest::new("/tmp/session", "   ");
        assert!(matches!(
            request.validate(),
            Err(AutopatchError::InvalidPlan(_))
        ));
    }

    #[test]
    fn test_request_rejects_zero_max_changes() {
        let request = PipelineRequest::new("/tmp/session", "do things").with_max_changes(0);
        assert!(matches!(
            request.validate(),
            Err(AutopatchError::InvalidPlan(_))
        ));
    }

    #[test]
    fn test_request_serde_roundtrip() {
        let request = PipelineRequest::new("/tmp/session", "tidy imports").force_skip();
        let json = serde_json::to_string(&request).expect("serialize");
        let deserialized: PipelineRequest = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(request, deserialized);
    }
}
