//! Validation analysis: classified outcome of one attempt.

use serde::{Deserialize, Serialize};

use crate::domain::strategy::FixSuggestion;

/// Classified outcome of a validation attempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallStatus {
    /// Every executed command succeeded.
    Success,
    /// Something failed and the retry budget allows another attempt.
    RetryNeeded,
    /// Something failed and the retry budget is exhausted.
    Failed,
}

/// Diagnosis of one validation attempt, produced by the result analyzer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationAnalysis {
    /// Deterministic classification of the attempt.
    pub overall_status: OverallStatus,

    /// What happened during the build phase.
    pub build_analysis: String,

    /// What happened during the test phase, when tests ran.
    pub test_analysis: Option<String>,

    /// Diagnosed root cause of the failure, if any.
    pub error_diagnosis: Option<String>,

    /// Concrete fixes to the strategy, ordered by preference.
    pub fix_suggestions: Vec<FixSuggestion>,

    /// Whether the orchestrator should run a fix-and-reexecute cycle.
    pub should_retry: bool,

    /// Why a retry is expected to help.
    pub retry_reason: Option<String>,
}

impl ValidationAnalysis {
    /// Analysis for a fully successful attempt.
    pub fn success(build_analysis: impl Into<String>, test_analysis: Option<String>) -> Self {
        Self {
            overall_status: OverallStatus::Success,
            build_analysis: build_analysis.into(),
            test_analysis,
            error_diagnosis: None,
            fix_suggestions: Vec::new(),
            should_retry: false,
            retry_reason: None,
        }
    }

    /// Whether this analysis is terminal for the pipeline run.
    pub fn is_terminal(&self) -> bool {
        !self.should_retry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::strategy::FixType;

    #[test]
    fn test_overall_status_serde() {
        let statuses = [
            OverallStatus::Success,
            OverallStatus::RetryNeeded,
            OverallStatus::Failed,
        ];
        for status in &statuses {
            let json = serde_json::to_string(status).expect("serialize");
            let deserialized: OverallStatus = serde_json::from_str(&json).expect("deserialize");
            assert_eq!(*status, deserialized);
        }
        assert_eq!(
            serde_json::to_string(&OverallStatus::RetryNeeded).expect("serialize"),
            "\"RETRY_NEEDED\""
        );
    }

    #[test]
    fn test_success_analysis_is_terminal() {
        let analysis = ValidationAnalysis::success("2 build commands passed", None);
        assert_eq!(analysis.overall_status, OverallStatus::Success);
        assert!(analysis.is_terminal());
        assert!(analysis.fix_suggestions.is_empty());
    }

    #[test]
    fn test_analysis_serde_roundtrip() {
        let analysis = ValidationAnalysis {
            overall_status: OverallStatus::RetryNeeded,
            build_analysis: "build passed".to_string(),
            test_analysis: Some("1 of 3 test commands failed".to_string()),
            error_diagnosis: Some("missing system dependency libssl".to_string()),
            fix_suggestions: vec![FixSuggestion {
                description: "install libssl-dev in the image".to_string(),
                fix_type: FixType::ContainerSpecChange,
                container_spec: Some("FROM rust:1.75\nRUN apt-get install -y libssl-dev".to_string()),
                build_commands: None,
                test_commands: None,
            }],
            should_retry: true,
            retry_reason: Some("container is missing a system package".to_string()),
        };

        let json = serde_json::to_string(&analysis).expect("serialize");
        let deserialized: ValidationAnalysis = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(analysis, deserialized);
        assert!(!analysis.is_terminal());
    }
}
