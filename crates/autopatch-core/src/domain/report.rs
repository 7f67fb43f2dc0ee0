//! Final validation report presented to the caller.

use serde::{Deserialize, Serialize};

/// Terminal verdict of a validation run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    /// Validation ran and everything passed.
    Passed,
    /// Validation ran and failed, retries included.
    Failed,
    /// Validation never ran (runtime unavailable or skipped by request).
    Skipped,
}

/// Human-readable summary of a whole validation run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinalValidationReport {
    /// Multi-line narrative of what happened.
    pub summary: String,

    /// Outcome of the build phase ("passed", "failed", "not run").
    pub build_status: String,

    /// Outcome of the test phase, when tests were reached.
    pub test_status: Option<String>,

    /// Follow-up actions suggested to the caller.
    pub recommendations: Vec<String>,

    /// Number of validation attempts executed (0 when skipped).
    pub total_attempts: u32,

    /// Terminal verdict.
    pub verdict: Verdict,
}

impl FinalValidationReport {
    /// Whether validation passed.
    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Passed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_serde() {
        let verdicts = [Verdict::Passed, Verdict::Failed, Verdict::Skipped];
        for verdict in &verdicts {
            let json = serde_json::to_string(verdict).expect("serialize");
            let deserialized: Verdict = serde_json::from_str(&json).expect("deserialize");
            assert_eq!(*verdict, deserialized);
        }
    }

    #[test]
    fn test_report_serde_roundtrip() {
        let report = FinalValidationReport {
            summary: "validation passed after 2 attempts".to_string(),
            build_status: "passed".to_string(),
            test_status: Some("passed".to_string()),
            recommendations: vec!["pin the base image digest".to_string()],
            total_attempts: 2,
            verdict: Verdict::Passed,
        };
        let json = serde_json::to_string(&report).expect("serialize");
        let deserialized: FinalValidationReport =
            serde_json::from_str(&json).expect("deserialize");
        assert_eq!(report, deserialized);
        assert!(report.passed());
    }

    #[test]
    fn test_skipped_report_not_passed() {
        let report = FinalValidationReport {
            summary: "validation did not run".to_string(),
            build_status: "not run".to_string(),
            test_status: None,
            recommendations: Vec::new(),
            total_attempts: 0,
            verdict: Verdict::Skipped,
        };
        assert!(!report.passed());
    }
}
