//! Final report generation.
//!
//! Pure functions of the terminal analysis (or skip reason) and the attempt
//! history. No model call and no side effects; safe to call repeatedly.

use std::fmt::Write as _;

use crate::domain::analysis::{OverallStatus, ValidationAnalysis};
use crate::domain::execution::{AttemptRecord, CommandCategory};
use crate::domain::report::{FinalValidationReport, Verdict};

/// Build the final report for a run whose validation executed.
pub fn report_from_analysis(
    analysis: &ValidationAnalysis,
    history: &[AttemptRecord],
) -> FinalValidationReport {
    let total_attempts = history.len() as u32;
    let verdict = match analysis.overall_status {
        OverallStatus::Success => Verdict::Passed,
        // RetryNeeded is not a terminal status; reporting one means the
        // orchestrator stopped early, which reads as a failure.
        OverallStatus::RetryNeeded | OverallStatus::Failed => Verdict::Failed,
    };

    let last = history.last();
    let build_status = match last {
        None => "not run".to_string(),
        Some(attempt) if !attempt.image_built => "image build failed".to_string(),
        Some(attempt) => phase_status(attempt, CommandCategory::Build),
    };
    let test_status = last.and_then(|attempt| {
        if attempt.results_for(CommandCategory::Test).is_empty() {
            None
        } else {
            Some(phase_status(attempt, CommandCategory::Test))
        }
    });

    let mut summary = String::new();
    match verdict {
        Verdict::Passed => {
            let _ = write!(summary, "Validation passed after {total_attempts} attempt(s).");
        }
        Verdict::Failed => {
            let _ = write!(summary, "Validation failed after {total_attempts} attempt(s).");
        }
        Verdict::Skipped => {}
    }
    let _ = write!(summary, " Build: {build_status}.");
    if let Some(test) = &test_status {
        let _ = write!(summary, " Tests: {test}.");
    }
    if let Some(diagnosis) = &analysis.error_diagnosis {
        let _ = write!(summary, " Diagnosis: {diagnosis}");
    }

    let mut recommendations: Vec<String> = analysis
        .fix_suggestions
        .iter()
        .map(|f| f.description.clone())
        .collect();
    if verdict == Verdict::Failed {
        recommendations
            .push("review the diagnosed cause and revise the plan or instructions".to_string());
    }

    FinalValidationReport {
        summary,
        build_status,
        test_status,
        recommendations,
        total_attempts,
        verdict,
    }
}

/// Build the report for a run whose validation never executed.
pub fn skipped_report(reason: &str) -> FinalValidationReport {
    FinalValidationReport {
        summary: format!("Validation did not run: {reason}."),
        build_status: "not run".to_string(),
        test_status: None,
        recommendations: vec!["run the pipeline with validation enabled before merging".to_string()],
        total_attempts: 0,
        verdict: Verdict::Skipped,
    }
}

fn phase_status(attempt: &AttemptRecord, category: CommandCategory) -> String {
    let results = attempt.results_for(category);
    let failed = results.iter().filter(|r| !r.success).count();
    if results.is_empty() {
        "not run".to_string()
    } else if failed == 0 {
        "passed".to_string()
    } else {
        format!("failed ({failed} of {} command(s))", results.len())
    }
}
