//! Result analysis: classify an attempt and propose strategy fixes.
//!
//! The status decision is deterministic and computed here, never delegated:
//! all commands passed means Success, anything else means RetryNeeded or
//! Failed depending on the remaining retry budget. The model is consulted
//! only for the diagnosis and fix suggestions when a retry will happen, and
//! its own status fields are treated as advisory.

use std::sync::{Arc, OnceLock};

use regex::Regex;
use tracing::{info, warn};

use crate::domain::analysis::{OverallStatus, ValidationAnalysis};
use crate::domain::error::Result;
use crate::domain::execution::{AttemptRecord, CommandCategory};
use crate::model::ModelClient;
use crate::parser;
use crate::prompts;

/// Lines matching this pattern in failed command output are treated as
/// failure evidence.
const FAILURE_LINE_PATTERN: &str =
    r"(?i)\b(error|failed|failure|panic|fatal|unresolved|timed out|cannot find|no such file)\b";

fn failure_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(FAILURE_LINE_PATTERN).expect("static failure-line pattern"))
}

/// Tuning knobs for the analyzer.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerConfig {
    /// Cap on failure-evidence lines fed to the model and kept in analyses.
    pub max_failure_lines: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            max_failure_lines: 20,
        }
    }
}

/// Classifies attempt outcomes and collects fix suggestions.
pub struct ResultAnalyzer {
    model: Arc<dyn ModelClient>,
    config: AnalyzerConfig,
}

impl ResultAnalyzer {
    /// Create an analyzer with default configuration.
    pub fn new(model: Arc<dyn ModelClient>) -> Self {
        Self {
            model,
            config: AnalyzerConfig::default(),
        }
    }

    /// Override the configuration.
    pub fn with_config(mut self, config: AnalyzerConfig) -> Self {
        self.config = config;
        self
    }

    /// Analyze one attempt against the retry budget.
    pub async fn analyze(
        &self,
        attempt: &AttemptRecord,
        retry_count: u32,
        max_retries: u32,
    ) -> Result<ValidationAnalysis> {
        let build_analysis = self.build_phase_summary(attempt);
        let test_analysis = self.test_phase_summary(attempt);

        if attempt.all_passed() {
            info!(attempt = attempt.attempt, "validation attempt passed");
            return Ok(ValidationAnalysis::success(build_analysis, test_analysis));
        }

        let failure_lines = extract_failure_lines(attempt, self.config.max_failure_lines);
        let retries_left = retry_count < max_retries;

        if !retries_left {
            info!(
                attempt = attempt.attempt,
                retry_count, "retry budget exhausted, attempt is terminal"
            );
            return Ok(ValidationAnalysis {
                overall_status: OverallStatus::Failed,
                build_analysis,
                test_analysis,
                error_diagnosis: Some(terminal_diagnosis(attempt, &failure_lines)),
                fix_suggestions: Vec::new(),
                should_retry: false,
                retry_reason: None,
            });
        }

        // A retry will happen; ask the model what to change. The diagnosis
        // is best-effort: a failed call or parse degrades to a retry with an
        // unchanged strategy rather than fabricated data.
        let prompt =
            prompts::analysis_user_prompt(attempt, &failure_lines, retry_count, max_retries);
        let parsed = match self.model.complete(prompts::ANALYSIS_SYSTEM_PROMPT, &prompt).await {
            Ok(response) => match parser::parse_validation_analysis(&response) {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    warn!(error = %e, "analysis response unusable, retrying without a fix");
                    None
                }
            },
            Err(e) => {
                warn!(error = %e, "analysis model call failed, retrying without a fix");
                None
            }
        };

        let (error_diagnosis, fix_suggestions, retry_reason) = match parsed {
            Some(parsed) => (
                parsed
                    .error_diagnosis
                    .or_else(|| Some(terminal_diagnosis(attempt, &failure_lines))),
                parsed.fix_suggestions,
                parsed
                    .retry_reason
                    .or_else(|| Some("strategy fix suggested by analysis".to_string())),
            ),
            None => (
                Some(terminal_diagnosis(attempt, &failure_lines)),
                Vec::new(),
                Some("diagnosis unavailable, retrying with unchanged strategy".to_string()),
            ),
        };

        Ok(ValidationAnalysis {
            overall_status: OverallStatus::RetryNeeded,
            build_analysis,
            test_analysis,
            error_diagnosis,
            fix_suggestions,
            should_retry: true,
            retry_reason,
        })
    }

    fn build_phase_summary(&self, attempt: &AttemptRecord) -> String {
        if !attempt.image_built {
            return "container image failed to build; no commands ran".to_string();
        }
        let results = attempt.results_for(CommandCategory::Build);
        let failed = results.iter().filter(|r| !r.success).count();
        if results.is_empty() {
            "no build commands declared".to_string()
        } else if failed == 0 {
            format!("all {} build command(s) succeeded", results.len())
        } else {
            format!("{failed} of {} build command(s) failed", results.len())
        }
    }

    fn test_phase_summary(&self, attempt: &AttemptRecord) -> Option<String> {
        let results = attempt.results_for(CommandCategory::Test);
        if results.is_empty() {
            return None;
        }
        let failed = results.iter().filter(|r| !r.success).count();
        Some(if failed == 0 {
            format!("all {} test command(s) succeeded", results.len())
        } else {
            format!("{failed} of {} test command(s) failed", results.len())
        })
    }
}

/// Pull candidate failure lines out of failed command output, capped.
pub fn extract_failure_lines(attempt: &AttemptRecord, cap: usize) -> Vec<String> {
    let regex = failure_line_regex();
    let mut lines = Vec::new();

    for result in attempt.failures() {
        for line in result.stderr.iter().chain(result.stdout.iter()) {
            if regex.is_match(line) {
                lines.push(format!("[{}] {}", result.command, line.trim()));
                if lines.len() >= cap {
                    return lines;
                }
            }
        }
    }
    lines
}

fn terminal_diagnosis(attempt: &AttemptRecord, failure_lines: &[String]) -> String {
    if !attempt.image_built {
        return "container image build failed".to_string();
    }
    match failure_lines.first() {
        Some(line) => line.clone(),
        None => format!("{} command(s) failed without captured output", attempt.failures().len()),
    }
}
