//! Strict parser for structured model responses.
//!
//! The single translation boundary between untrusted model text and typed
//! domain objects. The model is instructed to return one JSON document,
//! optionally wrapped in fenced code markup, which is stripped before
//! parsing. There is deliberately no best-effort text-scraping fallback:
//! content fields hold code with escaped quotes and embedded newlines, and a
//! non-escape-aware matcher truncates them silently. Any failure raises
//! [`AutopatchError::PlanParse`] carrying a truncated copy of the input so
//! the caller can retry the upstream request with a stricter prompt.

use serde::Deserialize;

use crate::domain::analysis::{OverallStatus, ValidationAnalysis};
use crate::domain::change::{ChangeType, Complexity, ProposedChange};
use crate::domain::error::{AutopatchError, Result};
use crate::domain::plan::ModificationPlan;
use crate::domain::strategy::{FixSuggestion, FixType, ValidationStrategy};

/// Strip a leading/trailing markdown code fence from a response.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let inner = if let Some(rest) = trimmed.strip_prefix("```json") {
        rest
    } else if let Some(rest) = trimmed.strip_prefix("```") {
        rest
    } else {
        trimmed
    };
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    inner.trim()
}

fn decode<'a, T: Deserialize<'a>>(cleaned: &'a str, original: &str, what: &str) -> Result<T> {
    serde_json::from_str(cleaned)
        .map_err(|e| AutopatchError::plan_parse(format!("{what}: {e}"), original))
}

// ---------------------------------------------------------------------------
// Raw document shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawPlan {
    changes: Vec<RawChange>,
    #[serde(default)]
    rationale: String,
    estimated_complexity: Complexity,
}

#[derive(Debug, Deserialize)]
struct RawChange {
    id: String,
    file_path: String,
    change_type: ChangeType,
    #[serde(default)]
    description: String,
    start_line: Option<u32>,
    end_line: Option<u32>,
    new_content: Option<String>,
    old_content: Option<String>,
    #[serde(default)]
    depends_on: Vec<String>,
    validation_notes: Option<String>,
}

impl From<RawChange> for ProposedChange {
    fn from(raw: RawChange) -> Self {
        ProposedChange {
            id: raw.id,
            file_path: raw.file_path,
            change_type: raw.change_type,
            description: raw.description,
            start_line: raw.start_line,
            end_line: raw.end_line,
            new_content: raw.new_content,
            old_content: raw.old_content,
            depends_on: raw.depends_on,
            validation_notes: raw.validation_notes,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawStrategy {
    #[serde(default)]
    approach_description: String,
    #[serde(default)]
    project_type_analysis: String,
    container_spec: String,
    #[serde(default)]
    build_commands: Vec<String>,
    #[serde(default)]
    test_commands: Vec<String>,
    #[serde(default)]
    expected_outcomes: String,
}

#[derive(Debug, Deserialize)]
struct RawAnalysis {
    overall_status: OverallStatus,
    #[serde(default)]
    build_analysis: String,
    test_analysis: Option<String>,
    error_diagnosis: Option<String>,
    #[serde(default)]
    fix_suggestions: Vec<RawFix>,
    #[serde(default)]
    should_retry: bool,
    retry_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawFix {
    description: String,
    fix_type: FixType,
    container_spec: Option<String>,
    build_commands: Option<Vec<String>>,
    test_commands: Option<Vec<String>>,
}

impl From<RawFix> for FixSuggestion {
    fn from(raw: RawFix) -> Self {
        FixSuggestion {
            description: raw.description,
            fix_type: raw.fix_type,
            container_spec: raw.container_spec,
            build_commands: raw.build_commands,
            test_commands: raw.test_commands,
        }
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Parse a modification plan, enforcing the plan-size cap and every plan
/// invariant the parser can check without the filesystem.
pub fn parse_modification_plan(text: &str, max_changes: usize) -> Result<ModificationPlan> {
    let cleaned = strip_code_fences(text);
    let raw: RawPlan = decode(cleaned, text, "modification plan")?;

    if raw.changes.len() > max_changes {
        return Err(AutopatchError::plan_parse(
            format!(
                "plan proposes {} changes, more than the allowed {}",
                raw.changes.len(),
                max_changes
            ),
            text,
        ));
    }

    let plan = ModificationPlan::new(
        raw.changes.into_iter().map(ProposedChange::from).collect(),
        raw.rationale,
        raw.estimated_complexity,
    );
    plan.validate()
        .map_err(|e| AutopatchError::plan_parse(e.to_string(), text))?;
    Ok(plan)
}

/// Parse a validation strategy document.
pub fn parse_validation_strategy(text: &str) -> Result<ValidationStrategy> {
    let cleaned = strip_code_fences(text);
    let raw: RawStrategy = decode(cleaned, text, "validation strategy")?;

    if raw.container_spec.trim().is_empty() {
        return Err(AutopatchError::plan_parse(
            "strategy has an empty container_spec",
            text,
        ));
    }
    if raw.build_commands.is_empty() && raw.test_commands.is_empty() {
        return Err(AutopatchError::plan_parse(
            "strategy declares no build or test commands",
            text,
        ));
    }

    Ok(ValidationStrategy {
        approach_description: raw.approach_description,
        project_type_analysis: raw.project_type_analysis,
        container_spec: raw.container_spec,
        build_commands: raw.build_commands,
        test_commands: raw.test_commands,
        expected_outcomes: raw.expected_outcomes,
    })
}

/// Parse a validation analysis document.
///
/// The result analyzer treats the model's status fields as advisory and
/// re-derives them from the execution results; this function only guarantees
/// the document is well-formed and typed.
pub fn parse_validation_analysis(text: &str) -> Result<ValidationAnalysis> {
    let cleaned = strip_code_fences(text);
    let raw: RawAnalysis = decode(cleaned, text, "validation analysis")?;

    Ok(ValidationAnalysis {
        overall_status: raw.overall_status,
        build_analysis: raw.build_analysis,
        test_analysis: raw.test_analysis,
        error_diagnosis: raw.error_diagnosis,
        fix_suggestions: raw.fix_suggestions.into_iter().map(FixSuggestion::from).collect(),
        should_retry: raw.should_retry,
        retry_reason: raw.retry_reason,
    })
}
