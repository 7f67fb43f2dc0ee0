//! Prompt construction for the three model call sites.
//!
//! Every prompt instructs the model to answer with a single JSON document so
//! the strict parser has something to hold it to. File content is truncated
//! head-and-tail beyond a cap to bound prompt size.

use std::fmt::Write as _;

use crate::domain::context::FileContext;
use crate::domain::execution::{AttemptRecord, CommandCategory};
use crate::domain::plan::ModificationPlan;
use crate::domain::strategy::ValidationStrategy;

/// Per-file content cap inside the planning prompt.
pub const MAX_FILE_CHARS: usize = 12_000;

/// System prompt for modification plan generation.
pub const PLAN_SYSTEM_PROMPT: &str = "\
You are a code modification planner. Given source files and an instruction, \
produce a plan of concrete file changes.

Respond with a single JSON object and nothing else (no prose, no markdown \
fence). Shape:
{
  \"changes\": [{
    \"id\": \"c1\",
    \"file_path\": \"relative/path\",
    \"change_type\": \"CREATE\" | \"MODIFY\" | \"DELETE\" | \"RENAME\" | \"REFACTOR\",
    \"description\": \"what and why\",
    \"start_line\": 1, \"end_line\": 10,
    \"new_content\": \"entire new file content\",
    \"old_content\": \"entire previous content (required for MODIFY)\",
    \"depends_on\": [\"ids applied before this one\"],
    \"validation_notes\": \"optional\"
  }],
  \"rationale\": \"plan-level reasoning\",
  \"estimated_complexity\": \"SIMPLE\" | \"MODERATE\" | \"COMPLEX\" | \"CRITICAL\"
}

Rules: new_content always holds the complete file, never a fragment. For \
RENAME, new_content holds the destination path. Escape quotes, newlines and \
backslashes exactly as JSON requires. depends_on must not form a cycle.";

/// System prompt for validation strategy generation.
pub const STRATEGY_SYSTEM_PROMPT: &str = "\
You are a build engineer. Given a project file listing and a summary of \
recent changes, describe how to validate the project inside a container.

Respond with a single JSON object and nothing else. Shape:
{
  \"approach_description\": \"...\",
  \"project_type_analysis\": \"...\",
  \"container_spec\": \"complete Dockerfile body\",
  \"build_commands\": [\"...\"],
  \"test_commands\": [\"...\"],
  \"expected_outcomes\": \"...\"
}

The container spec must copy the project into the image and install every \
toolchain the commands need. Commands run with `sh -c` in declaration order.";

/// System prompt for failure analysis.
pub const ANALYSIS_SYSTEM_PROMPT: &str = "\
You are a build failure analyst. Given a validation strategy and the results \
of running it, diagnose the failure and propose concrete fixes to the \
strategy (not to the project source).

Respond with a single JSON object and nothing else. Shape:
{
  \"overall_status\": \"SUCCESS\" | \"RETRY_NEEDED\" | \"FAILED\",
  \"build_analysis\": \"...\",
  \"test_analysis\": \"... or null\",
  \"error_diagnosis\": \"root cause\",
  \"fix_suggestions\": [{
    \"description\": \"...\",
    \"fix_type\": \"CONTAINER_SPEC_CHANGE\" | \"BUILD_COMMAND_CHANGE\" | \
\"TEST_COMMAND_CHANGE\" | \"DEPENDENCY_FIX\" | \"CONFIGURATION_CHANGE\",
    \"container_spec\": \"replacement or null\",
    \"build_commands\": [\"replacement\"] or null,
    \"test_commands\": [\"replacement\"] or null
  }],
  \"should_retry\": true,
  \"retry_reason\": \"...\"
}

A null override field means the current value is kept. Suggest the smallest \
fix likely to make the next attempt pass.";

/// Build the user prompt for plan generation.
pub fn plan_user_prompt(
    contexts: &[FileContext],
    instructions: &str,
    max_changes: usize,
) -> String {
    let mut prompt = String::new();
    let _ = writeln!(prompt, "## Instruction\n\n{instructions}\n");
    let _ = writeln!(
        prompt,
        "Propose at most {max_changes} changes across the files below.\n"
    );
    let _ = writeln!(prompt, "## Files\n");

    for context in contexts {
        let _ = writeln!(prompt, "### {}", context.header_line());
        if !context.imports.is_empty() {
            let _ = writeln!(prompt, "imports: {}", context.imports.join(", "));
        }
        if !context.types.is_empty() {
            let _ = writeln!(prompt, "types: {}", context.types.join(", "));
        }
        if !context.functions.is_empty() {
            let _ = writeln!(prompt, "functions: {}", context.functions.join(", "));
        }
        let _ = writeln!(
            prompt,
            "```\n{}\n```\n",
            truncate_content(&context.content, MAX_FILE_CHARS)
        );
    }

    prompt
}

/// Build the user prompt for strategy generation.
pub fn strategy_user_prompt(files: &[String], plan: &ModificationPlan) -> String {
    let mut prompt = String::new();
    let _ = writeln!(prompt, "## Project files (truncated listing)\n");
    for file in files {
        let _ = writeln!(prompt, "- {file}");
    }
    let _ = writeln!(prompt, "\n## Applied changes\n");
    for summary in plan.change_summaries() {
        let _ = writeln!(prompt, "- {summary}");
    }
    let _ = writeln!(
        prompt,
        "\nDescribe a container-based validation strategy for this project."
    );
    prompt
}

/// Build the user prompt for result analysis.
pub fn analysis_user_prompt(
    attempt: &AttemptRecord,
    failure_lines: &[String],
    retry_count: u32,
    max_retries: u32,
) -> String {
    let mut prompt = String::new();
    let strategy: &ValidationStrategy = &attempt.strategy;

    let _ = writeln!(prompt, "## Strategy under test\n");
    let _ = writeln!(prompt, "container spec:\n```\n{}\n```", strategy.container_spec);
    let _ = writeln!(prompt, "build commands: {:?}", strategy.build_commands);
    let _ = writeln!(prompt, "test commands: {:?}\n", strategy.test_commands);

    let _ = writeln!(
        prompt,
        "## Attempt {} (retry {retry_count} of {max_retries})\n",
        attempt.attempt
    );
    if !attempt.image_built {
        let _ = writeln!(prompt, "The container image failed to build.\n");
    }
    for result in &attempt.results {
        let _ = writeln!(
            prompt,
            "[{}] `{}` exit {} ({:.1}s)",
            result.category.label(),
            result.command,
            result.exit_code,
            result.duration_seconds
        );
    }

    if !failure_lines.is_empty() {
        let _ = writeln!(prompt, "\n## Captured failure output\n");
        for line in failure_lines {
            let _ = writeln!(prompt, "{line}");
        }
    }

    let build_failures = attempt
        .results_for(CommandCategory::Build)
        .iter()
        .filter(|r| !r.success)
        .count();
    let _ = writeln!(
        prompt,
        "\nDiagnose the failure ({build_failures} build command(s) failed) and \
propose strategy fixes."
    );
    prompt
}

/// Truncate content to `max_chars`, keeping the head and tail halves.
pub fn truncate_content(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        return content.to_string();
    }
    let head: String = content.chars().take(max_chars / 2).collect();
    let tail_rev: String = content.chars().rev().take(max_chars / 2).collect();
    let tail: String = tail_rev.chars().rev().collect();
    format!("{head}\n... [truncated] ...\n{tail}")
}
