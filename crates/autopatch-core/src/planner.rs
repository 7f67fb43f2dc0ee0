//! Modification plan generation.
//!
//! One prompt over all file contexts, one model call, one strict parse.
//! There is no per-file call loop (cost is bounded by a single request) and
//! no fallback plan: a parse failure surfaces as the typed error so the
//! caller can retry the model request, never proceed with corrupted data.

use std::sync::Arc;

use tracing::info;

use crate::domain::context::FileContext;
use crate::domain::error::Result;
use crate::domain::plan::ModificationPlan;
use crate::model::ModelClient;
use crate::order;
use crate::parser;
use crate::prompts;

/// Generates dependency-sorted modification plans.
pub struct PlanGenerator {
    model: Arc<dyn ModelClient>,
}

impl PlanGenerator {
    /// Create a generator backed by the given model client.
    pub fn new(model: Arc<dyn ModelClient>) -> Self {
        Self { model }
    }

    /// Generate a plan for the instructions over the given file contexts.
    ///
    /// The returned plan is validated, dependency-sorted, and capped at
    /// `max_changes` changes.
    pub async fn generate(
        &self,
        contexts: &[FileContext],
        instructions: &str,
        max_changes: usize,
    ) -> Result<ModificationPlan> {
        info!(files = contexts.len(), max_changes, "generating modification plan");

        let user_prompt = prompts::plan_user_prompt(contexts, instructions, max_changes);
        let response = self
            .model
            .complete(prompts::PLAN_SYSTEM_PROMPT, &user_prompt)
            .await?;

        let plan = parser::parse_modification_plan(&response, max_changes)?;
        let plan = order::sort_plan(plan)?;

        info!(
            changes = plan.changes.len(),
            files = plan.files_affected(),
            complexity = ?plan.estimated_complexity,
            "modification plan ready"
        );
        Ok(plan)
    }
}
