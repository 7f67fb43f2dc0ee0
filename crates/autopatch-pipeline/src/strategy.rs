//! Validation strategy generation for a patched project tree.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use autopatch_core::domain::error::Result;
use autopatch_core::domain::plan::ModificationPlan;
use autopatch_core::domain::strategy::ValidationStrategy;
use autopatch_core::model::ModelClient;
use autopatch_core::{parser, prompts};

/// Cap on the number of files listed in the strategy prompt.
pub const MAX_LISTED_FILES: usize = 50;

/// Directory names excluded from the prompt file listing.
const SKIPPED_DIRS: &[&str] = &["target", "node_modules", "__pycache__"];

/// Generates a [`ValidationStrategy`] for a patched tree.
pub struct StrategyGenerator {
    model: Arc<dyn ModelClient>,
}

impl StrategyGenerator {
    /// Create a generator backed by the given model client.
    pub fn new(model: Arc<dyn ModelClient>) -> Self {
        Self { model }
    }

    /// Ask the model how to validate the tree at `project_dir`.
    ///
    /// One model call; the response goes through the strict parser. The
    /// resulting spec and commands are untrusted text that only ever runs
    /// inside the validation container.
    pub async fn generate(
        &self,
        project_dir: &Path,
        plan: &ModificationPlan,
    ) -> Result<ValidationStrategy> {
        let files = list_project_files(project_dir, MAX_LISTED_FILES)?;
        info!(files = files.len(), "generating validation strategy");

        let user_prompt = prompts::strategy_user_prompt(&files, plan);
        let response = self
            .model
            .complete(prompts::STRATEGY_SYSTEM_PROMPT, &user_prompt)
            .await?;

        let strategy = parser::parse_validation_strategy(&response)?;
        info!(
            build_commands = strategy.build_commands.len(),
            test_commands = strategy.test_commands.len(),
            "validation strategy ready"
        );
        Ok(strategy)
    }
}

/// Sorted relative paths of the project's files, capped at `cap` entries.
fn list_project_files(root: &Path, cap: usize) -> Result<Vec<String>> {
    fn walk(root: &Path, dir: &Path, out: &mut Vec<String>) -> std::io::Result<()> {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if name_str.starts_with('.') || SKIPPED_DIRS.contains(&name_str.as_ref()) {
                continue;
            }

            let path = entry.path();
            if path.is_dir() {
                walk(root, &path, out)?;
            } else if let Ok(relative) = path.strip_prefix(root) {
                out.push(relative.to_string_lossy().to_string());
            }
        }
        Ok(())
    }

    let mut files = Vec::new();
    walk(root, root, &mut files)?;
    files.sort();
    files.truncate(cap);
    Ok(files)
}
