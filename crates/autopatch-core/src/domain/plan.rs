//! Modification plan: an ordered set of proposed changes.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::domain::change::{Complexity, ProposedChange};
use crate::domain::error::{AutopatchError, Result};

/// A set of proposed file changes produced for one set of instructions.
///
/// Created once per planning cycle and immutable after validation. Retries
/// never mutate the plan; they patch the validation strategy instead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModificationPlan {
    /// Proposed changes. Application order once `dependencies_sorted` is set.
    pub changes: Vec<ProposedChange>,

    /// Free-text rationale for the plan as a whole.
    pub rationale: String,

    /// Model-estimated complexity of the plan.
    pub estimated_complexity: Complexity,

    /// Set once the dependency orderer has sorted `changes`.
    pub dependencies_sorted: bool,
}

impl ModificationPlan {
    /// Create an unsorted plan.
    pub fn new(
        changes: Vec<ProposedChange>,
        rationale: impl Into<String>,
        estimated_complexity: Complexity,
    ) -> Self {
        Self {
            changes,
            rationale: rationale.into(),
            estimated_complexity,
            dependencies_sorted: false,
        }
    }

    /// Check plan-level invariants: non-empty, unique ids, resolvable
    /// dependencies, and every per-change invariant.
    ///
    /// Acyclicity is the dependency orderer's concern, not checked here.
    pub fn validate(&self) -> Result<()> {
        if self.changes.is_empty() {
            return Err(AutopatchError::InvalidPlan(
                "plan contains no changes".to_string(),
            ));
        }

        let mut ids = HashSet::new();
        for change in &self.changes {
            change.validate()?;
            if !ids.insert(change.id.as_str()) {
                return Err(AutopatchError::InvalidPlan(format!(
                    "duplicate change id '{}'",
                    change.id
                )));
            }
        }

        for change in &self.changes {
            for dep in &change.depends_on {
                if dep == &change.id {
                    return Err(AutopatchError::InvalidPlan(format!(
                        "change '{}' depends on itself",
                        change.id
                    )));
                }
                if !ids.contains(dep.as_str()) {
                    return Err(AutopatchError::InvalidPlan(format!(
                        "change '{}' depends on unknown change '{}'",
                        change.id, dep
                    )));
                }
            }
        }

        Ok(())
    }

    /// Number of distinct files touched by the plan.
    pub fn files_affected(&self) -> usize {
        self.changes
            .iter()
            .map(|c| c.file_path.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    /// One-line per-change summary, used in validation prompts and reports.
    pub fn change_summaries(&self) -> Vec<String> {
        self.changes
            .iter()
            .map(|c| format!("{:?} {} - {}", c.change_type, c.file_path, c.description))
            .collect()
    }
}
