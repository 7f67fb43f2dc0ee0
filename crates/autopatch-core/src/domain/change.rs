//! Proposed change types and per-change validation.

use serde::{Deserialize, Serialize};

use crate::domain::error::{AutopatchError, Result};

/// Kind of file operation a change performs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeType {
    /// Create a new file; the target must not already exist.
    Create,
    /// Replace an existing file's content.
    Modify,
    /// Remove a file (idempotent if already absent).
    Delete,
    /// Move a file; `new_content` carries the destination path.
    Rename,
    /// Restructure an existing file; same application semantics as Modify.
    Refactor,
}

/// Estimated complexity of an entire modification plan.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
    Critical,
}

/// A single proposed file edit within a modification plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProposedChange {
    /// Identifier, unique within the plan.
    pub id: String,

    /// Target path, relative to the project root.
    pub file_path: String,

    /// Operation to perform.
    pub change_type: ChangeType,

    /// Human-readable description of the edit.
    pub description: String,

    /// Advisory start line (1-based, inclusive). Not a patch primitive:
    /// application always replaces the whole file.
    pub start_line: Option<u32>,

    /// Advisory end line (1-based, inclusive).
    pub end_line: Option<u32>,

    /// New file content (Create/Modify/Refactor) or destination path (Rename).
    pub new_content: Option<String>,

    /// Prior content, required for Modify so reviewers can verify the edit.
    pub old_content: Option<String>,

    /// Ids of changes that must be applied before this one.
    pub depends_on: Vec<String>,

    /// Free-form notes for the validation stage.
    pub validation_notes: Option<String>,
}

impl ProposedChange {
    /// Create a change with only the required fields set.
    pub fn new(
        id: impl Into<String>,
        file_path: impl Into<String>,
        change_type: ChangeType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            file_path: file_path.into(),
            change_type,
            description: description.into(),
            start_line: None,
            end_line: None,
            new_content: None,
            old_content: None,
            depends_on: Vec::new(),
            validation_notes: None,
        }
    }

    /// Set the new content (or rename destination).
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.new_content = Some(content.into());
        self
    }

    /// Set the prior content for verification.
    pub fn with_old_content(mut self, content: impl Into<String>) -> Self {
        self.old_content = Some(content.into());
        self
    }

    /// Set the advisory line range.
    pub fn with_line_range(mut self, start: u32, end: u32) -> Self {
        self.start_line = Some(start);
        self.end_line = Some(end);
        self
    }

    /// Set dependency ids.
    pub fn with_depends_on(mut self, ids: Vec<String>) -> Self {
        self.depends_on = ids;
        self
    }

    /// Set validation notes.
    pub fn with_validation_notes(mut self, notes: impl Into<String>) -> Self {
        self.validation_notes = Some(notes.into());
        self
    }

    /// Check per-change invariants.
    ///
    /// Plan-level invariants (id uniqueness, dependency resolution and
    /// acyclicity) are checked by the plan and the dependency orderer.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(AutopatchError::InvalidPlan(
                "change id cannot be empty".to_string(),
            ));
        }
        if self.file_path.trim().is_empty() {
            return Err(AutopatchError::InvalidPlan(format!(
                "change '{}' has an empty file path",
                self.id
            )));
        }

        match (self.start_line, self.end_line) {
            (Some(start), Some(end)) if start > end => {
                return Err(AutopatchError::InvalidPlan(format!(
                    "change '{}' has start_line {} > end_line {}",
                    self.id, start, end
                )));
            }
            (Some(_), None) | (None, Some(_)) => {
                return Err(AutopatchError::InvalidPlan(format!(
                    "change '{}' sets only one end of its line range",
                    self.id
                )));
            }
            _ => {}
        }

        match self.change_type {
            ChangeType::Create | ChangeType::Modify | ChangeType::Refactor => {
                if self.new_content.is_none() {
                    return Err(AutopatchError::InvalidPlan(format!(
                        "change '{}' ({:?}) is missing new_content",
                        self.id, self.change_type
                    )));
                }
                if self.change_type == ChangeType::Modify && self.old_content.is_none() {
                    return Err(AutopatchError::InvalidPlan(format!(
                        "change '{}' (Modify) is missing old_content",
                        self.id
                    )));
                }
            }
            ChangeType::Rename => {
                let dest_ok = self
                    .new_content
                    .as_deref()
                    .is_some_and(|d| !d.trim().is_empty());
                if !dest_ok {
                    return Err(AutopatchError::InvalidPlan(format!(
                        "change '{}' (Rename) is missing a destination path in new_content",
                        self.id
                    )));
                }
            }
            ChangeType::Delete => {}
        }

        Ok(())
    }
}
