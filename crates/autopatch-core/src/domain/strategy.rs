//! Validation strategy and fix-suggestion types.

use serde::{Deserialize, Serialize};

/// Container image spec plus build/test commands used to validate a plan.
///
/// Owned by exactly one validation attempt. Applying a fix produces a new
/// strategy value via [`ValidationStrategy::with_fix`]; earlier attempts keep
/// their strategies intact for diagnosis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationStrategy {
    /// How the model intends to validate the project.
    pub approach_description: String,

    /// What kind of project the model detected (toolchain, layout).
    pub project_type_analysis: String,

    /// Dockerfile body used to build the validation image.
    pub container_spec: String,

    /// Build commands, run in order inside the container.
    pub build_commands: Vec<String>,

    /// Test commands, run in order after all build commands succeed.
    pub test_commands: Vec<String>,

    /// What successful validation should look like.
    pub expected_outcomes: String,
}

impl ValidationStrategy {
    /// Return a copy with the suggestion's non-`None` fields substituted.
    ///
    /// Fields the suggestion leaves as `None` carry over unchanged, so a fix
    /// can target the container spec alone without restating the commands.
    pub fn with_fix(&self, fix: &FixSuggestion) -> ValidationStrategy {
        ValidationStrategy {
            approach_description: self.approach_description.clone(),
            project_type_analysis: self.project_type_analysis.clone(),
            container_spec: fix
                .container_spec
                .clone()
                .unwrap_or_else(|| self.container_spec.clone()),
            build_commands: fix
                .build_commands
                .clone()
                .unwrap_or_else(|| self.build_commands.clone()),
            test_commands: fix
                .test_commands
                .clone()
                .unwrap_or_else(|| self.test_commands.clone()),
            expected_outcomes: self.expected_outcomes.clone(),
        }
    }

    /// Total number of commands this strategy will run.
    pub fn command_count(&self) -> usize {
        self.build_commands.len() + self.test_commands.len()
    }
}

/// Which part of a strategy a fix targets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FixType {
    ContainerSpecChange,
    BuildCommandChange,
    TestCommandChange,
    DependencyFix,
    ConfigurationChange,
}

/// A concrete fix proposed by the result analyzer.
///
/// Override fields are nullable; `None` means "no change to this field".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FixSuggestion {
    /// What the fix does and why it should help.
    pub description: String,

    /// Category of the fix.
    pub fix_type: FixType,

    /// Replacement Dockerfile body, if the image is at fault.
    pub container_spec: Option<String>,

    /// Replacement build command list.
    pub build_commands: Option<Vec<String>>,

    /// Replacement test command list.
    pub test_commands: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_strategy() -> ValidationStrategy {
        ValidationStrategy {
            approach_description: "build then run the unit tests".to_string(),
            project_type_analysis: "cargo workspace".to_string(),
            container_spec: "FROM rust:1.75\nWORKDIR /app\nCOPY . .".to_string(),
            build_commands: vec!["cargo build".to_string()],
            test_commands: vec!["cargo test".to_string()],
            expected_outcomes: "all commands exit 0".to_string(),
        }
    }

    #[test]
    fn test_strategy_serde_roundtrip() {
        let strategy = sample_strategy();
        let json = serde_json::to_string(&strategy).expect("serialize");
        let deserialized: ValidationStrategy = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(strategy, deserialized);
    }

    #[test]
    fn test_fix_type_serde() {
        let kinds = [
            FixType::ContainerSpecChange,
            FixType::BuildCommandChange,
            FixType::TestCommandChange,
            FixType::DependencyFix,
            FixType::ConfigurationChange,
        ];
        for kind in &kinds {
            let json = serde_json::to_string(kind).expect("serialize");
            let deserialized: FixType = serde_json::from_str(&json).expect("deserialize");
            assert_eq!(*kind, deserialized);
        }
    }

    #[test]
    fn test_with_fix_replaces_only_overridden_fields() {
        let strategy = sample_strategy();
        let fix = FixSuggestion {
            description: "pin the toolchain image".to_string(),
            fix_type: FixType::ContainerSpecChange,
            container_spec: Some("FROM rust:1.80\nWORKDIR /app\nCOPY . .".to_string()),
            build_commands: None,
            test_commands: None,
        };

        let fixed = strategy.with_fix(&fix);

        assert!(fixed.container_spec.contains("rust:1.80"));
        assert_eq!(fixed.build_commands, strategy.build_commands);
        assert_eq!(fixed.test_commands, strategy.test_commands);
        // The original value is untouched.
        assert!(strategy.container_spec.contains("rust:1.75"));
    }

    #[test]
    fn test_with_fix_replaces_command_lists() {
        let strategy = sample_strategy();
        let fix = FixSuggestion {
            description: "skip doctests, they need network access".to_string(),
            fix_type: FixType::TestCommandChange,
            container_spec: None,
            build_commands: None,
            test_commands: Some(vec!["cargo test --lib".to_string()]),
        };

        let fixed = strategy.with_fix(&fix);

        assert_eq!(fixed.test_commands, vec!["cargo test --lib".to_string()]);
        assert_eq!(fixed.container_spec, strategy.container_spec);
    }

    #[test]
    fn test_command_count() {
        assert_eq!(sample_strategy().command_count(), 2);
    }
}
