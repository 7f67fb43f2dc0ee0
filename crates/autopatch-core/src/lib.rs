//! Autopatch Core Library
//!
//! Domain model and orchestration-free logic for the autopatch pipeline:
//! plan parsing, dependency ordering, patch application, result analysis,
//! and report generation. Process execution and pipeline sequencing live in
//! `autopatch-pipeline`.

pub mod analyzer;
pub mod domain;
pub mod model;
pub mod order;
pub mod parser;
pub mod patch;
pub mod planner;
pub mod prompts;
pub mod reporter;
pub mod telemetry;
pub mod testing;

pub use domain::{
    AttemptRecord, AutopatchError, ChangeType, CommandCategory, CommandExecutionResult,
    Complexity, FileContext, FinalValidationReport, FixSuggestion, FixType, ModificationPlan,
    OverallStatus, PipelineRequest, ProposedChange, Result, ValidationAnalysis,
    ValidationStrategy, Verdict, DEFAULT_MAX_CHANGES, TIMEOUT_EXIT_CODE,
};

pub use analyzer::{AnalyzerConfig, ResultAnalyzer};
pub use model::{HttpModelClient, ModelClient, ModelConfig};
pub use order::{sort_changes, sort_plan};
pub use parser::{parse_modification_plan, parse_validation_analysis, parse_validation_strategy};
pub use patch::{apply_plan, PatchedTree};
pub use planner::PlanGenerator;
pub use reporter::{report_from_analysis, skipped_report};
pub use telemetry::init_tracing;

/// Autopatch version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
