//! Domain model for the autopatch pipeline.
//!
//! Core entities, one family per module:
//! - `ProposedChange` / `ModificationPlan`: typed file edits and their plan
//! - `ValidationStrategy` / `FixSuggestion`: how a plan gets validated
//! - `CommandExecutionResult` / `AttemptRecord`: what an attempt produced
//! - `ValidationAnalysis`: classified outcome of an attempt
//! - `FinalValidationReport`: terminal summary for the caller
//! - `PipelineRequest` / `FileContext`: the inbound boundary

pub mod analysis;
pub mod change;
pub mod context;
pub mod error;
pub mod execution;
pub mod plan;
pub mod report;
pub mod request;
pub mod strategy;

pub use analysis::{OverallStatus, ValidationAnalysis};
pub use change::{ChangeType, Complexity, ProposedChange};
pub use context::FileContext;
pub use error::{AutopatchError, Result};
pub use execution::{
    AttemptRecord, CommandCategory, CommandExecutionResult, TIMEOUT_EXIT_CODE,
};
pub use plan::ModificationPlan;
pub use report::{FinalValidationReport, Verdict};
pub use request::{PipelineRequest, DEFAULT_MAX_CHANGES};
pub use strategy::{FixSuggestion, FixType, ValidationStrategy};
