//! Pipeline orchestration: plan, patch, validate, retry, report.
//!
//! The orchestrator is the only component that owns mutable run state: the
//! retry counter, the current strategy, and the attempt history. Stages are
//! an explicit enum with one transition function, so every path through the
//! run is statically enumerable. Cleanup of scratch trees and built images
//! runs on every exit path, deadline expiry included.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use autopatch_core::analyzer::ResultAnalyzer;
use autopatch_core::domain::analysis::ValidationAnalysis;
use autopatch_core::domain::change::Complexity;
use autopatch_core::domain::context::FileContext;
use autopatch_core::domain::error::{AutopatchError, Result};
use autopatch_core::domain::execution::AttemptRecord;
use autopatch_core::domain::plan::ModificationPlan;
use autopatch_core::domain::report::{FinalValidationReport, Verdict};
use autopatch_core::domain::request::PipelineRequest;
use autopatch_core::domain::strategy::ValidationStrategy;
use autopatch_core::model::ModelClient;
use autopatch_core::patch::{self, PatchedTree};
use autopatch_core::planner::PlanGenerator;
use autopatch_core::reporter;

use crate::container::{unique_image_name, ContainerRuntime};
use crate::executor::{ExecutorConfig, ValidationExecutor};
use crate::strategy::StrategyGenerator;

/// Default bound on fix-and-reexecute cycles.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Orchestrator configuration; all knobs are explicit, nothing ambient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Maximum fix-and-reexecute cycles after the first attempt.
    pub max_retries: u32,

    /// Per-command timeout inside the container.
    pub command_timeout_secs: u64,

    /// Overall deadline for one run; cleanup still runs on expiry.
    pub deadline: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            command_timeout_secs: crate::executor::DEFAULT_COMMAND_TIMEOUT_SECS,
            deadline: None,
        }
    }
}

/// Top-level outcome of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineResult {
    /// Unique id of this run.
    pub run_id: String,

    /// Whether the run produced an applied plan and validation did not fail.
    pub success: bool,

    /// The plan that was applied, when planning succeeded.
    pub plan: Option<ModificationPlan>,

    /// Final validation report, when the run reached reporting.
    pub report: Option<FinalValidationReport>,

    /// Number of changes in the plan.
    pub total_changes: usize,

    /// Number of distinct files the plan touches.
    pub files_affected: usize,

    /// Plan complexity, when a plan exists.
    pub complexity: Option<Complexity>,

    /// Human-readable error for failed runs.
    pub error: Option<String>,

    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// Total wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

/// Pipeline stages; the transition function lives in `run_inner`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    CheckAvailable,
    Plan,
    Patch,
    Strategy,
    Execute,
    Analyze,
    ApplyFix,
    Report,
    Done,
}

/// Mutable state owned exclusively by the orchestrator for one run.
struct RunState {
    run_id: Uuid,
    plan: Option<ModificationPlan>,
    tree: Option<PatchedTree>,
    strategy: Option<ValidationStrategy>,
    analysis: Option<ValidationAnalysis>,
    report: Option<FinalValidationReport>,
    history: Vec<AttemptRecord>,
    retry_count: u32,
    built_images: Vec<String>,
    skip_reason: Option<String>,
}

impl RunState {
    fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            plan: None,
            tree: None,
            strategy: None,
            analysis: None,
            report: None,
            history: Vec::new(),
            retry_count: 0,
            built_images: Vec::new(),
            skip_reason: None,
        }
    }
}

/// Sequences one modification request through planning, patching,
/// containerized validation, and bounded retries.
pub struct PipelineOrchestrator {
    model: Arc<dyn ModelClient>,
    runtime: Arc<dyn ContainerRuntime>,
    config: PipelineConfig,
}

impl PipelineOrchestrator {
    /// Create an orchestrator over the given collaborators.
    pub fn new(
        model: Arc<dyn ModelClient>,
        runtime: Arc<dyn ContainerRuntime>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            model,
            runtime,
            config,
        }
    }

    /// Run one request to a terminal result.
    ///
    /// Never panics and never leaks resources: scratch trees and built
    /// images are released whether the run succeeds, fails, errors, or hits
    /// its deadline.
    pub async fn run(
        &self,
        request: &PipelineRequest,
        contexts: &[FileContext],
    ) -> PipelineResult {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let started = Instant::now();
        let mut state = RunState::new(run_id);

        info!(run_id = %run_id, session = %request.session_path.display(), "starting pipeline run");

        let outcome = match self.config.deadline {
            Some(deadline) => {
                match tokio::time::timeout(deadline, self.run_inner(request, contexts, &mut state))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(AutopatchError::DeadlineExceeded {
                        deadline_secs: deadline.as_secs(),
                    }),
                }
            }
            None => self.run_inner(request, contexts, &mut state).await,
        };

        self.cleanup(&mut state).await;
        self.finish(state, outcome, started_at, started)
    }

    async fn run_inner(
        &self,
        request: &PipelineRequest,
        contexts: &[FileContext],
        state: &mut RunState,
    ) -> Result<()> {
        request.validate()?;

        let planner = PlanGenerator::new(self.model.clone());
        let strategy_generator = StrategyGenerator::new(self.model.clone());
        let analyzer = ResultAnalyzer::new(self.model.clone());
        let executor = ValidationExecutor::new(self.runtime.as_ref()).with_config(ExecutorConfig {
            command_timeout_secs: self.config.command_timeout_secs,
        });

        let mut stage = Stage::CheckAvailable;
        loop {
            stage = match stage {
                Stage::CheckAvailable => {
                    if request.force_skip_validation {
                        state.skip_reason = Some("validation skipped by request".to_string());
                    } else if !request.enable_validation {
                        state.skip_reason = Some("validation disabled for this run".to_string());
                    } else if !self.runtime.check_available().await {
                        warn!(run_id = %state.run_id, "container runtime unavailable, validation will be skipped");
                        state.skip_reason = Some(
                            AutopatchError::ContainerUnavailable(
                                "runtime not available on this host".to_string(),
                            )
                            .to_string(),
                        );
                    }
                    Stage::Plan
                }

                Stage::Plan => {
                    let plan = planner
                        .generate(contexts, &request.instructions, request.max_changes)
                        .await?;
                    state.plan = Some(plan);
                    Stage::Patch
                }

                Stage::Patch => {
                    let Some(plan) = state.plan.as_ref() else {
                        return Err(AutopatchError::InvalidPlan(
                            "pipeline reached Patch without a plan".to_string(),
                        ));
                    };
                    state.tree = Some(patch::apply_plan(plan, &request.session_path)?);
                    if state.skip_reason.is_some() {
                        Stage::Report
                    } else {
                        Stage::Strategy
                    }
                }

                Stage::Strategy => {
                    let (Some(plan), Some(tree)) = (state.plan.as_ref(), state.tree.as_ref())
                    else {
                        return Err(AutopatchError::InvalidPlan(
                            "pipeline reached Strategy without a patched tree".to_string(),
                        ));
                    };
                    state.strategy = Some(strategy_generator.generate(tree.path(), plan).await?);
                    Stage::Execute
                }

                Stage::Execute => {
                    let (Some(tree), Some(strategy)) =
                        (state.tree.as_ref(), state.strategy.as_ref())
                    else {
                        return Err(AutopatchError::InvalidPlan(
                            "pipeline reached Execute without a strategy".to_string(),
                        ));
                    };
                    let attempt = state.history.len() as u32 + 1;
                    let image = format!(
                        "{}-a{attempt}",
                        unique_image_name(&request.session_path, &state.run_id)
                    );
                    // Register before building so cleanup catches images from
                    // interrupted builds too.
                    state.built_images.push(image.clone());

                    let record = executor.execute(tree.path(), strategy, &image, attempt).await?;
                    state.history.push(record);
                    Stage::Analyze
                }

                Stage::Analyze => {
                    let Some(attempt) = state.history.last() else {
                        return Err(AutopatchError::InvalidPlan(
                            "pipeline reached Analyze without an attempt".to_string(),
                        ));
                    };
                    let analysis = analyzer
                        .analyze(attempt, state.retry_count, self.config.max_retries)
                        .await?;
                    let retry = analysis.should_retry;
                    state.analysis = Some(analysis);
                    if retry {
                        Stage::ApplyFix
                    } else {
                        Stage::Report
                    }
                }

                Stage::ApplyFix => {
                    let fix = state
                        .analysis
                        .as_ref()
                        .and_then(|a| a.fix_suggestions.first().cloned());
                    let Some(current) = state.strategy.take() else {
                        return Err(AutopatchError::InvalidPlan(
                            "pipeline reached ApplyFix without a strategy".to_string(),
                        ));
                    };
                    state.strategy = Some(match fix {
                        Some(fix) => {
                            info!(
                                run_id = %state.run_id,
                                fix_type = ?fix.fix_type,
                                "applying strategy fix before retry"
                            );
                            current.with_fix(&fix)
                        }
                        None => {
                            info!(run_id = %state.run_id, "no fix suggested, retrying unchanged strategy");
                            current
                        }
                    });
                    state.retry_count += 1;
                    Stage::Execute
                }

                Stage::Report => {
                    state.report = Some(match (&state.skip_reason, &state.analysis) {
                        (Some(reason), _) => reporter::skipped_report(reason),
                        (None, Some(analysis)) => {
                            reporter::report_from_analysis(analysis, &state.history)
                        }
                        (None, None) => {
                            // Unreachable by construction; report it rather
                            // than inventing an analysis.
                            reporter::skipped_report("validation produced no analysis")
                        }
                    });
                    Stage::Done
                }

                Stage::Done => return Ok(()),
            };
        }
    }

    /// Release every resource the run claimed. Failures are logged, never
    /// propagated: cleanup runs on error paths too.
    async fn cleanup(&self, state: &mut RunState) {
        for image in state.built_images.drain(..) {
            if let Err(e) = self.runtime.remove_image(&image).await {
                warn!(image = %image, error = %e, "failed to remove validation image");
            }
        }
        if state.tree.take().is_some() {
            // Dropping the PatchedTree removes the scratch directory.
            info!(run_id = %state.run_id, "scratch tree released");
        }
    }

    fn finish(
        &self,
        state: RunState,
        outcome: Result<()>,
        started_at: DateTime<Utc>,
        started: Instant,
    ) -> PipelineResult {
        let duration_ms = started.elapsed().as_millis() as u64;
        let run_id = state.run_id.to_string();
        let total_changes = state.plan.as_ref().map_or(0, |p| p.changes.len());
        let files_affected = state.plan.as_ref().map_or(0, |p| p.files_affected());
        let complexity = state.plan.as_ref().map(|p| p.estimated_complexity);

        match outcome {
            Ok(()) => {
                let failed = state
                    .report
                    .as_ref()
                    .is_some_and(|r| r.verdict == Verdict::Failed);
                let error = if failed {
                    let attempts = state.history.len() as u32;
                    let last_error = state
                        .analysis
                        .as_ref()
                        .and_then(|a| a.error_diagnosis.clone())
                        .unwrap_or_else(|| "validation failed".to_string());
                    Some(
                        AutopatchError::RetryLimitExceeded {
                            attempts,
                            last_error,
                        }
                        .to_string(),
                    )
                } else {
                    None
                };

                info!(run_id = %run_id, success = !failed, duration_ms, "pipeline run finished");
                PipelineResult {
                    run_id,
                    success: !failed,
                    plan: state.plan,
                    report: state.report,
                    total_changes,
                    files_affected,
                    complexity,
                    error,
                    started_at,
                    duration_ms,
                }
            }
            Err(e) => {
                error!(run_id = %run_id, error = %e, "pipeline run errored");
                PipelineResult {
                    run_id,
                    success: false,
                    plan: state.plan,
                    report: state.report,
                    total_changes,
                    files_affected,
                    complexity,
                    error: Some(e.to_string()),
                    started_at,
                    duration_ms,
                }
            }
        }
    }
}
