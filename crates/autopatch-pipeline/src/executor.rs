//! Validation execution inside an ephemeral container.
//!
//! Per attempt: build the image, run the build commands, then the test
//! commands, strictly in declaration order. An image build failure
//! short-circuits the attempt. A command timeout becomes a synthetic failed
//! result; later commands in the same category still run, but test commands
//! only run when every build command succeeded.

use std::path::Path;
use std::time::Instant;

use tracing::{info, warn};

use autopatch_core::domain::error::{AutopatchError, Result};
use autopatch_core::domain::execution::{
    AttemptRecord, CommandCategory, CommandExecutionResult,
};
use autopatch_core::domain::strategy::ValidationStrategy;

use crate::container::ContainerRuntime;

/// Default per-command timeout.
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 300;

/// Tuning knobs for the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Independent timeout applied to each command.
    pub command_timeout_secs: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
        }
    }
}

/// Runs one validation strategy against a patched project tree.
pub struct ValidationExecutor<'a> {
    runtime: &'a dyn ContainerRuntime,
    config: ExecutorConfig,
}

impl<'a> ValidationExecutor<'a> {
    /// Create an executor with default configuration.
    pub fn new(runtime: &'a dyn ContainerRuntime) -> Self {
        Self {
            runtime,
            config: ExecutorConfig::default(),
        }
    }

    /// Override the configuration.
    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Execute one attempt of `strategy` against the tree at `project_dir`.
    ///
    /// Commands run strictly sequentially; the attempt record preserves
    /// their declaration order.
    pub async fn execute(
        &self,
        project_dir: &Path,
        strategy: &ValidationStrategy,
        image: &str,
        attempt: u32,
    ) -> Result<AttemptRecord> {
        tokio::fs::write(project_dir.join("Dockerfile"), &strategy.container_spec).await?;

        info!(image = %image, attempt, "building validation image");
        let build = self.runtime.build(project_dir, image).await?;
        if !build.success {
            warn!(image = %image, "image build failed, skipping all commands");
            return Ok(AttemptRecord {
                attempt,
                strategy: strategy.clone(),
                image_built: false,
                results: Vec::new(),
            });
        }

        let mut results = Vec::with_capacity(strategy.command_count());
        self.run_category(
            image,
            &strategy.build_commands,
            CommandCategory::Build,
            &mut results,
        )
        .await;

        let build_ok = results.iter().all(|r| r.success);
        if build_ok {
            self.run_category(
                image,
                &strategy.test_commands,
                CommandCategory::Test,
                &mut results,
            )
            .await;
        } else {
            info!(image = %image, "build commands failed, tests not run");
        }

        let record = AttemptRecord {
            attempt,
            strategy: strategy.clone(),
            image_built: true,
            results,
        };
        info!(
            attempt,
            commands = record.results.len(),
            passed = record.all_passed(),
            "validation attempt finished"
        );
        Ok(record)
    }

    async fn run_category(
        &self,
        image: &str,
        commands: &[String],
        category: CommandCategory,
        results: &mut Vec<CommandExecutionResult>,
    ) {
        let timeout = self.config.command_timeout_secs;
        for command in commands {
            let started = Instant::now();
            let result = match self.runtime.run(image, command, timeout).await {
                Ok(output) => CommandExecutionResult::from_captured(
                    command,
                    category,
                    output.exit_code,
                    &output.stdout,
                    &output.stderr,
                    started.elapsed().as_secs_f64(),
                ),
                Err(AutopatchError::CommandTimeout { .. }) => {
                    warn!(command = %command, category = category.label(), "command timed out");
                    CommandExecutionResult::timed_out(command, category, timeout)
                }
                Err(e) => {
                    // Runtime invocation failure: recorded like a failed
                    // command so the attempt stays diagnosable.
                    warn!(command = %command, error = %e, "command invocation failed");
                    CommandExecutionResult::from_captured(
                        command,
                        category,
                        -1,
                        "",
                        &e.to_string(),
                        started.elapsed().as_secs_f64(),
                    )
                }
            };
            results.push(result);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{ScriptedContainerRuntime, ScriptedRun};
    use autopatch_core::domain::execution::TIMEOUT_EXIT_CODE;

    fn strategy(build: &[&str], test: &[&str]) -> ValidationStrategy {
        ValidationStrategy {
            approach_description: "scripted".to_string(),
            project_type_analysis: "test project".to_string(),
            container_spec: "FROM scratch".to_string(),
            build_commands: build.iter().map(|c| c.to_string()).collect(),
            test_commands: test.iter().map(|c| c.to_string()).collect(),
            expected_outcomes: "all pass".to_string(),
        }
    }

    #[tokio::test]
    async fn test_happy_path_runs_everything_in_order() {
        let runtime = ScriptedContainerRuntime::new();
        let executor = ValidationExecutor::new(&runtime);
        let dir = tempfile::tempdir().expect("tempdir");

        let record = executor
            .execute(dir.path(), &strategy(&["make"], &["make test"]), "img", 1)
            .await
            .expect("execute failed");

        assert!(record.image_built);
        assert!(record.all_passed());
        assert_eq!(
            runtime.run_commands(),
            vec!["make".to_string(), "make test".to_string()]
        );
        assert_eq!(record.results[0].category, CommandCategory::Build);
        assert_eq!(record.results[1].category, CommandCategory::Test);
    }

    #[tokio::test]
    async fn test_dockerfile_written_from_strategy() {
        let runtime = ScriptedContainerRuntime::new();
        let executor = ValidationExecutor::new(&runtime);
        let dir = tempfile::tempdir().expect("tempdir");

        executor
            .execute(dir.path(), &strategy(&["true"], &[]), "img", 1)
            .await
            .expect("execute failed");

        let written = std::fs::read_to_string(dir.path().join("Dockerfile")).expect("read");
        assert_eq!(written, "FROM scratch");
    }

    #[tokio::test]
    async fn test_image_build_failure_short_circuits() {
        let runtime = ScriptedContainerRuntime::new();
        runtime.push_build_failure("no base image");
        let executor = ValidationExecutor::new(&runtime);
        let dir = tempfile::tempdir().expect("tempdir");

        let record = executor
            .execute(dir.path(), &strategy(&["make"], &["make test"]), "img", 1)
            .await
            .expect("execute failed");

        assert!(!record.image_built);
        assert!(record.results.is_empty());
        assert!(runtime.run_commands().is_empty());
        assert!(!record.all_passed());
    }

    #[tokio::test]
    async fn test_failed_build_command_skips_tests() {
        let runtime = ScriptedContainerRuntime::new();
        runtime.push_run(ScriptedRun::fail(2, "compile error"));
        let executor = ValidationExecutor::new(&runtime);
        let dir = tempfile::tempdir().expect("tempdir");

        let record = executor
            .execute(dir.path(), &strategy(&["make"], &["make test"]), "img", 1)
            .await
            .expect("execute failed");

        assert_eq!(record.results.len(), 1);
        assert_eq!(runtime.run_commands(), vec!["make".to_string()]);
        assert!(!record.all_passed());
    }

    #[tokio::test]
    async fn test_timeout_recorded_and_category_continues() {
        let runtime = ScriptedContainerRuntime::new();
        runtime.push_run(ScriptedRun::timeout());
        runtime.push_run(ScriptedRun::ok());
        let executor = ValidationExecutor::new(&runtime).with_config(ExecutorConfig {
            command_timeout_secs: 5,
        });
        let dir = tempfile::tempdir().expect("tempdir");

        let record = executor
            .execute(
                dir.path(),
                &strategy(&["slow-step", "fast-step"], &["never-reached"]),
                "img",
                1,
            )
            .await
            .expect("execute failed");

        // Both build commands ran; the timed-out one is a synthetic failure.
        assert_eq!(record.results.len(), 2);
        assert_eq!(record.results[0].exit_code, TIMEOUT_EXIT_CODE);
        assert!(!record.results[0].success);
        assert!(record.results[1].success);
        // A failed build phase still gates the tests.
        assert_eq!(
            runtime.run_commands(),
            vec!["slow-step".to_string(), "fast-step".to_string()]
        );
    }

    #[tokio::test]
    async fn test_test_only_strategy_runs_tests() {
        let runtime = ScriptedContainerRuntime::new();
        let executor = ValidationExecutor::new(&runtime);
        let dir = tempfile::tempdir().expect("tempdir");

        let record = executor
            .execute(dir.path(), &strategy(&[], &["pytest"]), "img", 1)
            .await
            .expect("execute failed");

        assert!(record.all_passed());
        assert_eq!(runtime.run_commands(), vec!["pytest".to_string()]);
    }
}
