//! In-memory container runtime fake for tests.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use autopatch_core::domain::error::{AutopatchError, Result};

use crate::container::{BuildOutput, ContainerRuntime, RunOutput};

/// One scripted response for a `run` call.
#[derive(Debug, Clone)]
pub struct ScriptedRun {
    exit_code: i32,
    stdout: String,
    stderr: String,
    timed_out: bool,
}

impl ScriptedRun {
    /// A command that exits 0.
    pub fn ok() -> Self {
        Self {
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
            timed_out: false,
        }
    }

    /// A command that fails with the given exit code and stderr.
    pub fn fail(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
            timed_out: false,
        }
    }

    /// A command that hits its timeout.
    pub fn timeout() -> Self {
        Self {
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
            timed_out: true,
        }
    }
}

/// A [`ContainerRuntime`] that replays scripted results and records calls.
///
/// `run` responses are consumed in order; an empty queue defaults to exit 0
/// so success scenarios only script the interesting calls.
pub struct ScriptedContainerRuntime {
    available: bool,
    build_results: Mutex<VecDeque<BuildOutput>>,
    run_results: Mutex<VecDeque<ScriptedRun>>,
    builds: Mutex<Vec<(PathBuf, String)>>,
    runs: Mutex<Vec<String>>,
    removed: Mutex<Vec<String>>,
}

impl Default for ScriptedContainerRuntime {
    fn default() -> Self {
        Self {
            available: true,
            build_results: Mutex::new(VecDeque::new()),
            run_results: Mutex::new(VecDeque::new()),
            builds: Mutex::new(Vec::new()),
            runs: Mutex::new(Vec::new()),
            removed: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedContainerRuntime {
    /// An available runtime where everything succeeds unless scripted.
    pub fn new() -> Self {
        Self::default()
    }

    /// A runtime whose availability probe fails.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::default()
        }
    }

    /// Queue a failing image build.
    pub fn push_build_failure(&self, logs: impl Into<String>) {
        self.build_results
            .lock()
            .expect("build lock")
            .push_back(BuildOutput {
                success: false,
                logs: logs.into(),
            });
    }

    /// Queue a `run` response.
    pub fn push_run(&self, run: ScriptedRun) {
        self.run_results.lock().expect("run lock").push_back(run);
    }

    /// Commands executed so far, in order.
    pub fn run_commands(&self) -> Vec<String> {
        self.runs.lock().expect("run lock").clone()
    }

    /// Images built so far.
    pub fn built_images(&self) -> Vec<String> {
        self.builds
            .lock()
            .expect("build lock")
            .iter()
            .map(|(_, image)| image.clone())
            .collect()
    }

    /// Images removed so far.
    pub fn removed_images(&self) -> Vec<String> {
        self.removed.lock().expect("removed lock").clone()
    }
}

#[async_trait]
impl ContainerRuntime for ScriptedContainerRuntime {
    async fn check_available(&self) -> bool {
        self.available
    }

    async fn build(&self, dir: &Path, image: &str) -> Result<BuildOutput> {
        self.builds
            .lock()
            .expect("build lock")
            .push((dir.to_path_buf(), image.to_string()));

        Ok(self
            .build_results
            .lock()
            .expect("build lock")
            .pop_front()
            .unwrap_or(BuildOutput {
                success: true,
                logs: String::new(),
            }))
    }

    async fn run(&self, _image: &str, command: &str, timeout_secs: u64) -> Result<RunOutput> {
        self.runs.lock().expect("run lock").push(command.to_string());

        let scripted = self
            .run_results
            .lock()
            .expect("run lock")
            .pop_front()
            .unwrap_or_else(ScriptedRun::ok);

        if scripted.timed_out {
            return Err(AutopatchError::CommandTimeout {
                command: command.to_string(),
                timeout_secs,
            });
        }

        Ok(RunOutput {
            exit_code: scripted.exit_code,
            stdout: scripted.stdout,
            stderr: scripted.stderr,
        })
    }

    async fn remove_image(&self, image: &str) -> Result<()> {
        self.removed.lock().expect("removed lock").push(image.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fake_defaults_to_success() {
        let runtime = ScriptedContainerRuntime::new();
        assert!(runtime.check_available().await);

        let build = runtime
            .build(Path::new("/tmp"), "img")
            .await
            .expect("build");
        assert!(build.success);

        let run = runtime.run("img", "echo hi", 30).await.expect("run");
        assert!(run.success());
        assert_eq!(runtime.run_commands(), vec!["echo hi".to_string()]);
    }

    #[tokio::test]
    async fn test_fake_replays_scripted_results() {
        let runtime = ScriptedContainerRuntime::new();
        runtime.push_run(ScriptedRun::fail(1, "boom"));
        runtime.push_run(ScriptedRun::timeout());

        let first = runtime.run("img", "a", 30).await.expect("run");
        assert_eq!(first.exit_code, 1);

        let second = runtime.run("img", "b", 30).await;
        assert!(matches!(
            second,
            Err(AutopatchError::CommandTimeout { .. })
        ));
    }

    #[tokio::test]
    async fn test_fake_records_removals() {
        let runtime = ScriptedContainerRuntime::new();
        runtime.remove_image("img-1").await.expect("remove");
        assert_eq!(runtime.removed_images(), vec!["img-1".to_string()]);
    }
}
