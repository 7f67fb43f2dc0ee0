//! Container runtime boundary and docker CLI adapter.
//!
//! The pipeline talks to the container runtime through [`ContainerRuntime`];
//! [`DockerRuntime`] shells out to the docker CLI. Image names embed the
//! run's UUID plus a digest of the session path, so concurrent pipeline runs
//! never collide on the shared runtime.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::process::Command;
use tracing::{debug, warn};
use uuid::Uuid;

use autopatch_core::domain::error::{AutopatchError, Result};

/// Default ceiling for one image build.
pub const DEFAULT_BUILD_TIMEOUT_SECS: u64 = 600;

/// Outcome of an image build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutput {
    /// Whether the build succeeded.
    pub success: bool,

    /// Combined build log output.
    pub logs: String,
}

/// Outcome of one command run inside a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput {
    /// Command exit code; -1 when the process died without one.
    pub exit_code: i32,

    /// Captured stdout.
    pub stdout: String,

    /// Captured stderr.
    pub stderr: String,
}

impl RunOutput {
    /// Whether the command exited 0.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// External container runtime, accessed as a command-line tool.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Whether the runtime can be used at all.
    async fn check_available(&self) -> bool;

    /// Build `dir` into an image tagged `image`.
    async fn build(&self, dir: &Path, image: &str) -> Result<BuildOutput>;

    /// Run `command` inside `image` with a per-command timeout.
    ///
    /// A timeout is reported as [`AutopatchError::CommandTimeout`] so the
    /// executor can record it as a synthetic failed result.
    async fn run(&self, image: &str, command: &str, timeout_secs: u64) -> Result<RunOutput>;

    /// Remove a previously built image.
    async fn remove_image(&self, image: &str) -> Result<()>;
}

/// [`ContainerRuntime`] backed by the docker CLI.
pub struct DockerRuntime {
    binary: String,
    build_timeout_secs: u64,
}

impl Default for DockerRuntime {
    fn default() -> Self {
        Self {
            binary: "docker".to_string(),
            build_timeout_secs: DEFAULT_BUILD_TIMEOUT_SECS,
        }
    }
}

impl DockerRuntime {
    /// Create a runtime using the `docker` binary from `PATH`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different CLI binary (e.g. `podman`).
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Override the image build timeout.
    pub fn with_build_timeout(mut self, secs: u64) -> Self {
        self.build_timeout_secs = secs;
        self
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn check_available(&self) -> bool {
        let probe = Command::new(&self.binary)
            .args(["version", "--format", "{{.Server.Version}}"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status();

        match tokio::time::timeout(Duration::from_secs(10), probe).await {
            Ok(Ok(status)) => status.success(),
            Ok(Err(e)) => {
                debug!(error = %e, "container runtime probe failed");
                false
            }
            Err(_) => {
                warn!("container runtime probe timed out");
                false
            }
        }
    }

    async fn build(&self, dir: &Path, image: &str) -> Result<BuildOutput> {
        debug!(image = %image, dir = %dir.display(), "building container image");

        let child = Command::new(&self.binary)
            .arg("build")
            .arg("-t")
            .arg(image)
            .arg(dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = match tokio::time::timeout(
            Duration::from_secs(self.build_timeout_secs),
            child.wait_with_output(),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                return Ok(BuildOutput {
                    success: false,
                    logs: format!(
                        "image build timed out after {} seconds",
                        self.build_timeout_secs
                    ),
                });
            }
        };

        let mut logs = String::from_utf8_lossy(&output.stdout).to_string();
        logs.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(BuildOutput {
            success: output.status.success(),
            logs,
        })
    }

    async fn run(&self, image: &str, command: &str, timeout_secs: u64) -> Result<RunOutput> {
        debug!(image = %image, command = %command, "running command in container");

        let child = Command::new(&self.binary)
            .args(["run", "--rm", image, "sh", "-c", command])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            child.wait_with_output(),
        )
        .await
        .map_err(|_| AutopatchError::CommandTimeout {
            command: command.to_string(),
            timeout_secs,
        })??;

        Ok(RunOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    async fn remove_image(&self, image: &str) -> Result<()> {
        let output = Command::new(&self.binary)
            .args(["rmi", "-f", image])
            .output()
            .await?;

        if output.status.success() {
            Ok(())
        } else {
            Err(AutopatchError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!(
                    "failed to remove image {image}: {}",
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            )))
        }
    }
}

/// Collision-free image name for one pipeline run.
///
/// Concurrent runs share the runtime's image namespace; embedding the run
/// UUID keeps them disjoint, and the session-path digest makes leftovers
/// attributable when cleanup is interrupted.
pub fn unique_image_name(session_path: &Path, run_id: &Uuid) -> String {
    let mut hasher = Sha256::new();
    hasher.update(session_path.to_string_lossy().as_bytes());
    let digest = hex::encode(hasher.finalize());
    let run = run_id.simple().to_string();
    format!("autopatch-validate-{}-{}", &digest[..8], &run[..12])
}
