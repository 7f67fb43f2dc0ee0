//! Autopatch Pipeline - containerized validation with bounded retries
//!
//! Provides the execution half of autopatch:
//! - A container runtime boundary with a docker CLI adapter
//! - The validation executor (image build, build commands, test commands)
//! - The validation strategy generator
//! - The pipeline orchestrator with its bounded retry state machine

pub mod container;
pub mod executor;
pub mod fakes;
pub mod orchestrator;
pub mod strategy;

// Re-export key types
pub use container::{
    unique_image_name, BuildOutput, ContainerRuntime, DockerRuntime, RunOutput,
    DEFAULT_BUILD_TIMEOUT_SECS,
};
pub use executor::{ExecutorConfig, ValidationExecutor, DEFAULT_COMMAND_TIMEOUT_SECS};
pub use orchestrator::{PipelineConfig, PipelineOrchestrator, PipelineResult, DEFAULT_MAX_RETRIES};
pub use strategy::{StrategyGenerator, MAX_LISTED_FILES};
