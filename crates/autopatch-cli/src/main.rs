//! Autopatch - autonomous code modification pipeline CLI
//!
//! The `autopatch` command submits one modification request to the pipeline:
//! plan the changes, apply them to a scratch copy, validate inside a
//! container, retry with diagnosed fixes, and print the final result.
//!
//! ## Commands
//!
//! - `run`: execute one modification request against a project
//! - `doctor`: check that the container runtime is usable

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::Level;

use autopatch_core::{
    init_tracing, FileContext, HttpModelClient, ModelConfig, PipelineRequest,
};
use autopatch_pipeline::{
    ContainerRuntime, DockerRuntime, PipelineConfig, PipelineOrchestrator, PipelineResult,
};

/// Source file extensions picked up when no explicit `--file` is given.
const SOURCE_EXTENSIONS: &[(&str, &str)] = &[
    ("rs", "rust"),
    ("py", "python"),
    ("js", "javascript"),
    ("ts", "typescript"),
    ("go", "go"),
    ("java", "java"),
    ("rb", "ruby"),
    ("c", "c"),
    ("cpp", "cpp"),
];

/// Cap on auto-discovered context files.
const MAX_CONTEXT_FILES: usize = 20;

#[derive(Parser)]
#[command(name = "autopatch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Autonomous code modification pipeline", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one modification request against a project
    Run {
        /// Project root the request applies to
        session_path: PathBuf,

        /// Natural-language change instructions
        #[arg(short, long)]
        instructions: String,

        /// Files to hand to the planner (relative to the session root);
        /// auto-discovered when omitted
        #[arg(short, long = "file")]
        files: Vec<String>,

        /// Cap on the number of changes the plan may contain
        #[arg(long, default_value_t = 10)]
        max_changes: usize,

        /// Maximum fix-and-reexecute cycles
        #[arg(long, default_value_t = 2)]
        max_retries: u32,

        /// Per-command timeout in seconds
        #[arg(long, default_value_t = 300)]
        command_timeout: u64,

        /// Overall deadline for the run, in seconds
        #[arg(long)]
        deadline_secs: Option<u64>,

        /// Disable containerized validation
        #[arg(long)]
        no_validation: bool,

        /// Skip validation even when the runtime is available
        #[arg(long)]
        force_skip_validation: bool,

        /// Base URL of the OpenAI-compatible model API
        #[arg(long, env = "AUTOPATCH_MODEL_URL", default_value = "https://api.openai.com/v1")]
        model_url: String,

        /// Model identifier
        #[arg(long, env = "AUTOPATCH_MODEL", default_value = "gpt-4o-mini")]
        model: String,

        /// API key for the model endpoint
        #[arg(long, env = "AUTOPATCH_API_KEY")]
        api_key: Option<String>,

        /// Print the full result as JSON instead of a text summary
        #[arg(long)]
        json: bool,
    },

    /// Check that the container runtime is usable
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    init_tracing(cli.json_logs, level);

    match cli.command {
        Commands::Run {
            session_path,
            instructions,
            files,
            max_changes,
            max_retries,
            command_timeout,
            deadline_secs,
            no_validation,
            force_skip_validation,
            model_url,
            model,
            api_key,
            json,
        } => {
            let contexts = load_contexts(&session_path, &files)
                .with_context(|| format!("loading file contexts from {}", session_path.display()))?;
            anyhow::ensure!(
                !contexts.is_empty(),
                "no source files found under {}; pass --file explicitly",
                session_path.display()
            );

            let mut request = PipelineRequest::new(&session_path, instructions)
                .with_max_changes(max_changes);
            if !files.is_empty() {
                request = request.with_file_scope(files);
            }
            if no_validation {
                request = request.without_validation();
            }
            if force_skip_validation {
                request = request.force_skip();
            }

            let model_client = Arc::new(HttpModelClient::new(ModelConfig {
                base_url: model_url,
                model,
                api_key,
                ..ModelConfig::default()
            }));
            let runtime = Arc::new(DockerRuntime::new());
            let config = PipelineConfig {
                max_retries,
                command_timeout_secs: command_timeout,
                deadline: deadline_secs.map(Duration::from_secs),
            };

            let orchestrator = PipelineOrchestrator::new(model_client, runtime, config);
            let result = orchestrator.run(&request, &contexts).await;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_summary(&result);
            }

            if !result.success {
                std::process::exit(1);
            }
            Ok(())
        }

        Commands::Doctor => {
            let runtime = DockerRuntime::new();
            if runtime.check_available().await {
                println!("container runtime: available");
                Ok(())
            } else {
                println!("container runtime: NOT available (validation would be skipped)");
                std::process::exit(1);
            }
        }
    }
}

/// Load file contexts for the planner.
///
/// This is a pragmatic stand-in for a dedicated repository-analysis stage:
/// explicit `--file` paths are read as-is; otherwise source files are
/// discovered by extension, capped at [`MAX_CONTEXT_FILES`].
fn load_contexts(session_path: &Path, files: &[String]) -> Result<Vec<FileContext>> {
    let mut contexts = Vec::new();

    if files.is_empty() {
        let mut discovered = Vec::new();
        discover_source_files(session_path, session_path, &mut discovered)?;
        discovered.sort();
        for relative in discovered.into_iter().take(MAX_CONTEXT_FILES) {
            contexts.push(read_context(session_path, &relative)?);
        }
    } else {
        for relative in files {
            contexts.push(read_context(session_path, relative)?);
        }
    }

    Ok(contexts)
}

fn read_context(session_path: &Path, relative: &str) -> Result<FileContext> {
    let full = session_path.join(relative);
    let content = std::fs::read_to_string(&full)
        .with_context(|| format!("reading {}", full.display()))?;
    let mut context = FileContext::new(relative, content);
    if let Some(language) = language_of(relative) {
        context = context.with_language(language);
    }
    Ok(context)
}

fn language_of(path: &str) -> Option<&'static str> {
    let extension = Path::new(path).extension()?.to_str()?;
    SOURCE_EXTENSIONS
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, language)| *language)
}

fn discover_source_files(root: &Path, dir: &Path, out: &mut Vec<String>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name_str = name.to_string_lossy();
        if name_str.starts_with('.') || name_str == "target" || name_str == "node_modules" {
            continue;
        }

        let path = entry.path();
        if path.is_dir() {
            discover_source_files(root, &path, out)?;
        } else if let Ok(relative) = path.strip_prefix(root) {
            let relative = relative.to_string_lossy().to_string();
            if language_of(&relative).is_some() {
                out.push(relative);
            }
        }
    }
    Ok(())
}

fn print_summary(result: &PipelineResult) {
    println!("run:      {}", result.run_id);
    println!("success:  {}", result.success);
    println!(
        "changes:  {} across {} file(s)",
        result.total_changes, result.files_affected
    );
    if let Some(complexity) = &result.complexity {
        println!("estimate: {complexity:?}");
    }
    if let Some(report) = &result.report {
        println!("verdict:  {:?} ({} attempt(s))", report.verdict, report.total_attempts);
        println!("{}", report.summary);
        for recommendation in &report.recommendations {
            println!("  - {recommendation}");
        }
    }
    if let Some(error) = &result.error {
        println!("error:    {error}");
    }
}
