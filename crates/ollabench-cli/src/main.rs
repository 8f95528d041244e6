use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use ollabench_client::{InferenceClient, OllamaClient};
use ollabench_common::config::BenchConfig;
use ollabench_common::{with_default_tag, ModelSpec, Result};
use ollabench_core::{BenchmarkRunner, CategorySelection, PromptCatalog, ResultRecorder, RunSummary};
use ollabench_obs::SystemInfo;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "ollabench", version, about = "Benchmark local Ollama models and append the results to a CSV file")]
struct Cli {
    /// Models to benchmark, e.g. `--models gemma3:4b llama3.2`
    #[arg(short, long, num_args = 1..)]
    models: Vec<String>,
    /// Prompt category (coding, general_text, summarization) or `all`
    #[arg(short, long, default_value = "all")]
    category: CategorySelection,
    /// Directory holding one `<category>.json` per category
    #[arg(long)]
    benchmarks_dir: Option<PathBuf>,
    /// CSV file to append to
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Base URL of the inference server
    #[arg(long)]
    url: Option<String>,
    /// YAML config file (overrides OLLABENCH_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    match run(cli) {
        Ok(summary) => {
            tracing::info!(
                target: "cli",
                "benchmarking completed: {} attempted, {} succeeded, {} failed",
                summary.attempted, summary.succeeded, summary.failed
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(target: "cli", "{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<RunSummary> {
    let mut cfg = match &cli.config {
        Some(path) => BenchConfig::from_file(path)?,
        None => BenchConfig::load()?,
    };
    if let Some(dir) = cli.benchmarks_dir { cfg.benchmarks_dir = dir; }
    if let Some(out) = cli.output { cfg.output_path = out; }
    if let Some(url) = cli.url { cfg.ollama_url = url; }

    let models: Vec<ModelSpec> = if cli.models.is_empty() {
        vec![ModelSpec::new(cfg.default_model.clone())]
    } else {
        cli.models.into_iter().map(ModelSpec::from).collect()
    };
    let names: Vec<&str> = models.iter().map(ModelSpec::as_str).collect();
    tracing::info!(target: "cli", "starting benchmark: models={} category={}", names.join(","), cli.category);

    let catalog = PromptCatalog::load(&cfg.benchmarks_dir, &cli.category)?;
    let mut recorder = ResultRecorder::open(&cfg.output_path)?;
    let system = SystemInfo::collect();
    let client = OllamaClient::new(&cfg.ollama_url, cfg.request_timeout_secs.map(Duration::from_secs))?;
    check_models(&client, &models);

    let summary = BenchmarkRunner::new(&client, &mut recorder, system).run(&models, &catalog)?;
    tracing::info!(target: "cli", "results in {}", recorder.path().display());
    Ok(summary)
}

/// Warn about requested models the server does not list and return them.
/// A failed listing is logged and treated as nothing to report.
fn check_models<'m>(client: &dyn InferenceClient, models: &'m [ModelSpec]) -> Vec<&'m ModelSpec> {
    let available: Vec<String> = match client.list_models() {
        Ok(names) => names.iter().map(|n| with_default_tag(n)).collect(),
        Err(e) => {
            tracing::warn!(target: "cli", "could not list models: {e}");
            return Vec::new();
        }
    };
    tracing::info!(target: "cli", "server reports {} models", available.len());
    let unlisted: Vec<&ModelSpec> = models.iter().filter(|m| !available.contains(&m.tagged())).collect();
    for m in &unlisted {
        tracing::warn!(target: "cli", "model {} is not listed by the server", m);
    }
    unlisted
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
    );
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
