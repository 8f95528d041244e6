//! Sequential benchmark loop: models × categories × prompts

use std::sync::Arc;
use std::time::Instant;

use ollabench_client::{format_duration, InferenceClient, OllamaStats};
use ollabench_common::{ModelSpec, WriteError};
use ollabench_obs::SystemInfo;

use crate::catalog::{PromptCatalog, PromptItem};
use crate::recorder::ResultRecorder;
use crate::result::BenchmarkResult;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Drives one run. Exactly one request is in flight at a time, and each
/// result is on disk before the next request is sent.
pub struct BenchmarkRunner<'a> {
    client: &'a dyn InferenceClient,
    recorder: &'a mut ResultRecorder,
    system: Arc<SystemInfo>,
}

impl<'a> BenchmarkRunner<'a> {
    pub fn new(client: &'a dyn InferenceClient, recorder: &'a mut ResultRecorder, system: SystemInfo) -> Self {
        Self { client, recorder, system: Arc::new(system) }
    }

    /// Run every prompt in `catalog` against every model, in the order given.
    ///
    /// Inference failures are recorded as rows with empty metrics; only a
    /// failure to write the output aborts the run.
    pub fn run(&mut self, models: &[ModelSpec], catalog: &PromptCatalog) -> Result<RunSummary, WriteError> {
        let mut summary = RunSummary::default();
        let total = models.len() * catalog.prompt_count();
        for model in models {
            for category in catalog.categories() {
                for item in &category.prompts {
                    summary.attempted += 1;
                    tracing::info!(
                        target: "runner",
                        "[{}/{}] model={} category={} prompt={}",
                        summary.attempted, total, model, category.name, item.id
                    );
                    let result = self.run_one(model, item);
                    if result.is_success() { summary.succeeded += 1 } else { summary.failed += 1 }
                    self.recorder.append(&result)?;
                }
            }
        }
        Ok(summary)
    }

    fn run_one(&self, model: &ModelSpec, item: &PromptItem) -> BenchmarkResult {
        let start = Instant::now();
        let outcome = self.client.generate(model, &item.text);
        let duration = start.elapsed();
        match outcome {
            Ok(generation) => {
                tracing::info!(
                    target: "runner",
                    "model={} prompt={} duration={:.2}s {}",
                    model,
                    item.id,
                    duration.as_secs_f64(),
                    describe_stats(&generation.stats)
                );
                tracing::debug!(target: "runner", "response: {:.100}", generation.response);
                BenchmarkResult::success(model, item, generation.response, duration, generation.stats, self.system.clone())
            }
            Err(err) => {
                tracing::warn!(target: "runner", "model={} prompt={} failed: {}", model, item.id, err);
                BenchmarkResult::failure(model, item, err, self.system.clone())
            }
        }
    }
}

fn describe_stats(stats: &OllamaStats) -> String {
    let dur = |ns: Option<u64>| ns.map(format_duration).unwrap_or_else(|| "n/a".into());
    let rate = |r: Option<f64>| r.map(|r| format!("{r:.2} tokens/s")).unwrap_or_else(|| "n/a".into());
    format!(
        "total={} load={} prompt_eval={} ({}) eval={} ({})",
        dur(stats.total_duration),
        dur(stats.load_duration),
        dur(stats.prompt_eval_duration),
        rate(stats.prompt_eval_rate()),
        dur(stats.eval_duration),
        rate(stats.eval_rate()),
    )
}
