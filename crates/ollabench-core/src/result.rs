//! One row's worth of outcome for a (model, prompt) pair

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use ollabench_client::OllamaStats;
use ollabench_common::{InferenceError, ModelSpec};
use ollabench_obs::SystemInfo;

use crate::catalog::PromptItem;

/// Outcome of one (model, prompt) pair. Written once, never modified.
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    pub model: ModelSpec,
    pub category: String,
    pub prompt_id: String,
    pub prompt: String,
    /// `None` when the request failed.
    pub response: Option<String>,
    /// Wall-clock time around the request, including transport and parsing.
    pub duration: Option<Duration>,
    pub stats: OllamaStats,
    pub system: Arc<SystemInfo>,
    pub timestamp: DateTime<Local>,
    pub error: Option<InferenceError>,
}

impl BenchmarkResult {
    pub fn success(
        model: &ModelSpec,
        item: &PromptItem,
        response: String,
        duration: Duration,
        stats: OllamaStats,
        system: Arc<SystemInfo>,
    ) -> Self {
        Self {
            model: model.clone(),
            category: item.category.clone(),
            prompt_id: item.id.clone(),
            prompt: item.text.clone(),
            response: Some(response),
            duration: Some(duration),
            stats,
            system,
            timestamp: Local::now(),
            error: None,
        }
    }

    /// A row for a failed request: identity and host columns only, every metric absent.
    pub fn failure(model: &ModelSpec, item: &PromptItem, error: InferenceError, system: Arc<SystemInfo>) -> Self {
        Self {
            model: model.clone(),
            category: item.category.clone(),
            prompt_id: item.id.clone(),
            prompt: item.text.clone(),
            response: None,
            duration: None,
            stats: OllamaStats::default(),
            system,
            timestamp: Local::now(),
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool { self.error.is_none() }
}
