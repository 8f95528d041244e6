//! Inference client: one blocking, non-streaming generate call per prompt

use std::time::Duration;

use ollabench_common::{InferenceError, ModelSpec};
use serde::{Deserialize, Serialize};

/// Server-reported counters for a single generate call.
///
/// Durations are nanoseconds. Every field is optional: `None` means the server
/// did not report it, which is distinct from a reported zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct OllamaStats {
    pub total_duration: Option<u64>,
    pub load_duration: Option<u64>,
    pub prompt_eval_count: Option<u64>,
    pub prompt_eval_duration: Option<u64>,
    pub eval_count: Option<u64>,
    pub eval_duration: Option<u64>,
}

impl OllamaStats {
    pub fn total_duration_secs(&self) -> Option<f64> { self.total_duration.map(nanos_to_secs) }
    pub fn load_duration_secs(&self) -> Option<f64> { self.load_duration.map(nanos_to_secs) }
    pub fn prompt_eval_duration_secs(&self) -> Option<f64> { self.prompt_eval_duration.map(nanos_to_secs) }
    pub fn eval_duration_secs(&self) -> Option<f64> { self.eval_duration.map(nanos_to_secs) }

    /// Prompt tokens per second.
    pub fn prompt_eval_rate(&self) -> Option<f64> { rate(self.prompt_eval_count, self.prompt_eval_duration) }

    /// Generated tokens per second.
    pub fn eval_rate(&self) -> Option<f64> { rate(self.eval_count, self.eval_duration) }
}

fn rate(count: Option<u64>, duration_ns: Option<u64>) -> Option<f64> {
    match (count, duration_ns) {
        (Some(c), Some(d)) if d > 0 => Some(c as f64 / nanos_to_secs(d)),
        _ => None,
    }
}

pub fn nanos_to_secs(ns: u64) -> f64 { ns as f64 / 1e9 }

/// Human-readable duration for log lines.
pub fn format_duration(ns: u64) -> String {
    if ns < 1_000_000 {
        format!("{ns} ns")
    } else if ns < 1_000_000_000 {
        format!("{:.2} ms", ns as f64 / 1e6)
    } else if ns < 60_000_000_000 {
        format!("{:.2} s", ns as f64 / 1e9)
    } else {
        format!("{:.2} min", ns as f64 / 60e9)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub response: String,
    pub stats: OllamaStats,
}

pub trait InferenceClient: Send + Sync {
    /// Send `prompt` to `model` and wait for the complete response.
    fn generate(&self, model: &ModelSpec, prompt: &str) -> Result<Generation, InferenceError>;
    /// Names of the models the server currently has available.
    fn list_models(&self) -> Result<Vec<String>, InferenceError>;
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
    #[serde(flatten)]
    stats: OllamaStats,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Deserialize)]
struct TagEntry {
    name: String,
}

const BODY_EXCERPT_CHARS: usize = 200;

/// Client for an Ollama-compatible HTTP API.
pub struct OllamaClient {
    base_url: String,
    http: reqwest::blocking::Client,
}

impl OllamaClient {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, InferenceError> {
        // reqwest's blocking client defaults to a 30s timeout, far too short for generation
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InferenceError::Unreachable(e.to_string()))?;
        Ok(Self { base_url: base_url.trim_end_matches('/').to_string(), http })
    }

    fn get_text(&self, response: reqwest::blocking::Response) -> Result<String, InferenceError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(InferenceError::Status {
                status: status.as_u16(),
                body: body.chars().take(BODY_EXCERPT_CHARS).collect(),
            });
        }
        response.text().map_err(|e| InferenceError::Unreachable(e.to_string()))
    }
}

impl InferenceClient for OllamaClient {
    fn generate(&self, model: &ModelSpec, prompt: &str) -> Result<Generation, InferenceError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest { model: model.as_str(), prompt, stream: false };
        tracing::debug!(target: "client", "POST {} model={}", url, model);
        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| InferenceError::Unreachable(e.to_string()))?;
        let text = self.get_text(response)?;
        parse_generate_body(&text)
    }

    fn list_models(&self) -> Result<Vec<String>, InferenceError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .map_err(|e| InferenceError::Unreachable(e.to_string()))?;
        let text = self.get_text(response)?;
        let tags: TagsResponse =
            serde_json::from_str(&text).map_err(|e| InferenceError::Decode(e.to_string()))?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

/// Parse a generate response body.
///
/// A single JSON object is expected. Servers that ignore `stream: false` answer
/// with newline-delimited chunks instead; those are stitched back together, with
/// the statistics taken from the final chunk.
pub fn parse_generate_body(text: &str) -> Result<Generation, InferenceError> {
    match serde_json::from_str::<GenerateResponse>(text) {
        Ok(r) => Ok(Generation { response: r.response, stats: r.stats }),
        Err(whole_err) => {
            let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
            if lines.len() < 2 {
                return Err(InferenceError::Decode(whole_err.to_string()));
            }
            let mut response = String::new();
            let mut stats = OllamaStats::default();
            for line in lines {
                let chunk: GenerateResponse =
                    serde_json::from_str(line).map_err(|e| InferenceError::Decode(e.to_string()))?;
                response.push_str(&chunk.response);
                stats = chunk.stats;
            }
            tracing::warn!(target: "client", "server streamed a non-streaming request; reassembled chunks");
            Ok(Generation { response, stats })
        }
    }
}

#[cfg(feature = "mock")]
pub mod mock {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// In-process stand-in for the inference server.
    ///
    /// Echoes `"<model>: <prompt>"` with fixed stats, and fails with a 500 for
    /// any (model, prompt) pair registered through [`ScriptedClient::fail_on`].
    #[derive(Default)]
    pub struct ScriptedClient {
        stats: OllamaStats,
        failures: HashSet<(String, String)>,
        models: Vec<String>,
        calls: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedClient {
        pub fn new(stats: OllamaStats) -> Self { Self { stats, ..Self::default() } }

        pub fn fail_on(mut self, model: &str, prompt: &str) -> Self {
            self.failures.insert((model.to_string(), prompt.to_string()));
            self
        }

        pub fn with_models(mut self, models: &[&str]) -> Self {
            self.models = models.iter().map(|m| m.to_string()).collect();
            self
        }

        /// Every (model, prompt) pair seen so far, in call order.
        pub fn calls(&self) -> Vec<(String, String)> {
            self.calls.lock().map(|c| c.clone()).unwrap_or_default()
        }
    }

    impl InferenceClient for ScriptedClient {
        fn generate(&self, model: &ModelSpec, prompt: &str) -> Result<Generation, InferenceError> {
            let key = (model.as_str().to_string(), prompt.to_string());
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(key.clone());
            }
            if self.failures.contains(&key) {
                return Err(InferenceError::Status { status: 500, body: "scripted failure".into() });
            }
            Ok(Generation { response: format!("{model}: {prompt}"), stats: self.stats })
        }

        fn list_models(&self) -> Result<Vec<String>, InferenceError> { Ok(self.models.clone()) }
    }
}
