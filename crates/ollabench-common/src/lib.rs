//! Shared types: error taxonomy, model identifiers and runtime configuration

use std::fmt;
use std::path::PathBuf;

pub type Result<T> = core::result::Result<T, BenchError>;

/// Fatal errors. Anything surfacing as `BenchError` ends the run with a non-zero exit.
#[derive(thiserror::Error, Debug)]
pub enum BenchError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Write(#[from] WriteError),
    #[error("config {path}: {message}")]
    Config { path: PathBuf, message: String },
    #[error("inference client setup failed: {0}")]
    Client(#[from] InferenceError),
}

/// Problems with the prompt catalog. Always raised before any request is sent.
#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("benchmarks directory {0} not found")]
    MissingDir(PathBuf),
    #[error("no prompt file for category `{category}` at {path}")]
    UnknownCategory { category: String, path: PathBuf },
    #[error("failed to read {path}: {source}")]
    Io { path: PathBuf, #[source] source: std::io::Error },
    #[error("malformed prompt file {path}: {message}")]
    Malformed { path: PathBuf, message: String },
    #[error("duplicate prompt id `{id}` in {path}")]
    DuplicateId { path: PathBuf, id: String },
    #[error("no prompt files found in {0}")]
    Empty(PathBuf),
}

/// Per-request failures. Recorded against one (model, prompt) pair, never fatal.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum InferenceError {
    #[error("inference server unreachable: {0}")]
    Unreachable(String),
    #[error("inference server returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("could not decode inference response: {0}")]
    Decode(String),
}

/// The output file could not be written.
#[derive(thiserror::Error, Debug)]
pub enum WriteError {
    #[error("failed to write {path}: {source}")]
    Io { path: PathBuf, #[source] source: std::io::Error },
    #[error("failed to encode row for {path}: {source}")]
    Csv { path: PathBuf, #[source] source: csv::Error },
}

/// A model name as the inference server knows it, e.g. `gemma3:4b`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelSpec(String);

impl ModelSpec {
    pub fn new(name: impl Into<String>) -> Self { Self(name.into()) }
    pub fn as_str(&self) -> &str { &self.0 }

    /// The name with an implicit `:latest` tag spelled out, as the server lists it.
    pub fn tagged(&self) -> String { with_default_tag(&self.0) }
}

/// Append `:latest` to a model name that carries no tag. A registry port
/// (`host:5000/name`) is not a tag; only the last path segment is checked.
pub fn with_default_tag(name: &str) -> String {
    let last = name.rsplit('/').next().unwrap_or(name);
    if last.contains(':') { name.to_string() } else { format!("{name}:latest") }
}

impl fmt::Display for ModelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl From<&str> for ModelSpec {
    fn from(s: &str) -> Self { Self::new(s) }
}

impl From<String> for ModelSpec {
    fn from(s: String) -> Self { Self(s) }
}

pub mod config {
    use serde::Deserialize;
    use std::env;
    use std::path::{Path, PathBuf};

    use crate::{BenchError, Result};

    pub const CONFIG_ENV: &str = "OLLABENCH_CONFIG";

    #[derive(Debug, Clone, Deserialize, PartialEq)]
    #[serde(default)]
    pub struct BenchConfig {
        pub ollama_url: String,
        pub benchmarks_dir: PathBuf,
        pub output_path: PathBuf,
        pub default_model: String,
        /// `None` waits for the server indefinitely.
        pub request_timeout_secs: Option<u64>,
    }

    impl Default for BenchConfig {
        fn default() -> Self {
            Self {
                ollama_url: "http://localhost:11434".into(),
                benchmarks_dir: PathBuf::from("benchmarks"),
                output_path: PathBuf::from("results/all_benchmarks.csv"),
                default_model: "gemma3:4b".into(),
                request_timeout_secs: Some(600),
            }
        }
    }

    impl BenchConfig {
        /// File named by `OLLABENCH_CONFIG` if set, otherwise defaults plus `OLLABENCH_*` overrides.
        pub fn load() -> Result<Self> {
            if let Ok(path) = env::var(CONFIG_ENV) {
                return Self::from_file(Path::new(&path));
            }
            let mut cfg = Self::default();
            cfg.apply_overrides(|key| env::var(key).ok());
            Ok(cfg)
        }

        pub fn from_file(path: &Path) -> Result<Self> {
            let text = std::fs::read_to_string(path).map_err(|e| BenchError::Config {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
            let cfg = serde_yaml::from_str::<BenchConfig>(&text).map_err(|e| BenchError::Config {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
            tracing::debug!(target: "config", "loaded {}", path.display());
            Ok(cfg)
        }

        pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
            if let Some(v) = lookup("OLLABENCH_URL") { self.ollama_url = v; }
            if let Some(v) = lookup("OLLABENCH_BENCHMARKS_DIR") { self.benchmarks_dir = PathBuf::from(v); }
            if let Some(v) = lookup("OLLABENCH_OUTPUT") { self.output_path = PathBuf::from(v); }
            if let Some(v) = lookup("OLLABENCH_DEFAULT_MODEL") { self.default_model = v; }
            if let Some(v) = lookup("OLLABENCH_TIMEOUT_SECS") {
                match v.parse::<u64>() {
                    Ok(0) => self.request_timeout_secs = None,
                    Ok(secs) => self.request_timeout_secs = Some(secs),
                    Err(_) => tracing::warn!(target: "config", "ignoring OLLABENCH_TIMEOUT_SECS={v}"),
                }
            }
        }
    }
}
