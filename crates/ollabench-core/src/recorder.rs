//! Append-only CSV output

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use ollabench_common::WriteError;
use serde::Serialize;

use crate::result::BenchmarkResult;

/// Output column order. Never reorder: rows from earlier runs share the file.
pub const COLUMNS: [&str; 18] = [
    "model",
    "category",
    "prompt_id",
    "prompt",
    "response",
    "duration_s",
    "total_duration_s",
    "load_duration_s",
    "prompt_eval_count",
    "prompt_eval_duration_s",
    "prompt_eval_rate",
    "eval_count",
    "eval_duration_s",
    "eval_rate",
    "cpu_info",
    "ram_total",
    "gpu_info",
    "timestamp",
];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// Field order must match COLUMNS; the csv writer derives the header from it.
#[derive(Serialize)]
struct CsvRow<'a> {
    model: &'a str,
    category: &'a str,
    prompt_id: &'a str,
    prompt: &'a str,
    response: Option<&'a str>,
    duration_s: Option<f64>,
    total_duration_s: Option<f64>,
    load_duration_s: Option<f64>,
    prompt_eval_count: Option<u64>,
    prompt_eval_duration_s: Option<f64>,
    prompt_eval_rate: Option<f64>,
    eval_count: Option<u64>,
    eval_duration_s: Option<f64>,
    eval_rate: Option<f64>,
    cpu_info: String,
    ram_total: Option<f64>,
    gpu_info: String,
    timestamp: String,
}

impl<'a> CsvRow<'a> {
    fn from_result(r: &'a BenchmarkResult) -> Self {
        Self {
            model: r.model.as_str(),
            category: &r.category,
            prompt_id: &r.prompt_id,
            prompt: &r.prompt,
            response: r.response.as_deref(),
            duration_s: r.duration.map(|d| d.as_secs_f64()),
            total_duration_s: r.stats.total_duration_secs(),
            load_duration_s: r.stats.load_duration_secs(),
            prompt_eval_count: r.stats.prompt_eval_count,
            prompt_eval_duration_s: r.stats.prompt_eval_duration_secs(),
            prompt_eval_rate: r.stats.prompt_eval_rate(),
            eval_count: r.stats.eval_count,
            eval_duration_s: r.stats.eval_duration_secs(),
            eval_rate: r.stats.eval_rate(),
            cpu_info: r.system.cpu_info(),
            ram_total: r.system.ram_total_gib(),
            gpu_info: r.system.gpu_info(),
            timestamp: r.timestamp.format(TIMESTAMP_FORMAT).to_string(),
        }
    }
}

/// Appends one row per result, writing the header only into an empty file.
pub struct ResultRecorder {
    path: PathBuf,
    writer: csv::Writer<File>,
    rows_written: usize,
}

impl ResultRecorder {
    /// Open `path` for appending, creating it and its parent directory if needed.
    pub fn open(path: &Path) -> Result<Self, WriteError> {
        let io_err = |source| WriteError::Io { path: path.to_path_buf(), source };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path).map_err(io_err)?;
        let fresh = file.metadata().map_err(io_err)?.len() == 0;
        if !fresh {
            check_header(path);
        }
        let writer = csv::WriterBuilder::new().has_headers(fresh).from_writer(file);
        tracing::debug!(target: "recorder", "opened {} (fresh={})", path.display(), fresh);
        Ok(Self { path: path.to_path_buf(), writer, rows_written: 0 })
    }

    /// Write one row and sync it to disk before returning.
    pub fn append(&mut self, result: &BenchmarkResult) -> Result<(), WriteError> {
        let row = CsvRow::from_result(result);
        self.writer
            .serialize(&row)
            .map_err(|source| WriteError::Csv { path: self.path.clone(), source })?;
        self.writer
            .flush()
            .and_then(|_| self.writer.get_ref().sync_data())
            .map_err(|source| WriteError::Io { path: self.path.clone(), source })?;
        self.rows_written += 1;
        tracing::info!(target: "recorder", "appended {}/{} to {}", result.model, result.prompt_id, self.path.display());
        Ok(())
    }

    pub fn path(&self) -> &Path { &self.path }

    /// Rows appended through this recorder (excludes the header and earlier runs).
    pub fn rows_written(&self) -> usize { self.rows_written }
}

fn check_header(path: &Path) {
    let first = File::open(path)
        .ok()
        .and_then(|f| BufReader::new(f).lines().next())
        .and_then(|l| l.ok());
    if let Some(line) = first {
        if line.trim_end() != COLUMNS.join(",") {
            tracing::warn!(
                target: "recorder",
                "{} has a different header; new rows use the current column set",
                path.display()
            );
        }
    }
}
