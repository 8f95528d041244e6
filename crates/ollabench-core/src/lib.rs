//! Prompt catalog, benchmark loop and CSV recording

pub mod catalog;
pub mod recorder;
pub mod result;
pub mod runner;

pub use catalog::{CategorySelection, PromptCatalog, PromptCategory, PromptItem};
pub use recorder::{ResultRecorder, COLUMNS};
pub use result::BenchmarkResult;
pub use runner::{BenchmarkRunner, RunSummary};
