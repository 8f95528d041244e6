//! Prompt catalog: one JSON file per category under the benchmarks directory

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ollabench_common::LoadError;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategorySelection {
    All,
    Only(String),
}

impl FromStr for CategorySelection {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(if s.eq_ignore_ascii_case("all") { Self::All } else { Self::Only(s.to_string()) })
    }
}

impl fmt::Display for CategorySelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Only(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptItem {
    pub id: String,
    pub category: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptCategory {
    pub name: String,
    pub prompts: Vec<PromptItem>,
}

#[derive(Debug, Clone, Default)]
pub struct PromptCatalog {
    categories: Vec<PromptCategory>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Bare(String),
    Full {
        id: Option<RawId>,
        #[serde(alias = "text")]
        prompt: String,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(u64),
}

impl PromptCatalog {
    /// Load the selected categories from `dir`.
    ///
    /// `All` loads every `*.json` file in the directory, ordered by file name.
    pub fn load(dir: &Path, selection: &CategorySelection) -> Result<Self, LoadError> {
        if !dir.is_dir() {
            return Err(LoadError::MissingDir(dir.to_path_buf()));
        }
        let names = match selection {
            CategorySelection::All => discover(dir)?,
            CategorySelection::Only(name) => vec![name.clone()],
        };
        if names.is_empty() {
            return Err(LoadError::Empty(dir.to_path_buf()));
        }

        let mut categories = Vec::with_capacity(names.len());
        for name in names {
            let path = category_path(dir, &name);
            if name.is_empty() || name.contains(['/', '\\']) || !path.is_file() {
                return Err(LoadError::UnknownCategory { category: name, path });
            }
            let category = load_category(&path, &name)?;
            tracing::info!(target: "catalog", "loaded {} prompts from {}", category.prompts.len(), path.display());
            if category.prompts.is_empty() {
                tracing::warn!(target: "catalog", "category `{}` has no prompts", name);
            }
            categories.push(category);
        }
        Ok(Self { categories })
    }

    /// Categories in run order.
    pub fn categories(&self) -> &[PromptCategory] { &self.categories }

    pub fn get(&self, name: &str) -> Option<&PromptCategory> {
        self.categories.iter().find(|c| c.name == name)
    }

    pub fn prompt_count(&self) -> usize { self.categories.iter().map(|c| c.prompts.len()).sum() }
}

fn discover(dir: &Path) -> Result<Vec<String>, LoadError> {
    let read_dir = std::fs::read_dir(dir).map_err(|source| LoadError::Io { path: dir.to_path_buf(), source })?;
    let mut names: Vec<String> = read_dir
        .flatten()
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == "json"))
        .filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(String::from))
        .collect();
    names.sort();
    Ok(names)
}

fn load_category(path: &Path, name: &str) -> Result<PromptCategory, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io { path: path.to_path_buf(), source })?;
    let malformed = |message: String| LoadError::Malformed { path: path.to_path_buf(), message };

    // Either a bare array, or an object holding the array under the category name.
    // Other keys in the object are ignored.
    let list = match serde_json::from_str::<Value>(&text).map_err(|e| malformed(e.to_string()))? {
        list @ Value::Array(_) => list,
        Value::Object(mut map) => map
            .remove(name)
            .ok_or_else(|| malformed(format!("expected a top-level `{name}` array")))?,
        _ => return Err(malformed("expected an array or an object".into())),
    };
    let entries: Vec<RawEntry> = serde_json::from_value(list).map_err(|e| malformed(e.to_string()))?;

    let mut seen = HashSet::new();
    let mut prompts = Vec::with_capacity(entries.len());
    for (idx, entry) in entries.into_iter().enumerate() {
        let (id, text) = match entry {
            RawEntry::Bare(text) => (None, text),
            RawEntry::Full { id, prompt } => (id, prompt),
        };
        let id = match id {
            Some(RawId::Text(s)) => s,
            Some(RawId::Number(n)) => n.to_string(),
            None => format!("{name}-{}", idx + 1),
        };
        if !seen.insert(id.clone()) {
            return Err(LoadError::DuplicateId { path: path.to_path_buf(), id });
        }
        prompts.push(PromptItem { id, category: name.to_string(), text });
    }
    Ok(PromptCategory { name: name.to_string(), prompts })
}

/// Path of the file a category is read from.
pub fn category_path(dir: &Path, name: &str) -> PathBuf { dir.join(format!("{name}.json")) }
