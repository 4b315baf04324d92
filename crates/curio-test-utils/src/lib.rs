//! Fakes and fixtures shared by Curio's test suites.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use futures::future::BoxFuture;
use serde_json::{json, Value};
use tempfile::TempDir;

use curio_core::config::{PipelineConfig, ValidationPaths};
use curio_core::error::{CurioError, Result};
use curio_core::traits::TextAgent;

/// A `TextAgent` that answers from substring rules and records every prompt.
///
/// Rules are checked in insertion order; the first rule whose needle occurs
/// in the prompt wins. With no match the fallback reply is used, or an
/// `LlmRequest` error if none is set.
#[derive(Default)]
pub struct ScriptedAgent {
    rules: Vec<(String, String)>,
    fallback: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedAgent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `response` to any prompt containing `needle`.
    pub fn on(mut self, needle: impl Into<String>, response: impl Into<String>) -> Self {
        self.rules.push((needle.into(), response.into()));
        self
    }

    /// Reply used when no rule matches.
    pub fn otherwise(mut self, response: impl Into<String>) -> Self {
        self.fallback = Some(response.into());
        self
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    /// Number of recorded prompts containing `needle`.
    pub fn calls_matching(&self, needle: &str) -> usize {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.contains(needle))
            .count()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    fn respond(&self, prompt: &str) -> Result<String> {
        self.rules
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, response)| response.clone())
            .or_else(|| self.fallback.clone())
            .ok_or_else(|| CurioError::LlmRequest("no scripted response for prompt".into()))
    }
}

impl TextAgent for ScriptedAgent {
    fn run(&self, prompt: String) -> BoxFuture<'_, Result<String>> {
        self.prompts.lock().unwrap().push(prompt.clone());
        let reply = self.respond(&prompt);
        Box::pin(async move { reply })
    }
}

/// Prompt fragments that identify each agent call.
pub mod needles {
    pub const INJECTION: &str = "Insert a biologically plausible but false assertion";
    pub const LITERATURE: &str = "break down the definition into individual, atomic assertions";
    pub const TABLE_TO_JSON: &str = "extract only the markdown table";
}

/// A one-row literature table as a literature agent would return it.
pub const ONE_ROW_TABLE: &str = "| Assertion | Validated | Evidence | References |\n\
|---|---|---|---|\n\
| Test assertion | True | Supported by literature. | PMID:1 |\n";

/// The JSON conversion of [`ONE_ROW_TABLE`].
pub const ONE_ROW_JSON: &str = r#"[{"assertion": "Test assertion", "validated": "True",
    "summary_text": "Supported by literature.", "references": "PMID:1"}]"#;

/// A dataset entry with complete references.
pub fn term(id: &str, name: &str, definition: &str) -> Value {
    json!({
        "cell_id": id,
        "name": name,
        "definition": definition,
        "relations": "",
        "source": "test",
        "has_all_references": true,
        "references": "PMID:1"
    })
}

/// A temporary data directory with the standard Curio layout.
pub struct DatasetFixture {
    dir: TempDir,
}

impl DatasetFixture {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn paths(&self) -> ValidationPaths {
        ValidationPaths::under(self.dir.path())
    }

    /// Pipeline settings pointing at this fixture.
    pub fn pipeline_config(&self, false_assertion_probability: f64) -> PipelineConfig {
        PipelineConfig {
            data_dir: self.dir.path().display().to_string(),
            false_assertion_probability,
            seed: Some(7),
            ..PipelineConfig::default()
        }
    }

    /// Write `cells_data.json` from `(key, entry)` pairs, preserving order.
    pub fn write_dataset(&self, entries: &[(&str, Value)]) -> PathBuf {
        let mut map = serde_json::Map::new();
        for (key, entry) in entries {
            map.insert(key.to_string(), entry.clone());
        }
        let path = self.paths().dataset_file;
        std::fs::write(&path, serde_json::to_string_pretty(&Value::Object(map)).unwrap()).unwrap();
        path
    }

    /// Write an arbitrary file relative to the data directory.
    pub fn write_file(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path
    }
}

impl Default for DatasetFixture {
    fn default() -> Self {
        Self::new()
    }
}
