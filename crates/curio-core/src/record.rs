//! Records that flow through the curation pipeline.
//!
//! `TermRecord` is parsed from the curated dataset and cloned with a new
//! definition by the seeder. `NegativeAssertionEntry` and `ValidationTableRow`
//! are the on-disk cache shapes. `ReportRow` is one line of the curator TSV.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{CurioError, Result};

/// A curated definitional entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermRecord {
    #[serde(rename = "cell_id")]
    pub id: String,
    pub name: String,
    pub definition: String,
    #[serde(rename = "relations", default)]
    pub logical_axioms: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub has_all_references: bool,
    #[serde(default)]
    pub references: String,
}

impl TermRecord {
    /// Parse a raw dataset entry. `key` is the entry's key in the dataset
    /// mapping and is only used to name the record in errors.
    pub fn from_payload(key: &str, payload: &Value) -> Result<Self> {
        let obj = payload
            .as_object()
            .ok_or_else(|| CurioError::malformed(key, "entry is not a JSON object"))?;

        let required = |field: &str| -> Result<String> {
            obj.get(field)
                .and_then(scalar_to_string)
                .ok_or_else(|| CurioError::malformed(key, format!("missing field '{}'", field)))
        };
        let optional = |field: &str| obj.get(field).and_then(scalar_to_string).unwrap_or_default();

        Ok(Self {
            id: required("cell_id")?,
            name: required("name")?,
            definition: required("definition")?,
            logical_axioms: optional("relations"),
            source: optional("source"),
            has_all_references: obj.get("has_all_references").is_some_and(truthy),
            references: optional("references"),
        })
    }

    /// Clone this record with its definition replaced wholesale.
    pub fn with_definition(&self, definition: impl Into<String>) -> Self {
        Self {
            definition: definition.into(),
            ..self.clone()
        }
    }

    /// Whether the record carries complete provenance.
    pub fn has_complete_references(&self) -> bool {
        self.has_all_references && !self.references.is_empty()
    }
}

/// Durable record of one synthetic-false-assertion generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NegativeAssertionEntry {
    pub cell_id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub false_assertion: Option<String>,
    #[serde(default)]
    pub updated_definition: Option<String>,
}

impl NegativeAssertionEntry {
    /// The text that replaces a record's definition on a cache hit: the
    /// rewritten definition, or failing that the bare false assertion.
    pub fn replacement_definition(&self) -> Option<&str> {
        self.updated_definition
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.false_assertion.as_deref().filter(|s| !s.is_empty()))
    }
}

/// One atomic assertion extracted from the literature QA table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationTableRow {
    #[serde(default, deserialize_with = "lenient_string")]
    pub assertion: String,
    /// Left as the agent reported it; rendered at report time.
    #[serde(default)]
    pub validated: Value,
    #[serde(default, deserialize_with = "lenient_string")]
    pub summary_text: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub references: String,
}

impl ValidationTableRow {
    /// Render the agent's validation flag for the report.
    pub fn agent_validation(&self) -> String {
        match &self.validated {
            Value::Null => String::new(),
            Value::Bool(true) => "True".to_string(),
            Value::Bool(false) => "False".to_string(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Literature QA output for one record.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub record: TermRecord,
    pub report_markdown: String,
}

/// One line of the curator report.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReportRow {
    pub cell_id: String,
    pub name: String,
    pub assertion: String,
    pub agent_validation: String,
    pub curator_validation: String,
    pub references: String,
    pub curator_notes: String,
    pub agent_notes: String,
}

impl ReportRow {
    pub const COLUMNS: [&'static str; 8] = [
        "Cell ID",
        "Name",
        "Assertion",
        "Agent Validation",
        "Curator Validation",
        "References",
        "Curator Notes",
        "Agent Notes",
    ];

    /// Join a table row with the record it was extracted for. Curator
    /// columns are left empty for human fill-in.
    pub fn from_table_row(record: &TermRecord, row: &ValidationTableRow) -> Self {
        Self {
            cell_id: record.id.clone(),
            name: record.name.clone(),
            assertion: row.assertion.clone(),
            agent_validation: row.agent_validation(),
            curator_validation: String::new(),
            references: record.references.clone(),
            curator_notes: String::new(),
            agent_notes: row.summary_text.clone(),
        }
    }

    /// Cells in column order.
    pub fn cells(&self) -> [&str; 8] {
        [
            &self.cell_id,
            &self.name,
            &self.assertion,
            &self.agent_validation,
            &self.curator_validation,
            &self.references,
            &self.curator_notes,
            &self.agent_notes,
        ]
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(s.trim().to_lowercase().as_str(), "true" | "yes" | "1"),
        _ => false,
    }
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => String::new(),
        Value::Array(items) => items
            .iter()
            .map(|v| scalar_to_string(v).unwrap_or_else(|| v.to_string()))
            .collect::<Vec<_>>()
            .join("; "),
        other => scalar_to_string(&other).unwrap_or_else(|| other.to_string()),
    })
}
