use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use curio_core::error::{CurioError, Result};
use curio_core::record::{ReportRow, TermRecord, ValidationResult, ValidationTableRow};
use curio_core::storage;
use curio_core::traits::TextAgent;

use crate::parse::expect_array;
use crate::prompts::table_conversion_prompt;

const STAGE: &str = "generate_report";

/// Converts literature reports into structured rows and writes the curator TSV.
pub struct ReportBuilder {
    agent: Arc<dyn TextAgent>,
    json_dir: PathBuf,
    report_file: PathBuf,
}

impl ReportBuilder {
    pub fn new(
        agent: Arc<dyn TextAgent>,
        json_dir: impl Into<PathBuf>,
        report_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            agent,
            json_dir: json_dir.into(),
            report_file: report_file.into(),
        }
    }

    /// Build every row, then write the TSV. Returns the absolute report path.
    ///
    /// Nothing is written to the report path if any record fails.
    pub async fn build_report(&self, results: &[ValidationResult]) -> Result<(PathBuf, usize)> {
        let mut rows = Vec::new();
        for result in results {
            let table = self.table_rows(result).await?;
            rows.extend(
                table
                    .iter()
                    .map(|row| ReportRow::from_table_row(&result.record, row)),
            );
        }

        storage::write_text(&self.report_file, &render_tsv(&rows)).await?;
        let path = tokio::fs::canonicalize(&self.report_file).await?;
        info!(path = %path.display(), rows = rows.len(), "Report written");
        Ok((path, rows.len()))
    }

    async fn table_rows(&self, result: &ValidationResult) -> Result<Vec<ValidationTableRow>> {
        let record = &result.record;
        let cache_path = storage::record_cache_path(&self.json_dir, &record.id, "json");

        if storage::exists(&cache_path).await {
            debug!(record_id = %record.id, "Reusing cached structured table");
            return match storage::read_json::<Value>(&cache_path).await? {
                Value::Array(items) => decode_rows(record, items),
                _ => Err(CurioError::Decode {
                    path: cache_path.display().to_string(),
                    message: "structured cache must be a JSON array".into(),
                }),
            };
        }

        let reply = self
            .agent
            .run(table_conversion_prompt(&result.report_markdown))
            .await?;
        let items = expect_array(STAGE, &record.id, &reply)?;
        // Only a table whose rows all decode is cached
        let rows = decode_rows(record, items.clone())?;
        storage::write_json(&cache_path, &items).await?;
        Ok(rows)
    }
}

fn decode_rows(record: &TermRecord, items: Vec<Value>) -> Result<Vec<ValidationTableRow>> {
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            if !item.is_object() {
                return Err(CurioError::contract(
                    STAGE,
                    &record.id,
                    format!("table row {} is not an object", i),
                ));
            }
            serde_json::from_value(item).map_err(|e| {
                CurioError::contract(STAGE, &record.id, format!("table row {}: {}", i, e))
            })
        })
        .collect()
}

/// Tab-separated rendering with the fixed header.
pub fn render_tsv(rows: &[ReportRow]) -> String {
    let mut out = String::new();
    push_line(&mut out, &ReportRow::COLUMNS);
    for row in rows {
        push_line(&mut out, &row.cells());
    }
    out
}

fn push_line(out: &mut String, cells: &[&str]) {
    for (i, cell) in cells.iter().enumerate() {
        if i > 0 {
            out.push('\t');
        }
        out.push_str(&quote_field(cell));
    }
    out.push('\n');
}

/// Quote a field only when it contains the delimiter, a quote, or a line break.
fn quote_field(field: &str) -> std::borrow::Cow<'_, str> {
    if field.contains(|c: char| matches!(c, '\t' | '"' | '\r' | '\n')) {
        format!("\"{}\"", field.replace('"', "\"\"")).into()
    } else {
        field.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curio_test_utils::{needles, ScriptedAgent, ONE_ROW_JSON, ONE_ROW_TABLE};

    fn result(id: &str, markdown: &str) -> ValidationResult {
        ValidationResult {
            record: TermRecord {
                id: id.into(),
                name: format!("{} name", id),
                definition: "D".into(),
                logical_axioms: String::new(),
                source: String::new(),
                has_all_references: true,
                references: format!("PMID:{}", id),
            },
            report_markdown: markdown.into(),
        }
    }

    #[test]
    fn test_quote_field() {
        assert_eq!(quote_field("plain"), "plain");
        assert_eq!(quote_field("a\tb"), "\"a\tb\"");
        assert_eq!(quote_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(quote_field("line\nbreak"), "\"line\nbreak\"");
    }

    #[test]
    fn test_render_tsv_header_only() {
        assert_eq!(
            render_tsv(&[]),
            "Cell ID\tName\tAssertion\tAgent Validation\tCurator Validation\t\
             References\tCurator Notes\tAgent Notes\n"
        );
    }

    #[tokio::test]
    async fn test_k_rows_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let three_rows = r#"```json
[
  {"assertion": "A1", "validated": true, "summary_text": "s1", "references": "r"},
  {"assertion": "A2", "validated": false, "summary_text": "s2", "references": "r"},
  {"assertion": "A3", "validated": "True", "summary_text": "s3", "references": "r"}
]
```"#;
        let agent = Arc::new(
            ScriptedAgent::new()
                .on("three-row report", three_rows)
                .on(needles::TABLE_TO_JSON, ONE_ROW_JSON),
        );
        let builder = ReportBuilder::new(
            agent.clone(),
            dir.path().join("json"),
            dir.path().join("report.tsv"),
        );

        let (path, count) = builder
            .build_report(&[result("X", "three-row report"), result("Y", ONE_ROW_TABLE)])
            .await
            .unwrap();

        assert_eq!(count, 4);
        assert!(path.is_absolute());
        let tsv = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = tsv.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines.iter().filter(|l| l.starts_with("X\t")).count(), 3);
        assert_eq!(lines[1], "X\tX name\tA1\tTrue\t\tPMID:X\t\ts1");
        assert_eq!(lines[2].split('\t').nth(3), Some("False"));
        assert!(dir.path().join("json/X.json").exists());
    }

    #[tokio::test]
    async fn test_structured_cache_skips_agent() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("json")).unwrap();
        std::fs::write(dir.path().join("json/X.json"), ONE_ROW_JSON).unwrap();
        let agent = Arc::new(ScriptedAgent::new());
        let builder = ReportBuilder::new(
            agent.clone(),
            dir.path().join("json"),
            dir.path().join("report.tsv"),
        );

        let (_, count) = builder.build_report(&[result("X", "ignored")]).await.unwrap();
        assert_eq!(count, 1);
        assert_eq!(agent.call_count(), 0);
    }

    #[tokio::test]
    async fn test_non_array_reply_leaves_no_report() {
        let dir = tempfile::tempdir().unwrap();
        let agent = Arc::new(
            ScriptedAgent::new()
                .on("good", ONE_ROW_JSON)
                .on("bad", r#"{"assertion": "not wrapped in an array"}"#),
        );
        let report_file = dir.path().join("report.tsv");
        let builder = ReportBuilder::new(agent, dir.path().join("json"), &report_file);

        let err = builder
            .build_report(&[result("X", "good"), result("Y", "bad")])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CurioError::AgentContractViolation { ref record_id, .. } if record_id == "Y"
        ));
        assert!(!report_file.exists());
        assert!(!dir.path().join("json/Y.json").exists());
    }

    #[tokio::test]
    async fn test_rejected_rows_are_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let json_dir = dir.path().join("json");
        let report_file = dir.path().join("report.tsv");

        let bad = Arc::new(ScriptedAgent::new().otherwise(r#"["not an object"]"#));
        let err = ReportBuilder::new(bad, &json_dir, &report_file)
            .build_report(&[result("X", "md")])
            .await
            .unwrap_err();
        assert!(matches!(err, CurioError::AgentContractViolation { .. }));
        assert!(!json_dir.join("X.json").exists());

        let good = Arc::new(ScriptedAgent::new().otherwise(ONE_ROW_JSON));
        let (_, count) = ReportBuilder::new(good.clone(), &json_dir, &report_file)
            .build_report(&[result("X", "md")])
            .await
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(good.call_count(), 1);
        assert!(json_dir.join("X.json").exists());
    }

    #[tokio::test]
    async fn test_report_overwrites_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let report_file = dir.path().join("report.tsv");
        std::fs::write(&report_file, "old contents").unwrap();
        let agent = Arc::new(ScriptedAgent::new().otherwise(ONE_ROW_JSON));
        let builder = ReportBuilder::new(agent, dir.path().join("json"), &report_file);

        builder.build_report(&[result("X", "md")]).await.unwrap();
        let tsv = std::fs::read_to_string(&report_file).unwrap();
        assert!(tsv.starts_with("Cell ID\t"));
        assert!(!tsv.contains("old contents"));
    }
}
