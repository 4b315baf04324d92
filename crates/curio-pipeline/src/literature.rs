use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use curio_core::error::Result;
use curio_core::record::{TermRecord, ValidationResult};
use curio_core::storage;
use curio_core::traits::TextAgent;

use crate::prompts::literature_prompt;

/// Runs literature QA per record, caching the raw markdown reply.
pub struct LiteratureValidator {
    agent: Arc<dyn TextAgent>,
    markdown_dir: PathBuf,
}

impl LiteratureValidator {
    pub fn new(agent: Arc<dyn TextAgent>, markdown_dir: impl Into<PathBuf>) -> Self {
        Self {
            agent,
            markdown_dir: markdown_dir.into(),
        }
    }

    pub async fn validate_records(&self, records: &[TermRecord]) -> Result<Vec<ValidationResult>> {
        let mut results = Vec::with_capacity(records.len());
        let mut cached = 0usize;

        for record in records {
            let path = storage::record_cache_path(&self.markdown_dir, &record.id, "md");
            let report_markdown = if storage::exists(&path).await {
                cached += 1;
                debug!(
                    record_id = %record.id,
                    path = %path.display(),
                    "Reusing cached literature report"
                );
                storage::read_text(&path).await?
            } else {
                let markdown = self.agent.run(literature_prompt(record)).await?;
                storage::write_text(&path, &markdown).await?;
                info!(record_id = %record.id, "Literature report generated");
                markdown
            };
            results.push(ValidationResult {
                record: record.clone(),
                report_markdown,
            });
        }

        info!(records = results.len(), cached, "Literature validation complete");
        Ok(results)
    }
}
