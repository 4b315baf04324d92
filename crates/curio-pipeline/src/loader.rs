use std::collections::HashSet;
use std::path::PathBuf;

use serde_json::Value;
use tracing::{debug, info};

use curio_core::error::{CurioError, Result};
use curio_core::record::TermRecord;
use curio_core::storage;

/// Loads curated term records from the dataset file.
pub struct DatasetLoader {
    dataset_file: PathBuf,
    allowed_ids: HashSet<String>,
}

impl DatasetLoader {
    pub fn new(
        dataset_file: impl Into<PathBuf>,
        allowed_ids: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            dataset_file: dataset_file.into(),
            allowed_ids: allowed_ids.into_iter().collect(),
        }
    }

    /// Parse every entry, then drop those outside the allow-list (test mode
    /// only) or lacking complete references. Dataset order is kept.
    pub async fn load_definitions(&self, test_mode: bool) -> Result<Vec<TermRecord>> {
        let raw: Value = storage::read_json(&self.dataset_file).await?;
        let Value::Object(entries) = raw else {
            return Err(CurioError::Decode {
                path: self.dataset_file.display().to_string(),
                message: "dataset must be a JSON object keyed by record id".into(),
            });
        };

        let total = entries.len();
        let mut records = Vec::new();
        for (key, payload) in &entries {
            let record = TermRecord::from_payload(key, payload)?;
            if test_mode && !self.allowed_ids.contains(&record.id) {
                debug!(record_id = %record.id, "Skipping record outside test terms");
                continue;
            }
            if !record.has_complete_references() {
                debug!(record_id = %record.id, "Skipping record with incomplete references");
                continue;
            }
            records.push(record);
        }

        info!(
            path = %self.dataset_file.display(),
            total,
            kept = records.len(),
            test_mode,
            "Loaded definitions"
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curio_test_utils::{term, DatasetFixture};
    use serde_json::json;

    #[tokio::test]
    async fn test_filters_incomplete_references() {
        let fx = DatasetFixture::new();
        let mut no_flag = term("CL_2", "B", "def");
        no_flag["has_all_references"] = json!(false);
        let mut no_refs = term("CL_3", "C", "def");
        no_refs["references"] = json!("");
        let path = fx.write_dataset(&[
            ("CL_1", term("CL_1", "A", "def")),
            ("CL_2", no_flag),
            ("CL_3", no_refs),
        ]);

        let loader = DatasetLoader::new(path, vec!["CL_2".to_string()]);
        for test_mode in [false, true] {
            let ids: Vec<String> = loader
                .load_definitions(test_mode)
                .await
                .unwrap()
                .into_iter()
                .map(|r| r.id)
                .collect();
            assert!(!ids.contains(&"CL_2".to_string()));
            assert!(!ids.contains(&"CL_3".to_string()));
        }
    }

    #[tokio::test]
    async fn test_test_mode_allow_list() {
        let fx = DatasetFixture::new();
        let path = fx.write_dataset(&[
            ("CL_1", term("CL_1", "A", "def")),
            ("CL_2", term("CL_2", "B", "def")),
        ]);
        let loader = DatasetLoader::new(path, vec!["CL_2".to_string()]);

        assert_eq!(loader.load_definitions(false).await.unwrap().len(), 2);
        let restricted = loader.load_definitions(true).await.unwrap();
        assert_eq!(restricted.len(), 1);
        assert_eq!(restricted[0].id, "CL_2");
    }

    #[tokio::test]
    async fn test_preserves_dataset_order() {
        let fx = DatasetFixture::new();
        let path = fx.write_dataset(&[
            ("CL_9", term("CL_9", "Z", "def")),
            ("CL_1", term("CL_1", "A", "def")),
            ("CL_5", term("CL_5", "M", "def")),
        ]);
        let records = DatasetLoader::new(path, vec![]).load_definitions(false).await.unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["CL_9", "CL_1", "CL_5"]);
    }

    #[tokio::test]
    async fn test_malformed_record_is_fatal() {
        let fx = DatasetFixture::new();
        let path = fx.write_dataset(&[
            ("CL_1", term("CL_1", "A", "def")),
            ("CL_2", json!({"cell_id": "CL_2", "name": "B"})),
        ]);
        let err = DatasetLoader::new(path, vec![]).load_definitions(false).await.unwrap_err();
        assert!(matches!(
            err,
            CurioError::MalformedRecord { record_id, .. } if record_id == "CL_2"
        ));
    }

    #[tokio::test]
    async fn test_missing_and_non_object_dataset() {
        let fx = DatasetFixture::new();
        let err = DatasetLoader::new(fx.paths().dataset_file, vec![])
            .load_definitions(false)
            .await
            .unwrap_err();
        assert!(matches!(err, CurioError::NotFound(_)));

        let path = fx.write_file("cells_data.json", "[1, 2]");
        let err = DatasetLoader::new(path, vec![]).load_definitions(false).await.unwrap_err();
        assert!(matches!(err, CurioError::Decode { .. }));
    }
}
