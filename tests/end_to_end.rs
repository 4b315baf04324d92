//! Full pipeline runs against scripted agents, configured through a TOML file
//! the way the binary loads it.

use std::io::Write;
use std::sync::Arc;

use curio_core::config::AppConfig;
use curio_pipeline::run_validation;
use curio_test_utils::{needles, term, DatasetFixture, ScriptedAgent, ONE_ROW_JSON, ONE_ROW_TABLE};

fn config_for(fx: &DatasetFixture, extra: &str) -> AppConfig {
    let mut tmp = tempfile::NamedTempFile::new().unwrap();
    write!(
        tmp,
        "[pipeline]\ndata_dir = \"{}\"\nseed = 3\n{}",
        fx.data_dir().display(),
        extra
    )
    .unwrap();
    AppConfig::load(tmp.path()).unwrap()
}

#[tokio::test]
async fn report_lands_at_configured_path() {
    let fx = DatasetFixture::new();
    fx.write_dataset(&[("CL_0000001", term("CL_0000001", "Test Cell", "Original definition."))]);
    let report = fx.data_dir().join("reports").join("curators.tsv");
    let config = config_for(
        &fx,
        &format!(
            "false_assertion_probability = 0.0\n[pipeline.paths]\nreport_file = \"{}\"\n",
            report.display()
        ),
    );

    let curation = Arc::new(ScriptedAgent::new().on(needles::TABLE_TO_JSON, ONE_ROW_JSON));
    let literature = Arc::new(ScriptedAgent::new().on(needles::LITERATURE, ONE_ROW_TABLE));
    let summary = run_validation(config.pipeline, curation.clone(), literature)
        .await
        .unwrap();

    assert_eq!(summary.report_path, report.canonicalize().unwrap());
    assert_eq!(curation.calls_matching(needles::INJECTION), 0);
    let tsv = std::fs::read_to_string(&report).unwrap();
    assert_eq!(
        tsv.lines().nth(1).unwrap(),
        "CL_0000001\tTest Cell\tTest assertion\tTrue\t\tPMID:1\t\tSupported by literature."
    );
}

#[tokio::test]
async fn env_overrides_apply_before_run() {
    let fx = DatasetFixture::new();
    fx.write_dataset(&[
        ("CL_1", term("CL_1", "A", "First.")),
        ("CL_2", term("CL_2", "B", "Second.")),
    ]);
    let mut config = config_for(&fx, "");
    config
        .apply_env_overrides(|key| match key {
            "CURIO_TEST_MODE" => Some("1".into()),
            "CURIO_TEST_TERMS" => Some("CL_2".into()),
            "CURIO_FALSE_ASSERTION_PROBABILITY" => Some("0".into()),
            _ => None,
        })
        .unwrap();

    let curation = Arc::new(ScriptedAgent::new().on(needles::TABLE_TO_JSON, ONE_ROW_JSON));
    let literature = Arc::new(ScriptedAgent::new().on(needles::LITERATURE, ONE_ROW_TABLE));
    let summary = run_validation(config.pipeline, curation, literature.clone())
        .await
        .unwrap();

    assert_eq!(summary.loaded, 1);
    assert_eq!(literature.call_count(), 1);
    assert!(fx.paths().markdown_dir.join("CL_2.md").exists());
    assert!(!fx.paths().markdown_dir.join("CL_1.md").exists());
}
