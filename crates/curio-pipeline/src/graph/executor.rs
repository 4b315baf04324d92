use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, info, info_span, Instrument};

use curio_core::config::{PipelineConfig, ValidationPaths};
use curio_core::error::{CurioError, Result};
use curio_core::traits::TextAgent;

use super::node::{StageId, StageNode, StageOutcome};
use super::{build_validation_graph, WorkflowGraph};
use crate::literature::LiteratureValidator;
use crate::loader::DatasetLoader;
use crate::report::ReportBuilder;
use crate::seeder::{NegativeSeeder, SeedStats};
use crate::state::RunState;

/// Services and state bound into one pipeline run.
///
/// A `None` service slot leaves its stage unconfigured; the executor refuses
/// to start a graph that routes through an unbound stage.
pub struct PipelineDeps {
    pub config: PipelineConfig,
    pub paths: ValidationPaths,
    pub state: RunState,
    pub loader: Option<DatasetLoader>,
    pub seeder: Option<NegativeSeeder>,
    pub literature: Option<LiteratureValidator>,
    pub report: Option<ReportBuilder>,
}

impl PipelineDeps {
    /// Settings and fresh state with no services bound.
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            paths: config.paths(),
            state: RunState::new(config.test_mode),
            config,
            loader: None,
            seeder: None,
            literature: None,
            report: None,
        }
    }

    /// Bind every stage with its default service.
    pub fn with_agents(
        config: PipelineConfig,
        curation: Arc<dyn TextAgent>,
        literature: Arc<dyn TextAgent>,
    ) -> Self {
        let mut deps = Self::new(config);
        let paths = &deps.paths;
        deps.loader = Some(DatasetLoader::new(
            &paths.dataset_file,
            deps.config.test_terms.iter().cloned(),
        ));
        deps.seeder = Some(NegativeSeeder::new(
            curation.clone(),
            &paths.false_definitions_file,
            deps.config.false_assertion_probability,
            deps.config.seed,
        ));
        deps.literature = Some(LiteratureValidator::new(literature, &paths.markdown_dir));
        deps.report = Some(ReportBuilder::new(curation, &paths.json_dir, &paths.report_file));
        deps
    }

    fn is_bound(&self, stage: StageId) -> bool {
        match stage {
            StageId::LoadDefinitions => self.loader.is_some(),
            StageId::SeedFalseAssertions => self.seeder.is_some(),
            StageId::RunLiteratureQa => self.literature.is_some(),
            StageId::GenerateReport => self.report.is_some(),
        }
    }
}

/// Timing and volume for one executed stage.
#[derive(Debug, Clone)]
pub struct StageReport {
    pub stage: StageId,
    pub elapsed_ms: u64,
    /// Records (or report rows) the stage produced.
    pub items: usize,
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub report_path: PathBuf,
    pub stages: Vec<StageReport>,
    pub loaded: usize,
    pub seeded: usize,
    pub seed_stats: SeedStats,
    pub validated: usize,
    pub report_rows: usize,
}

/// Walks a workflow graph, dispatching each node to its stage service.
pub struct PipelineExecutor {
    graph: WorkflowGraph,
}

impl PipelineExecutor {
    pub fn new(graph: WorkflowGraph) -> Self {
        Self { graph }
    }

    /// Run the graph from its entrypoint until a node reports completion.
    ///
    /// The graph shape and every stage binding are checked before any stage
    /// runs. Errors from a stage abort the run.
    pub async fn execute(&self, deps: &mut PipelineDeps) -> Result<RunSummary> {
        self.graph.validate()?;
        if let Some(node) = self.graph.nodes.iter().find(|n| !deps.is_bound(n.id)) {
            return Err(CurioError::UnconfiguredStage(node.id.to_string()));
        }

        let run_id = uuid::Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let span = info_span!("pipeline_run", run_id = %run_id, workflow = %self.graph.name);

        let stages = self.run_chain(deps).instrument(span).await?;

        let report_path = deps
            .state
            .report_path
            .clone()
            .ok_or(CurioError::IncompleteWorkflow)?;
        let report_rows = stages
            .iter()
            .find(|s| s.stage == StageId::GenerateReport)
            .map_or(0, |s| s.items);

        Ok(RunSummary {
            run_id,
            started_at,
            report_path,
            stages,
            loaded: deps.state.loaded.len(),
            seeded: deps.state.seeded.len(),
            seed_stats: deps.seeder.as_ref().map(|s| s.stats()).unwrap_or_default(),
            validated: deps.state.validation_results.len(),
            report_rows,
        })
    }

    async fn run_chain(&self, deps: &mut PipelineDeps) -> Result<Vec<StageReport>> {
        deps.paths.ensure_directories()?;
        info!(
            entrypoint = %self.graph.entrypoint,
            test_mode = deps.state.test_mode,
            "Pipeline started"
        );

        let mut reports = Vec::new();
        let mut current = self.graph.entrypoint;
        loop {
            let node = self.graph.route(current).ok_or_else(|| {
                CurioError::Config(format!("Stage '{}' not found in graph", current))
            })?;

            let started = Instant::now();
            let (outcome, items) = run_stage(node, deps).await?;
            let elapsed_ms = started.elapsed().as_millis() as u64;
            debug!(stage = %node.id, items, elapsed_ms, "Stage complete");

            reports.push(StageReport {
                stage: node.id,
                elapsed_ms,
                items,
            });

            match outcome {
                StageOutcome::Next(next) => current = next,
                StageOutcome::Complete => break,
            }
        }

        info!(stages = reports.len(), "Pipeline finished");
        Ok(reports)
    }
}

impl Default for PipelineExecutor {
    fn default() -> Self {
        Self::new(build_validation_graph())
    }
}

fn unbound(stage: StageId) -> CurioError {
    CurioError::UnconfiguredStage(stage.to_string())
}

async fn run_stage(node: &StageNode, deps: &mut PipelineDeps) -> Result<(StageOutcome, usize)> {
    let state = &mut deps.state;
    let items = match node.id {
        StageId::LoadDefinitions => {
            let loader = deps.loader.as_ref().ok_or_else(|| unbound(node.id))?;
            state.loaded = loader.load_definitions(state.test_mode).await?;
            state.loaded.len()
        }
        StageId::SeedFalseAssertions => {
            let seeder = deps.seeder.as_mut().ok_or_else(|| unbound(node.id))?;
            state.seeded = seeder.seed_definitions(&state.loaded).await?;
            state.seeded.len()
        }
        StageId::RunLiteratureQa => {
            let validator = deps.literature.as_ref().ok_or_else(|| unbound(node.id))?;
            state.validation_results = validator.validate_records(&state.seeded).await?;
            state.validation_results.len()
        }
        StageId::GenerateReport => {
            let builder = deps.report.as_ref().ok_or_else(|| unbound(node.id))?;
            let (path, rows) = builder.build_report(&state.validation_results).await?;
            state.report_path = Some(path);
            rows
        }
    };
    Ok((node.outcome(), items))
}

/// Run the standard validation chain with the given agents.
pub async fn run_validation(
    config: PipelineConfig,
    curation: Arc<dyn TextAgent>,
    literature: Arc<dyn TextAgent>,
) -> Result<RunSummary> {
    let mut deps = PipelineDeps::with_agents(config, curation, literature);
    PipelineExecutor::default().execute(&mut deps).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use curio_test_utils::{term, DatasetFixture, ScriptedAgent};

    #[tokio::test]
    async fn test_unconfigured_stage_detected_before_work() {
        let fx = DatasetFixture::new();
        fx.write_dataset(&[("CL_1", term("CL_1", "A", "def"))]);
        let agent = Arc::new(ScriptedAgent::new());
        let mut deps =
            PipelineDeps::with_agents(fx.pipeline_config(1.0), agent.clone(), agent.clone());
        deps.literature = None;

        let err = PipelineExecutor::default().execute(&mut deps).await.unwrap_err();

        assert!(matches!(err, CurioError::UnconfiguredStage(ref s) if s == "run_paperqa"));
        assert!(deps.state.loaded.is_empty());
        assert_eq!(agent.call_count(), 0);
        assert!(!fx.paths().output_dir.exists());
    }

    #[tokio::test]
    async fn test_truncated_graph_is_incomplete() {
        let fx = DatasetFixture::new();
        fx.write_dataset(&[("CL_1", term("CL_1", "A", "def"))]);
        let agent = Arc::new(ScriptedAgent::new());
        let mut deps = PipelineDeps::with_agents(fx.pipeline_config(0.0), agent.clone(), agent);

        let graph = WorkflowGraph::new(
            "partial",
            StageId::LoadDefinitions,
            vec![
                StageNode::new(StageId::LoadDefinitions, "load").then(StageId::SeedFalseAssertions),
                StageNode::new(StageId::SeedFalseAssertions, "seed"),
            ],
        );
        let err = PipelineExecutor::new(graph).execute(&mut deps).await.unwrap_err();

        assert!(matches!(err, CurioError::IncompleteWorkflow));
        assert_eq!(deps.state.seeded.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_graph_rejected() {
        let mut deps = PipelineDeps::new(PipelineConfig::default());
        let graph = WorkflowGraph::new("empty", StageId::LoadDefinitions, vec![]);
        let err = PipelineExecutor::new(graph).execute(&mut deps).await.unwrap_err();
        assert!(matches!(err, CurioError::Config(_)));
    }

    #[test]
    fn test_new_deps_are_unbound() {
        let deps = PipelineDeps::new(PipelineConfig::default());
        assert!(StageId::ALL.iter().all(|s| !deps.is_bound(*s)));
        assert!(!deps.state.test_mode);
    }
}
