//! The curation pipeline: load definitions, seed synthetic negatives, run
//! literature QA, and write the curator report.
//!
//! Stages talk to language models only through [`curio_core::traits::TextAgent`].
//! Every agent-backed stage caches its output per record id under the
//! configured output directory, so an interrupted run resumes where it
//! stopped.

pub mod graph;
pub mod literature;
pub mod loader;
pub mod parse;
pub mod prompts;
pub mod report;
pub mod seeder;
pub mod state;

pub use graph::{
    build_validation_graph, run_validation, PipelineDeps, PipelineExecutor, RunSummary,
    StageId, StageNode, StageOutcome, StageReport, WorkflowGraph,
};
pub use literature::LiteratureValidator;
pub use loader::DatasetLoader;
pub use report::ReportBuilder;
pub use seeder::{NegativeSeeder, SeedStats};
pub use state::RunState;
