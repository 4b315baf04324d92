//! Declarative stage chain for the validation workflow.
//!
//! The workflow is a named set of nodes, each naming its successor. Only
//! linear chains are expressible: there are no conditional edges.

pub mod executor;
pub mod node;

use std::collections::HashSet;

use curio_core::error::{CurioError, Result};

pub use executor::{run_validation, PipelineDeps, PipelineExecutor, RunSummary, StageReport};
pub use node::{StageId, StageNode, StageOutcome};

#[derive(Debug, Clone)]
pub struct WorkflowGraph {
    pub name: String,
    pub entrypoint: StageId,
    pub nodes: Vec<StageNode>,
}

impl WorkflowGraph {
    pub fn new(name: impl Into<String>, entrypoint: StageId, nodes: Vec<StageNode>) -> Self {
        Self {
            name: name.into(),
            entrypoint,
            nodes,
        }
    }

    pub fn route(&self, id: StageId) -> Option<&StageNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Check that the entrypoint exists, ids are unique, every successor is
    /// a known node, and following successors never revisits a node.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.id) {
                return Err(CurioError::Config(format!(
                    "Workflow '{}' declares stage '{}' twice",
                    self.name, node.id
                )));
            }
        }
        if self.route(self.entrypoint).is_none() {
            return Err(CurioError::Config(format!(
                "Workflow '{}' entrypoint '{}' is not a node",
                self.name, self.entrypoint
            )));
        }
        for node in &self.nodes {
            if let Some(next) = node.next {
                if self.route(next).is_none() {
                    return Err(CurioError::Config(format!(
                        "Stage '{}' routes to unknown stage '{}'",
                        node.id, next
                    )));
                }
            }
        }

        let mut visited = HashSet::new();
        let mut current = Some(self.entrypoint);
        while let Some(id) = current {
            if !visited.insert(id) {
                return Err(CurioError::Config(format!(
                    "Workflow '{}' cycles back to stage '{}'",
                    self.name, id
                )));
            }
            current = self.route(id).and_then(|n| n.next);
        }
        Ok(())
    }

    /// Stages in execution order, starting at the entrypoint.
    pub fn chain(&self) -> Vec<&StageNode> {
        let mut chain = Vec::new();
        let mut current = self.route(self.entrypoint);
        while let Some(node) = current {
            if chain.iter().any(|n: &&StageNode| n.id == node.id) {
                break;
            }
            chain.push(node);
            current = node.next.and_then(|next| self.route(next));
        }
        chain
    }
}

/// The fixed four-stage validation chain.
pub fn build_validation_graph() -> WorkflowGraph {
    WorkflowGraph::new(
        "cl_validation",
        StageId::LoadDefinitions,
        vec![
            StageNode::new(StageId::LoadDefinitions, "Load curated definitions from the dataset")
                .then(StageId::SeedFalseAssertions),
            StageNode::new(
                StageId::SeedFalseAssertions,
                "Inject cached or newly generated false assertions",
            )
            .then(StageId::RunLiteratureQa),
            StageNode::new(StageId::RunLiteratureQa, "Validate assertions against literature")
                .then(StageId::GenerateReport),
            StageNode::new(StageId::GenerateReport, "Write the curator TSV report"),
        ],
    )
}
