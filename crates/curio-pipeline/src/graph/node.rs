use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    LoadDefinitions,
    SeedFalseAssertions,
    #[serde(rename = "run_paperqa")]
    RunLiteratureQa,
    GenerateReport,
}

impl StageId {
    pub const ALL: [StageId; 4] = [
        StageId::LoadDefinitions,
        StageId::SeedFalseAssertions,
        StageId::RunLiteratureQa,
        StageId::GenerateReport,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageId::LoadDefinitions => "load_definitions",
            StageId::SeedFalseAssertions => "seed_false_assertions",
            StageId::RunLiteratureQa => "run_paperqa",
            StageId::GenerateReport => "generate_report",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a stage hands back to the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    Next(StageId),
    Complete,
}

/// A node in the stage chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageNode {
    pub id: StageId,
    pub description: String,
    /// Successor stage; `None` marks the terminal node.
    #[serde(default)]
    pub next: Option<StageId>,
}

impl StageNode {
    pub fn new(id: StageId, description: impl Into<String>) -> Self {
        Self {
            id,
            description: description.into(),
            next: None,
        }
    }

    pub fn then(mut self, next: StageId) -> Self {
        self.next = Some(next);
        self
    }

    /// The outcome a successful run of this node reports.
    pub fn outcome(&self) -> StageOutcome {
        match self.next {
            Some(next) => StageOutcome::Next(next),
            None => StageOutcome::Complete,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        let names: Vec<&str> = StageId::ALL.iter().map(StageId::as_str).collect();
        assert_eq!(
            names,
            vec!["load_definitions", "seed_false_assertions", "run_paperqa", "generate_report"]
        );
        assert_eq!(
            serde_json::to_string(&StageId::RunLiteratureQa).unwrap(),
            "\"run_paperqa\""
        );
    }

    #[test]
    fn test_node_outcome() {
        let node =
            StageNode::new(StageId::LoadDefinitions, "load").then(StageId::SeedFalseAssertions);
        assert_eq!(node.outcome(), StageOutcome::Next(StageId::SeedFalseAssertions));
        assert_eq!(
            StageNode::new(StageId::GenerateReport, "report").outcome(),
            StageOutcome::Complete
        );
    }
}
