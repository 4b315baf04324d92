use std::path::PathBuf;

use curio_core::record::{TermRecord, ValidationResult};

/// Mutable state threaded through one pipeline run.
///
/// Created fresh per run and owned by the executor; each stage reads the
/// previous stage's output and writes its own.
#[derive(Debug, Clone, Default)]
pub struct RunState {
    pub test_mode: bool,
    pub loaded: Vec<TermRecord>,
    pub seeded: Vec<TermRecord>,
    pub validation_results: Vec<ValidationResult>,
    pub report_path: Option<PathBuf>,
}

impl RunState {
    pub fn new(test_mode: bool) -> Self {
        Self {
            test_mode,
            ..Self::default()
        }
    }
}
