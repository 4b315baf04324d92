use thiserror::Error;

#[derive(Debug, Error)]
pub enum CurioError {
    // Storage errors
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Failed to decode {path}: {message}")]
    Decode { path: String, message: String },

    // Dataset errors
    #[error("Malformed record {record_id}: {message}")]
    MalformedRecord { record_id: String, message: String },

    // Agent errors
    #[error("Agent contract violation in {stage} for {record_id}: {message}")]
    AgentContractViolation {
        stage: String,
        record_id: String,
        message: String,
    },

    // Pipeline errors
    #[error("Stage not configured: {0}")]
    UnconfiguredStage(String),

    #[error("Workflow completed without generating a report")]
    IncompleteWorkflow,

    // LLM errors
    #[error("LLM request failed: {0}")]
    LlmRequest(String),

    #[error("LLM streaming error: {0}")]
    LlmStream(String),

    #[error("LLM provider not supported: {0}")]
    UnsupportedProvider(String),

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CurioError {
    /// Shorthand for an agent response that does not have the expected shape.
    pub fn contract(
        stage: impl Into<String>,
        record_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::AgentContractViolation {
            stage: stage.into(),
            record_id: record_id.into(),
            message: message.into(),
        }
    }

    pub fn malformed(record_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedRecord {
            record_id: record_id.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CurioError>;
