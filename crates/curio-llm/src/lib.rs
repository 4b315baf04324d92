pub mod agent;
pub mod providers;
pub mod retry;
pub mod streaming;

use curio_core::config::ModelConfig;
use curio_core::traits::LlmClient;

pub use agent::{build_agent, CompletionAgent, CURATION_INSTRUCTIONS, LITERATURE_INSTRUCTIONS};
pub use providers::anthropic::AnthropicClient;
pub use providers::openai::OpenAiClient;
pub use providers::presets::apply_preset_defaults;
pub use retry::RetryingClient;

/// Create an LLM client based on the provider name.
pub fn create_client(config: &ModelConfig) -> Box<dyn LlmClient> {
    match config.provider.as_str() {
        "anthropic" | "claude" => Box::new(AnthropicClient::new()),
        // Everything else uses the OpenAI-compatible client
        _ => Box::new(OpenAiClient::new()),
    }
}
