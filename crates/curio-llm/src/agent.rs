use std::sync::Arc;

use futures::future::BoxFuture;
use futures::StreamExt;
use tracing::debug;

use curio_core::config::{AgentProfile, ModelConfig};
use curio_core::error::{CurioError, Result};
use curio_core::traits::{LlmClient, TextAgent};
use curio_core::types::*;

use crate::providers::presets::apply_preset_defaults;
use crate::retry::RetryingClient;

/// Instructions for the agent that rewrites definitions and converts tables.
pub const CURATION_INSTRUCTIONS: &str = "You are a Cell Ontology validation assistant. \
Follow the requested output format exactly. When asked for JSON, return only valid JSON \
with no surrounding prose.";

/// Instructions for the agent that checks assertions against literature.
pub const LITERATURE_INSTRUCTIONS: &str = "You are a PaperQA-style literature assistant. \
Break definitions into atomic assertions, judge each one against published evidence, \
and summarize the supporting or refuting literature with references.";

/// A text agent backed by a streaming chat model.
///
/// Each `run` is a fresh single-turn conversation: system instructions,
/// then the prompt as the user message. The reply is the concatenated text.
pub struct CompletionAgent {
    llm: Arc<dyn LlmClient>,
    config: ModelConfig,
    instructions: String,
}

impl CompletionAgent {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        config: ModelConfig,
        instructions: impl Into<String>,
    ) -> Self {
        Self {
            llm,
            config,
            instructions: instructions.into(),
        }
    }

    async fn complete(&self, prompt: String) -> Result<String> {
        let messages = vec![
            ChatMessage::system(self.instructions.clone()),
            ChatMessage::user(prompt),
        ];

        let mut stream = self.llm.chat_stream(&self.config, messages).await?;

        let mut text = String::new();
        while let Some(delta) = stream.next().await {
            match delta? {
                StreamDelta::TextDelta(chunk) => text.push_str(&chunk),
                StreamDelta::Stop(reason) => {
                    debug!(model = %self.config.model_id, ?reason, "Completion finished");
                }
                StreamDelta::Usage {
                    input_tokens,
                    output_tokens,
                } => {
                    debug!(input_tokens, output_tokens, "Token usage");
                }
                StreamDelta::MessageId(_) => {}
            }
        }

        if text.trim().is_empty() {
            return Err(CurioError::LlmStream(format!(
                "{} returned an empty completion",
                self.config.model_id
            )));
        }
        Ok(text)
    }
}

impl TextAgent for CompletionAgent {
    fn run(&self, prompt: String) -> BoxFuture<'_, Result<String>> {
        Box::pin(self.complete(prompt))
    }
}

/// Build a model-backed agent for a configured profile.
///
/// Provider presets are applied to the primary and fallback models, and the
/// client is wrapped for retry when a retry policy or fallbacks are configured.
pub fn build_agent(profile: &AgentProfile, instructions: &str) -> Arc<dyn TextAgent> {
    let mut model = profile.model.clone();
    apply_preset_defaults(&mut model);

    let primary = crate::create_client(&model);
    let llm: Arc<dyn LlmClient> = if model.retry.is_some() || !profile.fallback_models.is_empty() {
        let fallbacks = profile
            .fallback_models
            .iter()
            .cloned()
            .map(|mut fb| {
                apply_preset_defaults(&mut fb);
                let client = crate::create_client(&fb);
                (fb, client)
            })
            .collect();
        Arc::new(RetryingClient::new(
            primary,
            fallbacks,
            model.retry.clone().unwrap_or_default(),
        ))
    } else {
        Arc::from(primary)
    };

    Arc::new(CompletionAgent::new(llm, model, instructions))
}
