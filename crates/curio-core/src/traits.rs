use futures::future::BoxFuture;
use futures::stream::BoxStream;

use crate::config::ModelConfig;
use crate::error::Result;
use crate::types::*;

/// LLM client: multi-provider streaming.
pub trait LlmClient: Send + Sync + 'static {
    /// Send a chat request and receive a stream of deltas.
    fn chat_stream(
        &self,
        config: &ModelConfig,
        messages: Vec<ChatMessage>,
    ) -> BoxFuture<'_, Result<BoxStream<'_, Result<StreamDelta>>>>;
}

/// Text-completion service: opaque prompt in, text out.
///
/// Pipeline stages depend only on this capability, so tests can swap in a
/// scripted fake for the real model-backed agent.
pub trait TextAgent: Send + Sync + 'static {
    /// Run a single prompt to completion.
    fn run(&self, prompt: String) -> BoxFuture<'_, Result<String>>;
}
