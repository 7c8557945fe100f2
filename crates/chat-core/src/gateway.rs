//! The generation backend trait.

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::message::ChatMessage;

/// Trait for generation backends.
///
/// The orchestration pipeline only ever talks to a backend through this
/// trait: chat completion for replies and classification, image generation
/// for image requests, and web search for grounding. Implementations must
/// bound every call with a timeout so a slow backend can never hang a
/// request indefinitely.
#[async_trait]
pub trait GenerationGateway: Send + Sync {
    /// Send a message sequence to the chat-completion backend and return
    /// the reply text.
    ///
    /// `max_tokens` caps the response size for this call; `None` uses the
    /// implementation's configured default. Classification calls pass a
    /// small explicit ceiling.
    async fn generate_chat(
        &self,
        messages: Vec<ChatMessage>,
        model: &str,
        temperature: f32,
        max_tokens: Option<u32>,
    ) -> Result<String, GatewayError>;

    /// Generate an image from a prompt and return its URL.
    async fn generate_image(&self, prompt: &str) -> Result<String, GatewayError>;

    /// Perform a web search and return aggregated text with source
    /// annotations. The history is available for search-term optimization.
    async fn web_search(
        &self,
        query: &str,
        history: &[ChatMessage],
    ) -> Result<String, GatewayError>;

    /// Get the name of this gateway implementation.
    fn name(&self) -> &str;
}
