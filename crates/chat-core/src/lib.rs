//! Core traits and types for the Parley chat backend.
//!
//! This crate provides the shared interface between the orchestration
//! pipeline and its collaborators. It defines:
//!
//! - [`ChatMessage`] - A role/content message in a prompt sequence
//! - [`GenerationGateway`] - The trait every generation backend implements
//! - [`GatewayError`] - Error types for gateway operations
//! - [`ContentExtractor`] - Trait for extracting plain text from uploads
//! - [`TokenCounter`] - Heuristic token estimation for budget enforcement
//!
//! # Example
//!
//! ```rust
//! use chat_core::{async_trait, ChatMessage, GatewayError, GenerationGateway};
//!
//! struct EchoGateway;
//!
//! #[async_trait]
//! impl GenerationGateway for EchoGateway {
//!     async fn generate_chat(
//!         &self,
//!         messages: Vec<ChatMessage>,
//!         _model: &str,
//!         _temperature: f32,
//!         _max_tokens: Option<u32>,
//!     ) -> Result<String, GatewayError> {
//!         Ok(messages.last().map(|m| m.content.clone()).unwrap_or_default())
//!     }
//!
//!     async fn generate_image(&self, prompt: &str) -> Result<String, GatewayError> {
//!         Ok(format!("https://example.com/{prompt}.png"))
//!     }
//!
//!     async fn web_search(
//!         &self,
//!         _query: &str,
//!         _history: &[ChatMessage],
//!     ) -> Result<String, GatewayError> {
//!         Err(GatewayError::Configuration("search not configured".into()))
//!     }
//!
//!     fn name(&self) -> &str {
//!         "EchoGateway"
//!     }
//! }
//! ```

mod error;
mod extract;
mod gateway;
mod message;
mod tokens;

pub use error::{ExtractError, GatewayError};
pub use extract::{ContentExtractor, PlainTextExtractor, WORD_LIMIT};
pub use gateway::GenerationGateway;
pub use message::ChatMessage;
pub use tokens::TokenCounter;

// Re-export async_trait for convenience
pub use async_trait::async_trait;
