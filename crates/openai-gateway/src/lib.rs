//! OpenAI-compatible generation gateway.
//!
//! This crate implements [`chat_core::GenerationGateway`] against an
//! OpenAI-compatible HTTP API:
//!
//! - Chat completions for replies and intent classification
//! - Image generations (DALL-E style, returns a hosted URL)
//! - Web search via Google Custom Search, with search terms optimized by
//!   the chat model first
//!
//! All calls carry an explicit HTTP timeout and surface API error bodies in
//! [`chat_core::GatewayError`], so the orchestration core can degrade to
//! sentinel replies instead of hanging or crashing.
//!
//! # Example
//!
//! ```rust,no_run
//! use openai_gateway::OpenAiGateway;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let gateway = OpenAiGateway::from_env()?;
//! // Pass the gateway to the orchestrator...
//! # Ok(())
//! # }
//! ```

mod api_types;
mod config;
mod gateway;
mod search;

pub use config::{OpenAiGatewayConfig, OpenAiGatewayConfigBuilder};
pub use gateway::OpenAiGateway;
pub use search::{SearchClient, SearchConfig};

// Re-export chat-core types for convenience
pub use chat_core::{async_trait, ChatMessage, GatewayError, GenerationGateway};
