//! Scripted gateway implementation for testing pipeline behavior.
//!
//! This crate provides [`ScriptedGateway`], a `GenerationGateway` double
//! that replays queued responses and records every invocation, so tests can
//! assert both what a pipeline produced and which backend calls it made
//! (including which calls it must NOT make).
//!
//! # Example
//!
//! ```rust
//! use chat_core::{ChatMessage, GenerationGateway};
//! use mock_gateway::ScriptedGateway;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let gateway = ScriptedGateway::new();
//!     gateway.push_chat_response("Hello!").await;
//!
//!     let reply = gateway
//!         .generate_chat(vec![ChatMessage::user("hi")], "test-model", 0.7, None)
//!         .await
//!         .unwrap();
//!     assert_eq!(reply, "Hello!");
//!     assert_eq!(gateway.chat_call_count().await, 1);
//! }
//! ```

mod scripted;

pub use scripted::{Invocation, ScriptedGateway};

// Re-export chat-core types for convenience
pub use chat_core::{async_trait, ChatMessage, GatewayError, GenerationGateway};
