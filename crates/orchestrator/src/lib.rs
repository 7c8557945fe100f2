//! Chat orchestration pipeline for Parley.
//!
//! This crate provides the [`Orchestrator`] type which coordinates one chat
//! turn: intent classification, handler routing, prompt assembly, token
//! budgeting, and persistence.
//!
//! # Architecture
//!
//! ```text
//! Chat request (from the api crate)
//!          ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       ORCHESTRATOR                          │
//! │                                                             │
//! │  1. Get or create the session's conversation (race-safe)    │
//! │         ↓                                                   │
//! │  2. Classify the turn (one deterministic LLM call;          │
//! │     any failure → all-false record → plain chat)            │
//! │         ↓                                                   │
//! │  3. Route by precedence, exactly one handler:               │
//! │     • image / structure diagram → terminal reply            │
//! │     • files / code / search → supplemental context          │
//! │     • random number → terminal reply                        │
//! │         ↓                                                   │
//! │  4. Assemble prompt, trim to the token budget               │
//! │         ↓                                                   │
//! │  5. Generate, persist the turn, push completion event       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use orchestrator::{ChatTurn, LoggingNotifier, Orchestrator};
//! use parley_database::Database;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("sqlite:parley.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     let orchestrator = Orchestrator::from_env(db, LoggingNotifier)?;
//!     let outcome = orchestrator
//!         .process(ChatTurn::new("session-uuid", "What's the weather?"))
//!         .await?;
//!
//!     println!("Reply: {}", outcome.assistant_reply);
//!     Ok(())
//! }
//! ```

mod classifier;
mod code;
mod config;
mod error;
mod files;
mod intent;
mod notifier;
mod orchestrator;
mod prompt;

// Public exports
pub use classifier::{IntentClassifier, SessionFile};
pub use code::{CodeContext, DiagramRenderer, NoDiagramRenderer};
pub use config::{PipelineConfig, DEFAULT_PROMPT_FILE, DEFAULT_SYSTEM_PROMPT};
pub use error::OrchestratorError;
pub use files::{FileOrchestrator, HandlerOutput, FILE_CONTENT_LIMIT};
pub use intent::{Orchestration, PrimaryIntent};
pub use notifier::{LoggingNotifier, NoOpNotifier, Notifier};
pub use orchestrator::{ChatTurn, Orchestrator, TurnOutcome};
pub use prompt::{assemble, trim, MAX_HISTORY_MESSAGES, PROMPT_TOKEN_BUDGET};

// Re-export commonly used types from dependencies
pub use chat_core::{ChatMessage, ContentExtractor, GenerationGateway, PlainTextExtractor};
