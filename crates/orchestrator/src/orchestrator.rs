//! Main pipeline that coordinates one chat turn end-to-end.

use std::sync::Arc;

use chat_core::{ChatMessage, ContentExtractor, GenerationGateway, PlainTextExtractor};
use openai_gateway::OpenAiGateway;
use parley_database::{conversation, message, uploaded_file, Database};
use rand::Rng;
use tracing::{info, warn};

use crate::classifier::{IntentClassifier, SessionFile};
use crate::code::{CodeContext, DiagramRenderer, NoDiagramRenderer};
use crate::config::PipelineConfig;
use crate::error::OrchestratorError;
use crate::files::{HandlerOutput, FileOrchestrator};
use crate::intent::{Orchestration, PrimaryIntent};
use crate::notifier::Notifier;
use crate::prompt;

/// Sentinel reply when chat generation fails.
const CHAT_FAILURE_REPLY: &str = "Error generating response.";

/// Guidance prepended to web-search supplemental context.
const SEARCH_GUIDANCE: &str = "You have internet content. Use only the most relevant info. \
                               Include source links as [source](url).";

/// One inbound chat turn.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    /// Session the turn belongs to.
    pub session_id: String,
    /// The user's message text.
    pub message: String,
    /// Model override for this turn.
    pub model: Option<String>,
    /// Temperature override for this turn.
    pub temperature: Option<f32>,
    /// System prompt override for this turn.
    pub system_prompt: Option<String>,
}

impl ChatTurn {
    /// Create a turn with defaults for everything but the message.
    pub fn new(session_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            message: message.into(),
            model: None,
            temperature: None,
            system_prompt: None,
        }
    }
}

/// The completed result of one turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Id of the conversation the turn was appended to.
    pub conversation_id: i64,
    /// The user message as processed (may be synthesized for bare uploads).
    pub user_message: String,
    /// The assistant's reply.
    pub assistant_reply: String,
    /// Conversation history as it stood before this turn.
    pub history: Vec<ChatMessage>,
    /// The classification record that drove routing.
    pub orchestration: Orchestration,
}

/// Main pipeline that coordinates one chat turn.
///
/// The pipeline:
/// - Looks up or creates the session's conversation (race-safe)
/// - Classifies the turn with a single deterministic LLM call
/// - Routes to exactly one handler in precedence order
/// - Assembles and trims the prompt for the general chat path
/// - Persists the turn and pushes best-effort progress events
pub struct Orchestrator<N: Notifier> {
    gateway: Arc<dyn GenerationGateway>,
    db: Database,
    classifier: IntentClassifier,
    files: FileOrchestrator,
    code: Option<CodeContext>,
    diagrams: Arc<dyn DiagramRenderer>,
    notifier: N,
    config: PipelineConfig,
}

impl<N: Notifier> Orchestrator<N> {
    /// Create a new pipeline with the given components.
    ///
    /// Uses the plain-text extractor and no diagram renderer; see
    /// [`Orchestrator::with_extractor`] and
    /// [`Orchestrator::with_diagram_renderer`].
    pub fn new(
        gateway: Arc<dyn GenerationGateway>,
        db: Database,
        notifier: N,
        config: PipelineConfig,
    ) -> Self {
        let classifier = IntentClassifier::new(gateway.clone(), config.classifier_model.clone());
        let files = FileOrchestrator::new(
            db.clone(),
            Arc::new(PlainTextExtractor),
            config.upload_dir.clone(),
        );
        let code = config.code_dir.clone().map(CodeContext::new);

        Self {
            gateway,
            db,
            classifier,
            files,
            code,
            diagrams: Arc::new(NoDiagramRenderer),
            notifier,
            config,
        }
    }

    /// Create a pipeline from environment variables.
    pub fn from_env(db: Database, notifier: N) -> Result<Self, OrchestratorError> {
        let gateway = OpenAiGateway::from_env()
            .map_err(|e| OrchestratorError::Configuration(e.to_string()))?;
        let config = PipelineConfig::from_env();
        Ok(Self::new(Arc::new(gateway), db, notifier, config))
    }

    /// Replace the content extractor used for file questions.
    pub fn with_extractor(mut self, extractor: Arc<dyn ContentExtractor>) -> Self {
        self.files =
            FileOrchestrator::new(self.db.clone(), extractor, self.config.upload_dir.clone());
        self
    }

    /// Set the diagram renderer used for structure visualization.
    pub fn with_diagram_renderer(mut self, renderer: Arc<dyn DiagramRenderer>) -> Self {
        self.diagrams = renderer;
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Get the notifier.
    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Process one chat turn end-to-end.
    pub async fn process(&self, turn: ChatTurn) -> Result<TurnOutcome, OrchestratorError> {
        let session_id = turn.session_id.clone();
        info!("Processing turn for session {}", session_id);

        // Conversation and windowed history
        let conversation = conversation::get_or_create(self.db.pool(), &session_id).await?;
        let history: Vec<ChatMessage> = message::recent_history(
            self.db.pool(),
            conversation.id,
            self.config.max_history_messages,
        )
        .await?
        .into_iter()
        .map(|m| ChatMessage {
            role: m.role,
            content: m.content,
        })
        .collect();

        // Session uploads ground the classifier's file handling. A listing
        // failure degrades to "no files"; classification must never fail.
        let session_files: Vec<SessionFile> =
            match uploaded_file::list_by_session(self.db.pool(), &session_id).await {
                Ok(files) => files
                    .into_iter()
                    .map(|f| SessionFile {
                        id: f.id,
                        filename: f.original_filename,
                    })
                    .collect(),
                Err(e) => {
                    warn!("Failed to list uploads for classification: {}", e);
                    Vec::new()
                }
            };

        let orchestration = self
            .classifier
            .classify(&turn.message, &history, &session_files)
            .await;
        let intent = orchestration.primary_intent();
        info!("Routing turn as {:?}", intent);

        self.notify_status(&session_id, intent.status_message()).await;

        match intent {
            PrimaryIntent::ImageGeneration => {
                self.execute_image(&turn, conversation.id, history, orchestration)
                    .await
            }
            PrimaryIntent::CodeStructure => {
                self.execute_code_structure(&turn, conversation.id, history, orchestration)
                    .await
            }
            _ => {
                self.execute_chat(&turn, conversation.id, history, orchestration, intent)
                    .await
            }
        }
    }

    /// Terminal image handler; never falls through to chat generation.
    async fn execute_image(
        &self,
        turn: &ChatTurn,
        conversation_id: i64,
        history: Vec<ChatMessage>,
        orchestration: Orchestration,
    ) -> Result<TurnOutcome, OrchestratorError> {
        let prompt = orchestration.image_prompt.trim();

        let reply = if prompt.is_empty() {
            "No image prompt provided.".to_string()
        } else {
            match self.gateway.generate_image(prompt).await {
                Ok(url) => format!("![Generated Image]({})", url),
                Err(e) => {
                    warn!("Image generation failed: {}", e);
                    "Failed to generate image.".to_string()
                }
            }
        };

        // No user text is persisted on this path, only the result
        message::append(self.db.pool(), conversation_id, "assistant", &reply).await?;
        self.notify_complete(&turn.session_id, &reply).await;

        Ok(TurnOutcome {
            conversation_id,
            user_message: turn.message.clone(),
            assistant_reply: reply,
            history,
            orchestration,
        })
    }

    /// Terminal structure-diagram handler.
    async fn execute_code_structure(
        &self,
        turn: &ChatTurn,
        conversation_id: i64,
        history: Vec<ChatMessage>,
        orchestration: Orchestration,
    ) -> Result<TurnOutcome, OrchestratorError> {
        let reply = match self.diagrams.render_structure().await {
            Some(url) => format!("![Codebase Structure]({})", url),
            None => "Failed to generate codebase structure diagram.".to_string(),
        };

        message::append(self.db.pool(), conversation_id, "assistant", &reply).await?;
        self.notify_complete(&turn.session_id, &reply).await;

        Ok(TurnOutcome {
            conversation_id,
            user_message: turn.message.clone(),
            assistant_reply: reply,
            history,
            orchestration,
        })
    }

    /// Non-terminal handlers plus the general chat path.
    async fn execute_chat(
        &self,
        turn: &ChatTurn,
        conversation_id: i64,
        history: Vec<ChatMessage>,
        orchestration: Orchestration,
        intent: PrimaryIntent,
    ) -> Result<TurnOutcome, OrchestratorError> {
        let HandlerOutput {
            supplemental,
            reply: partial_reply,
        } = self
            .gather_supplement(turn, &history, &orchestration, intent)
            .await;

        let final_reply = if !partial_reply.is_empty() {
            // The handler produced a complete answer
            partial_reply
        } else {
            let system_prompt = turn
                .system_prompt
                .as_deref()
                .unwrap_or(&self.config.system_prompt);
            let model = turn.model.as_deref().unwrap_or(&self.config.model);
            let temperature = turn.temperature.unwrap_or(self.config.temperature);

            let messages = prompt::assemble(
                system_prompt,
                &history,
                supplemental.as_ref(),
                &turn.message,
            );
            let messages = prompt::trim(messages, self.config.token_budget);

            match self
                .gateway
                .generate_chat(messages, model, temperature, None)
                .await
            {
                Ok(reply) => reply,
                Err(e) => {
                    warn!("Chat generation failed: {}", e);
                    CHAT_FAILURE_REPLY.to_string()
                }
            }
        };

        message::append(self.db.pool(), conversation_id, "user", &turn.message).await?;
        message::append(self.db.pool(), conversation_id, "assistant", &final_reply).await?;
        self.notify_complete(&turn.session_id, &final_reply).await;

        Ok(TurnOutcome {
            conversation_id,
            user_message: turn.message.clone(),
            assistant_reply: final_reply,
            history,
            orchestration,
        })
    }

    /// Run the selected non-terminal handler.
    ///
    /// Handler failures degrade to an empty output so a collaborator outage
    /// costs response quality, not availability.
    async fn gather_supplement(
        &self,
        turn: &ChatTurn,
        history: &[ChatMessage],
        orchestration: &Orchestration,
        intent: PrimaryIntent,
    ) -> HandlerOutput {
        match intent {
            PrimaryIntent::FileOrchestration => {
                self.files
                    .handle(&orchestration.file_ids, &turn.session_id)
                    .await
            }

            PrimaryIntent::CodeOrchestration => {
                let content = self.code.as_ref().map(CodeContext::collect);
                match content {
                    Some(content) if !content.is_empty() => HandlerOutput {
                        supplemental: Some(ChatMessage::system(format!(
                            "You have been supplemented with codebase information.\n***{}***",
                            content
                        ))),
                        reply: String::new(),
                    },
                    _ => HandlerOutput {
                        supplemental: None,
                        reply: "No code files found.".to_string(),
                    },
                }
            }

            PrimaryIntent::InternetSearch => {
                match self.gateway.web_search(&turn.message, history).await {
                    Ok(content) => HandlerOutput {
                        supplemental: Some(ChatMessage::system(format!(
                            "{}\n\nInternet Content:\n***{}***",
                            SEARCH_GUIDANCE, content
                        ))),
                        reply: String::new(),
                    },
                    Err(e) => {
                        warn!("Web search failed: {}", e);
                        HandlerOutput::default()
                    }
                }
            }

            PrimaryIntent::RandomNumber => {
                let reply = match orchestration.rand_num[..] {
                    [lo, hi] if lo <= hi => {
                        let n = rand::thread_rng().gen_range(lo..=hi);
                        format!("Your random number between {} and {} is {}.", lo, hi, n)
                    }
                    _ => "Please provide a valid range for the random number.".to_string(),
                };
                HandlerOutput {
                    supplemental: None,
                    reply,
                }
            }

            _ => HandlerOutput::default(),
        }
    }

    /// Push a status event; failures are logged, never propagated.
    async fn notify_status(&self, session_id: &str, status: &str) {
        if let Err(e) = self.notifier.status_update(session_id, status).await {
            warn!("Failed to send status update: {}", e);
        }
    }

    /// Push a completion event; failures are logged, never propagated.
    async fn notify_complete(&self, session_id: &str, answer: &str) {
        if let Err(e) = self.notifier.task_complete(session_id, answer).await {
            warn!("Failed to send completion event: {}", e);
        }
    }
}
