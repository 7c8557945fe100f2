//! Pipeline configuration.

use std::env;
use std::path::{Path, PathBuf};

use crate::prompt::{MAX_HISTORY_MESSAGES, PROMPT_TOKEN_BUDGET};

/// Default system prompt (fallback if no env var or prompt file is set).
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful AI assistant. Provide relevant responses.";

/// Default path for the system prompt file.
pub const DEFAULT_PROMPT_FILE: &str = "SYSTEM_PROMPT.md";

/// Configuration for the orchestration pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// System prompt for chat generation.
    pub system_prompt: String,

    /// Chat model used when a request does not name one.
    pub model: String,

    /// Model used for intent classification.
    pub classifier_model: String,

    /// Sampling temperature used when a request does not set one.
    pub temperature: f32,

    /// How many stored messages to pull into the prompt.
    pub max_history_messages: i64,

    /// Token budget for the assembled prompt.
    pub token_budget: u32,

    /// Directory where uploads are stored.
    pub upload_dir: PathBuf,

    /// Root of the source tree served for code questions, if any.
    pub code_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            model: "gpt-4o-mini".to_string(),
            classifier_model: "gpt-4o".to_string(),
            temperature: 0.7,
            max_history_messages: MAX_HISTORY_MESSAGES,
            token_budget: PROMPT_TOKEN_BUDGET,
            upload_dir: PathBuf::from("uploads"),
            code_dir: None,
        }
    }
}

impl PipelineConfig {
    /// Create configuration from environment variables.
    ///
    /// Optional environment variables:
    /// - `PARLEY_SYSTEM_PROMPT` - System prompt (overrides prompt file)
    /// - `PARLEY_PROMPT_FILE` - Path to system prompt file (default: SYSTEM_PROMPT.md)
    /// - `PARLEY_MODEL` - Chat model (default: gpt-4o-mini)
    /// - `PARLEY_CLASSIFIER_MODEL` - Classifier model (default: gpt-4o)
    /// - `PARLEY_TEMPERATURE` - Default temperature (default: 0.7)
    /// - `PARLEY_UPLOAD_DIR` - Upload directory (default: uploads)
    /// - `PARLEY_CODE_DIR` - Source tree for code questions (default: unset)
    ///
    /// System prompt priority:
    /// 1. `PARLEY_SYSTEM_PROMPT` env var (if set)
    /// 2. Contents of prompt file (if exists)
    /// 3. Embedded default
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let system_prompt = if let Ok(prompt) = env::var("PARLEY_SYSTEM_PROMPT") {
            prompt
        } else {
            let prompt_file = env::var("PARLEY_PROMPT_FILE")
                .unwrap_or_else(|_| DEFAULT_PROMPT_FILE.to_string());
            load_prompt_file(&prompt_file).unwrap_or(defaults.system_prompt)
        };

        Self {
            system_prompt,
            model: env::var("PARLEY_MODEL").unwrap_or(defaults.model),
            classifier_model: env::var("PARLEY_CLASSIFIER_MODEL")
                .unwrap_or(defaults.classifier_model),
            temperature: env::var("PARLEY_TEMPERATURE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.temperature),
            max_history_messages: defaults.max_history_messages,
            token_budget: defaults.token_budget,
            upload_dir: env::var("PARLEY_UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            code_dir: env::var("PARLEY_CODE_DIR").ok().map(PathBuf::from),
        }
    }
}

/// Load a prompt from a file path.
///
/// Returns `Some(content)` if the file exists and is non-empty.
fn load_prompt_file(path: impl AsRef<Path>) -> Option<String> {
    let path = path.as_ref();

    match std::fs::read_to_string(path) {
        Ok(content) => {
            let trimmed = content.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Err(_) => None,
    }
}
