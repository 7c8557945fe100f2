//! Intent classification via a single LLM call.

use std::sync::Arc;

use chat_core::{ChatMessage, GenerationGateway};
use regex::Regex;
use tracing::{debug, trace, warn};

use crate::intent::Orchestration;

/// Temperature for classification (deterministic).
const CLASSIFIER_TEMPERATURE: f32 = 0.0;

/// Output budget for classification; the record is small.
const CLASSIFIER_MAX_TOKENS: u32 = 300;

/// How many trailing dialogue entries to include as context.
const HISTORY_WINDOW: usize = 5;

/// An uploaded file as presented to the classifier.
#[derive(Debug, Clone)]
pub struct SessionFile {
    /// Database id of the upload.
    pub id: i64,
    /// Filename as the user knows it.
    pub filename: String,
}

/// Classifies a user turn into an [`Orchestration`] record.
///
/// The classifier is stateless: it makes a single deterministic call per
/// turn and never fails. Any error on the way (network, non-JSON output,
/// type mismatches) falls back to the default all-false record, which routes
/// the turn to plain chat.
pub struct IntentClassifier {
    gateway: Arc<dyn GenerationGateway>,
    model: String,
    file_ref: Regex,
}

impl IntentClassifier {
    /// Create a classifier that calls the given gateway with `model`.
    pub fn new(gateway: Arc<dyn GenerationGateway>, model: impl Into<String>) -> Self {
        Self {
            gateway,
            model: model.into(),
            // Explicit file references look like FILE:42
            file_ref: Regex::new(r"FILE:(\d+)").expect("static pattern"),
        }
    }

    /// Classify a user message.
    pub async fn classify(
        &self,
        user_message: &str,
        history: &[ChatMessage],
        session_files: &[SessionFile],
    ) -> Orchestration {
        let messages = self.build_messages(user_message, history, session_files);
        trace!(message_count = messages.len(), "CLASSIFIER_INPUT");

        let mut record = match self
            .gateway
            .generate_chat(
                messages,
                &self.model,
                CLASSIFIER_TEMPERATURE,
                Some(CLASSIFIER_MAX_TOKENS),
            )
            .await
        {
            Ok(response) => {
                debug!("Classifier response: {}", response);
                match serde_json::from_str::<Orchestration>(extract_json(&response)) {
                    Ok(record) => record,
                    Err(e) => {
                        warn!(error = %e, raw_response = %response, "CLASSIFIER_PARSE_FAILED");
                        Orchestration::default()
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "CLASSIFIER_CALL_FAILED");
                Orchestration::default()
            }
        };

        self.apply_file_references(&mut record, user_message, session_files);
        record
    }

    /// Build the classification message sequence.
    ///
    /// System instruction, then the last [`HISTORY_WINDOW`] user/assistant
    /// entries in original order, then the current message.
    fn build_messages(
        &self,
        user_message: &str,
        history: &[ChatMessage],
        session_files: &[SessionFile],
    ) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::system(build_instruction(session_files))];

        let dialogue: Vec<&ChatMessage> =
            history.iter().filter(|m| m.is_dialogue()).collect();
        let window_start = dialogue.len().saturating_sub(HISTORY_WINDOW);
        for entry in &dialogue[window_start..] {
            messages.push((*entry).clone());
        }

        messages.push(ChatMessage::user(user_message));
        messages
    }

    /// Ground `file_ids` in the user's message.
    ///
    /// Explicit `FILE:<id>` references override whatever the model returned;
    /// with none present, a file question defaults to all of the session's
    /// uploads ("show me my files").
    fn apply_file_references(
        &self,
        record: &mut Orchestration,
        user_message: &str,
        session_files: &[SessionFile],
    ) {
        if !record.file_orchestration {
            return;
        }

        let mut referenced: Vec<String> = Vec::new();
        for capture in self.file_ref.captures_iter(user_message) {
            let id = capture[1].to_string();
            if !referenced.contains(&id) {
                referenced.push(id);
            }
        }

        record.file_ids = if referenced.is_empty() {
            session_files.iter().map(|f| f.id.to_string()).collect()
        } else {
            referenced
        };
    }
}

/// Build the classifier system instruction, embedding the session's files.
fn build_instruction(session_files: &[SessionFile]) -> String {
    let file_list = session_files
        .iter()
        .map(|f| format!("File ID: {}, Filename: {}", f.id, f.filename))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Analyze the user input, including the recent conversation turns, and output a \
         JSON object with the following keys:\n\
         - \"image_generation\": (boolean)\n\
         - \"image_prompt\": (string)\n\
         - \"internet_search\": (boolean)\n\
         - \"file_orchestration\": (boolean)\n\
         - \"file_ids\": (list of strings)\n\
         - \"code_orchestration\": (boolean)\n\
         - \"code_structure_orchestration\": (boolean)\n\
         - \"rand_num\": (list)\n\n\
         Respond with only the JSON object and no additional text.\n\n\
         Guidelines:\n\
         1. image_generation is true only when an image is requested. Example: \"Create an \
         image of a lighthouse at dusk\".\n\
         2. image_prompt contains the prompt for image generation when image_generation is \
         true.\n\
         3. internet_search is true when the user asks for information that might require \
         an internet search. If the question is about an uploaded file, set it to false.\n\
         4. file_orchestration is true when the user asks about an uploaded file. The files \
         uploaded in this session are:\n{}\n\
         5. file_ids contains the ids of the requested files when file_orchestration is \
         true. Detect file references in the format \"FILE:<id>\".\n\
         6. code_orchestration is true when the user asks about your own code or \
         implementation.\n\
         7. code_structure_orchestration is true only when the user asks specifically to \
         visualize the codebase architecture or structure.\n\
         8. rand_num contains [lowest_num, highest_num] when the user requests a random \
         number within a range.\n\n\
         IMPORTANT: Boolean values only: true or false.",
        file_list
    )
}

/// Extract JSON from a response that may contain markdown or other text.
fn extract_json(response: &str) -> &str {
    let trimmed = response.trim();

    if trimmed.starts_with('{') {
        return extract_balanced_json(trimmed);
    }

    // JSON in a ```json block
    if let Some(start) = trimmed.find("```json") {
        let json_start = start + 7;
        if let Some(end) = trimmed[json_start..].find("```") {
            return extract_balanced_json(trimmed[json_start..json_start + end].trim());
        }
    }

    // JSON in a generic code block
    if let Some(start) = trimmed.find("```") {
        let after_backticks = &trimmed[start + 3..];
        // Skip optional language identifier
        let json_start = after_backticks.find('\n').map(|i| i + 1).unwrap_or(0);
        if let Some(end) = after_backticks[json_start..].find("```") {
            return extract_balanced_json(after_backticks[json_start..json_start + end].trim());
        }
    }

    // A JSON object buried in surrounding prose
    if let Some(start) = trimmed.find('{') {
        return extract_balanced_json(&trimmed[start..]);
    }

    trimmed
}

/// Extract a balanced JSON object from a string that starts with '{'.
///
/// Handles trailing characters the model sometimes appends, such as extra
/// closing braces or commentary after the object.
fn extract_balanced_json(s: &str) -> &str {
    if !s.starts_with('{') {
        return s;
    }

    let mut depth = 0;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_string => {
                escape_next = true;
            }
            '"' => {
                in_string = !in_string;
            }
            '{' if !in_string => {
                depth += 1;
            }
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return &s[..=i];
                }
            }
            _ => {}
        }
    }

    s
}
