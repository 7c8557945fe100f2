//! File orchestration sub-handler.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chat_core::{ChatMessage, ContentExtractor};
use parley_database::{uploaded_file, Database, UploadedFile};
use tracing::warn;

/// Above this many requested files, contents are withheld and only names
/// are listed. Bounds the prompt size of a single turn.
pub const FILE_CONTENT_LIMIT: usize = 3;

/// Output of the file sub-handler.
///
/// A non-empty `reply` is complete and returned to the user without further
/// generation. An empty `reply` with supplemental context falls through to
/// the general chat path, grounded in the file contents.
#[derive(Debug, Default)]
pub struct HandlerOutput {
    /// Supplemental system context for the generation call, if any.
    pub supplemental: Option<ChatMessage>,
    /// Complete reply text; empty when the turn should continue to chat.
    pub reply: String,
}

impl HandlerOutput {
    fn terminal(reply: impl Into<String>) -> Self {
        Self {
            supplemental: None,
            reply: reply.into(),
        }
    }
}

/// Handles turns classified as file questions.
pub struct FileOrchestrator {
    db: Database,
    extractor: Arc<dyn ContentExtractor>,
    upload_dir: PathBuf,
}

impl FileOrchestrator {
    /// Create a new file orchestrator reading uploads from `upload_dir`.
    pub fn new(db: Database, extractor: Arc<dyn ContentExtractor>, upload_dir: PathBuf) -> Self {
        Self {
            db,
            extractor,
            upload_dir,
        }
    }

    /// Handle a file question for `session_id`.
    ///
    /// Per-file read errors are collected, never fatal to the batch; a
    /// storage failure degrades to an empty output so the turn still reaches
    /// plain chat.
    pub async fn handle(&self, file_ids: &[String], session_id: &str) -> HandlerOutput {
        let files = match uploaded_file::list_by_session(self.db.pool(), session_id).await {
            Ok(files) => files,
            Err(e) => {
                warn!("Failed to list uploads for {}: {}", session_id, e);
                return HandlerOutput::default();
            }
        };

        if file_ids.is_empty() {
            return self.list_all(&files);
        }

        let index: HashMap<String, &UploadedFile> =
            files.iter().map(|f| (f.id.to_string(), f)).collect();

        let valid: Vec<&str> = file_ids
            .iter()
            .map(String::as_str)
            .filter(|id| index.contains_key(*id))
            .collect();
        let invalid: Vec<&str> = file_ids
            .iter()
            .map(String::as_str)
            .filter(|id| !index.contains_key(*id))
            .collect();

        if valid.is_empty() {
            let reply = if invalid.is_empty() {
                "No valid file IDs found.".to_string()
            } else {
                format!("No valid files found for IDs: {}", invalid.join(", "))
            };
            return HandlerOutput::terminal(reply);
        }

        if valid.len() > FILE_CONTENT_LIMIT {
            return Self::list_requested(&index, &valid, &invalid);
        }

        self.read_contents(&index, &valid, &invalid).await
    }

    /// No ids requested: list every upload, or say there are none.
    fn list_all(&self, files: &[UploadedFile]) -> HandlerOutput {
        if files.is_empty() {
            return HandlerOutput::terminal("No files have been uploaded yet.");
        }

        let listing = files
            .iter()
            .map(|f| format!("- {} (ID: {})", f.original_filename, f.id))
            .collect::<Vec<_>>()
            .join("\n");

        HandlerOutput {
            supplemental: Some(ChatMessage::system(format!(
                "List of uploaded files:\n***{}***",
                listing
            ))),
            reply: format!("Uploaded files:\n{}", listing),
        }
    }

    /// Too many ids: list names only, contents withheld.
    fn list_requested(
        index: &HashMap<String, &UploadedFile>,
        valid: &[&str],
        invalid: &[&str],
    ) -> HandlerOutput {
        let listing = valid
            .iter()
            .map(|id| format!("- {} (ID: {})", index[*id].original_filename, id))
            .collect::<Vec<_>>()
            .join("\n");

        let mut reply = format!(
            "Here are the requested file names:\n{}\n\n\
             Note: File contents not displayed for more than {} files.",
            listing, FILE_CONTENT_LIMIT
        );
        if !invalid.is_empty() {
            reply.push_str(&format!("\nInvalid IDs: {}.", invalid.join(", ")));
        }

        HandlerOutput {
            supplemental: Some(ChatMessage::system(format!(
                "Requested file names:\n***{}***",
                listing
            ))),
            reply,
        }
    }

    /// 1 to [`FILE_CONTENT_LIMIT`] ids: read contents and build supplemental
    /// grounding for the chat turn.
    async fn read_contents(
        &self,
        index: &HashMap<String, &UploadedFile>,
        valid: &[&str],
        invalid: &[&str],
    ) -> HandlerOutput {
        let mut contents: Vec<(String, String)> = Vec::new();
        let mut notes: Vec<String> = Vec::new();

        for id in valid {
            let file = index[*id];
            let path = self.upload_dir.join(&file.filename);

            if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                notes.push(format!(
                    "File '{}' not found on server.",
                    file.original_filename
                ));
                continue;
            }

            match self.extractor.extract(&path, &file.content_type).await {
                Ok(content) => contents.push((file.original_filename.clone(), content)),
                Err(e) => notes.push(format!(
                    "Error reading file '{}': {}",
                    file.original_filename, e
                )),
            }
        }

        if !invalid.is_empty() {
            notes.push(format!("Invalid file IDs: {}.", invalid.join(", ")));
        }

        if contents.is_empty() {
            // Nothing readable; report the errors directly.
            return HandlerOutput::terminal(notes.join("\n"));
        }

        let joined = contents
            .iter()
            .map(|(name, content)| format!("File: {}\nContent:\n***{}***", name, content))
            .collect::<Vec<_>>()
            .join("\n\n");

        let mut supplemental_text =
            format!("You have been supplemented with file contents:\n{}", joined);
        if !notes.is_empty() {
            supplemental_text.push_str(&format!("\n\n{}", notes.join("\n")));
        }

        HandlerOutput {
            supplemental: Some(ChatMessage::system(supplemental_text)),
            reply: String::new(),
        }
    }
}
