//! Database models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A conversation, identified by its opaque session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Conversation {
    /// Auto-incrementing ID.
    pub id: i64,
    /// Opaque session identifier (e.g. a UUID held by the client).
    pub session_id: String,
    /// Human-readable title.
    pub title: String,
    /// Creation timestamp.
    pub created_at: String,
}

/// A single message within a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Message {
    /// Auto-incrementing ID.
    pub id: i64,
    /// Owning conversation.
    pub conversation_id: i64,
    /// Role: "system", "user", or "assistant".
    pub role: String,
    /// Message text.
    pub content: String,
    /// Creation timestamp.
    pub created_at: String,
}

/// Metadata for a file uploaded within a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UploadedFile {
    /// Auto-incrementing ID.
    pub id: i64,
    /// Session the upload belongs to.
    pub session_id: String,
    /// Storage key (unique filename on disk or in blob storage).
    pub filename: String,
    /// Filename as supplied by the client.
    pub original_filename: String,
    /// Retrieval URL served back to the client.
    pub file_url: String,
    /// MIME type recorded at upload time.
    pub content_type: String,
    /// Creation timestamp.
    pub created_at: String,
}

/// Fields for registering a new uploaded file.
#[derive(Debug, Clone)]
pub struct NewUploadedFile {
    /// Session the upload belongs to.
    pub session_id: String,
    /// Storage key; must be unique across all uploads.
    pub filename: String,
    /// Filename as supplied by the client.
    pub original_filename: String,
    /// Retrieval URL served back to the client.
    pub file_url: String,
    /// MIME type recorded at upload time.
    pub content_type: String,
}
