//! Message operations.
//!
//! Messages are append-only and read back ordered by creation time, so a
//! conversation's history always replays in turn order.

use sqlx::SqlitePool;

use crate::error::Result;
use crate::models::Message;

/// Append a message to a conversation.
pub async fn append(
    pool: &SqlitePool,
    conversation_id: i64,
    role: &str,
    content: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO messages (conversation_id, role, content)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(conversation_id)
    .bind(role)
    .bind(content)
    .execute(pool)
    .await?;

    Ok(())
}

/// Get the full history of a conversation in chronological order.
pub async fn history(pool: &SqlitePool, conversation_id: i64) -> Result<Vec<Message>> {
    let messages = sqlx::query_as::<_, Message>(
        r#"
        SELECT id, conversation_id, role, content, created_at
        FROM messages
        WHERE conversation_id = ?
        ORDER BY created_at, id
        "#,
    )
    .bind(conversation_id)
    .fetch_all(pool)
    .await?;

    Ok(messages)
}

/// Get the most recent `limit` messages in chronological order.
pub async fn recent_history(
    pool: &SqlitePool,
    conversation_id: i64,
    limit: i64,
) -> Result<Vec<Message>> {
    let mut messages = sqlx::query_as::<_, Message>(
        r#"
        SELECT id, conversation_id, role, content, created_at
        FROM messages
        WHERE conversation_id = ?
        ORDER BY created_at DESC, id DESC
        LIMIT ?
        "#,
    )
    .bind(conversation_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    messages.reverse();
    Ok(messages)
}

/// Count messages in a conversation.
pub async fn count(pool: &SqlitePool, conversation_id: i64) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM messages WHERE conversation_id = ?
        "#,
    )
    .bind(conversation_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}
