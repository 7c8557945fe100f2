//! Conversation operations.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::Conversation;

/// Title assigned to conversations created without an explicit one.
pub const DEFAULT_TITLE: &str = "New Conversation";

/// Create a new conversation for a session.
pub async fn create(pool: &SqlitePool, session_id: &str, title: &str) -> Result<Conversation> {
    sqlx::query(
        r#"
        INSERT INTO conversations (session_id, title)
        VALUES (?, ?)
        "#,
    )
    .bind(session_id)
    .bind(title)
    .execute(pool)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return DatabaseError::AlreadyExists {
                    entity: "Conversation",
                    id: session_id.to_string(),
                };
            }
        }
        DatabaseError::Sqlx(e)
    })?;

    get_by_session(pool, session_id)
        .await?
        .ok_or_else(|| DatabaseError::NotFound {
            entity: "Conversation",
            id: session_id.to_string(),
        })
}

/// Get a conversation by session identifier.
pub async fn get_by_session(pool: &SqlitePool, session_id: &str) -> Result<Option<Conversation>> {
    let record = sqlx::query_as::<_, Conversation>(
        r#"
        SELECT id, session_id, title, created_at
        FROM conversations
        WHERE session_id = ?
        "#,
    )
    .bind(session_id)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

/// Get an existing conversation for a session, or create one.
///
/// Two concurrent first requests for the same session both land here; the
/// UNIQUE constraint on `session_id` makes the loser's insert fail, and the
/// loser then reads the winner's row instead. Exactly one row per session.
pub async fn get_or_create(pool: &SqlitePool, session_id: &str) -> Result<Conversation> {
    if let Some(conversation) = get_by_session(pool, session_id).await? {
        return Ok(conversation);
    }

    match create(pool, session_id, DEFAULT_TITLE).await {
        Ok(conversation) => Ok(conversation),
        Err(DatabaseError::AlreadyExists { .. }) => get_by_session(pool, session_id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound {
                entity: "Conversation",
                id: session_id.to_string(),
            }),
        Err(e) => Err(e),
    }
}

/// Count total conversations.
pub async fn count(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM conversations
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Count conversations for one session identifier.
pub async fn count_for_session(pool: &SqlitePool, session_id: &str) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM conversations WHERE session_id = ?
        "#,
    )
    .bind(session_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}
