//! Uploaded file metadata operations.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::{NewUploadedFile, UploadedFile};

/// Register a newly stored upload and return the full row.
///
/// Storage keys are never reused: every upload gets a fresh UUID-prefixed
/// filename, so the UNIQUE constraint on `filename` only fires on a caller
/// bug.
pub async fn register(pool: &SqlitePool, file: &NewUploadedFile) -> Result<UploadedFile> {
    sqlx::query(
        r#"
        INSERT INTO uploaded_files (session_id, filename, original_filename, file_url, content_type)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&file.session_id)
    .bind(&file.filename)
    .bind(&file.original_filename)
    .bind(&file.file_url)
    .bind(&file.content_type)
    .execute(pool)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return DatabaseError::AlreadyExists {
                    entity: "UploadedFile",
                    id: file.filename.clone(),
                };
            }
        }
        DatabaseError::Sqlx(e)
    })?;

    get_by_filename(pool, &file.filename)
        .await?
        .ok_or_else(|| DatabaseError::NotFound {
            entity: "UploadedFile",
            id: file.filename.clone(),
        })
}

/// List all uploads for a session in upload order.
pub async fn list_by_session(pool: &SqlitePool, session_id: &str) -> Result<Vec<UploadedFile>> {
    let files = sqlx::query_as::<_, UploadedFile>(
        r#"
        SELECT id, session_id, filename, original_filename, file_url, content_type, created_at
        FROM uploaded_files
        WHERE session_id = ?
        ORDER BY created_at, id
        "#,
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;

    Ok(files)
}

/// Get an upload by its storage key.
pub async fn get_by_filename(pool: &SqlitePool, filename: &str) -> Result<Option<UploadedFile>> {
    let record = sqlx::query_as::<_, UploadedFile>(
        r#"
        SELECT id, session_id, filename, original_filename, file_url, content_type, created_at
        FROM uploaded_files
        WHERE filename = ?
        "#,
    )
    .bind(filename)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

/// Get an upload by storage key, scoped to the owning session.
///
/// Serving uploads goes through this so one session cannot fetch another
/// session's files by guessing storage keys.
pub async fn get_for_session(
    pool: &SqlitePool,
    filename: &str,
    session_id: &str,
) -> Result<Option<UploadedFile>> {
    let record = sqlx::query_as::<_, UploadedFile>(
        r#"
        SELECT id, session_id, filename, original_filename, file_url, content_type, created_at
        FROM uploaded_files
        WHERE filename = ? AND session_id = ?
        "#,
    )
    .bind(filename)
    .bind(session_id)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}
