//! SQLite persistence layer for Parley.
//!
//! This crate provides async database operations for conversations,
//! messages, and uploaded-file metadata using SQLx with SQLite.
//!
//! # Example
//!
//! ```no_run
//! use database::{conversation, message, Database};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Connect and run migrations
//!     let db = Database::connect("sqlite:parley.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     // One conversation per session, created on first use
//!     let conv = conversation::get_or_create(db.pool(), "session-uuid").await?;
//!     message::append(db.pool(), conv.id, "user", "hello").await?;
//!
//!     Ok(())
//! }
//! ```

pub mod conversation;
pub mod error;
pub mod message;
pub mod models;
pub mod uploaded_file;

pub use error::{DatabaseError, Result};
pub use models::{Conversation, Message, NewUploadedFile, UploadedFile};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Database connection wrapper.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Default pool size for database connections.
    /// Set high enough to handle concurrent chat requests.
    const DEFAULT_POOL_SIZE: u32 = 20;

    /// Connect to a SQLite database.
    ///
    /// The URL should be in the format `sqlite:path/to/db.sqlite?mode=rwc`.
    /// Use `?mode=rwc` to create the database file if it doesn't exist.
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_pool_size(url, Self::DEFAULT_POOL_SIZE).await
    }

    /// Connect to a SQLite database with a custom pool size.
    pub async fn connect_with_pool_size(url: &str, pool_size: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(options)
            .await?;

        tracing::info!("Connected to database: {} (pool size: {})", url, pool_size);

        Ok(Self { pool })
    }

    /// Run database migrations.
    ///
    /// This should be called once after connecting to ensure the schema is up to date.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::migrate!("./migrations").run(&self.pool).await?;

        tracing::info!("Migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> Database {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_conversation_get_or_create() {
        let db = test_db().await;

        let first = conversation::get_or_create(db.pool(), "session-1")
            .await
            .unwrap();
        assert_eq!(first.session_id, "session-1");
        assert_eq!(first.title, conversation::DEFAULT_TITLE);

        // Second call returns the same row, not a new one
        let second = conversation::get_or_create(db.pool(), "session-1")
            .await
            .unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(conversation::count(db.pool()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_conversation_duplicate_insert_rejected() {
        let db = test_db().await;

        conversation::create(db.pool(), "session-1", "First")
            .await
            .unwrap();
        let result = conversation::create(db.pool(), "session-1", "Second").await;
        assert!(matches!(
            result,
            Err(DatabaseError::AlreadyExists { .. })
        ));
    }

    #[tokio::test]
    async fn test_concurrent_get_or_create_single_row() {
        // File-backed database so both tasks share real connections.
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}/parley.db?mode=rwc", dir.path().display());
        let db = Database::connect(&url).await.unwrap();
        db.migrate().await.unwrap();

        let (a, b) = tokio::join!(
            conversation::get_or_create(db.pool(), "fresh-session"),
            conversation::get_or_create(db.pool(), "fresh-session"),
        );

        let a = a.unwrap();
        let b = b.unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(
            conversation::count_for_session(db.pool(), "fresh-session")
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_message_ordering() {
        let db = test_db().await;
        let conv = conversation::get_or_create(db.pool(), "s").await.unwrap();

        message::append(db.pool(), conv.id, "user", "first").await.unwrap();
        message::append(db.pool(), conv.id, "assistant", "second")
            .await
            .unwrap();
        message::append(db.pool(), conv.id, "user", "third").await.unwrap();

        let history = message::history(db.pool(), conv.id).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].content, "first");
        assert_eq!(history[2].content, "third");

        let recent = message::recent_history(db.pool(), conv.id, 2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].content, "second");
        assert_eq!(recent[1].content, "third");
    }

    #[tokio::test]
    async fn test_uploaded_file_session_scoping() {
        let db = test_db().await;

        let file = uploaded_file::register(
            db.pool(),
            &NewUploadedFile {
                session_id: "s1".to_string(),
                filename: "abc123_report.txt".to_string(),
                original_filename: "report.txt".to_string(),
                file_url: "/uploads/abc123_report.txt".to_string(),
                content_type: "text/plain".to_string(),
            },
        )
        .await
        .unwrap();
        assert!(file.id > 0);

        let listed = uploaded_file::list_by_session(db.pool(), "s1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].original_filename, "report.txt");

        // Another session cannot see or fetch it
        assert!(uploaded_file::list_by_session(db.pool(), "s2")
            .await
            .unwrap()
            .is_empty());
        assert!(
            uploaded_file::get_for_session(db.pool(), "abc123_report.txt", "s2")
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            uploaded_file::get_for_session(db.pool(), "abc123_report.txt", "s1")
                .await
                .unwrap()
                .is_some()
        );
    }
}
