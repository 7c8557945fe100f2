//! Error types for pipeline operations.

use parley_database::DatabaseError;
use thiserror::Error;

/// Errors that can escape the pipeline.
///
/// Gateway and handler failures are degraded to sentinel replies inside the
/// pipeline; only persistence failures and push-channel failures surface
/// here.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Persistence failed; the turn cannot be completed.
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// A push notification could not be delivered.
    #[error("notification failed: {0}")]
    NotifyFailed(String),

    /// The pipeline could not be constructed.
    #[error("configuration error: {0}")]
    Configuration(String),
}
