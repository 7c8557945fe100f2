//! Push-notification trait and implementations.

use async_trait::async_trait;

use crate::error::OrchestratorError;

/// Trait for pushing progress events to a session's clients.
///
/// Delivery is best-effort: the pipeline logs failures and moves on, so a
/// dead push channel can never fail a chat request.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Push an interim status line (e.g. "Searching the internet...").
    async fn status_update(
        &self,
        session_id: &str,
        message: &str,
    ) -> Result<(), OrchestratorError>;

    /// Push the completed answer for the turn.
    async fn task_complete(&self, session_id: &str, answer: &str)
        -> Result<(), OrchestratorError>;
}

/// A no-op notifier for tests and headless use.
#[derive(Debug, Clone, Default)]
pub struct NoOpNotifier;

#[async_trait]
impl Notifier for NoOpNotifier {
    async fn status_update(
        &self,
        _session_id: &str,
        _message: &str,
    ) -> Result<(), OrchestratorError> {
        Ok(())
    }

    async fn task_complete(
        &self,
        _session_id: &str,
        _answer: &str,
    ) -> Result<(), OrchestratorError> {
        Ok(())
    }
}

/// A notifier that logs every event, for debugging.
#[derive(Debug, Clone, Default)]
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn status_update(
        &self,
        session_id: &str,
        message: &str,
    ) -> Result<(), OrchestratorError> {
        tracing::info!("[{}] status: {}", session_id, message);
        Ok(())
    }

    async fn task_complete(
        &self,
        session_id: &str,
        answer: &str,
    ) -> Result<(), OrchestratorError> {
        tracing::info!("[{}] complete: {} chars", session_id, answer.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_notifier() {
        let notifier = NoOpNotifier;
        notifier.status_update("s1", "working").await.unwrap();
        notifier.task_complete("s1", "done").await.unwrap();
    }

    #[tokio::test]
    async fn test_logging_notifier() {
        let notifier = LoggingNotifier;
        notifier.status_update("s1", "working").await.unwrap();
        notifier.task_complete("s1", "done").await.unwrap();
    }
}
