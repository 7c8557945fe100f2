//! Plain-text extraction from uploaded files.
//!
//! Rich-format extraction (PDF, Word, spreadsheets) lives behind the
//! [`ContentExtractor`] trait so those parsers stay out of the core. The
//! bundled [`PlainTextExtractor`] handles anything that reads as text and
//! enforces the shared word budget.

use std::path::Path;

use async_trait::async_trait;

use crate::error::ExtractError;

/// Maximum number of words of extracted content per file.
pub const WORD_LIMIT: usize = 50_000;

/// Trait for extracting plain text from an uploaded file.
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    /// Read the file at `path` and return its text, truncated to the word
    /// budget. The `content_type` is the MIME type recorded at upload time.
    async fn extract(&self, path: &Path, content_type: &str) -> Result<String, ExtractError>;
}

/// Extractor that treats every file as text.
///
/// Bytes are decoded lossily, so binary uploads degrade to replacement
/// characters rather than errors.
#[derive(Debug, Clone, Default)]
pub struct PlainTextExtractor;

#[async_trait]
impl ContentExtractor for PlainTextExtractor {
    async fn extract(&self, path: &Path, _content_type: &str) -> Result<String, ExtractError> {
        let bytes = tokio::fs::read(path).await?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        if text.trim().is_empty() {
            return Err(ExtractError::Empty);
        }
        Ok(truncate_words(&text, WORD_LIMIT))
    }
}

/// Truncate `text` to at most `limit` words, appending a truncation notice
/// when anything was dropped.
pub fn truncate_words(text: &str, limit: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= limit {
        return text.to_string();
    }
    format!(
        "{}\n\n[Text truncated after {} words.]",
        words[..limit].join(" "),
        limit
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_truncate_words_under_limit() {
        let text = "one two three";
        assert_eq!(truncate_words(text, 10), text);
    }

    #[test]
    fn test_truncate_words_over_limit() {
        let text = "a b c d e";
        let truncated = truncate_words(text, 3);
        assert!(truncated.starts_with("a b c"));
        assert!(truncated.contains("[Text truncated after 3 words.]"));
    }

    #[tokio::test]
    async fn test_plain_text_extraction() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "quarterly report contents").unwrap();

        let extractor = PlainTextExtractor;
        let text = extractor
            .extract(file.path(), "text/plain")
            .await
            .unwrap();
        assert_eq!(text, "quarterly report contents");
    }

    #[tokio::test]
    async fn test_empty_file_is_an_error() {
        let file = tempfile::NamedTempFile::new().unwrap();

        let extractor = PlainTextExtractor;
        let result = extractor.extract(file.path(), "text/plain").await;
        assert!(matches!(result, Err(ExtractError::Empty)));
    }

    #[tokio::test]
    async fn test_missing_file_is_an_io_error() {
        let extractor = PlainTextExtractor;
        let result = extractor
            .extract(Path::new("/nonexistent/report.txt"), "text/plain")
            .await;
        assert!(matches!(result, Err(ExtractError::Io(_))));
    }
}
