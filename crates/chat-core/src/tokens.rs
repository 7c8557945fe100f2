//! Heuristic token estimation for prompt budget enforcement.
//!
//! The generation backend's exact tokenizer is a collaborator concern; this
//! estimator stands in at the same seam and errs slightly high, which only
//! makes budget trimming more conservative.

use crate::message::ChatMessage;

/// Token counting utility for estimating token usage.
pub struct TokenCounter;

impl TokenCounter {
    /// Rough estimation of tokens in text.
    ///
    /// Roughly 4 characters per token for English prose, weighted toward
    /// word count so whitespace-heavy text is not under-counted.
    pub fn estimate_tokens(text: &str) -> u32 {
        if text.is_empty() {
            return 0;
        }

        let char_count = text.chars().count() as f64;
        let word_count = text.split_whitespace().count() as f64;

        let estimated = (word_count * 1.3) + (char_count * 0.25);

        // Overhead for special tokens and formatting
        (estimated * 1.1).ceil() as u32
    }

    /// Estimate tokens for a message as it will be sent over the wire.
    ///
    /// Counts the JSON serialization so role names and structural overhead
    /// are included in the budget.
    pub fn estimate_message_tokens(message: &ChatMessage) -> u32 {
        let encoded = serde_json::to_string(message).unwrap_or_else(|_| message.content.clone());
        Self::estimate_tokens(&encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text() {
        assert_eq!(TokenCounter::estimate_tokens(""), 0);
    }

    #[test]
    fn test_short_text_bounds() {
        let count = TokenCounter::estimate_tokens("hello world");
        assert!(count > 0);
        assert!(count < 10);
    }

    #[test]
    fn test_longer_text_counts_more() {
        let long = "This is a much longer text that should result in more \
                    tokens being estimated than a short greeting.";
        assert!(TokenCounter::estimate_tokens(long) > TokenCounter::estimate_tokens("hi"));
    }

    #[test]
    fn test_message_tokens_include_role() {
        let msg = ChatMessage::user("hello");
        // JSON framing adds tokens beyond the bare content.
        assert!(
            TokenCounter::estimate_message_tokens(&msg) > TokenCounter::estimate_tokens("hello")
        );
    }
}
