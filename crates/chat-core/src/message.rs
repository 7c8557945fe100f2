//! Chat message types.

use serde::{Deserialize, Serialize};

/// A single message in a prompt sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role: "system", "user", or "assistant"
    pub role: String,
    /// Message content
    pub content: String,
}

impl ChatMessage {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }

    /// Whether this message was authored by the user or the assistant.
    ///
    /// System and supplemental messages are excluded from classification
    /// context windows.
    pub fn is_dialogue(&self) -> bool {
        self.role == "user" || self.role == "assistant"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        assert_eq!(ChatMessage::system("a").role, "system");
        assert_eq!(ChatMessage::user("b").role, "user");
        assert_eq!(ChatMessage::assistant("c").role, "assistant");
        assert_eq!(ChatMessage::assistant("c").content, "c");
    }

    #[test]
    fn test_is_dialogue() {
        assert!(ChatMessage::user("hi").is_dialogue());
        assert!(ChatMessage::assistant("hello").is_dialogue());
        assert!(!ChatMessage::system("rules").is_dialogue());
    }

    #[test]
    fn test_serde_round_trip() {
        let msg = ChatMessage::user("what's new?");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""role":"user""#));

        let parsed: ChatMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, msg);
    }
}
