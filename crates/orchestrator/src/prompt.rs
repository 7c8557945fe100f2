//! Prompt assembly and token-budget trimming.

use chat_core::{ChatMessage, TokenCounter};

/// Maximum stored-history messages pulled into a prompt.
pub const MAX_HISTORY_MESSAGES: i64 = 20;

/// Token budget for the assembled prompt.
pub const PROMPT_TOKEN_BUDGET: u32 = 50_000;

/// Formatting directive appended to every system prompt.
const STYLE_INSTRUCTIONS: &str = "Generate answers in Markdown. Use headings, lists, and \
                                  bullet points. Keep responses under 1500 tokens.";

/// Build the message sequence for a chat generation call.
///
/// The order is load-bearing: system prompt, history, then the supplemental
/// context (so it reads as freshly retrieved), then the user turn last for
/// maximum recency weighting.
pub fn assemble(
    system_prompt: &str,
    history: &[ChatMessage],
    supplemental: Option<&ChatMessage>,
    user_message: &str,
) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::system(format!(
        "{}\n\nAdditional Guidelines:\n{}",
        system_prompt, STYLE_INSTRUCTIONS
    ))];

    messages.extend(history.iter().cloned());

    if let Some(supplemental) = supplemental {
        messages.push(supplemental.clone());
    }

    messages.push(ChatMessage::user(user_message));
    messages
}

/// Trim `messages` from the front until they fit `max_tokens`.
///
/// Walks from the newest message backward, accumulating estimated token
/// cost, and drops everything older once the budget is hit. The final
/// message is the user's current turn and is never dropped, even when it
/// alone exceeds the budget.
pub fn trim(messages: Vec<ChatMessage>, max_tokens: u32) -> Vec<ChatMessage> {
    let mut total: u32 = 0;
    let mut kept: Vec<ChatMessage> = Vec::with_capacity(messages.len());

    for message in messages.iter().rev() {
        let cost = TokenCounter::estimate_message_tokens(message);
        if total + cost > max_tokens {
            break;
        }
        kept.push(message.clone());
        total += cost;
    }

    if kept.is_empty() {
        if let Some(last) = messages.last() {
            return vec![last.clone()];
        }
        return Vec::new();
    }

    kept.reverse();
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_core::TokenCounter;

    #[test]
    fn test_assemble_order() {
        let history = vec![
            ChatMessage::user("earlier question"),
            ChatMessage::assistant("earlier answer"),
        ];
        let supplemental = ChatMessage::system("Internet Content: ...");

        let messages = assemble("You are helpful.", &history, Some(&supplemental), "now?");

        assert_eq!(messages.len(), 5);
        assert_eq!(messages[0].role, "system");
        assert!(messages[0].content.starts_with("You are helpful."));
        assert!(messages[0].content.contains("Additional Guidelines"));
        assert_eq!(messages[1].content, "earlier question");
        assert_eq!(messages[2].content, "earlier answer");
        // Supplemental context sits between history and the user turn
        assert_eq!(messages[3].content, "Internet Content: ...");
        assert_eq!(messages[4].content, "now?");
        assert_eq!(messages[4].role, "user");
    }

    #[test]
    fn test_assemble_without_supplemental() {
        let messages = assemble("sys", &[], None, "hello");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].content, "hello");
    }

    #[test]
    fn test_trim_keeps_everything_under_budget() {
        let messages = vec![ChatMessage::user("a"), ChatMessage::assistant("b")];
        let trimmed = trim(messages.clone(), PROMPT_TOKEN_BUDGET);
        assert_eq!(trimmed, messages);
    }

    #[test]
    fn test_trim_drops_oldest_first() {
        let messages = vec![
            ChatMessage::user("oldest message in the sequence"),
            ChatMessage::assistant("middle message in the sequence"),
            ChatMessage::user("newest message in the sequence"),
        ];

        // Budget for exactly the last two messages
        let budget = TokenCounter::estimate_message_tokens(&messages[1])
            + TokenCounter::estimate_message_tokens(&messages[2]);

        let trimmed = trim(messages.clone(), budget);
        assert_eq!(trimmed.len(), 2);
        assert_eq!(trimmed[0].content, "middle message in the sequence");
        assert_eq!(trimmed[1].content, "newest message in the sequence");
    }

    #[test]
    fn test_trim_never_drops_the_final_message() {
        let messages = vec![
            ChatMessage::system("a very long system prompt that costs plenty of tokens"),
            ChatMessage::user("the current turn"),
        ];

        let trimmed = trim(messages.clone(), 0);
        assert_eq!(trimmed.len(), 1);
        assert_eq!(trimmed[0], messages[1]);
    }

    #[test]
    fn test_trim_empty_input() {
        assert!(trim(Vec::new(), 100).is_empty());
    }

    #[test]
    fn test_trim_preserves_chronological_order() {
        let messages: Vec<ChatMessage> = (0..6)
            .map(|i| ChatMessage::user(format!("message number {}", i)))
            .collect();

        let budget: u32 = messages[2..]
            .iter()
            .map(TokenCounter::estimate_message_tokens)
            .sum();

        let trimmed = trim(messages, budget);
        let contents: Vec<&str> = trimmed.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(
            contents,
            vec![
                "message number 2",
                "message number 3",
                "message number 4",
                "message number 5"
            ]
        );
    }
}
