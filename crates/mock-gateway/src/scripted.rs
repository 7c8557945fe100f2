//! Scripted gateway - replays queued responses and records calls.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::Mutex;

use chat_core::{ChatMessage, GatewayError, GenerationGateway};

/// A recorded gateway invocation.
#[derive(Debug, Clone)]
pub enum Invocation {
    /// A chat completion call.
    Chat {
        /// Model requested by the caller.
        model: String,
        /// Temperature requested by the caller.
        temperature: f32,
        /// Per-call output token ceiling, if any.
        max_tokens: Option<u32>,
        /// Full message sequence sent to the backend.
        messages: Vec<ChatMessage>,
    },
    /// An image generation call.
    Image {
        /// The image prompt.
        prompt: String,
    },
    /// A web search call.
    Search {
        /// The search query.
        query: String,
    },
}

/// A gateway double that replays queued responses.
///
/// Chat responses are consumed in FIFO order; a call with an empty queue
/// fails with `ProcessingFailed`, which also makes a fresh
/// `ScriptedGateway::new()` a convenient always-failing gateway.
#[derive(Default)]
pub struct ScriptedGateway {
    chat_responses: Mutex<VecDeque<Result<String, String>>>,
    image_response: Mutex<Option<Result<String, String>>>,
    search_response: Mutex<Option<Result<String, String>>>,
    calls: Mutex<Vec<Invocation>>,
}

impl ScriptedGateway {
    /// Create a new gateway with nothing scripted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a chat completion response.
    pub async fn push_chat_response(&self, text: impl Into<String>) {
        self.chat_responses.lock().await.push_back(Ok(text.into()));
    }

    /// Queue a chat completion failure.
    pub async fn push_chat_error(&self, message: impl Into<String>) {
        self.chat_responses
            .lock()
            .await
            .push_back(Err(message.into()));
    }

    /// Set the image generation result (returned for every image call).
    pub async fn set_image_url(&self, url: impl Into<String>) {
        *self.image_response.lock().await = Some(Ok(url.into()));
    }

    /// Make every image generation call fail.
    pub async fn set_image_error(&self, message: impl Into<String>) {
        *self.image_response.lock().await = Some(Err(message.into()));
    }

    /// Set the web search result (returned for every search call).
    pub async fn set_search_result(&self, text: impl Into<String>) {
        *self.search_response.lock().await = Some(Ok(text.into()));
    }

    /// Make every web search call fail.
    pub async fn set_search_error(&self, message: impl Into<String>) {
        *self.search_response.lock().await = Some(Err(message.into()));
    }

    /// Get a copy of every recorded invocation, in call order.
    pub async fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().await.clone()
    }

    /// Count recorded chat completion calls.
    pub async fn chat_call_count(&self) -> usize {
        self.count(|call| matches!(call, Invocation::Chat { .. })).await
    }

    /// Count recorded image generation calls.
    pub async fn image_call_count(&self) -> usize {
        self.count(|call| matches!(call, Invocation::Image { .. })).await
    }

    /// Count recorded web search calls.
    pub async fn search_call_count(&self) -> usize {
        self.count(|call| matches!(call, Invocation::Search { .. })).await
    }

    async fn count(&self, predicate: impl Fn(&Invocation) -> bool) -> usize {
        self.calls.lock().await.iter().filter(|c| predicate(c)).count()
    }
}

#[async_trait]
impl GenerationGateway for ScriptedGateway {
    async fn generate_chat(
        &self,
        messages: Vec<ChatMessage>,
        model: &str,
        temperature: f32,
        max_tokens: Option<u32>,
    ) -> Result<String, GatewayError> {
        self.calls.lock().await.push(Invocation::Chat {
            model: model.to_string(),
            temperature,
            max_tokens,
            messages,
        });

        match self.chat_responses.lock().await.pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(GatewayError::ProcessingFailed(message)),
            None => Err(GatewayError::ProcessingFailed(
                "no scripted chat response".to_string(),
            )),
        }
    }

    async fn generate_image(&self, prompt: &str) -> Result<String, GatewayError> {
        self.calls.lock().await.push(Invocation::Image {
            prompt: prompt.to_string(),
        });

        match self.image_response.lock().await.clone() {
            Some(Ok(url)) => Ok(url),
            Some(Err(message)) => Err(GatewayError::ProcessingFailed(message)),
            None => Err(GatewayError::ProcessingFailed(
                "no scripted image response".to_string(),
            )),
        }
    }

    async fn web_search(
        &self,
        query: &str,
        _history: &[ChatMessage],
    ) -> Result<String, GatewayError> {
        self.calls.lock().await.push(Invocation::Search {
            query: query.to_string(),
        });

        match self.search_response.lock().await.clone() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(GatewayError::ProcessingFailed(message)),
            None => Err(GatewayError::ProcessingFailed(
                "no scripted search response".to_string(),
            )),
        }
    }

    fn name(&self) -> &str {
        "ScriptedGateway"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_chat_responses_replay_in_order() {
        let gateway = ScriptedGateway::new();
        gateway.push_chat_response("first").await;
        gateway.push_chat_response("second").await;

        let a = gateway
            .generate_chat(vec![ChatMessage::user("1")], "m", 0.0, None)
            .await
            .unwrap();
        let b = gateway
            .generate_chat(vec![ChatMessage::user("2")], "m", 0.0, None)
            .await
            .unwrap();
        assert_eq!(a, "first");
        assert_eq!(b, "second");
    }

    #[tokio::test]
    async fn test_empty_queue_fails() {
        let gateway = ScriptedGateway::new();
        let result = gateway.generate_chat(vec![], "m", 0.0, None).await;
        assert!(matches!(result, Err(GatewayError::ProcessingFailed(_))));
    }

    #[tokio::test]
    async fn test_scripted_error() {
        let gateway = ScriptedGateway::new();
        gateway.push_chat_error("backend down").await;

        let result = gateway.generate_chat(vec![], "m", 0.0, None).await;
        match result {
            Err(GatewayError::ProcessingFailed(msg)) => assert_eq!(msg, "backend down"),
            other => panic!("Expected ProcessingFailed, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_records_invocations() {
        let gateway = ScriptedGateway::new();
        gateway.set_image_url("https://img.example.com/1.png").await;
        gateway.set_search_result("results").await;

        let _ = gateway.generate_image("a flag").await;
        let _ = gateway.web_search("news", &[]).await;

        assert_eq!(gateway.image_call_count().await, 1);
        assert_eq!(gateway.search_call_count().await, 1);
        assert_eq!(gateway.chat_call_count().await, 0);

        let calls = gateway.calls().await;
        assert!(matches!(&calls[0], Invocation::Image { prompt } if prompt == "a flag"));
        assert!(matches!(&calls[1], Invocation::Search { query } if query == "news"));
    }
}
