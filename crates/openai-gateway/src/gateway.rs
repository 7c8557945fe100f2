//! Gateway implementation over an OpenAI-compatible API.

use chat_core::{async_trait, ChatMessage, GatewayError, GenerationGateway};
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::api_types::{
    ApiError, ChatCompletionRequest, ChatCompletionResponse, ImageGenerationRequest,
    ImageGenerationResponse,
};
use crate::config::OpenAiGatewayConfig;
use crate::search::{aggregate_results, SearchClient};

/// Temperature for search-term generation (slightly creative, mostly literal).
const SEARCH_TERMS_TEMPERATURE: f32 = 0.4;

/// Output budget for search-term generation.
const SEARCH_TERMS_MAX_TOKENS: u32 = 60;

/// A [`GenerationGateway`] backed by an OpenAI-compatible API.
///
/// Covers chat completions and image generations; web search goes through a
/// Google Custom Search client with search terms first optimized by the
/// chat model.
pub struct OpenAiGateway {
    client: Client,
    config: OpenAiGatewayConfig,
    search: Option<SearchClient>,
}

impl OpenAiGateway {
    /// Create a new gateway with the given configuration.
    pub fn new(config: OpenAiGatewayConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                GatewayError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        let search = match config.search.clone() {
            Some(search_config) => Some(SearchClient::new(search_config)?),
            None => None,
        };

        info!(
            "OpenAiGateway initialized with model: {}, image model: {}, search: {}",
            config.model,
            config.image_model,
            search.is_some()
        );

        Ok(Self {
            client,
            config,
            search,
        })
    }

    /// Create a gateway from environment variables.
    ///
    /// See [`OpenAiGatewayConfig::from_env`] for the variables used.
    pub fn from_env() -> Result<Self, GatewayError> {
        let config = OpenAiGatewayConfig::from_env()?;
        Self::new(config)
    }

    /// Get the configuration.
    pub fn config(&self) -> &OpenAiGatewayConfig {
        &self.config
    }

    /// Make a chat completion request.
    async fn chat_completion(
        &self,
        messages: Vec<ChatMessage>,
        model: &str,
        temperature: f32,
        max_tokens: Option<u32>,
    ) -> Result<ChatCompletionResponse, GatewayError> {
        let url = format!("{}/v1/chat/completions", self.config.api_url);

        let request = ChatCompletionRequest {
            model: model.to_string(),
            messages,
            max_tokens,
            temperature: Some(temperature),
        };

        debug!("Sending chat completion request: model={}", model);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| GatewayError::Network(format!("Failed to send request: {}", e)))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();

            // Prefer the structured API error message when the body parses
            if let Ok(api_error) = serde_json::from_str::<ApiError>(&error_text) {
                return Err(GatewayError::ProcessingFailed(format!(
                    "API error ({}): {}",
                    status.as_u16(),
                    api_error.error.message
                )));
            }

            return Err(GatewayError::ProcessingFailed(format!(
                "API error ({}): {}",
                status.as_u16(),
                error_text
            )));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::ProcessingFailed(format!("Failed to parse response: {}", e)))?;

        if let Some(ref usage) = completion.usage {
            debug!(
                "Token usage - prompt: {}, completion: {}, total: {}",
                usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
            );
        }

        Ok(completion)
    }

    /// Generate optimized search terms for a query.
    ///
    /// Falls back to the raw query if the model call fails; search still
    /// proceeds, just less focused.
    async fn generate_search_terms(&self, query: &str, history: &[ChatMessage]) -> String {
        let mut messages = vec![ChatMessage::system(
            "Generate concise search terms for a web search based on the user input. \
             Return only the search terms, with no additional formatting or headings. \
             Be as brief and relevant as possible. Do not use quotation marks.",
        )];
        messages.extend(history.iter().cloned());
        messages.push(ChatMessage::user(format!("User Input: {}\n", query)));

        match self
            .chat_completion(
                messages,
                &self.config.model,
                SEARCH_TERMS_TEMPERATURE,
                Some(SEARCH_TERMS_MAX_TOKENS),
            )
            .await
        {
            Ok(completion) => completion
                .choices
                .first()
                .and_then(|c| c.message.content.as_deref())
                .and_then(|text| text.lines().next())
                .map(|line| line.trim().to_string())
                .filter(|line| !line.is_empty())
                .unwrap_or_else(|| query.to_string()),
            Err(e) => {
                warn!("Search term generation failed, using raw query: {}", e);
                query.to_string()
            }
        }
    }
}

#[async_trait]
impl GenerationGateway for OpenAiGateway {
    async fn generate_chat(
        &self,
        messages: Vec<ChatMessage>,
        model: &str,
        temperature: f32,
        max_tokens: Option<u32>,
    ) -> Result<String, GatewayError> {
        let model = if model.is_empty() {
            &self.config.model
        } else {
            model
        };

        let completion = self
            .chat_completion(
                messages,
                model,
                temperature,
                max_tokens.or(self.config.max_tokens),
            )
            .await?;

        let reply = completion
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .map(|s| s.to_string())
            .unwrap_or_else(|| {
                warn!("No content in response, using default");
                "I apologize, but I couldn't generate a response.".to_string()
            });

        Ok(reply)
    }

    async fn generate_image(&self, prompt: &str) -> Result<String, GatewayError> {
        let url = format!("{}/v1/images/generations", self.config.api_url);

        let request = ImageGenerationRequest {
            model: self.config.image_model.clone(),
            prompt: prompt.to_string(),
            n: 1,
            size: self.config.image_size.clone(),
        };

        debug!("Sending image generation request: model={}", request.model);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| GatewayError::Network(format!("Failed to send request: {}", e)))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();

            if let Ok(api_error) = serde_json::from_str::<ApiError>(&error_text) {
                return Err(GatewayError::ProcessingFailed(format!(
                    "Image API error ({}): {}",
                    status.as_u16(),
                    api_error.error.message
                )));
            }

            return Err(GatewayError::ProcessingFailed(format!(
                "Image API error ({}): {}",
                status.as_u16(),
                error_text
            )));
        }

        let generated: ImageGenerationResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::ProcessingFailed(format!("Failed to parse response: {}", e)))?;

        generated
            .data
            .first()
            .and_then(|image| image.url.clone())
            .ok_or_else(|| GatewayError::ProcessingFailed("No image URL in response".to_string()))
    }

    async fn web_search(
        &self,
        query: &str,
        history: &[ChatMessage],
    ) -> Result<String, GatewayError> {
        let Some(ref search) = self.search else {
            return Err(GatewayError::Configuration(
                "web search is not configured".to_string(),
            ));
        };

        let terms = self.generate_search_terms(query, history).await;
        info!("Web search terms: {}", terms);

        let mut items = search.search(&terms).await?;

        // Empty result set: regenerate broader terms once and retry
        if items.is_empty() {
            let retry_query = format!(
                "{}\nThis is what you provided last time and resulted in no search results. \
                 Try again, but be more general to allow a broader search:\n{}",
                query, terms
            );
            let broader = self.generate_search_terms(&retry_query, history).await;
            info!("Broadened search terms: {}", broader);
            items = search.search(&broader).await?;
        }

        Ok(aggregate_results(&items))
    }

    fn name(&self) -> &str {
        "OpenAiGateway"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_name() {
        let config = OpenAiGatewayConfig::builder().api_key("test-key").build();
        let gateway = OpenAiGateway::new(config).unwrap();
        assert_eq!(gateway.name(), "OpenAiGateway");
    }

    #[test]
    fn test_search_disabled_without_credentials() {
        let config = OpenAiGatewayConfig::builder().api_key("test-key").build();
        let gateway = OpenAiGateway::new(config).unwrap();
        assert!(gateway.search.is_none());
    }

    #[tokio::test]
    async fn test_web_search_unconfigured_is_a_configuration_error() {
        let config = OpenAiGatewayConfig::builder().api_key("test-key").build();
        let gateway = OpenAiGateway::new(config).unwrap();

        let result = gateway.web_search("anything", &[]).await;
        assert!(matches!(result, Err(GatewayError::Configuration(_))));
    }
}
