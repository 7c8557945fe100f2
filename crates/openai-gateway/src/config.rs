//! Configuration for the OpenAI gateway.

use chat_core::GatewayError;
use std::env;

use crate::search::SearchConfig;

/// Configuration for [`crate::OpenAiGateway`].
#[derive(Debug, Clone)]
pub struct OpenAiGatewayConfig {
    /// API base URL.
    pub api_url: String,

    /// API key for authentication.
    pub api_key: String,

    /// Chat model used when the caller does not specify one.
    pub model: String,

    /// Image generation model.
    pub image_model: String,

    /// Image size passed to the image endpoint.
    pub image_size: String,

    /// Maximum tokens for chat responses.
    pub max_tokens: Option<u32>,

    /// HTTP timeout for every request, in seconds.
    pub timeout_secs: u64,

    /// Web search configuration, if search is enabled.
    pub search: Option<SearchConfig>,
}

impl Default for OpenAiGatewayConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.openai.com".to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            image_model: "dall-e-3".to_string(),
            image_size: "1024x1024".to_string(),
            max_tokens: Some(2000),
            timeout_secs: 60,
            search: None,
        }
    }
}

impl OpenAiGatewayConfig {
    /// Create configuration from environment variables.
    ///
    /// Required environment variables:
    /// - `OPENAI_API_KEY` - API key for authentication
    ///
    /// Optional environment variables:
    /// - `OPENAI_API_URL` - API base URL (default: https://api.openai.com)
    /// - `OPENAI_MODEL` - Chat model (default: gpt-4o-mini)
    /// - `OPENAI_IMAGE_MODEL` - Image model (default: dall-e-3)
    /// - `OPENAI_IMAGE_SIZE` - Image size (default: 1024x1024)
    /// - `OPENAI_MAX_TOKENS` - Max chat tokens (default: 2000)
    /// - `OPENAI_TIMEOUT_SECS` - HTTP timeout (default: 60)
    /// - `GOOGLE_API_KEY` / `SEARCH_ENGINE_ID` - enable web search when both
    ///   are set
    /// - `SEARCH_URL` - Custom Search endpoint (default: Google's)
    pub fn from_env() -> Result<Self, GatewayError> {
        let api_key = env::var("OPENAI_API_KEY")
            .map_err(|_| GatewayError::Configuration("OPENAI_API_KEY not set".to_string()))?;

        let api_url =
            env::var("OPENAI_API_URL").unwrap_or_else(|_| "https://api.openai.com".to_string());

        let model = env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

        let image_model =
            env::var("OPENAI_IMAGE_MODEL").unwrap_or_else(|_| "dall-e-3".to_string());

        let image_size = env::var("OPENAI_IMAGE_SIZE").unwrap_or_else(|_| "1024x1024".to_string());

        let max_tokens = env::var("OPENAI_MAX_TOKENS")
            .ok()
            .and_then(|v| v.parse().ok())
            .or(Some(2000));

        let timeout_secs = env::var("OPENAI_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        let search = match (env::var("GOOGLE_API_KEY"), env::var("SEARCH_ENGINE_ID")) {
            (Ok(api_key), Ok(engine_id)) => Some(SearchConfig {
                api_key,
                engine_id,
                search_url: env::var("SEARCH_URL")
                    .unwrap_or_else(|_| SearchConfig::DEFAULT_SEARCH_URL.to_string()),
            }),
            _ => None,
        };

        Ok(Self {
            api_url,
            api_key,
            model,
            image_model,
            image_size,
            max_tokens,
            timeout_secs,
            search,
        })
    }

    /// Create a new config builder.
    pub fn builder() -> OpenAiGatewayConfigBuilder {
        OpenAiGatewayConfigBuilder::default()
    }
}

/// Builder for [`OpenAiGatewayConfig`].
#[derive(Debug, Default)]
pub struct OpenAiGatewayConfigBuilder {
    config: OpenAiGatewayConfig,
}

impl OpenAiGatewayConfigBuilder {
    /// Set the API key.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = key.into();
        self
    }

    /// Set the API base URL.
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_url = url.into();
        self
    }

    /// Set the chat model.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    /// Set the image model.
    pub fn image_model(mut self, model: impl Into<String>) -> Self {
        self.config.image_model = model.into();
        self
    }

    /// Set the image size.
    pub fn image_size(mut self, size: impl Into<String>) -> Self {
        self.config.image_size = size.into();
        self
    }

    /// Set the max tokens.
    pub fn max_tokens(mut self, tokens: u32) -> Self {
        self.config.max_tokens = Some(tokens);
        self
    }

    /// Set the HTTP timeout in seconds.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs;
        self
    }

    /// Enable web search with the given credentials.
    pub fn search(mut self, api_key: impl Into<String>, engine_id: impl Into<String>) -> Self {
        self.config.search = Some(SearchConfig {
            api_key: api_key.into(),
            engine_id: engine_id.into(),
            search_url: SearchConfig::DEFAULT_SEARCH_URL.to_string(),
        });
        self
    }

    /// Build the configuration.
    pub fn build(self) -> OpenAiGatewayConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OpenAiGatewayConfig::default();

        assert_eq!(config.api_url, "https://api.openai.com");
        assert!(config.api_key.is_empty());
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.image_model, "dall-e-3");
        assert_eq!(config.image_size, "1024x1024");
        assert_eq!(config.max_tokens, Some(2000));
        assert_eq!(config.timeout_secs, 60);
        assert!(config.search.is_none());
    }

    #[test]
    fn test_builder_all_options() {
        let config = OpenAiGatewayConfig::builder()
            .api_key("my-key")
            .api_url("https://custom.api.com")
            .model("gpt-4o")
            .image_model("dall-e-2")
            .image_size("512x512")
            .max_tokens(512)
            .timeout_secs(10)
            .search("g-key", "engine-1")
            .build();

        assert_eq!(config.api_key, "my-key");
        assert_eq!(config.api_url, "https://custom.api.com");
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.image_model, "dall-e-2");
        assert_eq!(config.image_size, "512x512");
        assert_eq!(config.max_tokens, Some(512));
        assert_eq!(config.timeout_secs, 10);

        let search = config.search.unwrap();
        assert_eq!(search.api_key, "g-key");
        assert_eq!(search.engine_id, "engine-1");
        assert_eq!(search.search_url, SearchConfig::DEFAULT_SEARCH_URL);
    }

    // Environment-based tests are combined into a single test to avoid
    // race conditions when tests run in parallel (env vars are process-global).
    #[test]
    fn test_from_env_scenarios() {
        use std::sync::Mutex;
        static ENV_LOCK: Mutex<()> = Mutex::new(());
        let _guard = ENV_LOCK.lock().unwrap();

        fn clear_all_vars() {
            std::env::remove_var("OPENAI_API_KEY");
            std::env::remove_var("OPENAI_API_URL");
            std::env::remove_var("OPENAI_MODEL");
            std::env::remove_var("OPENAI_IMAGE_MODEL");
            std::env::remove_var("OPENAI_IMAGE_SIZE");
            std::env::remove_var("OPENAI_MAX_TOKENS");
            std::env::remove_var("OPENAI_TIMEOUT_SECS");
            std::env::remove_var("GOOGLE_API_KEY");
            std::env::remove_var("SEARCH_ENGINE_ID");
            std::env::remove_var("SEARCH_URL");
        }

        // Scenario 1: Missing API key should error
        clear_all_vars();
        let result = OpenAiGatewayConfig::from_env();
        match result {
            Err(GatewayError::Configuration(msg)) => assert!(msg.contains("OPENAI_API_KEY")),
            other => panic!("Expected Configuration error, got {:?}", other.map(|_| ())),
        }

        // Scenario 2: Only API key set, defaults used
        clear_all_vars();
        std::env::set_var("OPENAI_API_KEY", "test-env-key");

        let config = OpenAiGatewayConfig::from_env().unwrap();
        assert_eq!(config.api_key, "test-env-key");
        assert_eq!(config.api_url, "https://api.openai.com");
        assert_eq!(config.model, "gpt-4o-mini");
        assert!(config.search.is_none());

        // Scenario 3: Search enabled only when both credentials are present
        clear_all_vars();
        std::env::set_var("OPENAI_API_KEY", "test-env-key");
        std::env::set_var("GOOGLE_API_KEY", "g-key");
        assert!(OpenAiGatewayConfig::from_env().unwrap().search.is_none());

        std::env::set_var("SEARCH_ENGINE_ID", "engine-1");
        let config = OpenAiGatewayConfig::from_env().unwrap();
        let search = config.search.unwrap();
        assert_eq!(search.api_key, "g-key");
        assert_eq!(search.engine_id, "engine-1");

        // Cleanup
        clear_all_vars();
    }
}
