//! Google Custom Search client.

use chat_core::GatewayError;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

/// HTTP timeout for search requests (10 seconds).
const SEARCH_TIMEOUT_SECS: u64 = 10;

/// How many results to fold into the aggregated text.
const MAX_RESULTS: usize = 5;

/// Credentials and endpoint for the Custom Search API.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// API key.
    pub api_key: String,
    /// Search engine (cx) identifier.
    pub engine_id: String,
    /// Search endpoint URL.
    pub search_url: String,
}

impl SearchConfig {
    /// Google's Custom Search endpoint.
    pub const DEFAULT_SEARCH_URL: &'static str = "https://www.googleapis.com/customsearch/v1";
}

/// A single search result item.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchItem {
    /// Result title.
    #[serde(default)]
    pub title: String,
    /// Result URL.
    #[serde(default)]
    pub link: String,
    /// Result snippet.
    #[serde(default)]
    pub snippet: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

/// Client for the Custom Search API.
pub struct SearchClient {
    client: Client,
    config: SearchConfig,
}

impl SearchClient {
    /// Create a new search client.
    pub fn new(config: SearchConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(SEARCH_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                GatewayError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client, config })
    }

    /// Run a search and return the raw result items (possibly empty).
    pub async fn search(&self, terms: &str) -> Result<Vec<SearchItem>, GatewayError> {
        debug!("Searching: {}", terms);

        let response = self
            .client
            .get(&self.config.search_url)
            .query(&[
                ("key", self.config.api_key.as_str()),
                ("cx", self.config.engine_id.as_str()),
                ("q", terms),
            ])
            .send()
            .await
            .map_err(|e| GatewayError::Network(format!("Failed to send search request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("Search API error ({}): {}", status.as_u16(), error_text);
            return Err(GatewayError::ProcessingFailed(format!(
                "Search API error ({}): {}",
                status.as_u16(),
                error_text
            )));
        }

        let results: SearchResponse = response.json().await.map_err(|e| {
            GatewayError::ProcessingFailed(format!("Failed to parse search response: {}", e))
        })?;

        Ok(results.items)
    }
}

/// Fold result items into annotated text the generator can cite from.
pub fn aggregate_results(items: &[SearchItem]) -> String {
    if items.is_empty() {
        return "No search results found.".to_string();
    }

    items
        .iter()
        .take(MAX_RESULTS)
        .map(|item| format!("From {}: {}. {}", item.link, item.title, item.snippet))
        .collect::<Vec<_>>()
        .join("\n")
}
