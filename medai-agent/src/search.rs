//! Web search fallback used when the local documents have nothing relevant.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{AgentError, Result};

/// Returned whenever the web search cannot produce a snippet, for any reason.
pub const NO_WEB_RESULTS: &str = "No relevant information found on the web.";

/// The default Tavily search endpoint.
pub const TAVILY_SEARCH_URL: &str = "https://api.tavily.com/search";

/// A web search backend that answers with a single best snippet.
///
/// Implementations never fail: transport errors, bad statuses and empty
/// result sets all collapse into [`NO_WEB_RESULTS`].
#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Search the web for `query` and return the best snippet.
    async fn search(&self, query: &str) -> String;
}

/// [`WebSearch`] backed by the Tavily search API.
pub struct TavilySearch {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    search_depth: String,
}

impl TavilySearch {
    /// Create a client for `endpoint` with a per-request timeout.
    ///
    /// A missing or blank `api_key` is allowed; every search then returns
    /// [`NO_WEB_RESULTS`] without touching the network.
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AgentError::Config(format!("failed to build search HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            search_depth: "basic".to_string(),
        })
    }

    /// Set the Tavily `search_depth` parameter (`basic` or `advanced`).
    pub fn with_search_depth(mut self, search_depth: impl Into<String>) -> Self {
        self.search_depth = search_depth.into();
        self
    }

    async fn try_search(&self, api_key: &str, query: &str) -> std::result::Result<String, String> {
        let body = SearchRequest { query, search_depth: &self.search_depth };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("API returned {status}"));
        }

        let parsed: SearchResponse =
            response.json().await.map_err(|e| format!("failed to parse response: {e}"))?;

        parsed
            .results
            .into_iter()
            .next()
            .map(|r| r.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| "no results".to_string())
    }
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    search_depth: &'a str,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Deserialize)]
struct SearchResult {
    #[serde(default)]
    content: String,
}

#[async_trait]
impl WebSearch for TavilySearch {
    async fn search(&self, query: &str) -> String {
        let Some(api_key) = self.api_key.as_deref() else {
            warn!(provider = "Tavily", "no API key configured; skipping web search");
            return NO_WEB_RESULTS.to_string();
        };

        debug!(provider = "Tavily", query, "web search");
        match self.try_search(api_key, query).await {
            Ok(snippet) => snippet,
            Err(reason) => {
                warn!(provider = "Tavily", %reason, "web search returned nothing usable");
                NO_WEB_RESULTS.to_string()
            }
        }
    }
}
