//! # Web Search
//!
//! Search backends the research-capable agents can call. Serper (Google
//! results) is used when `SERPER_API_KEY` is set; a SearXNG instance is the
//! fallback when `SEARXNG_URL` is configured.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

pub const DEFAULT_SERPER_URL: &str = "https://google.serper.dev/search";
pub const DEFAULT_MAX_RESULTS: usize = 5;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("no search backend configured (set SERPER_API_KEY or SEARXNG_URL)")]
    NoBackend,
    #[error("search request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("search backend returned HTTP {0}")]
    Status(u16),
}

/// Where search requests go
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub serper_api_key: Option<String>,
    pub serper_url: String,
    pub searxng_url: Option<String>,
    pub max_results: usize,
    pub timeout: Duration,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            serper_api_key: None,
            serper_url: DEFAULT_SERPER_URL.to_string(),
            searxng_url: None,
            max_results: DEFAULT_MAX_RESULTS,
            timeout: Duration::from_secs(10),
        }
    }
}

impl SearchConfig {
    /// Read `SERPER_API_KEY`, `SERPER_URL`, `SEARXNG_URL` and
    /// `PITCHCRAFT_MAX_SEARCH_RESULTS` from the environment
    pub fn from_env() -> Self {
        let non_empty = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        let mut config = Self::default();
        config.serper_api_key = non_empty("SERPER_API_KEY");
        if let Some(url) = non_empty("SERPER_URL") {
            config.serper_url = url;
        }
        config.searxng_url = non_empty("SEARXNG_URL");
        if let Some(max) = non_empty("PITCHCRAFT_MAX_SEARCH_RESULTS").and_then(|v| v.parse().ok())
        {
            config.max_results = max;
        }
        config
    }

    pub fn has_backend(&self) -> bool {
        self.serper_api_key.is_some() || self.searxng_url.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchSource {
    Serper,
    Searxng,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResults {
    pub query: String,
    pub source: SearchSource,
    pub hits: Vec<SearchHit>,
}

/// Run a web search against the configured backend
pub async fn search(config: &SearchConfig, query: &str) -> Result<SearchResults, SearchError> {
    if !config.has_backend() {
        return Err(SearchError::NoBackend);
    }

    let client = reqwest::Client::builder()
        .timeout(config.timeout)
        .user_agent("pitchcraft/0.1")
        .build()?;

    if let Some(api_key) = &config.serper_api_key {
        match search_serper(&client, config, api_key, query).await {
            Ok(hits) => {
                return Ok(SearchResults {
                    query: query.to_string(),
                    source: SearchSource::Serper,
                    hits,
                })
            }
            Err(e) if config.searxng_url.is_some() => {
                tracing::warn!("Serper search failed, falling back to SearXNG: {}", e);
            }
            Err(e) => return Err(e),
        }
    }

    // has_backend() guarantees one of the two is present
    let base = config.searxng_url.as_deref().ok_or(SearchError::NoBackend)?;
    let hits = search_searxng(&client, base, query, config.max_results).await?;
    Ok(SearchResults {
        query: query.to_string(),
        source: SearchSource::Searxng,
        hits,
    })
}

async fn search_serper(
    client: &reqwest::Client,
    config: &SearchConfig,
    api_key: &str,
    query: &str,
) -> Result<Vec<SearchHit>, SearchError> {
    let response = client
        .post(&config.serper_url)
        .header("X-API-KEY", api_key)
        .json(&json!({ "q": query, "num": config.max_results }))
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(SearchError::Status(response.status().as_u16()));
    }

    let body: serde_json::Value = response.json().await?;
    let hits = body
        .get("organic")
        .and_then(|o| o.as_array())
        .map(|items| {
            items
                .iter()
                .take(config.max_results)
                .map(|r| SearchHit {
                    title: str_field(r, "title"),
                    url: str_field(r, "link"),
                    snippet: str_field(r, "snippet"),
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(hits)
}

async fn search_searxng(
    client: &reqwest::Client,
    base: &str,
    query: &str,
    max_results: usize,
) -> Result<Vec<SearchHit>, SearchError> {
    let url = format!(
        "{}/search?q={}&format=json",
        base.trim_end_matches('/'),
        urlencoding::encode(query)
    );

    let response = client.get(&url).send().await?;
    if !response.status().is_success() {
        return Err(SearchError::Status(response.status().as_u16()));
    }

    let body: serde_json::Value = response.json().await?;
    let hits = body
        .get("results")
        .and_then(|r| r.as_array())
        .map(|items| {
            items
                .iter()
                .take(max_results)
                .map(|r| SearchHit {
                    title: str_field(r, "title"),
                    url: str_field(r, "url"),
                    snippet: str_field(r, "content"),
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(hits)
}

fn str_field(value: &serde_json::Value, key: &str) -> String {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn serper_config(server: &MockServer) -> SearchConfig {
        SearchConfig {
            serper_api_key: Some("test-key".to_string()),
            serper_url: server.url("/search"),
            max_results: 2,
            ..SearchConfig::default()
        }
    }

    #[tokio::test]
    async fn test_no_backend_is_an_error() {
        let result = search(&SearchConfig::default(), "crewai").await;
        assert!(matches!(result, Err(SearchError::NoBackend)));
    }

    #[tokio::test]
    async fn test_serper_results_are_mapped_and_truncated() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/search")
                    .header("x-api-key", "test-key")
                    .json_body(json!({ "q": "acme.com competitors", "num": 2 }));
                then.status(200).json_body(json!({
                    "organic": [
                        { "title": "Acme", "link": "https://acme.com", "snippet": "Widgets" },
                        { "title": "Globex", "link": "https://globex.com", "snippet": "Gadgets" },
                        { "title": "Initech", "link": "https://initech.com", "snippet": "TPS" }
                    ]
                }));
            })
            .await;

        let results = search(&serper_config(&server), "acme.com competitors")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(results.source, SearchSource::Serper);
        assert_eq!(results.hits.len(), 2);
        assert_eq!(results.hits[0].url, "https://acme.com");
        assert_eq!(results.hits[1].snippet, "Gadgets");
    }

    #[tokio::test]
    async fn test_serper_error_status_without_fallback() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/search");
                then.status(401);
            })
            .await;

        let result = search(&serper_config(&server), "acme").await;
        assert!(matches!(result, Err(SearchError::Status(401))));
    }

    #[tokio::test]
    async fn test_falls_back_to_searxng() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/search");
                then.status(500);
            })
            .await;
        let searx = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/searx/search")
                    .query_param("q", "acme")
                    .query_param("format", "json");
                then.status(200).json_body(json!({
                    "results": [
                        { "title": "Acme", "url": "https://acme.com", "content": "Widgets" }
                    ]
                }));
            })
            .await;

        let mut config = serper_config(&server);
        config.searxng_url = Some(server.url("/searx/"));

        let results = search(&config, "acme").await.unwrap();
        searx.assert_async().await;
        assert_eq!(results.source, SearchSource::Searxng);
        assert_eq!(results.hits[0].title, "Acme");
    }
}
