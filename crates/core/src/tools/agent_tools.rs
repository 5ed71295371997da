//! # Agent Tools
//!
//! `#[tool]` wrappers that expose web search and page scraping to the LLM
//! worker. Configuration comes from the environment on every call so keys
//! saved through the settings endpoint take effect without a restart.

use radkit::macros::tool;
use radkit::tools::ToolResult;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;

use super::scrape::{self, DEFAULT_MAX_CHARS};
use super::web_search::{self, SearchConfig};

/// Arguments for web search
#[derive(Deserialize, JsonSchema)]
pub struct SearchWebArgs {
    /// Search query
    pub query: String,
    /// Maximum number of results (default: 5)
    pub max_results: Option<u32>,
}

/// Search the internet for information about companies, competitors and markets
#[tool(
    description = "Search the internet for a query. Returns result titles, URLs and snippets."
)]
pub async fn search_web(args: SearchWebArgs) -> ToolResult {
    let mut config = SearchConfig::from_env();
    if let Some(max) = args.max_results {
        config.max_results = max as usize;
    }

    match web_search::search(&config, &args.query).await {
        Ok(results) => ToolResult::success(json!({
            "query": results.query,
            "source": results.source,
            "results": results.hits,
        })),
        Err(e) => {
            tracing::warn!(query = %args.query, "Web search failed: {}", e);
            ToolResult::error(format!("Search failed: {}", e))
        }
    }
}

/// Arguments for website scraping
#[derive(Deserialize, JsonSchema)]
pub struct ScrapeWebsiteArgs {
    /// Absolute http(s) URL of the page to read
    pub url: String,
}

/// Read the visible text of a web page
#[tool(
    description = "Read a website and return its title and visible text content."
)]
pub async fn scrape_website(args: ScrapeWebsiteArgs) -> ToolResult {
    let max_chars = std::env::var("PITCHCRAFT_SCRAPE_MAX_CHARS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_MAX_CHARS);

    let client = match reqwest::Client::builder()
        .user_agent("pitchcraft/0.1")
        .timeout(std::time::Duration::from_secs(15))
        .build()
    {
        Ok(c) => c,
        Err(e) => return ToolResult::error(format!("Failed to create HTTP client: {}", e)),
    };

    match scrape::scrape(&client, &args.url, max_chars).await {
        Ok(page) => ToolResult::success(json!({
            "url": page.url,
            "title": page.title,
            "text": page.text,
            "truncated": page.truncated,
        })),
        Err(e) => {
            tracing::warn!(url = %args.url, "Scrape failed: {}", e);
            ToolResult::error(format!("Failed to read {}: {}", args.url, e))
        }
    }
}
