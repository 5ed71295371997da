//! # Agent Tools
//!
//! Web access for the agents that are allowed to research.
//!
//! ## Modules
//!
//! - `web_search` - Serper / SearXNG search client
//! - `scrape` - Page fetch and HTML-to-text reduction
//! - `agent_tools` - radkit `#[tool]` wrappers handed to the LLM worker

pub mod agent_tools;
pub mod scrape;
pub mod web_search;

pub use scrape::{scrape, ScrapeError, ScrapedPage};
pub use web_search::{search, SearchConfig, SearchError, SearchHit, SearchResults, SearchSource};
