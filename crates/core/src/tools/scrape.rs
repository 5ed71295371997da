//! # Website Scrape
//!
//! Fetches a page and reduces it to readable text for the LLM. No LLM call
//! is involved; tags are stripped with regexes and the result is truncated.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default cap on extracted text (save tokens)
pub const DEFAULT_MAX_CHARS: usize = 50_000;
/// Most HTML read from one page
pub const MAX_PAGE_BYTES: usize = 4 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("only http(s) URLs can be scraped: {0}")]
    UnsupportedUrl(String),
    #[error("fetch failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("page returned HTTP {0}")]
    Status(u16),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapedPage {
    pub url: String,
    pub title: Option<String>,
    pub text: String,
    pub truncated: bool,
}

/// Fetch `url` and return its visible text
pub async fn scrape(
    client: &reqwest::Client,
    url: &str,
    max_chars: usize,
) -> Result<ScrapedPage, ScrapeError> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ScrapeError::UnsupportedUrl(url.to_string()));
    }

    let (html, cut) = fetch_html(client, url, MAX_PAGE_BYTES).await?;

    let title = extract_title(&html);
    let (text, truncated) = truncate_chars(&html_to_text(&html), max_chars);
    let truncated = truncated || cut;

    tracing::debug!(url, chars = text.len(), truncated, "Scraped page");

    Ok(ScrapedPage {
        url: url.to_string(),
        title,
        text,
        truncated,
    })
}

/// Read at most `limit` bytes of the body; the flag is set when more was left
async fn fetch_html(
    client: &reqwest::Client,
    url: &str,
    limit: usize,
) -> Result<(String, bool), ScrapeError> {
    let mut response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(ScrapeError::Status(response.status().as_u16()));
    }

    let expected = response.content_length().map_or(0, |n| n as usize);
    let mut body = Vec::with_capacity(expected.min(limit));
    let mut cut = false;
    while let Some(chunk) = response.chunk().await? {
        let room = limit - body.len();
        if chunk.len() > room {
            body.extend_from_slice(&chunk[..room]);
            cut = true;
            break;
        }
        body.extend_from_slice(&chunk);
    }
    if cut {
        tracing::debug!(url, limit, "Page body cut at byte limit");
    }

    Ok((String::from_utf8_lossy(&body).into_owned(), cut))
}

fn block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)<(script|style|noscript|head)\b[^>]*>.*?</(script|style|noscript|head)\s*>")
            .expect("valid regex")
    })
}

fn comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"))
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"))
}

fn title_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title\s*>").expect("valid regex"))
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"))
}

/// Page `<title>`, entity-decoded and trimmed
pub fn extract_title(html: &str) -> Option<String> {
    title_re()
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| collapse(&decode_entities(m.as_str())))
        .filter(|t| !t.is_empty())
}

/// Strip markup and return the visible text on a single line per block
pub fn html_to_text(html: &str) -> String {
    let without_blocks = block_re().replace_all(html, " ");
    let without_comments = comment_re().replace_all(&without_blocks, " ");
    let without_tags = tag_re().replace_all(&without_comments, " ");
    collapse(&decode_entities(&without_tags))
}

fn collapse(text: &str) -> String {
    whitespace_re().replace_all(text, " ").trim().to_string()
}

fn decode_entities(text: &str) -> String {
    // &amp; last so "&amp;lt;" decodes to "&lt;" rather than "<"
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Cut `text` to at most `max_chars` characters, on a char boundary
fn truncate_chars(text: &str, max_chars: usize) -> (String, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => (format!("{}... [TRUNCATED]", &text[..byte_idx]), true),
        None => (text.to_string(), false),
    }
}
