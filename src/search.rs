//! Web evidence: live search snippets scraped from a public results page.
//!
//! The scraping depends on the page's current markup, so an empty result
//! list is the normal "no evidence" outcome rather than an error.

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Results kept per query.
pub const MAX_RESULTS: usize = 5;

/// Desktop browser UA; the results page serves different markup to bots.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Prefix of redirect-wrapped result links.
const REDIRECT_PREFIX: &str = "/url?q=";

static RESULT_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".g").expect("result selector"));
static TITLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h3").expect("title selector"));
static SNIPPET_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".VwiC3b").expect("snippet selector"));
static LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("link selector"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub snippet: String,
    pub link: String,
}

/// Source of web evidence for a question.
#[async_trait]
pub trait EvidenceSource: Send + Sync {
    /// At most [`MAX_RESULTS`] results in page order. Never fails: any
    /// transport or parse problem yields an empty list.
    async fn fetch(&self, query: &str) -> Vec<SearchResult>;
}

/// Fetches one results page and scrapes its result blocks.
pub struct ScrapingFetcher {
    client: reqwest::Client,
    search_url: String,
    user_agent: String,
}

impl ScrapingFetcher {
    pub fn new(search_url: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            search_url: search_url.into(),
            user_agent: user_agent.into(),
        }
    }

    fn query_url(&self, query: &str) -> String {
        let sep = if self.search_url.contains('?') { '&' } else { '?' };
        format!("{}{}q={}", self.search_url, sep, urlencoding::encode(query))
    }

    async fn fetch_page(&self, query: &str) -> Result<String, reqwest::Error> {
        self.client
            .get(self.query_url(query))
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

#[async_trait]
impl EvidenceSource for ScrapingFetcher {
    async fn fetch(&self, query: &str) -> Vec<SearchResult> {
        match self.fetch_page(query).await {
            Ok(html) => {
                let results = parse_results(&html);
                tracing::debug!(count = results.len(), "Web search results parsed");
                results
            }
            Err(e) => {
                tracing::warn!(error = %e, "Web search failed");
                Vec::new()
            }
        }
    }
}

/// Scrape result blocks from a results page, first [`MAX_RESULTS`] complete
/// blocks in document order.
pub fn parse_results(html: &str) -> Vec<SearchResult> {
    let doc = Html::parse_document(html);
    doc.select(&RESULT_SEL)
        .filter_map(parse_block)
        .take(MAX_RESULTS)
        .collect()
}

fn parse_block(block: ElementRef<'_>) -> Option<SearchResult> {
    let title = joined_text(block, &TITLE_SEL)?;
    let snippet = joined_text(block, &SNIPPET_SEL)?;
    let href = block
        .select(&LINK_SEL)
        .next()
        .and_then(|a| a.value().attr("href"))
        .filter(|h| !h.is_empty())?;
    Some(SearchResult {
        title,
        snippet,
        link: unwrap_redirect(href),
    })
}

/// Text of every element matching `sel` inside `block`, concatenated.
fn joined_text(block: ElementRef<'_>, sel: &Selector) -> Option<String> {
    let text: String = block.select(sel).flat_map(|el| el.text()).collect();
    (!text.is_empty()).then_some(text)
}

/// `/url?q=<target>&sa=...` becomes `<target>`, percent-decoded.
pub fn unwrap_redirect(href: &str) -> String {
    let Some(wrapped) = href.strip_prefix(REDIRECT_PREFIX) else {
        return href.to_string();
    };
    let target = wrapped.split('&').next().unwrap_or_default();
    urlencoding::decode(target)
        .map(|t| t.into_owned())
        .unwrap_or_else(|_| target.to_string())
}
