// src/fetch/mod.rs
//! Content fetcher adapters: the narrow boundary between the counting engine
//! and whatever renders an account's feed (headless browser, HTTP API, RSS
//! mirror, in-memory fixture).

pub mod browserless;
pub mod chrome;
pub mod fixture;
pub mod rss;

use async_trait::async_trait;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::accounts::AccountRef;
use crate::config::{Backend, CounterConfig};

/// One fetched post. `published_at` is kept raw; the window filter parses it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub text: String,
    pub published_at: Option<String>,
}

impl ContentItem {
    pub fn new(text: impl Into<String>, published_at: Option<&str>) -> Self {
        Self {
            text: text.into(),
            published_at: published_at.map(str::to_string),
        }
    }
}

/// Items surfaced by one fetch, plus how many could not be read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedItems {
    pub items: Vec<ContentItem>,
    pub unreadable: usize,
}

impl FetchedItems {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.unreadable == 0
    }
}

impl From<Vec<ContentItem>> for FetchedItems {
    fn from(items: Vec<ContentItem>) -> Self {
        Self {
            items,
            unreadable: 0,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("unexpected content: {0}")]
    UnexpectedShape(String),

    #[error("renderer unavailable: {0}")]
    Unavailable(String),
}

impl FetchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout(_))
    }
}

#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// One retrieval transaction for `account`, bounded by `timeout`.
    /// Implementations never retry; the caller owns the retry policy.
    async fn fetch(
        &self,
        account: &AccountRef,
        timeout: Duration,
    ) -> Result<FetchedItems, FetchError>;

    fn name(&self) -> &'static str;
}

/// Run `fut` under `timeout`, mapping expiry to [`FetchError::Timeout`].
pub(crate) async fn within<T, F>(timeout: Duration, fut: F) -> Result<T, FetchError>
where
    F: Future<Output = Result<T, FetchError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(res) => res,
        Err(_) => Err(FetchError::Timeout(timeout)),
    }
}

/// CSS selectors used to find posts and their timestamps in a rendered page.
#[derive(Debug, Clone)]
pub struct ItemSelectors {
    item_raw: String,
    item: Selector,
    time: Selector,
}

impl ItemSelectors {
    pub fn parse(item: &str, time: &str) -> anyhow::Result<Self> {
        let item_sel = Selector::parse(item)
            .map_err(|e| anyhow::anyhow!("invalid item selector '{item}': {e}"))?;
        let time_sel = Selector::parse(time)
            .map_err(|e| anyhow::anyhow!("invalid time selector '{time}': {e}"))?;
        Ok(Self {
            item_raw: item.to_string(),
            item: item_sel,
            time: time_sel,
        })
    }

    pub fn item_selector(&self) -> &str {
        &self.item_raw
    }
}

impl Default for ItemSelectors {
    fn default() -> Self {
        Self {
            item_raw: "article".to_string(),
            item: Selector::parse("article").expect("static selector"),
            time: Selector::parse("time").expect("static selector"),
        }
    }
}

/// Pull posts out of a rendered DOM snapshot.
///
/// A post whose text is empty is a placeholder the page had not filled in
/// yet; it is counted as unreadable and skipped.
pub fn extract_html_items(html: &str, selectors: &ItemSelectors) -> FetchedItems {
    let doc = Html::parse_document(html);
    let mut out = FetchedItems::default();

    for node in doc.select(&selectors.item) {
        let text = collapse_whitespace(&node.text().collect::<String>());
        if text.is_empty() {
            out.unreadable += 1;
            debug!("skipping unreadable item (no text)");
            continue;
        }
        let published_at = node
            .select(&selectors.time)
            .next()
            .and_then(|t| t.value().attr("datetime"))
            .map(str::to_string);
        out.items.push(ContentItem { text, published_at });
    }

    out
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Plain text: decode entities and collapse whitespace, no tag stripping.
pub fn normalize_plain_text(s: &str) -> String {
    collapse_whitespace(&html_escape::decode_html_entities(s))
}

/// Normalize markup-bearing text: decode entities, strip tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));

    // Tags first so that decoded `&lt;` text is not mistaken for markup.
    let stripped = re_tags.replace_all(s, " ");
    let decoded = html_escape::decode_html_entities(&stripped);
    collapse_whitespace(&decoded)
}

/// Build the configured adapter.
pub fn build_fetcher(cfg: &CounterConfig) -> anyhow::Result<Arc<dyn ContentFetcher>> {
    let selectors = cfg.selectors()?;
    let fetcher: Arc<dyn ContentFetcher> = match cfg.fetch.backend {
        Backend::Chrome => Arc::new(chrome::ChromeFetcher::new(
            &cfg.chrome.bin,
            cfg.chrome.max_sessions,
            selectors,
        )),
        Backend::Browserless => Arc::new(browserless::BrowserlessFetcher::new(
            &cfg.browserless.url,
            cfg.browserless.token.as_deref(),
            selectors,
        )?),
        Backend::Rss => Arc::new(rss::RssFetcher::new(cfg.rss.base_url.as_deref())?),
        Backend::Fixture => {
            let dir = cfg
                .fixture
                .dir
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("fixture backend needs [fixture] dir"))?;
            Arc::new(fixture::FixtureFetcher::from_dir(dir.as_ref())?.with_selectors(selectors))
        }
    };
    Ok(fetcher)
}
