// src/fetch/rss.rs
use async_trait::async_trait;
use metrics::histogram;
use quick_xml::de::from_str;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{
    normalize_plain_text, normalize_text, within, ContentFetcher, ContentItem, FetchError,
    FetchedItems,
};
use crate::accounts::AccountRef;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

/// Parse an RSS document into content items.
///
/// The description is preferred over the title: feed mirrors of social
/// accounts repeat the post text in both, and counting both would double it.
pub fn parse_feed(xml: &str) -> Result<FetchedItems, FetchError> {
    let t0 = std::time::Instant::now();
    let xml_clean = scrub_html_entities_for_xml(xml);
    let rss: Rss = from_str(&xml_clean)
        .map_err(|e| FetchError::UnexpectedShape(format!("parsing rss xml: {e}")))?;

    let mut out = FetchedItems::default();
    for it in rss.channel.item {
        // Descriptions carry HTML; titles are plain text and may contain `<`/`>`.
        let text = match it.description.as_deref().filter(|d| !d.trim().is_empty()) {
            Some(html) => normalize_text(html),
            None => normalize_plain_text(it.title.as_deref().unwrap_or_default()),
        };
        if text.is_empty() {
            out.unreadable += 1;
            continue;
        }
        out.items.push(ContentItem {
            text,
            published_at: it.pub_date.map(|d| d.trim().to_string()),
        });
    }

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("mentions_rss_parse_ms").record(ms);
    Ok(out)
}

/// Fetches an RSS rendering of each account, either from a mirror
/// (`{base}/{handle}/rss`) or from the account URL itself.
pub struct RssFetcher {
    client: Client,
    base_url: Option<String>,
}

impl RssFetcher {
    pub fn new(base_url: Option<&str>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("ticker-mentions/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.map(|b| b.trim_end_matches('/').to_string()),
        })
    }

    pub fn feed_url(&self, account: &AccountRef) -> Result<String, FetchError> {
        match &self.base_url {
            None => Ok(account.as_str().to_string()),
            Some(base) => {
                let handle = account.handle().ok_or_else(|| {
                    FetchError::Navigation(format!("no account handle in {account}"))
                })?;
                Ok(format!("{base}/{handle}/rss"))
            }
        }
    }

    async fn get(&self, url: &str) -> Result<String, FetchError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Navigation(format!("rss http get: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Navigation(format!("rss HTTP {status} for {url}")));
        }
        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::Navigation(format!("rss body: {e}")))?;
        debug!(url, bytes = body.len(), "rss fetched");
        Ok(body)
    }
}

#[async_trait]
impl ContentFetcher for RssFetcher {
    async fn fetch(
        &self,
        account: &AccountRef,
        timeout: Duration,
    ) -> Result<FetchedItems, FetchError> {
        let url = self.feed_url(account)?;
        let body = within(timeout, self.get(&url)).await?;
        parse_feed(&body)
    }

    fn name(&self) -> &'static str {
        "rss"
    }
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
