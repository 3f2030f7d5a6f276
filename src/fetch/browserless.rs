// src/fetch/browserless.rs
//! Browserless `/content` adapter: a remote browser renders the page and
//! returns the final HTML.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

use super::{extract_html_items, within, ContentFetcher, FetchError, FetchedItems, ItemSelectors};
use crate::accounts::AccountRef;

const BODY_SNIPPET: usize = 300;

pub struct BrowserlessFetcher {
    client: Client,
    base_url: String,
    token: Option<String>,
    selectors: ItemSelectors,
}

impl BrowserlessFetcher {
    pub fn new(
        base_url: &str,
        token: Option<&str>,
        selectors: ItemSelectors,
    ) -> anyhow::Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
            selectors,
        })
    }

    fn endpoint(&self) -> String {
        let mut endpoint = format!("{}/content", self.base_url);
        if let Some(ref token) = self.token {
            endpoint.push_str(&format!("?token={token}"));
        }
        endpoint
    }

    async fn content(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        let body = serde_json::json!({
            "url": url,
            "waitForSelector": {
                "selector": self.selectors.item_selector(),
                "timeout": timeout.as_millis() as u64,
            },
        });

        let resp = self
            .client
            .post(self.endpoint())
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(classify)?;

        let status = resp.status();
        if status == StatusCode::REQUEST_TIMEOUT {
            return Err(FetchError::Timeout(timeout));
        }
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            let snippet: String = message.chars().take(BODY_SNIPPET).collect();
            return Err(FetchError::Navigation(format!("browserless HTTP {status}: {snippet}")));
        }

        resp.text().await.map_err(classify)
    }
}

fn classify(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        // reqwest does not report the configured duration back.
        FetchError::Timeout(Duration::ZERO)
    } else if e.is_connect() {
        FetchError::Unavailable(e.to_string())
    } else {
        FetchError::Navigation(e.to_string())
    }
}

#[async_trait]
impl ContentFetcher for BrowserlessFetcher {
    async fn fetch(
        &self,
        account: &AccountRef,
        timeout: Duration,
    ) -> Result<FetchedItems, FetchError> {
        let html = within(timeout, self.content(account.as_str(), timeout))
            .await
            .map_err(|e| match e {
                FetchError::Timeout(_) => FetchError::Timeout(timeout),
                other => other,
            })?;

        let batch = extract_html_items(&html, &self.selectors);
        if batch.is_empty() {
            warn!(account = %account, "browserless page had no items");
            return Err(FetchError::Timeout(timeout));
        }
        debug!(account = %account, items = batch.items.len(), "browserless page parsed");
        Ok(batch)
    }

    fn name(&self) -> &'static str {
        "browserless"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_carries_token_and_trims_slash() {
        let f = BrowserlessFetcher::new("http://render:3000/", Some("abc"), ItemSelectors::default())
            .unwrap();
        assert_eq!(f.endpoint(), "http://render:3000/content?token=abc");

        let anon = BrowserlessFetcher::new("http://render:3000", None, ItemSelectors::default())
            .unwrap();
        assert_eq!(anon.endpoint(), "http://render:3000/content");
    }

    #[tokio::test]
    async fn unreachable_service_is_not_a_timeout() {
        // Port 9 (discard) on localhost is closed in test environments.
        let f = BrowserlessFetcher::new("http://127.0.0.1:9", None, ItemSelectors::default())
            .unwrap();
        let acc = AccountRef::parse("https://x.com/someone").unwrap();
        let err = f.fetch(&acc, Duration::from_secs(5)).await.unwrap_err();
        assert!(!err.is_timeout(), "got {err:?}");
    }
}
