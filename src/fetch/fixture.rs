// src/fetch/fixture.rs
//! Scripted, in-memory fetcher for tests and offline runs.
//!
//! Responses are queued per account. Each call pops the front response while
//! more than one is queued; the last one sticks, so a single scripted
//! response answers every call.

use anyhow::Context;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::debug;

use super::{
    extract_html_items, within, ContentFetcher, ContentItem, FetchError, FetchedItems,
    ItemSelectors,
};
use crate::accounts::AccountRef;

#[derive(Debug, Clone)]
pub enum FixtureResponse {
    Items(FetchedItems),
    Html(String),
    Timeout,
    Error(String),
    /// Never answers; the fetch ends only when its timeout fires.
    Hang,
}

impl From<Vec<ContentItem>> for FixtureResponse {
    fn from(items: Vec<ContentItem>) -> Self {
        FixtureResponse::Items(items.into())
    }
}

#[derive(Default)]
pub struct FixtureFetcher {
    responses: Mutex<HashMap<String, VecDeque<FixtureResponse>>>,
    calls: Mutex<HashMap<String, usize>>,
    selectors: ItemSelectors,
}

impl FixtureFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for `key`: a full account URL or a bare handle.
    pub fn respond(self, key: &str, response: impl Into<FixtureResponse>) -> Self {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.to_string())
            .or_default()
            .push_back(response.into());
        self
    }

    pub fn with_selectors(mut self, selectors: ItemSelectors) -> Self {
        self.selectors = selectors;
        self
    }

    /// Load `<handle>.html` files from `dir`, keyed by handle.
    pub fn from_dir(dir: &Path) -> anyhow::Result<Self> {
        let mut fetcher = Self::new();
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("reading fixture dir {}", dir.display()))?;
        for e in entries.flatten() {
            let path = e.path();
            if path.extension().and_then(|s| s.to_str()) != Some("html") {
                continue;
            }
            let Some(handle) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let html = std::fs::read_to_string(&path)
                .with_context(|| format!("reading fixture {}", path.display()))?;
            fetcher = fetcher.respond(handle, FixtureResponse::Html(html));
        }
        Ok(fetcher)
    }

    /// Number of fetches made for `account` so far.
    pub fn calls(&self, account: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(account)
            .copied()
            .unwrap_or(0)
    }

    fn next_response(&self, account: &AccountRef) -> Option<FixtureResponse> {
        let mut map = self.responses.lock().unwrap_or_else(PoisonError::into_inner);
        let key = if map.contains_key(account.as_str()) {
            account.as_str().to_string()
        } else {
            account.handle()?.to_string()
        };
        let queue = map.get_mut(&key)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

impl From<String> for FixtureResponse {
    fn from(html: String) -> Self {
        FixtureResponse::Html(html)
    }
}

#[async_trait]
impl ContentFetcher for FixtureFetcher {
    async fn fetch(
        &self,
        account: &AccountRef,
        timeout: Duration,
    ) -> Result<FetchedItems, FetchError> {
        *self
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(account.as_str().to_string())
            .or_default() += 1;

        let response = self
            .next_response(account)
            .ok_or_else(|| FetchError::Navigation(format!("no fixture for {account}")))?;
        debug!(account = %account, ?response, "fixture response");

        match response {
            FixtureResponse::Items(batch) => Ok(batch),
            FixtureResponse::Html(html) => Ok(extract_html_items(&html, &self.selectors)),
            FixtureResponse::Timeout => Err(FetchError::Timeout(timeout)),
            FixtureResponse::Error(msg) => Err(FetchError::Navigation(msg)),
            FixtureResponse::Hang => {
                within(timeout, std::future::pending::<Result<FetchedItems, FetchError>>()).await
            }
        }
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}
