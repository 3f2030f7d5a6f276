// src/fetch/chrome.rs
//! Headless Chromium adapter: one `--dump-dom` run per fetch.

use async_trait::async_trait;
use metrics::counter;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::{extract_html_items, within, ContentFetcher, FetchError, FetchedItems, ItemSelectors};
use crate::accounts::AccountRef;

/// Part of the wait handed to Chromium as virtual time, leaving headroom
/// for startup and serialization before our own deadline fires.
const VIRTUAL_TIME_SHARE: f64 = 0.75;
const STDERR_SNIPPET: usize = 300;

pub struct ChromeFetcher {
    bin: String,
    sessions: Semaphore,
    selectors: ItemSelectors,
    runs: AtomicU64,
}

impl ChromeFetcher {
    /// `max_sessions` bounds concurrently running browsers (min 1).
    pub fn new(bin: &str, max_sessions: usize, selectors: ItemSelectors) -> Self {
        let max_sessions = max_sessions.max(1);
        info!(bin, max_sessions, "chrome fetcher initialized");
        Self {
            bin: bin.to_string(),
            sessions: Semaphore::new(max_sessions),
            selectors,
            runs: AtomicU64::new(0),
        }
    }

    fn profile_dir(&self) -> PathBuf {
        let n = self.runs.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!("ticker-mentions-{}-{n}", std::process::id()))
    }

    async fn dump_dom(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        let budget_ms = (timeout.as_millis() as f64 * VIRTUAL_TIME_SHARE) as u64;
        let profile = self.profile_dir();

        let user_data = format!("--user-data-dir={}", profile.display());
        let budget = format!("--virtual-time-budget={budget_ms}");

        let mut cmd = tokio::process::Command::new(&self.bin);
        cmd.args([
            "--headless",
            "--no-sandbox",
            "--disable-gpu",
            "--disable-dev-shm-usage",
            user_data.as_str(),
            budget.as_str(),
            "--dump-dom",
            url,
        ])
        .stdin(Stdio::null())
        .kill_on_drop(true);

        let res = within(timeout, async {
            cmd.output()
                .await
                .map_err(|e| FetchError::Unavailable(format!("launching {}: {e}", self.bin)))
        })
        .await;

        if let Err(e) = tokio::fs::remove_dir_all(&profile).await {
            debug!(path = %profile.display(), error = %e, "profile cleanup skipped");
        }

        let output = res?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let snippet: String = stderr.trim().chars().take(STDERR_SNIPPET).collect();
            return Err(FetchError::Navigation(format!(
                "chrome exited with {}: {snippet}",
                output.status
            )));
        }
        if output.stdout.is_empty() {
            return Err(FetchError::UnexpectedShape("empty DOM output".into()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl ContentFetcher for ChromeFetcher {
    async fn fetch(
        &self,
        account: &AccountRef,
        timeout: Duration,
    ) -> Result<FetchedItems, FetchError> {
        // Waiting for a free session does not eat into this account's timeout.
        let _permit = self
            .sessions
            .acquire()
            .await
            .map_err(|_| FetchError::Unavailable("chrome session pool closed".into()))?;

        let dom = self.dump_dom(account.as_str(), timeout).await?;
        let batch = extract_html_items(&dom, &self.selectors);

        if batch.is_empty() {
            // Nothing matching the item selector rendered within the wait.
            warn!(account = %account, selector = self.selectors.item_selector(), "no items surfaced");
            counter!("mentions_empty_pages_total").increment(1);
            return Err(FetchError::Timeout(timeout));
        }

        debug!(account = %account, items = batch.items.len(), unreadable = batch.unreadable, "chrome dom parsed");
        Ok(batch)
    }

    fn name(&self) -> &'static str {
        "chrome"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_binary_is_unavailable_not_timeout() {
        let f = ChromeFetcher::new(
            "/nonexistent/definitely-not-chromium",
            1,
            ItemSelectors::default(),
        );
        let acc = AccountRef::parse("https://x.com/someone").unwrap();
        let err = f.fetch(&acc, Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, FetchError::Unavailable(_)), "got {err:?}");
    }

    #[test]
    fn profile_dirs_are_unique() {
        let f = ChromeFetcher::new("chromium", 1, ItemSelectors::default());
        assert_ne!(f.profile_dir(), f.profile_dir());
    }
}
