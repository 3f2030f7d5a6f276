// src/aggregator.rs
//! Runs the per-account processor over every account and folds the outcomes
//! into a [`RunReport`].

use futures::stream::{self, StreamExt};
use metrics::gauge;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

use crate::accounts::AccountRef;
use crate::config::CounterConfig;
use crate::fetch::{build_fetcher, ContentFetcher};
use crate::mentions::Ticker;
use crate::processor::{process_account, FetchPolicy};
use crate::report::RunReport;
use crate::window::{Clock, RecencyWindow, SystemClock};

pub struct MentionRunner {
    fetcher: Arc<dyn ContentFetcher>,
    clock: Arc<dyn Clock>,
    policy: FetchPolicy,
    concurrency: usize,
    deadline: Option<Duration>,
}

impl MentionRunner {
    /// Sequential runner on the system clock with the default fetch policy.
    pub fn new(fetcher: Arc<dyn ContentFetcher>) -> Self {
        Self {
            fetcher,
            clock: Arc::new(SystemClock),
            policy: FetchPolicy::default(),
            concurrency: 1,
            deadline: None,
        }
    }

    pub fn from_config(cfg: &CounterConfig) -> anyhow::Result<Self> {
        let fetcher = build_fetcher(cfg)?;
        let mut runner = Self::new(fetcher)
            .with_policy(cfg.fetch_policy())
            .with_concurrency(cfg.run.concurrency);
        if let Some(d) = cfg.run_deadline() {
            runner = runner.with_deadline(d);
        }
        Ok(runner)
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_policy(mut self, policy: FetchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Accounts fetched at once. 0 is treated as 1.
    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    /// Wall-clock budget for a whole run; accounts still pending when it
    /// expires are reported as timeouts.
    pub fn with_deadline(mut self, d: Duration) -> Self {
        self.deadline = Some(d);
        self
    }

    pub fn fetcher_name(&self) -> &'static str {
        self.fetcher.name()
    }

    /// Count `ticker` across `accounts`. Entries come back in input order
    /// whatever the concurrency; failures are recorded, never raised.
    pub async fn run(
        &self,
        accounts: &[AccountRef],
        ticker: &Ticker,
        window: RecencyWindow,
    ) -> RunReport {
        let started = Instant::now();
        let deadline = self.deadline.map(|d| started + d);
        info!(
            accounts = accounts.len(),
            %ticker,
            %window,
            fetcher = self.fetcher.name(),
            concurrency = self.concurrency,
            "run started"
        );

        let fetcher = self.fetcher.as_ref();
        let clock = self.clock.as_ref();
        let policy = &self.policy;
        let tasks: Vec<_> = accounts
            .iter()
            .enumerate()
            .map(|(i, account)| async move {
                let entry =
                    process_account(fetcher, account, ticker, window, policy, clock, deadline)
                        .await;
                (i, entry)
            })
            .collect();
        let mut indexed = stream::iter(tasks)
            .buffer_unordered(self.concurrency)
            .collect::<Vec<_>>()
            .await;
        // Completion order is arbitrary; the report follows input order.
        indexed.sort_by_key(|(i, _)| *i);
        let entries = indexed.into_iter().map(|(_, entry)| entry).collect();

        let report = RunReport::new(ticker.clone(), window, entries);
        gauge!("mentions_run_total_last").set(report.total_mentions() as f64);
        info!(
            total = report.total_mentions(),
            failed = report.failed_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "run finished"
        );
        report
    }
}
