// src/processor.rs
//! # Per-Account Processor
//! fetch → window filter → count, for one account.
//!
//! This is the failure-isolation boundary: whatever happens while fetching
//! (timeout, renderer error, even a panicking adapter) ends up as an
//! [`AccountOutcome`] and never escapes to the run.

use futures::FutureExt;
use metrics::{counter, histogram};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::accounts::AccountRef;
use crate::fetch::{ContentFetcher, FetchError, FetchedItems};
use crate::mentions::Ticker;
use crate::report::{AccountOutcome, AccountReport, FailureReason, ItemStats};
use crate::window::{is_recent, Clock, RecencyWindow};

/// How one account is fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    /// Bounded wait handed to the adapter on every attempt.
    pub timeout: Duration,
    /// Total attempts for timeouts and fetch errors (1 = no retry).
    pub max_attempts: u32,
    /// Sleep before attempt `n + 1` is `retry_backoff * 2^(n-1)`.
    pub retry_backoff: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_attempts: 1,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

impl FetchPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        self.retry_backoff.saturating_mul(1u32 << shift)
    }
}

/// Count recent mentions in a fetched batch, with `now` sampled once.
pub fn tally(
    batch: &FetchedItems,
    ticker: &Ticker,
    window: RecencyWindow,
    clock: &dyn Clock,
) -> (usize, ItemStats) {
    let now = clock.now();
    let mut stats = ItemStats {
        fetched: batch.items.len(),
        recent: 0,
        unreadable: batch.unreadable,
    };
    let mut mentions = 0usize;
    for item in &batch.items {
        if is_recent(item, window, now) {
            stats.recent += 1;
            mentions += ticker.count_in(&item.text);
        }
    }
    (mentions, stats)
}

enum Attempt {
    Done(Result<FetchedItems, FetchError>),
    Panicked(String),
}

async fn attempt_fetch(
    fetcher: &dyn ContentFetcher,
    account: &AccountRef,
    timeout: Duration,
    deadline: Option<Instant>,
) -> Attempt {
    let guarded = AssertUnwindSafe(fetcher.fetch(account, timeout)).catch_unwind();
    let res = match deadline {
        Some(at) => match tokio::time::timeout_at(at, guarded).await {
            Ok(r) => r,
            Err(_) => Ok(Err(FetchError::Timeout(timeout))),
        },
        None => guarded.await,
    };
    match res {
        Ok(done) => Attempt::Done(done),
        Err(payload) => Attempt::Panicked(panic_message(payload.as_ref())),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "fetcher panicked".to_string()
    }
}

fn failed(
    account: &AccountRef,
    reason: FailureReason,
    attempts: u32,
    error: String,
) -> AccountReport {
    warn!(account = %account, %reason, attempts, error = %error, "account failed");
    let label = match reason {
        FailureReason::Timeout => "timeout",
        FailureReason::FetchError => "fetch_error",
        FailureReason::Other => "other",
    };
    counter!("mentions_accounts_total", "outcome" => label).increment(1);
    AccountReport {
        account: account.clone(),
        outcome: AccountOutcome::Failed(reason),
        stats: ItemStats::default(),
        attempts,
        error: Some(error),
    }
}

/// Process one account. Always returns a report; never panics or errors.
///
/// `deadline` is the run-wide cut-off, if any: it caps each attempt's wait
/// and turns anything still in flight into a timeout.
pub async fn process_account(
    fetcher: &dyn ContentFetcher,
    account: &AccountRef,
    ticker: &Ticker,
    window: RecencyWindow,
    policy: &FetchPolicy,
    clock: &dyn Clock,
    deadline: Option<Instant>,
) -> AccountReport {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempts = 0u32;
    let mut last_error: Option<String> = None;

    loop {
        let timeout = match deadline {
            Some(at) => {
                let left = at.saturating_duration_since(Instant::now());
                if left.is_zero() {
                    let error = match last_error {
                        Some(e) => format!("run deadline reached; last error: {e}"),
                        None => "run deadline reached".into(),
                    };
                    return failed(account, FailureReason::Timeout, attempts, error);
                }
                policy.timeout.min(left)
            }
            None => policy.timeout,
        };

        attempts += 1;
        let t0 = Instant::now();
        let attempt = attempt_fetch(fetcher, account, timeout, deadline).await;
        histogram!("mentions_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        let err = match attempt {
            Attempt::Done(Ok(batch)) => {
                let (mentions, stats) = tally(&batch, ticker, window, clock);
                counter!("mentions_accounts_total", "outcome" => "counted").increment(1);
                counter!("mentions_items_total").increment(stats.fetched as u64);
                counter!("mentions_unreadable_items_total").increment(stats.unreadable as u64);
                info!(
                    account = %account,
                    fetcher = fetcher.name(),
                    items = stats.fetched,
                    recent = stats.recent,
                    unreadable = stats.unreadable,
                    mentions,
                    "account counted"
                );
                return AccountReport {
                    account: account.clone(),
                    outcome: AccountOutcome::Counted(mentions),
                    stats,
                    attempts,
                    error: None,
                };
            }
            Attempt::Panicked(msg) => {
                return failed(account, FailureReason::Other, attempts, msg);
            }
            Attempt::Done(Err(e)) => e,
        };

        let deadline_passed = deadline.is_some_and(|at| Instant::now() >= at);
        if attempts >= max_attempts || deadline_passed {
            return failed(account, FailureReason::from(&err), attempts, err.to_string());
        }

        let delay = policy.backoff(attempts);
        warn!(account = %account, attempt = attempts, error = %err, ?delay, "fetch failed, retrying");
        counter!("mentions_fetch_retries_total").increment(1);
        last_error = Some(err.to_string());
        match deadline {
            Some(at) => tokio::time::sleep_until((Instant::now() + delay).min(at)).await,
            None => tokio::time::sleep(delay).await,
        }
    }
}
