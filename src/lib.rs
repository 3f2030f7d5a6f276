// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod accounts;
pub mod aggregator;
pub mod api;
pub mod config;
pub mod error;
pub mod fetch;
pub mod mentions;
pub mod metrics;
pub mod processor;
pub mod report;
pub mod window;

// ---- Re-exports for stable public API ----
pub use crate::accounts::{load_accounts, parse_accounts, AccountRef};
pub use crate::aggregator::MentionRunner;
pub use crate::api::router;
pub use crate::config::CounterConfig;
pub use crate::error::InputError;
pub use crate::fetch::{ContentFetcher, ContentItem, FetchError, FetchedItems};
pub use crate::mentions::{count_mentions, Ticker};
pub use crate::report::{AccountOutcome, AccountReport, FailureReason, RunReport};
pub use crate::window::{RecencyWindow, TimeUnit};

use std::path::Path;
use std::sync::Arc;

/// One-shot count: load accounts from `path`, fetch each, and report.
///
/// Input problems (unreadable file, empty ticker, bad window) are the only
/// errors; everything that goes wrong per account lands in the report.
pub async fn count_ticker_mentions(
    fetcher: Arc<dyn ContentFetcher>,
    path: &Path,
    ticker: &str,
    count: u64,
    unit: TimeUnit,
) -> Result<RunReport, InputError> {
    let ticker = Ticker::new(ticker)?;
    let window = RecencyWindow::new(count, unit)?;
    let accounts = load_accounts(path)?;
    let runner = MentionRunner::new(fetcher);
    Ok(runner.run(&accounts, &ticker, window).await)
}
