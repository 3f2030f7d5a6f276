// src/report.rs
//! Per-account outcomes and the final run report.

use serde::Serialize;
use std::fmt;

use crate::accounts::AccountRef;
use crate::fetch::FetchError;
use crate::mentions::Ticker;
use crate::window::RecencyWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    Timeout,
    FetchError,
    Other,
}

impl From<&FetchError> for FailureReason {
    fn from(e: &FetchError) -> Self {
        match e {
            FetchError::Timeout(_) => FailureReason::Timeout,
            FetchError::Navigation(_)
            | FetchError::UnexpectedShape(_)
            | FetchError::Unavailable(_) => FailureReason::FetchError,
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailureReason::Timeout => "timeout",
            FailureReason::FetchError => "fetch error",
            FailureReason::Other => "other",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountOutcome {
    Counted(usize),
    Failed(FailureReason),
}

impl AccountOutcome {
    pub fn mentions(&self) -> Option<usize> {
        match self {
            AccountOutcome::Counted(n) => Some(*n),
            AccountOutcome::Failed(_) => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, AccountOutcome::Failed(_))
    }
}

/// Diagnostics that explain a count without changing it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ItemStats {
    pub fetched: usize,
    pub recent: usize,
    pub unreadable: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountReport {
    pub account: AccountRef,
    pub outcome: AccountOutcome,
    pub stats: ItemStats,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Terminal artifact of a run. `total_mentions` is derived from the account
/// entries at construction and cannot drift from them.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    ticker: Ticker,
    window: RecencyWindow,
    total_mentions: usize,
    accounts: Vec<AccountReport>,
}

impl RunReport {
    pub fn new(ticker: Ticker, window: RecencyWindow, accounts: Vec<AccountReport>) -> Self {
        let total_mentions = accounts.iter().filter_map(|a| a.outcome.mentions()).sum();
        Self {
            ticker,
            window,
            total_mentions,
            accounts,
        }
    }

    pub fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    pub fn window(&self) -> RecencyWindow {
        self.window
    }

    pub fn total_mentions(&self) -> usize {
        self.total_mentions
    }

    /// Per-account entries in input order.
    pub fn accounts(&self) -> &[AccountReport] {
        &self.accounts
    }

    pub fn outcomes(&self) -> impl Iterator<Item = AccountOutcome> + '_ {
        self.accounts.iter().map(|a| a.outcome)
    }

    pub fn failed_count(&self) -> usize {
        self.accounts.iter().filter(|a| a.outcome.is_failed()).count()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} was mentioned {} times in the last {}.",
            self.ticker, self.total_mentions, self.window
        )?;
        for a in &self.accounts {
            match a.outcome {
                AccountOutcome::Counted(n) => writeln!(
                    f,
                    "  {}  counted {} ({} items, {} recent, {} unreadable)",
                    a.account, n, a.stats.fetched, a.stats.recent, a.stats.unreadable
                )?,
                AccountOutcome::Failed(reason) => writeln!(
                    f,
                    "  {}  FAILED ({}) after {} attempt(s): {}",
                    a.account,
                    reason,
                    a.attempts,
                    a.error.as_deref().unwrap_or("-")
                )?,
            }
        }
        let failed = self.failed_count();
        write!(
            f,
            "{} of {} accounts counted, {} failed.",
            self.accounts.len() - failed,
            self.accounts.len(),
            failed
        )
    }
}
