// tests/run_partial_failure.rs
//
// One account timing out must not cost the others their counts.

use chrono::{TimeZone, Utc};
use std::sync::Arc;

use ticker_mentions::fetch::fixture::{FixtureFetcher, FixtureResponse};
use ticker_mentions::window::FixedClock;
use ticker_mentions::{
    AccountOutcome, AccountRef, ContentItem, FailureReason, MentionRunner, RecencyWindow, Ticker,
    TimeUnit,
};

fn acc(s: &str) -> AccountRef {
    AccountRef::parse(s).unwrap()
}

#[tokio::test]
async fn middle_timeout_is_reported_and_others_summed() {
    let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
    let fixture = FixtureFetcher::new()
        .respond(
            "https://x.com/a",
            vec![
                ContentItem::new("$TSLA to the moon TSLA", Some("2024-03-10T09:00:00.000Z")),
                ContentItem::new("TSLA", Some("2024-03-01T09:00:00.000Z")),
            ],
        )
        .respond("https://x.com/b", FixtureResponse::Timeout)
        .respond(
            "https://x.com/c",
            vec![ContentItem::new("sold my TSLA", Some("2024-03-10T11:59:00.000Z"))],
        );

    let runner = MentionRunner::new(Arc::new(fixture)).with_clock(Arc::new(FixedClock(now)));
    let report = runner
        .run(
            &[acc("https://x.com/a"), acc("https://x.com/b"), acc("https://x.com/c")],
            &Ticker::new("TSLA").unwrap(),
            RecencyWindow::new(1, TimeUnit::Days).unwrap(),
        )
        .await;

    let outcomes: Vec<_> = report.outcomes().collect();
    assert_eq!(
        outcomes,
        vec![
            AccountOutcome::Counted(2),
            AccountOutcome::Failed(FailureReason::Timeout),
            AccountOutcome::Counted(1),
        ]
    );
    assert_eq!(report.total_mentions(), 3);
    assert_eq!(report.ticker().as_str(), "TSLA");
    assert_eq!(report.window(), RecencyWindow::new(24, TimeUnit::Hours).unwrap());

    let b = &report.accounts()[1];
    assert_eq!(b.account.as_str(), "https://x.com/b");
    assert!(b.error.as_deref().unwrap().contains("timed out"));

    let summary = report.to_string();
    assert!(summary.starts_with("TSLA was mentioned 3 times in the last 1 day."));
    assert!(summary.contains("https://x.com/b  FAILED (timeout)"));
}

#[tokio::test]
async fn every_account_failing_still_yields_a_report() {
    let fixture = FixtureFetcher::new()
        .respond("a", FixtureResponse::Error("net::ERR_NAME_NOT_RESOLVED".into()))
        .respond("b", FixtureResponse::Timeout);
    let runner = MentionRunner::new(Arc::new(fixture));
    let report = runner
        .run(
            &[acc("https://x.com/a"), acc("https://x.com/b")],
            &Ticker::new("AAPL").unwrap(),
            RecencyWindow::new(30, TimeUnit::Mins).unwrap(),
        )
        .await;

    assert_eq!(report.total_mentions(), 0);
    assert_eq!(report.failed_count(), 2);
    assert!(report.to_string().ends_with("0 of 2 accounts counted, 2 failed."));
}
