// tests/accounts_loader.rs
use std::fs;
use std::sync::Arc;

use ticker_mentions::fetch::fixture::FixtureFetcher;
use ticker_mentions::{count_ticker_mentions, load_accounts, InputError, TimeUnit};

#[test]
fn file_order_is_preserved_and_bad_lines_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("accounts.txt");
    fs::write(
        &p,
        "https://x.com/zed\n\
         garbage\n\
         https://x.com/alpha   \n\
         \n\
         https://x.com/mid\n",
    )
    .unwrap();

    let got: Vec<String> = load_accounts(&p)
        .unwrap()
        .iter()
        .map(|a| a.to_string())
        .collect();
    assert_eq!(
        got,
        vec!["https://x.com/zed", "https://x.com/alpha", "https://x.com/mid"]
    );
}

#[test]
fn missing_file_is_an_input_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_accounts(&dir.path().join("nope.txt")).unwrap_err();
    assert!(matches!(err, InputError::AccountsFile { .. }));
    assert!(err.to_string().contains("nope.txt"));
}

#[tokio::test]
async fn empty_file_gives_empty_report() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("accounts.txt");
    fs::write(&p, "").unwrap();

    let report = count_ticker_mentions(Arc::new(FixtureFetcher::new()), &p, "TSLA", 24, TimeUnit::Hours)
        .await
        .unwrap();
    assert_eq!(report.total_mentions(), 0);
    assert!(report.accounts().is_empty());
}

#[tokio::test]
async fn empty_ticker_is_rejected_before_fetching() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("accounts.txt");
    fs::write(&p, "https://x.com/a\n").unwrap();

    let fixture = Arc::new(FixtureFetcher::new());
    let err = count_ticker_mentions(fixture.clone(), &p, "", 1, TimeUnit::Days)
        .await
        .unwrap_err();
    assert!(matches!(err, InputError::EmptyToken));
    assert_eq!(fixture.calls("https://x.com/a"), 0);
}
