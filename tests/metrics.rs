// tests/metrics.rs
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use std::sync::Arc;
use tower::ServiceExt;

use ticker_mentions::fetch::fixture::{FixtureFetcher, FixtureResponse};
use ticker_mentions::metrics::Metrics;
use ticker_mentions::{AccountRef, ContentItem, MentionRunner, RecencyWindow, Ticker, TimeUnit};

// Only one test in this binary: the Prometheus recorder is process-global.
#[tokio::test]
async fn metrics_endpoint_contains_expected_series() {
    let metrics = Metrics::init().expect("install recorder");

    let ts = chrono::Utc::now().to_rfc3339();
    let fixture = FixtureFetcher::new()
        .respond("a", vec![ContentItem::new("MSFT", Some(&ts))])
        .respond("b", FixtureResponse::Error("boom".into()));
    let runner = MentionRunner::new(Arc::new(fixture));
    let accounts = vec![
        AccountRef::parse("https://x.com/a").unwrap(),
        AccountRef::parse("https://x.com/b").unwrap(),
    ];
    runner
        .run(
            &accounts,
            &Ticker::new("MSFT").unwrap(),
            RecencyWindow::new(1, TimeUnit::Hours).unwrap(),
        )
        .await;

    let resp = metrics
        .router()
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // axum::body::to_bytes requires an explicit limit
    let body = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();

    for needle in [
        "mentions_accounts_total{outcome=\"counted\"} 1",
        "mentions_accounts_total{outcome=\"fetch_error\"} 1",
        "mentions_items_total 1",
        "mentions_run_total_last 1",
        "mentions_fetch_ms",
    ] {
        assert!(text.contains(needle), "missing `{needle}` in:\n{text}");
    }
}
