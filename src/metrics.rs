use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "mentions_accounts_total",
            "Accounts processed, labelled by outcome."
        );
        describe_counter!("mentions_items_total", "Content items fetched.");
        describe_counter!(
            "mentions_unreadable_items_total",
            "Content items skipped because they could not be read."
        );
        describe_counter!(
            "mentions_fetch_retries_total",
            "Fetch attempts repeated after a transient failure."
        );
        describe_counter!(
            "mentions_empty_pages_total",
            "Rendered pages on which no items surfaced."
        );
        describe_histogram!("mentions_fetch_ms", "Per-attempt fetch time in milliseconds.");
        describe_histogram!("mentions_rss_parse_ms", "RSS parse time in milliseconds.");
        describe_gauge!("mentions_run_total_last", "Total mentions of the last run.");
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder for this process.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new().install_recorder()?;
        ensure_metrics_described();
        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
