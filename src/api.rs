use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::debug;

use crate::accounts::AccountRef;
use crate::aggregator::MentionRunner;
use crate::error::InputError;
use crate::mentions::Ticker;
use crate::window::{RecencyWindow, TimeUnit};

#[derive(Clone)]
pub struct AppState {
    pub runner: Arc<MentionRunner>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/count", post(count))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(serde::Deserialize)]
struct CountReq {
    accounts: Vec<String>,
    ticker: String,
    count: u64,
    unit: String,
}

struct BadRequest(InputError);

impl IntoResponse for BadRequest {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": self.0.to_string() })),
        )
            .into_response()
    }
}

impl From<InputError> for BadRequest {
    fn from(e: InputError) -> Self {
        BadRequest(e)
    }
}

async fn count(
    State(state): State<AppState>,
    Json(body): Json<CountReq>,
) -> Result<Response, BadRequest> {
    let ticker = Ticker::new(&body.ticker)?;
    let unit: TimeUnit = body.unit.parse()?;
    let window = RecencyWindow::new(body.count, unit)?;

    // Same rule as the accounts file: malformed entries are dropped.
    let accounts: Vec<AccountRef> = body
        .accounts
        .iter()
        .filter_map(|raw| {
            let parsed = AccountRef::parse(raw.trim_end());
            if parsed.is_none() {
                debug!(line = %raw, "dropping malformed account");
            }
            parsed
        })
        .collect();

    let report = state.runner.run(&accounts, &ticker, window).await;
    Ok(Json(report).into_response())
}
