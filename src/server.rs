use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tower_http::trace::TraceLayer;

use crate::batch::BatchExecutor;
use crate::config::Config;
use crate::error::FanoutError;
use crate::heavy;
use crate::hello;
use crate::response::{AggregateReport, HeavyReport};

#[derive(Clone)]
pub struct AppState {
    executor: Arc<BatchExecutor>,
    heavy_iterations: u64,
    heavy_partitions: usize,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self, FanoutError> {
        Ok(Self {
            executor: Arc::new(BatchExecutor::new(config)?),
            heavy_iterations: config.heavy_iterations,
            heavy_partitions: config.heavy_partitions,
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(fetch_batch))
        .route("/heavy", get(heavy_computation))
        .route("/hello", get(hello_world))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

const COUNT_PARAM: &str = "nbRequests";

/// First value of `key` in the query string. Repeats are ignored.
pub fn first_param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// Parse the raw `nbRequests` value. Range checks happen in the executor.
pub fn parse_count(raw: Option<&str>) -> Result<i64, FanoutError> {
    let raw = raw.ok_or_else(|| FanoutError::InvalidArgument("nbRequests is required".into()))?;
    raw.parse::<i64>()
        .map_err(|e| FanoutError::InvalidArgument(format!("nbRequests {raw:?}: {e}")))
}

impl IntoResponse for FanoutError {
    fn into_response(self) -> Response {
        if self.is_client_error() {
            tracing::debug!("rejected request: {self}");
        } else {
            tracing::warn!("request failed: {self}");
        }
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, self.user_message()).into_response()
    }
}

async fn fetch_batch(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<AggregateReport>, FanoutError> {
    let requested = parse_count(first_param(&params, COUNT_PARAM))?;
    let outcome = state.executor.run(requested).await?;
    Ok(Json(outcome.report))
}

async fn heavy_computation(
    State(state): State<AppState>,
) -> Result<Json<HeavyReport>, FanoutError> {
    let (iterations, partitions) = (state.heavy_iterations, state.heavy_partitions);
    let report = tokio::task::spawn_blocking(move || heavy::run(iterations, partitions))
        .await
        .map_err(|e| FanoutError::Other(format!("heavy computation failed: {e}")))?;
    Ok(Json(report))
}

async fn hello_world() -> String {
    hello::greeting(chrono::Utc::now())
}
