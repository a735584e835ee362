use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::task::{Id as TaskId, JoinSet};

use crate::collector::ResultSet;
use crate::config::Config;
use crate::dispatch::http::FetchDispatch;
use crate::dispatch::{self, FetchOutcome, FetchRequest};
use crate::error::FanoutError;
use crate::response::AggregateReport;

/// Everything a finished batch produced.
#[derive(Debug)]
pub struct BatchOutcome {
    pub report: AggregateReport,
    pub results: Arc<ResultSet>,
    pub succeeded: usize,
    pub failed: usize,
}

/// Fans one batch out to the downstream service and joins every fetch.
///
/// - One task per ordinal, all spawned up front, no cap besides `max_requests`
/// - Each task writes only its own slot in the shared `ResultSet`
/// - Failed fetches are logged and leave their slot empty
/// - Aggregation runs only after the last task has been joined
pub struct BatchExecutor {
    dispatch: FetchDispatch,
    base_url: String,
    max_requests: usize,
    fail_on_total_failure: bool,
}

impl BatchExecutor {
    pub fn new(config: &Config) -> Result<Self, FanoutError> {
        Ok(Self {
            dispatch: FetchDispatch::new(config.request_timeout(), config.reject_error_status)?,
            base_url: config.base_url.clone(),
            max_requests: config.max_requests,
            fail_on_total_failure: config.fail_on_total_failure,
        })
    }

    /// Checks a requested count before anything is dispatched.
    pub fn validate(&self, requested: i64) -> Result<usize, FanoutError> {
        if requested <= 0 {
            return Err(FanoutError::InvalidArgument(format!(
                "count must be positive, got {requested}"
            )));
        }
        let requested = requested as u64;
        if requested > self.max_requests as u64 {
            return Err(FanoutError::TooManyRequests {
                requested,
                max: self.max_requests,
            });
        }
        Ok(requested as usize)
    }

    pub async fn run(&self, requested: i64) -> Result<BatchOutcome, FanoutError> {
        let dispatch = self.dispatch.clone();
        self.run_with(requested, move |req| {
            let dispatch = dispatch.clone();
            async move { dispatch.fetch(&req).await }
        })
        .await
    }

    /// Like [`run`](Self::run), with the per-ordinal fetch supplied by the caller.
    pub async fn run_with<F, Fut>(
        &self,
        requested: i64,
        fetch: F,
    ) -> Result<BatchOutcome, FanoutError>
    where
        F: Fn(FetchRequest) -> Fut + Clone + Send + 'static,
        Fut: Future<Output = Result<FetchOutcome, FanoutError>> + Send + 'static,
    {
        let n = self.validate(requested)?;
        let outcome = execute(dispatch::targets(&self.base_url, n), fetch).await;

        if outcome.succeeded == 0 {
            if self.fail_on_total_failure {
                return Err(FanoutError::AllRequestsFailed { requested: n });
            }
            tracing::warn!(requested = n, "every downstream request failed, reporting zeros");
        }
        Ok(outcome)
    }
}

/// Spawn one task per request, wait for all of them, then aggregate.
pub async fn execute<F, Fut>(requests: Vec<FetchRequest>, fetch: F) -> BatchOutcome
where
    F: Fn(FetchRequest) -> Fut + Clone + Send + 'static,
    Fut: Future<Output = Result<FetchOutcome, FanoutError>> + Send + 'static,
{
    let batch_start = Instant::now();
    let n = requests.len();
    let results = Arc::new(ResultSet::new(n));

    tracing::debug!(requested = n, "dispatching");
    let mut set = JoinSet::new();
    let mut task_ordinals: HashMap<TaskId, (usize, String)> = HashMap::with_capacity(n);

    for req in requests {
        let fetch = fetch.clone();
        let results = results.clone();
        let ordinal = req.ordinal;
        let url = req.url.clone();

        let handle = set.spawn(async move {
            let url = req.url.clone();
            match fetch(req).await {
                Ok(outcome) => {
                    tracing::trace!(ordinal, elapsed_ms = outcome.elapsed_ms, "fetch ok");
                    if let Err(e) = results.record(outcome) {
                        tracing::error!(ordinal, "{e}");
                        return false;
                    }
                    true
                }
                Err(e) => {
                    tracing::warn!(ordinal, url = %url, "fetch failed: {e}");
                    false
                }
            }
        });
        task_ordinals.insert(handle.id(), (ordinal, url));
    }

    tracing::debug!(requested = n, "awaiting completion");
    let mut succeeded = 0;
    let mut failed = 0;
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(true) => succeeded += 1,
            Ok(false) => failed += 1,
            Err(join_err) => {
                failed += 1;
                match task_ordinals.get(&join_err.id()) {
                    Some((ordinal, url)) => tracing::error!(
                        ordinal = *ordinal,
                        url = %url,
                        "fetch task did not complete: {join_err}"
                    ),
                    None => tracing::error!("fetch task did not complete: {join_err}"),
                }
            }
        }
    }

    tracing::debug!(requested = n, "aggregating");
    let report = aggregate(&results, batch_start);
    tracing::info!(
        requested = n,
        succeeded,
        failed,
        total_ms = report.total_processing_time,
        max_ms = report.max_processing_time,
        "batch complete"
    );

    BatchOutcome {
        report,
        results,
        succeeded,
        failed,
    }
}

/// Summarize a joined batch. Must only be called once every writer is done.
pub fn aggregate(results: &ResultSet, batch_start: Instant) -> AggregateReport {
    AggregateReport {
        total_processing_time: batch_start.elapsed().as_millis() as u64,
        max_processing_time: results.max_elapsed_ms(),
    }
}
