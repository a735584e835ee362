use serde::Serialize;

/// Timing summary for one batch, as returned by `GET /`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateReport {
    /// Batch start to last worker completion.
    pub total_processing_time: u64,
    /// Slowest successful fetch; 0 when none succeeded.
    pub max_processing_time: u64,
}

/// Result of `GET /heavy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeavyReport {
    pub total_processing_time: u64,
    pub result: i64,
}
