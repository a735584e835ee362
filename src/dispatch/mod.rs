pub mod http;

use serde::Serialize;

/// One downstream GET, addressed by its position in the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Zero-based; also the index of this request's result slot.
    pub ordinal: usize,
    pub url: String,
}

/// A successful fetch. Failed fetches produce no outcome at all.
#[derive(Debug, Clone, Serialize)]
pub struct FetchOutcome {
    pub ordinal: usize,
    pub url: String,
    /// Send + body read + JSON parse, in whole milliseconds.
    pub elapsed_ms: u64,
    pub payload: serde_json::Value,
}

/// Builds the `n` requests of a batch: ordinal `i` targets `{base_url}/{i + 1}`.
pub fn targets(base_url: &str, n: usize) -> Vec<FetchRequest> {
    let base = base_url.trim_end_matches('/');
    (0..n)
        .map(|ordinal| FetchRequest {
            ordinal,
            url: format!("{base}/{}", ordinal + 1),
        })
        .collect()
}
