use std::time::{Duration, Instant};

use reqwest::Client;

use crate::dispatch::{FetchOutcome, FetchRequest};
use crate::error::FanoutError;

pub const MAX_RESPONSE_BYTES: usize = 2 * 1024 * 1024; // 2MB

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared downstream client. Cloning is cheap; clones share the connection pool.
#[derive(Clone)]
pub struct FetchDispatch {
    client: Client,
    timeout: Duration,
    reject_error_status: bool,
}

impl FetchDispatch {
    pub fn new(timeout: Duration, reject_error_status: bool) -> Result<Self, FanoutError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| FanoutError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            timeout,
            reject_error_status,
        })
    }

    /// GET one target and parse its body as JSON. The reported latency covers
    /// the send, the full body read, and the parse. The status code is ignored
    /// unless `reject_error_status` is set.
    pub async fn fetch(&self, req: &FetchRequest) -> Result<FetchOutcome, FanoutError> {
        let start = Instant::now();

        let response = self
            .client
            .get(&req.url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if self.reject_error_status && !status.is_success() {
            return Err(FanoutError::Upstream {
                url: req.url.clone(),
                message: format!("{status}"),
                status: Some(status.as_u16()),
            });
        }

        if let Some(len) = response.content_length()
            && len > MAX_RESPONSE_BYTES as u64
        {
            return Err(too_large(&req.url, len as usize));
        }

        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                self.classify(e)
            } else {
                FanoutError::Upstream {
                    url: req.url.clone(),
                    message: format!("failed to read response body: {e}"),
                    status: None,
                }
            }
        })?;

        if bytes.len() > MAX_RESPONSE_BYTES {
            return Err(too_large(&req.url, bytes.len()));
        }

        let payload: serde_json::Value = serde_json::from_slice(&bytes)
            .map_err(|e| FanoutError::SchemaParse(format!("{}: {e}", req.url)))?;

        let elapsed_ms = start.elapsed().as_millis() as u64;

        Ok(FetchOutcome {
            ordinal: req.ordinal,
            url: req.url.clone(),
            elapsed_ms,
            payload,
        })
    }

    fn classify(&self, e: reqwest::Error) -> FanoutError {
        if e.is_timeout() {
            FanoutError::Timeout(self.timeout.as_millis() as u64)
        } else {
            FanoutError::Request(e)
        }
    }
}

fn too_large(url: &str, len: usize) -> FanoutError {
    FanoutError::Upstream {
        url: url.to_string(),
        message: format!("response too large: {len} bytes (max {MAX_RESPONSE_BYTES})"),
        status: None,
    }
}
