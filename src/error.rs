use thiserror::Error;

#[derive(Debug, Error)]
pub enum FanoutError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("requested {requested} requests, max is {max}")]
    TooManyRequests { requested: u64, max: usize },

    #[error("timeout after {0}ms")]
    Timeout(u64),

    #[error("upstream error from {url}: {message}")]
    Upstream {
        url: String,
        message: String,
        status: Option<u16>,
    },

    #[error("schema parse error: {0}")]
    SchemaParse(String),

    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("result slot {0} already written")]
    SlotTaken(usize),

    #[error("result slot {ordinal} out of range (batch size {len})")]
    SlotOutOfRange { ordinal: usize, len: usize },

    #[error("all {requested} downstream requests failed")]
    AllRequestsFailed { requested: usize },

    #[error("{0}")]
    Other(String),
}

/// Message returned for a missing, non-numeric, or non-positive count.
pub const INVALID_COUNT_MESSAGE: &str =
    "Invalid number of requests. Please provide a positive integer.";

impl FanoutError {
    /// True for errors caused by the caller's input. These are rejected
    /// before any downstream request is issued.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidArgument(_) | Self::TooManyRequests { .. })
    }

    /// True for failures of a single downstream fetch. The batch absorbs these.
    pub fn is_downstream(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::Upstream { .. } | Self::SchemaParse(_) | Self::Request(_)
        )
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidArgument(_) | Self::TooManyRequests { .. } => 400,
            Self::AllRequestsFailed { .. } => 502,
            _ => 500,
        }
    }

    /// Client-safe message. Does not leak downstream URLs or connection details.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidArgument(_) => INVALID_COUNT_MESSAGE.to_string(),
            Self::TooManyRequests { requested, max } => format!(
                "Invalid number of requests: {requested} exceeds the maximum of {max}."
            ),
            Self::Timeout(ms) => format!("request timed out after {ms}ms"),
            Self::Upstream { status, .. } => match status {
                Some(s) => format!("downstream returned status {s}"),
                None => "downstream request failed".to_string(),
            },
            Self::SchemaParse(_) => "failed to parse downstream response".to_string(),
            Self::Request(_) => "request to downstream failed".to_string(),
            Self::SlotTaken(_) | Self::SlotOutOfRange { .. } => {
                "internal error collecting results".to_string()
            }
            Self::AllRequestsFailed { requested } => {
                format!("All {requested} downstream requests failed.")
            }
            Self::Other(msg) => msg.clone(),
        }
    }
}
