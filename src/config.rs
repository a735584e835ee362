use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_BASE_URL: &str = "https://jsonplaceholder.typicode.com/photos";
/// Ceiling on `nbRequests`. Each request holds a task and a socket for the
/// lifetime of the batch.
pub const DEFAULT_MAX_REQUESTS: usize = 1000;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_HEAVY_ITERATIONS: u64 = 1_000_000_000;

const CONFIG_FILE: &str = "fanout.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    /// Downstream base; request `i` goes to `{base_url}/{i + 1}`.
    pub base_url: String,
    pub max_requests: usize,
    pub request_timeout_ms: u64,
    /// Treat a non-2xx downstream status as a failed fetch. Off by default: any
    /// readable JSON body counts, whatever the status.
    pub reject_error_status: bool,
    /// When every fetch in a batch fails, answer 502 instead of a zero-filled 200.
    pub fail_on_total_failure: bool,
    pub heavy_iterations: u64,
    pub heavy_partitions: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            base_url: DEFAULT_BASE_URL.to_string(),
            max_requests: DEFAULT_MAX_REQUESTS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            reject_error_status: false,
            fail_on_total_failure: false,
            heavy_iterations: DEFAULT_HEAVY_ITERATIONS,
            heavy_partitions: default_partitions(),
        }
    }
}

/// On-disk overrides. Every field is optional; absent fields keep the default.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub port: Option<u16>,
    pub base_url: Option<String>,
    pub max_requests: Option<usize>,
    pub request_timeout_ms: Option<u64>,
    pub reject_error_status: Option<bool>,
    pub fail_on_total_failure: Option<bool>,
    pub heavy_iterations: Option<u64>,
    pub heavy_partitions: Option<usize>,
}

impl Config {
    /// Defaults, then `fanout.toml` (or `$FANOUT_CONFIG`), then `FANOUT_*` env vars.
    pub fn load() -> Self {
        let mut config = Self::default();

        let path = env::var("FANOUT_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(CONFIG_FILE));
        if path.exists() {
            match read_file_config(&path) {
                Ok(file) => config.apply_file(file),
                Err(e) => tracing::warn!(path = %path.display(), "ignoring config file: {e}"),
            }
        }

        config.apply_env();
        config
    }

    pub fn apply_file(&mut self, file: FileConfig) {
        if let Some(port) = file.port {
            self.port = port;
        }
        if let Some(base_url) = file.base_url {
            self.base_url = base_url;
        }
        if let Some(max) = file.max_requests {
            self.max_requests = positive_or(max, self.max_requests, "max_requests");
        }
        if let Some(ms) = file.request_timeout_ms {
            self.request_timeout_ms =
                positive_or(ms, self.request_timeout_ms, "request_timeout_ms");
        }
        if let Some(flag) = file.reject_error_status {
            self.reject_error_status = flag;
        }
        if let Some(flag) = file.fail_on_total_failure {
            self.fail_on_total_failure = flag;
        }
        if let Some(iterations) = file.heavy_iterations {
            self.heavy_iterations = iterations;
        }
        if let Some(partitions) = file.heavy_partitions {
            self.heavy_partitions =
                positive_or(partitions, self.heavy_partitions, "heavy_partitions");
        }
    }

    pub fn apply_env(&mut self) {
        if let Some(port) = env_parse("FANOUT_PORT") {
            self.port = port;
        }
        if let Ok(base_url) = env::var("FANOUT_BASE_URL")
            && !base_url.trim().is_empty()
        {
            self.base_url = base_url.trim().to_string();
        }
        if let Some(max) = env_parse("FANOUT_MAX_REQUESTS") {
            self.max_requests = positive_or(max, self.max_requests, "FANOUT_MAX_REQUESTS");
        }
        if let Some(ms) = env_parse("FANOUT_REQUEST_TIMEOUT_MS") {
            self.request_timeout_ms =
                positive_or(ms, self.request_timeout_ms, "FANOUT_REQUEST_TIMEOUT_MS");
        }
        if let Some(flag) = env_parse("FANOUT_REJECT_ERROR_STATUS") {
            self.reject_error_status = flag;
        }
        if let Some(flag) = env_parse("FANOUT_FAIL_ON_TOTAL_FAILURE") {
            self.fail_on_total_failure = flag;
        }
        if let Some(iterations) = env_parse("FANOUT_HEAVY_ITERATIONS") {
            self.heavy_iterations = iterations;
        }
        if let Some(partitions) = env_parse("FANOUT_HEAVY_PARTITIONS") {
            self.heavy_partitions =
                positive_or(partitions, self.heavy_partitions, "FANOUT_HEAVY_PARTITIONS");
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

pub fn read_file_config(path: &Path) -> Result<FileConfig, String> {
    let raw = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    toml::from_str(&raw).map_err(|e| e.to_string())
}

fn default_partitions() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("{key}={raw:?} is not valid, keeping default");
            None
        }
    }
}

fn positive_or<T: PartialOrd + Default + Copy>(value: T, fallback: T, key: &str) -> T {
    if value > T::default() {
        value
    } else {
        tracing::warn!("{key} must be positive, keeping default");
        fallback
    }
}
