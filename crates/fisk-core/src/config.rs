use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Retry policy parameters (`[retry]` section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt; a call performs at
    /// most `max_retries + 1` attempts.
    pub max_retries: u32,
    /// Base delay in milliseconds for exponential backoff.
    pub base_delay_ms: u64,
    /// Upper bound on a single backoff delay in milliseconds.
    pub max_delay_ms: u64,
    /// HTTP status codes treated as retryable in addition to the 5xx family.
    pub retryable_status: Vec<u16>,
    /// Whether the whole 5xx family is retryable.
    pub retry_server_errors: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            retryable_status: vec![408, 429],
            retry_server_errors: true,
        }
    }
}

/// Circuit breaker parameters (`[circuit]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitConfig {
    /// Failures while closed (since the last close) before the circuit opens.
    pub failure_threshold: u32,
    /// How long the circuit stays open before a half-open probe is allowed,
    /// in milliseconds.
    pub recovery_time_ms: u64,
    /// Consecutive probe successes in half-open required to close again.
    pub half_open_requests: u32,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_time_ms: 30_000,
            half_open_requests: 2,
        }
    }
}

/// Queue processor parameters (`[queue]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Period of the background drain tick in milliseconds. The tick is a
    /// safety net; most drains are kicked by enqueues and circuit closes.
    pub drain_interval_ms: u64,
    /// Fixed pause between dispatches within one drain pass, so a drain does
    /// not burst the upstream even while the circuit is closed.
    pub dispatch_gap_ms: u64,
    /// Newest attempt-log entries kept in memory.
    pub request_log_capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            drain_interval_ms: 30_000,
            dispatch_gap_ms: 200,
            request_log_capacity: 200,
        }
    }
}

/// Global configuration loaded from `~/.config/fisk/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FiskConfig {
    pub retry: RetryConfig,
    pub circuit: CircuitConfig,
    pub queue: QueueConfig,
}

/// Partial update for the retry policy; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfigPatch {
    pub max_retries: Option<u32>,
    pub base_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
    pub retryable_status: Option<Vec<u16>>,
    pub retry_server_errors: Option<bool>,
}

impl RetryConfigPatch {
    pub fn apply(&self, cfg: &mut RetryConfig) {
        if let Some(v) = self.max_retries {
            cfg.max_retries = v;
        }
        if let Some(v) = self.base_delay_ms {
            cfg.base_delay_ms = v;
        }
        if let Some(v) = self.max_delay_ms {
            cfg.max_delay_ms = v;
        }
        if let Some(v) = &self.retryable_status {
            cfg.retryable_status = v.clone();
        }
        if let Some(v) = self.retry_server_errors {
            cfg.retry_server_errors = v;
        }
    }
}

/// Partial update for the circuit breaker; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitConfigPatch {
    pub failure_threshold: Option<u32>,
    pub recovery_time_ms: Option<u64>,
    pub half_open_requests: Option<u32>,
}

impl CircuitConfigPatch {
    pub fn apply(&self, cfg: &mut CircuitConfig) {
        if let Some(v) = self.failure_threshold {
            cfg.failure_threshold = v;
        }
        if let Some(v) = self.recovery_time_ms {
            cfg.recovery_time_ms = v;
        }
        if let Some(v) = self.half_open_requests {
            cfg.half_open_requests = v;
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("fisk")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<FiskConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = FiskConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: FiskConfig = toml::from_str(&data)?;
    Ok(cfg)
}
