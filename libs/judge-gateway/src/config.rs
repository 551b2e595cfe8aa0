// Gateway configuration
// Read once at startup from the environment, immutable afterwards

use crate::breaker::BreakerConfig;
use crate::error::{GatewayError, Result};
use crate::poller::RetryPolicy;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:2358";
pub const DEFAULT_API_KEY_HEADER: &str = "X-Auth-Token";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
pub const HEALTH_TIMEOUT_MS: u64 = 3_000;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub api_key_header: String,
    pub request_timeout: Duration,
    pub health_timeout: Duration,
    pub breaker: BreakerConfig,
    pub poll: RetryPolicy,
}

impl GatewayConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: None,
            api_key_header: DEFAULT_API_KEY_HEADER.to_string(),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            health_timeout: Duration::from_millis(HEALTH_TIMEOUT_MS),
            breaker: BreakerConfig::default(),
            poll: RetryPolicy::default(),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_poll_policy(mut self, poll: RetryPolicy) -> Self {
        self.poll = poll;
        self
    }

    /// Load from `JUDGE0_API_URL`, `JUDGE0_API_KEY`, `JUDGE0_API_KEY_HEADER`
    /// and `JUDGE0_TIMEOUT_MS`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("JUDGE0_API_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(GatewayError::Config(format!(
                "JUDGE0_API_URL must be an http(s) URL, got '{}'",
                base_url
            )));
        }

        let mut config = Self::new(base_url.trim());

        config.api_key = lookup("JUDGE0_API_KEY").filter(|v| !v.is_empty());

        if let Some(header) = lookup("JUDGE0_API_KEY_HEADER").filter(|v| !v.is_empty()) {
            config.api_key_header = header;
        }

        if let Some(raw) = lookup("JUDGE0_TIMEOUT_MS").filter(|v| !v.is_empty()) {
            let ms: u64 = raw.trim().parse().map_err(|_| {
                GatewayError::Config(format!("JUDGE0_TIMEOUT_MS must be a number, got '{}'", raw))
            })?;
            config.request_timeout = Duration::from_millis(ms);
        }

        Ok(config)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}
