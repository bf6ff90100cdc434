//! Poller configuration
//!
//! Defines all configurable parameters for the poller including
//! polling intervals, request timeouts and the Horde connection settings.

use std::path::PathBuf;
use std::time::Duration;

/// Default Horde API host
pub const DEFAULT_API_URL: &str = "https://stablehorde.net";

/// Poller configuration
///
/// Intervals are configurable so the poller can be tuned against Horde's
/// rate limits.
#[derive(Debug, Clone)]
pub struct Config {
    /// Horde API base URL (e.g., "https://stablehorde.net")
    pub api_url: String,

    /// Value sent in the `Client-Agent` header, `name:version:contact`
    pub client_agent: String,

    /// Path of the local SQLite job store
    pub db_path: PathBuf,

    /// How often to check pending jobs
    pub poll_interval: Duration,

    /// How often to check that Horde is online
    pub heartbeat_interval: Duration,

    /// Timeout applied to every HTTP request
    pub request_timeout: Duration,

    /// Max status checks in flight across all jobs
    pub max_parallel_checks: usize,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(api_url: String, db_path: PathBuf) -> Self {
        Self {
            api_url,
            client_agent: default_client_agent(),
            db_path,
            poll_interval: Duration::from_secs(5),
            heartbeat_interval: Duration::from_secs(60),
            request_timeout: Duration::from_secs(30),
            max_parallel_checks: 8,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables (all optional):
    /// - HORDE_API_URL (default: https://stablehorde.net)
    /// - HORDE_CLIENT_AGENT (default: horde-poller:<version>:unknown)
    /// - HORDE_DB_PATH (default: horde.db)
    /// - POLL_INTERVAL (seconds, default: 5)
    /// - HEARTBEAT_INTERVAL (seconds, default: 60)
    /// - REQUEST_TIMEOUT (seconds, default: 30)
    /// - MAX_PARALLEL_CHECKS (default: 8)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let api_url = std::env::var("HORDE_API_URL").unwrap_or(defaults.api_url);

        let client_agent = std::env::var("HORDE_CLIENT_AGENT").unwrap_or(defaults.client_agent);

        let db_path = std::env::var("HORDE_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);

        let poll_interval = env_secs("POLL_INTERVAL").unwrap_or(defaults.poll_interval);

        let heartbeat_interval =
            env_secs("HEARTBEAT_INTERVAL").unwrap_or(defaults.heartbeat_interval);

        let request_timeout = env_secs("REQUEST_TIMEOUT").unwrap_or(defaults.request_timeout);

        let max_parallel_checks = std::env::var("MAX_PARALLEL_CHECKS")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(defaults.max_parallel_checks);

        Self {
            api_url,
            client_agent,
            db_path,
            poll_interval,
            heartbeat_interval,
            request_timeout,
            max_parallel_checks,
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            anyhow::bail!("api_url must start with http:// or https://");
        }

        horde_client::validate_client_agent(&self.client_agent)
            .map_err(|e| anyhow::anyhow!("client_agent is unusable: {}", e))?;

        if self.db_path.as_os_str().is_empty() {
            anyhow::bail!("db_path cannot be empty");
        }

        if self.poll_interval.is_zero() {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        if self.heartbeat_interval.is_zero() {
            anyhow::bail!("heartbeat_interval must be greater than 0");
        }

        if self.request_timeout.is_zero() {
            anyhow::bail!("request_timeout must be greater than 0");
        }

        if self.max_parallel_checks == 0 {
            anyhow::bail!("max_parallel_checks must be greater than 0");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL.to_string(), PathBuf::from("horde.db"))
    }
}

fn default_client_agent() -> String {
    format!("horde-poller:{}:unknown", env!("CARGO_PKG_VERSION"))
}

fn env_secs(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
}
