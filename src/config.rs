//! Configuration management for the dashboard client

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Live incident feed length used when nothing else is configured
pub const DEFAULT_INCIDENT_CAPACITY: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the monitoring backend REST API
    pub api_url: String,

    /// Push channel URL; derived from `api_url` when unset
    pub ws_url: Option<String>,

    /// Interval between service list polls
    pub services_interval: Duration,

    /// Interval between alert list polls
    pub alerts_interval: Duration,

    /// HTTP timeout for backend requests
    pub http_timeout: Duration,

    /// Maximum number of live incidents kept in the feed
    pub incident_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".to_string(),
            ws_url: None,
            services_interval: Duration::from_secs(5),
            alerts_interval: Duration::from_secs(5),
            http_timeout: Duration::from_secs(10),
            incident_capacity: DEFAULT_INCIDENT_CAPACITY,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Config::default();

        if let Ok(api_url) = env::var("DASHBOARD_API_URL") {
            config.api_url = api_url.trim_end_matches('/').to_string();
        }

        if let Ok(ws_url) = env::var("DASHBOARD_WS_URL") {
            config.ws_url = Some(ws_url);
        }

        // The shared interval is applied first so the per-resource ones win.
        if let Some(interval) = seconds_var("POLL_INTERVAL_SECONDS") {
            config.services_interval = interval;
            config.alerts_interval = interval;
        }

        if let Some(interval) = seconds_var("SERVICES_POLL_INTERVAL_SECONDS") {
            config.services_interval = interval;
        }

        if let Some(interval) = seconds_var("ALERTS_POLL_INTERVAL_SECONDS") {
            config.alerts_interval = interval;
        }

        if let Some(timeout) = seconds_var("HTTP_TIMEOUT_SECONDS") {
            config.http_timeout = timeout;
        }

        if let Ok(capacity) = env::var("INCIDENT_FEED_CAPACITY") {
            if let Ok(capacity) = capacity.parse() {
                config.incident_capacity = capacity;
            }
        }

        config
    }

    /// Push channel URL, either configured or derived from the API URL
    pub fn push_url(&self) -> String {
        if let Some(url) = &self.ws_url {
            return url.clone();
        }

        let base = self.api_url.trim_end_matches('/');
        let base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            base.to_string()
        };

        format!("{}/ws/alerts", base)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.api_url.is_empty() {
            return Err("api_url cannot be empty".to_string());
        }

        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(format!("api_url must be an http(s) URL, got {}", self.api_url));
        }

        let push_url = self.push_url();
        if !push_url.starts_with("ws://") && !push_url.starts_with("wss://") {
            return Err(format!("push channel must be a ws(s) URL, got {}", push_url));
        }

        if self.services_interval.is_zero() || self.alerts_interval.is_zero() {
            return Err("poll intervals must be greater than 0".to_string());
        }

        if self.http_timeout.is_zero() {
            return Err("http_timeout must be greater than 0".to_string());
        }

        if self.incident_capacity == 0 {
            return Err("incident_capacity must be greater than 0".to_string());
        }

        Ok(())
    }
}

fn seconds_var(name: &str) -> Option<Duration> {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .map(Duration::from_secs)
}
