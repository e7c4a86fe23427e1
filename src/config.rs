//! Runtime configuration.
//!
//! Defaults, overridden by `TOKENPEEK_*` environment variables, overridden
//! in turn by the settings the user saved in the panel.

use crate::metrics::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

const ENV_PREFIX: &str = "TOKENPEEK_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeekConfig {
    pub api_base_url: String,
    pub api_key: Option<String>,
    pub request_timeout_seconds: u64,
    /// Retries after the first call, only on HTTP 502.
    pub retry_attempts: usize,
    pub retry_base_delay_ms: u64,
    /// Foreground refresh of the displayed record.
    pub refresh_interval_ms: u64,
    /// Trending list cadence. Independent of `refresh_interval_ms`.
    pub trending_refresh_seconds: u64,
    pub detection_poll_interval_ms: u64,
    pub mutation_debounce_ms: u64,
    pub url_change_debounce_ms: u64,
    pub auto_open_panel: bool,
}

impl Default for PeekConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000/api".to_string(),
            api_key: None,
            request_timeout_seconds: 15,
            retry_attempts: 3,
            retry_base_delay_ms: 500,
            refresh_interval_ms: 1500,
            trending_refresh_seconds: 60,
            detection_poll_interval_ms: 5000,
            mutation_debounce_ms: 500,
            url_change_debounce_ms: 100,
            auto_open_panel: true,
        }
    }
}

impl PeekConfig {
    /// Defaults overlaid with environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Defaults overlaid with whatever `lookup` yields for each
    /// `TOKENPEEK_*` key. Unparseable values are logged and ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let get = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

        if let Some(url) = get("API_BASE_URL").filter(|v| !v.trim().is_empty()) {
            config.api_base_url = url.trim().to_string();
        }
        if let Some(key) = get("API_KEY").filter(|v| !v.trim().is_empty()) {
            config.api_key = Some(key.trim().to_string());
        }
        overlay(&mut config.request_timeout_seconds, "REQUEST_TIMEOUT_SECONDS", get("REQUEST_TIMEOUT_SECONDS"));
        overlay(&mut config.retry_attempts, "RETRY_ATTEMPTS", get("RETRY_ATTEMPTS"));
        overlay(&mut config.retry_base_delay_ms, "RETRY_BASE_DELAY_MS", get("RETRY_BASE_DELAY_MS"));
        overlay(&mut config.refresh_interval_ms, "REFRESH_INTERVAL_MS", get("REFRESH_INTERVAL_MS"));
        overlay(
            &mut config.trending_refresh_seconds,
            "TRENDING_REFRESH_SECONDS",
            get("TRENDING_REFRESH_SECONDS"),
        );
        overlay(
            &mut config.detection_poll_interval_ms,
            "DETECTION_POLL_INTERVAL_MS",
            get("DETECTION_POLL_INTERVAL_MS"),
        );
        config
    }

    /// Overlay user-saved settings.
    pub fn apply_settings(&mut self, settings: &PeekSettings) {
        if let Some(url) = settings.api_base_url.as_deref().filter(|v| !v.trim().is_empty()) {
            self.api_base_url = url.trim().to_string();
        }
        if let Some(key) = settings.api_key.as_deref().filter(|v| !v.trim().is_empty()) {
            self.api_key = Some(key.trim().to_string());
        }
        self.auto_open_panel = settings.auto_open_panel;
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_attempts, Duration::from_millis(self.retry_base_delay_ms))
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn trending_refresh(&self) -> Duration {
        Duration::from_secs(self.trending_refresh_seconds)
    }

    pub fn detection_poll_interval(&self) -> Duration {
        Duration::from_millis(self.detection_poll_interval_ms)
    }

    pub fn mutation_debounce(&self) -> Duration {
        Duration::from_millis(self.mutation_debounce_ms)
    }

    pub fn url_change_debounce(&self) -> Duration {
        Duration::from_millis(self.url_change_debounce_ms)
    }
}

fn overlay<T: FromStr>(slot: &mut T, name: &str, raw: Option<String>) {
    let Some(raw) = raw else {
        return;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => *slot = value,
        Err(_) => warn!("Ignoring invalid {}{}={:?}", ENV_PREFIX, name, raw),
    }
}

/// User settings persisted by the host under `tp_settings`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PeekSettings {
    pub api_base_url: Option<String>,
    pub api_key: Option<String>,
    pub auto_open_panel: bool,
}

impl Default for PeekSettings {
    fn default() -> Self {
        Self {
            api_base_url: None,
            api_key: None,
            auto_open_panel: true,
        }
    }
}

/// Fluent construction of a `PeekConfig`.
#[derive(Debug, Clone, Default)]
pub struct PeekConfigBuilder {
    config: PeekConfig,
}

impl PeekConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration.
    pub fn from_config(config: PeekConfig) -> Self {
        Self { config }
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into();
        self
    }

    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.config.api_key = key;
        self
    }

    pub fn with_request_timeout(mut self, seconds: u64) -> Self {
        self.config.request_timeout_seconds = seconds;
        self
    }

    /// Set retry count and linear backoff step.
    pub fn with_retry(mut self, attempts: usize, base_delay_ms: u64) -> Self {
        self.config.retry_attempts = attempts;
        self.config.retry_base_delay_ms = base_delay_ms;
        self
    }

    pub fn with_refresh_interval_ms(mut self, interval_ms: u64) -> Self {
        self.config.refresh_interval_ms = interval_ms;
        self
    }

    pub fn with_trending_refresh_seconds(mut self, seconds: u64) -> Self {
        self.config.trending_refresh_seconds = seconds;
        self
    }

    pub fn with_detection_poll_interval_ms(mut self, interval_ms: u64) -> Self {
        self.config.detection_poll_interval_ms = interval_ms;
        self
    }

    /// Set the DOM-mutation and URL-change debounce windows.
    pub fn with_debounce(mut self, mutation_ms: u64, url_change_ms: u64) -> Self {
        self.config.mutation_debounce_ms = mutation_ms;
        self.config.url_change_debounce_ms = url_change_ms;
        self
    }

    pub fn with_auto_open_panel(mut self, enabled: bool) -> Self {
        self.config.auto_open_panel = enabled;
        self
    }

    pub fn build(self) -> PeekConfig {
        self.config
    }
}
