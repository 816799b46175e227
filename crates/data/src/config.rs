//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Deserializer};

pub const API_URL_ENV: &str = "TENANTKIT_API_URL";
pub const API_TIMEOUT_ENV: &str = "TENANTKIT_API_TIMEOUT_MS";

const DEFAULT_API_URL: &str = "http://localhost:8080";
const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Where and how the client talks to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL without trailing slash.
    #[serde(deserialize_with = "base_url")]
    pub api_url: String,
    pub timeout_ms: u64,
    /// Header carrying the active company (tenant) id.
    pub company_header: String,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            company_header: "x-company-id".to_string(),
            user_agent: concat!("tenantkit/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: trim_base(api_url.into()),
            ..Default::default()
        }
    }

    /// Read `TENANTKIT_API_URL` / `TENANTKIT_API_TIMEOUT_MS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        match lookup(API_URL_ENV).filter(|v| !v.trim().is_empty()) {
            Some(url) => config.api_url = trim_base(url),
            None => tracing::warn!(
                default = DEFAULT_API_URL,
                "{API_URL_ENV} not set; using default"
            ),
        }

        if let Some(raw) = lookup(API_TIMEOUT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => config.timeout_ms = ms,
                Err(_) => tracing::warn!(value = %raw, "invalid {API_TIMEOUT_ENV}; keeping default"),
            }
        }

        config
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Absolute URL for an endpoint path such as `/users?x=1`.
    pub fn url_for(&self, path: &str) -> String {
        let base = self.api_url.trim_end_matches('/');
        format!("{base}/{}", path.trim_start_matches('/'))
    }
}

fn trim_base(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn base_url<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    String::deserialize(deserializer).map(trim_base)
}
