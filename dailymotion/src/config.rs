//! Client configuration.

use serde::Deserialize;
use std::time::Duration;

/// The kind of API key an application was issued.
///
/// Public and private keys are served from different hosts; requests made with a private key
/// must go to the partner API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiKeyType {
    #[default]
    Public,
    Private,
}

impl ApiKeyType {
    pub const fn base_url(self) -> &'static str {
        match self {
            ApiKeyType::Public => "https://api.dailymotion.com",
            ApiKeyType::Private => "https://partner.api.dailymotion.com",
        }
    }
}

impl std::str::FromStr for ApiKeyType {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" => Ok(ApiKeyType::Public),
            "private" => Ok(ApiKeyType::Private),
            other => eyre::bail!("unknown API key type {other:?}, expected public or private"),
        }
    }
}

/// An application's API key and secret.
#[derive(Clone, Deserialize)]
pub struct ApiCredentials {
    pub key: String,
    pub secret: String,
    #[serde(default)]
    pub key_type: ApiKeyType,
}

impl ApiCredentials {
    pub fn new(key: impl Into<String>, secret: impl Into<String>, key_type: ApiKeyType) -> Self {
        Self {
            key: key.into(),
            secret: secret.into(),
            key_type,
        }
    }
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("key", &self.key)
            .field("secret", &"[redacted]")
            .field("key_type", &self.key_type)
            .finish()
    }
}

/// Settings for the HTTP layer.
///
/// Every field has a default, so a partial config file (or none at all) is fine.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub user_agent: String,
    pub timeout_secs: u64,
    /// How many times a failed request is retried before giving up.
    pub max_retries: u32,
    /// Back-off before retry `n` is `n * retry_backoff_ms`.
    pub retry_backoff_ms: u64,
    /// Minimum time between the start of two consecutive requests.
    pub min_call_interval_ms: u64,
    /// Sends every request here instead of the key type's host.
    pub base_url: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("dailymotion-rs/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 30,
            max_retries: 2,
            retry_backoff_ms: 500,
            min_call_interval_ms: 0,
            base_url: None,
        }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn min_call_interval(&self) -> Duration {
        Duration::from_millis(self.min_call_interval_ms)
    }

    /// The API host to use for `key_type`, honoring [`ClientConfig::base_url`].
    pub fn base_url_for(&self, key_type: ApiKeyType) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => key_type.base_url().to_string(),
        }
    }
}
