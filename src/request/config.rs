use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::network::{HttpVersion, ProxyConfig};

pub const DEFAULT_TIMEOUT_SECS: f64 = 30.0;
pub const DEFAULT_USER_AGENT: &str = concat!("curling/", env!("CARGO_PKG_VERSION"));

/// Settings used to build the [`ReqwestExecutor`](crate::ReqwestExecutor) client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Per-request timeout in seconds.
    pub timeout: f64,
    pub compression: bool,
    pub user_agent: String,
    pub proxy: Option<ProxyConfig>,
    pub http_version: HttpVersion,
    /// `false` accepts invalid TLS certificates.
    pub ssl_verify: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT_SECS,
            compression: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            proxy: None,
            http_version: HttpVersion::Auto,
            ssl_verify: true,
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout.as_secs_f64();
        self
    }

    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compression = enabled;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_proxy(mut self, proxy: ProxyConfig) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn with_http_version(mut self, version: HttpVersion) -> Self {
        self.http_version = version;
        self
    }

    pub fn with_ssl_verify(mut self, verify: bool) -> Self {
        self.ssl_verify = verify;
        self
    }

    pub fn timeout_duration(&self) -> Duration {
        // Negative or NaN values would panic in Duration::from_secs_f64.
        if self.timeout.is_finite() && self.timeout > 0.0 {
            Duration::from_secs_f64(self.timeout)
        } else {
            Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS)
        }
    }

    /// Loads a configuration from a JSON document; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub(crate) fn build_client(&self) -> Result<Client> {
        let mut builder = Client::builder()
            .timeout(self.timeout_duration())
            .gzip(self.compression)
            .brotli(self.compression)
            .deflate(self.compression)
            .user_agent(self.user_agent.as_str())
            .danger_accept_invalid_certs(!self.ssl_verify);

        builder = self.http_version.apply_to_builder(builder);

        if let Some(proxy) = &self.proxy {
            builder = proxy.apply_to_builder(builder)?;
        }

        builder.build().map_err(|e| Error::Client(e.to_string()))
    }
}
