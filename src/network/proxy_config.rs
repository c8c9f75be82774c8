use reqwest::{ClientBuilder, NoProxy, Proxy};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

/// `all` takes precedence over the per-scheme `http`/`https` entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub http: Option<String>,
    pub https: Option<String>,
    pub all: Option<String>,
    pub no_proxy: Option<Vec<String>>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// When `Some(false)`, proxies from the environment are ignored.
    pub trust_env: Option<bool>,
}

impl ProxyConfig {
    pub fn from_url(proxy_url: impl Into<String>) -> Self {
        Self {
            all: Some(proxy_url.into()),
            ..Default::default()
        }
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: Option<String>) -> Self {
        self.username = Some(username.into());
        self.password = password;
        self
    }

    pub fn with_no_proxy(mut self, hosts: Vec<String>) -> Self {
        self.no_proxy = Some(hosts);
        self
    }

    fn authenticated_url(&self, proxy_url: &str) -> Result<String> {
        let Some(user) = &self.username else {
            return Ok(proxy_url.to_string());
        };
        let mut parsed = Url::parse(proxy_url)
            .map_err(|e| Error::Proxy(format!("invalid proxy URL '{}': {}", proxy_url, e)))?;
        parsed
            .set_username(user)
            .map_err(|_| Error::Proxy(format!("cannot set username on '{}'", proxy_url)))?;
        if let Some(pass) = &self.password {
            parsed
                .set_password(Some(pass))
                .map_err(|_| Error::Proxy(format!("cannot set password on '{}'", proxy_url)))?;
        }
        Ok(parsed.to_string())
    }

    fn finish(&self, proxy: Proxy) -> Proxy {
        let no_proxy = self
            .no_proxy
            .as_ref()
            .and_then(|hosts| NoProxy::from_string(&hosts.join(",")));
        proxy.no_proxy(no_proxy)
    }

    pub(crate) fn apply_to_builder(&self, mut builder: ClientBuilder) -> Result<ClientBuilder> {
        if self.trust_env == Some(false) {
            builder = builder.no_proxy();
        }

        let to_err = |e: reqwest::Error| Error::Proxy(e.to_string());

        if let Some(all) = &self.all {
            let proxy = Proxy::all(self.authenticated_url(all)?).map_err(to_err)?;
            return Ok(builder.proxy(self.finish(proxy)));
        }
        if let Some(http) = &self.http {
            let proxy = Proxy::http(self.authenticated_url(http)?).map_err(to_err)?;
            builder = builder.proxy(self.finish(proxy));
        }
        if let Some(https) = &self.https {
            let proxy = Proxy::https(self.authenticated_url(https)?).map_err(to_err)?;
            builder = builder.proxy(self.finish(proxy));
        }
        Ok(builder)
    }
}
