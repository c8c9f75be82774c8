use std::fmt;
use std::str::FromStr;

use reqwest::ClientBuilder;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// HTTP protocol version negotiation for the reqwest executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum HttpVersion {
    #[default]
    Auto,
    Http1Only,
    Http2,
    /// Force HTTP/2 without fallback; the server must support it.
    Http2PriorKnowledge,
}

impl HttpVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVersion::Auto => "AUTO",
            HttpVersion::Http1Only => "HTTP1_ONLY",
            HttpVersion::Http2 => "HTTP2",
            HttpVersion::Http2PriorKnowledge => "HTTP2_PRIOR_KNOWLEDGE",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            HttpVersion::Auto => "Automatically negotiate the best HTTP version",
            HttpVersion::Http1Only => "Use only HTTP/1.1 (no HTTP/2)",
            HttpVersion::Http2 => "Prefer HTTP/2, fallback to HTTP/1.1 if needed",
            HttpVersion::Http2PriorKnowledge => {
                "Force HTTP/2 without fallback (server must support HTTP/2)"
            }
        }
    }

    pub fn supports_http2(&self) -> bool {
        !matches!(self, HttpVersion::Http1Only)
    }

    pub fn is_http2_forced(&self) -> bool {
        matches!(self, HttpVersion::Http2PriorKnowledge)
    }

    pub(crate) fn apply_to_builder(&self, builder: ClientBuilder) -> ClientBuilder {
        match self {
            HttpVersion::Auto | HttpVersion::Http2 => builder,
            HttpVersion::Http1Only => builder.http1_only(),
            HttpVersion::Http2PriorKnowledge => builder.http2_prior_knowledge(),
        }
    }
}

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "AUTO" | "" => Ok(HttpVersion::Auto),
            "HTTP1" | "HTTP1.1" | "HTTP1_ONLY" => Ok(HttpVersion::Http1Only),
            "HTTP2" => Ok(HttpVersion::Http2),
            "HTTP2_PRIOR_KNOWLEDGE" | "FORCE_HTTP2" | "HTTP2_ONLY" => {
                Ok(HttpVersion::Http2PriorKnowledge)
            }
            _ => Err(Error::InvalidHttpVersion(s.to_string())),
        }
    }
}

impl TryFrom<String> for HttpVersion {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<HttpVersion> for String {
    fn from(version: HttpVersion) -> Self {
        version.as_str().to_string()
    }
}
