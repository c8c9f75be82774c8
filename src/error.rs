use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unsupported HTTP method '{0}', expected one of GET, POST, PUT, PATCH")]
    InvalidMethod(String),

    #[error("invalid target URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid header '{name}': {message}")]
    InvalidHeader { name: String, message: String },

    #[error("failed to serialize request body: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("proxy configuration error: {0}")]
    Proxy(String),

    #[error("invalid HTTP version '{0}', expected one of AUTO, HTTP1_ONLY, HTTP2, HTTP2_PRIOR_KNOWLEDGE")]
    InvalidHttpVersion(String),

    #[error("item {0} has no dedicated output and no shared output is attached")]
    NoOutput(uuid::Uuid),

    #[error("dedicated output '{output}' of item {item} is already closed")]
    OutputClosed { item: uuid::Uuid, output: String },

    #[error("batch worker did not complete: {0}")]
    Worker(String),

    #[error("invalid delay {0}s")]
    InvalidDelay(f64),

    #[error("failed to initialize debug logging: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, Error>;
