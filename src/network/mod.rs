// src/network/mod.rs
pub mod http_version;
pub mod proxy_config;

pub use http_version::HttpVersion;
pub use proxy_config::ProxyConfig;
