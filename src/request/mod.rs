// request/mod.rs

pub mod request_item;
pub mod executor;
pub mod config;

pub use request_item::{Body, Method, Request};
pub use executor::{HttpExecutor, HttpResponse, ReqwestExecutor, ResponseHeaders};
pub use config::ClientConfig;
