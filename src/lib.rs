#![cfg_attr(feature = "python", allow(non_local_definitions))]
//! Concurrent execution of repeated HTTP requests.
//!
//! Build [`BatchItem`]s, group them in a [`BatchRequest`] and run it with an
//! [`HttpExecutor`] such as [`ReqwestExecutor`]. Every iteration of every
//! item yields one [`OutputFrame`], delivered either to the item's own
//! [`ItemOutput`] or to the batch's shared output.
//!
//! ```no_run
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use std::time::Duration;
//! use curling::{BatchItem, BatchRequest, Method, ReqwestExecutor};
//!
//! # async fn run() -> curling::Result<()> {
//! let executor = Arc::new(ReqwestExecutor::new()?);
//! let mut batch = BatchRequest::new(
//!     vec![BatchItem::new(Method::Get, "https://httpbin.org/get", HashMap::new())
//!         .with_iterations(5)
//!         .with_delay(Duration::from_millis(250))],
//!     true,
//! );
//! let mut frames = batch.take_output().expect("allocated by new");
//! batch.run_batch(executor).await?;
//! while let Some(frame) = frames.recv().await {
//!     println!("{}", frame.text());
//! }
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod debug;
pub mod error;
pub mod network;
pub mod request;
pub mod utils;

#[cfg(feature = "python")]
pub mod python;

pub use batch::{
    BatchItem, BatchRequest, FrameRecord, ItemOutput, OutputFrame, OutputSender, OutputStream,
};
pub use debug::{init_debug, DebugTarget};
pub use error::{Error, Result};
pub use network::{HttpVersion, ProxyConfig};
pub use request::{
    Body, ClientConfig, HttpExecutor, HttpResponse, Method, Request, ReqwestExecutor,
    ResponseHeaders,
};
