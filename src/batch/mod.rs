//! Concurrent execution of repeated requests.
//!
//! A [`BatchRequest`] runs each of its [`BatchItem`]s concurrently. Every
//! item repeats its request sequentially and emits one [`OutputFrame`] per
//! iteration, either to its own [`ItemOutput`] or to the batch's shared
//! output.

pub mod batch_item;
pub mod batch_request;
pub mod output;

#[cfg(test)]
pub(crate) mod mock;

pub use batch_item::BatchItem;
pub use batch_request::BatchRequest;
pub use output::{channel, FrameRecord, ItemOutput, OutputFrame, OutputSender, OutputStream};
