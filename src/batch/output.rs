use std::borrow::Cow;
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::request::{HttpResponse, ResponseHeaders};
use crate::utils::format_datetime;

pub type OutputSender = mpsc::Sender<OutputFrame>;
pub type OutputStream = mpsc::Receiver<OutputFrame>;

pub fn channel(capacity: usize) -> (OutputSender, OutputStream) {
    mpsc::channel(capacity.max(1))
}

/// The result of one iteration of a [`BatchItem`](crate::BatchItem).
///
/// On failure `error` is set and `data`/`headers` are empty.
#[derive(Debug)]
pub struct OutputFrame {
    pub item_id: Uuid,
    pub iteration: usize,
    /// Absent when no response was received.
    pub status: Option<u16>,
    pub data: Vec<u8>,
    pub headers: ResponseHeaders,
    pub error: Option<Error>,
    pub requested_at: DateTime<Local>,
    pub elapsed: Duration,
}

impl OutputFrame {
    pub(crate) fn from_result(
        item_id: Uuid,
        iteration: usize,
        result: Result<HttpResponse>,
        requested_at: DateTime<Local>,
        elapsed: Duration,
    ) -> Self {
        let (status, data, headers, error) = match result {
            Ok(response) => (
                Some(response.status),
                response.body,
                response.headers,
                None,
            ),
            Err(e) => (None, Vec::new(), ResponseHeaders::new(), Some(e)),
        };
        Self {
            item_id,
            iteration,
            status,
            data,
            headers,
            error,
            requested_at,
            elapsed,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }

    /// Flat, serializable view of the frame. `output_id` names the dedicated
    /// output it was read from, if any.
    pub fn record<'a>(&'a self, output_id: Option<&'a str>) -> FrameRecord<'a> {
        FrameRecord {
            item_id: self.item_id.to_string(),
            output_id,
            iteration: self.iteration,
            http_status: self.status,
            response: self.text(),
            headers: &self.headers,
            exception: self.error.as_ref().map(ToString::to_string),
            request_time: format_datetime(self.requested_at),
            process_time: format!("{:.4}", self.elapsed.as_secs_f64()),
        }
    }

    pub fn into_result(self) -> Result<HttpResponse> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(HttpResponse {
                status: self.status.unwrap_or_default(),
                body: self.data,
                headers: self.headers,
            }),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FrameRecord<'a> {
    pub item_id: String,
    pub output_id: Option<&'a str>,
    pub iteration: usize,
    pub http_status: Option<u16>,
    pub response: Cow<'a, str>,
    pub headers: &'a ResponseHeaders,
    pub exception: Option<String>,
    pub request_time: String,
    pub process_time: String,
}

/// A dedicated output for one item, identified by a caller-chosen id.
#[derive(Debug)]
pub struct ItemOutput {
    id: String,
    sender: Option<OutputSender>,
}

impl ItemOutput {
    pub fn new(id: impl Into<String>, sender: OutputSender) -> Self {
        Self {
            id: id.into(),
            sender: Some(sender),
        }
    }

    pub fn channel(id: impl Into<String>, capacity: usize) -> (Self, OutputStream) {
        let (tx, rx) = channel(capacity);
        (Self::new(id, tx), rx)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_none()
    }

    pub(crate) fn take_sender(&mut self) -> Option<OutputSender> {
        self.sender.take()
    }
}
