use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::request::{Body, HttpExecutor, HttpResponse, Method, Request, ResponseHeaders};

/// Answers every request with its method name and an `x-seq` header counting
/// calls per URL.
#[derive(Default)]
pub(crate) struct EchoExecutor {
    latency: Duration,
    blocking: Duration,
    failures: HashSet<(String, usize)>,
    sequence: Mutex<HashMap<String, usize>>,
    calls: Mutex<Vec<(Method, String, Body)>>,
}

impl EchoExecutor {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    // Holds the worker thread, like a client doing synchronous I/O.
    pub(crate) fn with_blocking_latency(mut self, latency: Duration) -> Self {
        self.blocking = latency;
        self
    }

    /// Makes the `seq`-th call (0-based) to `url` fail.
    pub(crate) fn failing_on(mut self, url: &str, seq: usize) -> Self {
        self.failures.insert((url.to_string(), seq));
        self
    }

    pub(crate) fn calls(&self) -> Vec<(Method, String, Body)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpExecutor for EchoExecutor {
    async fn execute(&self, request: &Request, body: &Body) -> Result<HttpResponse> {
        let seq = {
            let mut sequence = self.sequence.lock().unwrap();
            let counter = sequence.entry(request.url().to_string()).or_default();
            let seq = *counter;
            *counter += 1;
            seq
        };
        self.calls.lock().unwrap().push((
            request.method(),
            request.url().to_string(),
            body.clone(),
        ));

        if !self.blocking.is_zero() {
            std::thread::sleep(self.blocking);
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if self.failures.contains(&(request.url().to_string(), seq)) {
            return Err(Error::Client(format!("scripted failure #{}", seq)));
        }

        let mut headers = ResponseHeaders::new();
        headers.insert("x-seq".to_string(), vec![seq.to_string()]);
        Ok(HttpResponse {
            status: 200,
            body: request.method().as_str().as_bytes().to_vec(),
            headers,
        })
    }
}
