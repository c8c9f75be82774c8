use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::Local;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::batch::output::{ItemOutput, OutputFrame, OutputSender};
use crate::error::{Error, Result};
use crate::request::{Body, HttpExecutor, Method, Request};

/// A request template repeated `iterations` times, `delay` apart.
#[derive(Debug)]
pub struct BatchItem {
    id: Uuid,
    request: Request,
    body: Body,
    iterations: usize,
    delay: Duration,
    iterations_done: usize,
    output: Option<ItemOutput>,
}

// A clone keeps the id but not the dedicated output, whose stream must close
// when this item finishes.
impl Clone for BatchItem {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            request: self.request.clone(),
            body: self.body.clone(),
            iterations: self.iterations,
            delay: self.delay,
            iterations_done: self.iterations_done,
            output: None,
        }
    }
}

impl BatchItem {
    pub fn new(method: Method, url: impl Into<String>, headers: HashMap<String, String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            request: Request::new(method, url, headers),
            body: Body::Empty,
            iterations: 1,
            delay: Duration::ZERO,
            iterations_done: 0,
            output: None,
        }
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.set_iterations(iterations);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_output(mut self, output: ItemOutput) -> Self {
        self.output = Some(output);
        self
    }

    pub fn set_iterations(&mut self, iterations: usize) {
        self.iterations = iterations.max(1);
    }

    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = delay;
    }

    pub fn set_body(&mut self, body: impl Into<Body>) {
        self.body = body.into();
    }

    pub fn set_output(&mut self, output: ItemOutput) {
        self.output = Some(output);
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn method(&self) -> Method {
        self.request.method()
    }

    pub fn url(&self) -> &str {
        self.request.url()
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn iterations_done(&self) -> usize {
        self.iterations_done
    }

    pub fn output(&self) -> Option<&ItemOutput> {
        self.output.as_ref()
    }

    pub fn has_dedicated_output(&self) -> bool {
        self.output.is_some()
    }

    /// Runs every iteration in order, sending one frame each to the dedicated
    /// output if there is one, else to `default_sink`. Only the dedicated
    /// output is closed afterwards.
    pub async fn execute<E>(&mut self, executor: &E, default_sink: Option<&OutputSender>) -> Result<()>
    where
        E: HttpExecutor + ?Sized,
    {
        let dedicated = match self.output.as_mut() {
            Some(output) => match output.take_sender() {
                Some(sender) => Some(sender),
                None => {
                    return Err(Error::OutputClosed {
                        item: self.id,
                        output: output.id().to_string(),
                    })
                }
            },
            None => None,
        };

        let sink = match (&dedicated, default_sink) {
            (Some(sender), _) => sender,
            (None, Some(sender)) => sender,
            (None, None) => return Err(Error::NoOutput(self.id)),
        };

        debug!(
            item = %self.id,
            method = %self.request.method(),
            url = self.request.url(),
            iterations = self.iterations,
            dedicated = dedicated.is_some(),
            "starting item"
        );

        for iteration in 0..self.iterations {
            let frame = self.attempt(executor, iteration).await;

            if let Some(err) = &frame.error {
                warn!(item = %self.id, iteration, error = %err, "iteration failed");
            }
            if sink.send(frame).await.is_err() {
                warn!(item = %self.id, iteration, "output receiver dropped, frame discarded");
            }
            self.iterations_done += 1;

            if iteration + 1 < self.iterations && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        // Dropping the item's only sender closes the dedicated stream.
        drop(dedicated);

        debug!(item = %self.id, done = self.iterations_done, "item finished");
        Ok(())
    }

    async fn attempt<E>(&self, executor: &E, iteration: usize) -> OutputFrame
    where
        E: HttpExecutor + ?Sized,
    {
        let requested_at = Local::now();
        let started = Instant::now();
        let result = executor.execute(&self.request, &self.body).await;
        OutputFrame::from_result(self.id, iteration, result, requested_at, started.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::mock::EchoExecutor;
    use crate::batch::output::channel;

    const URL: &str = "http://echo.test/";

    #[test]
    fn new_item_defaults() {
        let item = BatchItem::new(Method::Get, URL, HashMap::new());
        assert_eq!(item.iterations(), 1);
        assert_eq!(item.delay(), Duration::ZERO);
        assert_eq!(item.iterations_done(), 0);
        assert!(item.body().is_empty());
        assert!(!item.has_dedicated_output());
    }

    #[test]
    fn ids_are_unique() {
        let a = BatchItem::new(Method::Get, URL, HashMap::new());
        let b = BatchItem::new(Method::Get, URL, HashMap::new());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn zero_iterations_are_clamped() {
        let item = BatchItem::new(Method::Get, URL, HashMap::new()).with_iterations(0);
        assert_eq!(item.iterations(), 1);
    }

    #[tokio::test]
    async fn frames_follow_iteration_order_on_default_sink() {
        let executor = EchoExecutor::new();
        let (tx, mut rx) = channel(4);
        let mut item = BatchItem::new(Method::Get, URL, HashMap::new())
            .with_iterations(4)
            .with_delay(Duration::from_nanos(1));

        item.execute(&executor, Some(&tx)).await.unwrap();
        drop(tx);

        let mut seen = Vec::new();
        while let Some(frame) = rx.recv().await {
            assert!(frame.is_ok());
            assert_eq!(frame.item_id, item.id());
            assert_eq!(frame.headers["x-seq"], vec![frame.iteration.to_string()]);
            seen.push(frame.iteration);
        }
        assert_eq!(seen, vec![0, 1, 2, 3]);
        assert_eq!(item.iterations_done(), 4);
    }

    #[tokio::test]
    async fn dedicated_output_bypasses_default_and_is_closed() {
        let executor = EchoExecutor::new();
        let (shared_tx, mut shared_rx) = channel(8);
        let (output, mut own_rx) = ItemOutput::channel("PUT", 1);
        let mut item = BatchItem::new(Method::Put, URL, HashMap::new())
            .with_iterations(3)
            .with_output(output);

        let consumer = tokio::spawn(async move {
            let mut bodies = Vec::new();
            while let Some(frame) = own_rx.recv().await {
                bodies.push(frame.text().into_owned());
            }
            bodies
        });

        item.execute(&executor, Some(&shared_tx)).await.unwrap();
        drop(shared_tx);

        assert_eq!(consumer.await.unwrap(), vec!["PUT"; 3]);
        assert!(shared_rx.recv().await.is_none());
        assert!(item.output().unwrap().is_closed());
    }

    #[tokio::test]
    async fn failure_does_not_stop_remaining_iterations() {
        let executor = EchoExecutor::new().failing_on(URL, 1);
        let (tx, mut rx) = channel(3);
        let mut item = BatchItem::new(Method::Get, URL, HashMap::new()).with_iterations(3);

        item.execute(&executor, Some(&tx)).await.unwrap();
        drop(tx);

        let mut frames = Vec::new();
        while let Some(frame) = rx.recv().await {
            frames.push(frame);
        }
        assert_eq!(frames.len(), 3);
        assert!(frames[0].is_ok());
        assert!(matches!(frames[1].error, Some(Error::Client(_))));
        assert!(frames[1].data.is_empty() && frames[1].headers.is_empty());
        assert!(frames[2].is_ok());
        assert_eq!(executor.calls().len(), 3);
    }

    #[tokio::test]
    async fn missing_output_is_rejected_before_any_request() {
        let executor = EchoExecutor::new();
        let mut item = BatchItem::new(Method::Get, URL, HashMap::new()).with_iterations(2);

        let err = item.execute(&executor, None).await.unwrap_err();
        assert!(matches!(err, Error::NoOutput(id) if id == item.id()));
        assert!(executor.calls().is_empty());
        assert_eq!(item.iterations_done(), 0);
    }

    #[tokio::test]
    async fn closed_dedicated_output_is_rejected_on_rerun() {
        let executor = EchoExecutor::new();
        let (output, _rx) = ItemOutput::channel("once", 1);
        let mut item = BatchItem::new(Method::Get, URL, HashMap::new()).with_output(output);

        item.execute(&executor, None).await.unwrap();
        let err = item.execute(&executor, None).await.unwrap_err();
        assert!(matches!(err, Error::OutputClosed { output, .. } if output == "once"));
        assert_eq!(executor.calls().len(), 1);
    }

    #[tokio::test]
    async fn dropped_receiver_does_not_abort_loop() {
        let executor = EchoExecutor::new();
        let (tx, rx) = channel(1);
        drop(rx);
        let mut item = BatchItem::new(Method::Get, URL, HashMap::new()).with_iterations(2);

        item.execute(&executor, Some(&tx)).await.unwrap();
        assert_eq!(item.iterations_done(), 2);
        assert_eq!(executor.calls().len(), 2);
    }

    #[tokio::test]
    async fn body_is_passed_to_executor() {
        let executor = EchoExecutor::new();
        let (tx, _rx) = channel(1);
        let mut item = BatchItem::new(Method::Post, URL, HashMap::new()).with_body("payload");

        item.execute(&executor, Some(&tx)).await.unwrap();
        let calls = executor.calls();
        assert_eq!(calls[0].0, Method::Post);
        assert_eq!(calls[0].2, Body::text("payload"));
    }

    #[tokio::test(start_paused = true)]
    async fn delay_separates_iterations_but_not_the_last() {
        let executor = EchoExecutor::new();
        let (tx, _rx) = channel(3);
        let mut item = BatchItem::new(Method::Get, URL, HashMap::new())
            .with_iterations(3)
            .with_delay(Duration::from_secs(1));

        let started = tokio::time::Instant::now();
        item.execute(&executor, Some(&tx)).await.unwrap();
        assert_eq!(started.elapsed(), Duration::from_secs(2));
        assert_eq!(item.iterations_done(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn single_iteration_never_sleeps() {
        let executor = EchoExecutor::new();
        let (tx, _rx) = channel(1);
        let mut item =
            BatchItem::new(Method::Get, URL, HashMap::new()).with_delay(Duration::from_secs(5));

        let started = tokio::time::Instant::now();
        item.execute(&executor, Some(&tx)).await.unwrap();
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn clone_does_not_hold_dedicated_output_open() {
        let executor = EchoExecutor::new();
        let (output, mut rx) = ItemOutput::channel("own", 2);
        let mut item = BatchItem::new(Method::Get, URL, HashMap::new())
            .with_iterations(2)
            .with_output(output);

        let copy = item.clone();
        assert_eq!(copy.id(), item.id());
        assert!(!copy.has_dedicated_output());

        item.execute(&executor, None).await.unwrap();
        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_none());
        drop(copy);
    }
}
