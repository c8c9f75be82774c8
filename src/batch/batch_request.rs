use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{info, warn};
use uuid::Uuid;

use crate::batch::output::{channel, OutputSender, OutputStream};
use crate::batch::BatchItem;
use crate::error::{Error, Result};
use crate::request::HttpExecutor;

/// A set of unique [`BatchItem`]s run concurrently, sharing one output.
#[derive(Debug)]
pub struct BatchRequest {
    items: Vec<BatchItem>,
    output: Option<OutputSender>,
    stream: Option<OutputStream>,
}

impl BatchRequest {
    /// With `init_output` the shared output is allocated now, buffered for
    /// every iteration of the batch, and its stream is available from
    /// [`take_output`](Self::take_output).
    pub fn new(items: Vec<BatchItem>, init_output: bool) -> Self {
        let mut batch = Self {
            items: Vec::with_capacity(items.len()),
            output: None,
            stream: None,
        };
        for item in items {
            batch.add(item);
        }
        if init_output {
            let (tx, rx) = channel(batch.total_iterations());
            batch.output = Some(tx);
            batch.stream = Some(rx);
        }
        batch
    }

    // Discards any stream allocated by `new`.
    pub fn set_output(&mut self, sender: OutputSender) {
        self.output = Some(sender);
        self.stream = None;
    }

    pub fn take_output(&mut self) -> Option<OutputStream> {
        self.stream.take()
    }

    pub fn has_output(&self) -> bool {
        self.output.is_some()
    }

    pub fn add(&mut self, item: BatchItem) -> bool {
        if self.contains(item.id()) {
            return false;
        }
        self.items.push(item);
        true
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.items.iter().any(|item| item.id() == id)
    }

    pub fn items(&self) -> &[BatchItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total_iterations(&self) -> usize {
        self.items.iter().map(BatchItem::iterations).sum()
    }

    /// Runs every item on its own task and returns once all of them finished
    /// and the shared output has been closed.
    ///
    /// Nothing is sent if an item has nowhere to write: either no dedicated
    /// output and no shared one ([`Error::NoOutput`]), or a dedicated output
    /// closed by an earlier run ([`Error::OutputClosed`]). Request failures
    /// never fail the batch; they are carried by the frames.
    pub async fn run_batch<E>(&mut self, executor: Arc<E>) -> Result<()>
    where
        E: HttpExecutor + ?Sized + 'static,
    {
        self.check_outputs()?;

        info!(
            items = self.items.len(),
            total_iterations = self.total_iterations(),
            "running batch"
        );

        let mut workers = JoinSet::new();
        let count = self.items.len();
        for (index, mut item) in std::mem::take(&mut self.items).into_iter().enumerate() {
            let executor = Arc::clone(&executor);
            let shared = self.output.clone();
            workers.spawn(async move {
                let result = item.execute(&*executor, shared.as_ref()).await;
                (index, item, result)
            });
        }

        let mut slots: Vec<Option<BatchItem>> = (0..count).map(|_| None).collect();
        let mut failure = None;
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok((index, item, result)) => {
                    if let Err(e) = result {
                        warn!(item = %item.id(), error = %e, "item did not run");
                        failure.get_or_insert(e);
                    }
                    slots[index] = Some(item);
                }
                Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                Err(e) => {
                    warn!(error = %e, "batch worker cancelled");
                    failure.get_or_insert(Error::Worker(e.to_string()));
                }
            }
        }
        self.items = slots.into_iter().flatten().collect();

        // Every worker has returned and dropped its clone, so this closes the stream.
        drop(self.output.take());

        info!(
            iterations_done = self.items.iter().map(BatchItem::iterations_done).sum::<usize>(),
            "batch finished"
        );
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn check_outputs(&self) -> Result<()> {
        for item in &self.items {
            match item.output() {
                Some(output) if output.is_closed() => {
                    return Err(Error::OutputClosed {
                        item: item.id(),
                        output: output.id().to_string(),
                    })
                }
                Some(_) => {}
                None if self.output.is_none() => return Err(Error::NoOutput(item.id())),
                None => {}
            }
        }
        Ok(())
    }
}
