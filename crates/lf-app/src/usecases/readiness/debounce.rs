//! Debounced input: collect rapid triggers within a window, emit once.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::trace;

/// Collects items pushed within `window` of the first one and forwards them
/// as a single batch.
///
/// The window is fixed from the first trigger, so a steady stream of events
/// still flushes at least once per window.
pub struct Debouncer<T> {
    input: mpsc::UnboundedSender<T>,
    task: JoinHandle<()>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Spawn the collector. Each batch is passed through `wrap` and sent to
    /// `sink`; the task ends when the sink closes or the debouncer drops.
    pub fn spawn<O, W>(window: Duration, sink: mpsc::Sender<O>, wrap: W) -> Self
    where
        O: Send + 'static,
        W: Fn(Vec<T>) -> O + Send + 'static,
    {
        let (input, mut rx) = mpsc::unbounded_channel::<T>();

        let task = tokio::spawn(async move {
            while let Some(first) = rx.recv().await {
                let deadline = Instant::now() + window;
                let mut batch = vec![first];

                loop {
                    tokio::select! {
                        _ = tokio::time::sleep_until(deadline) => break,
                        next = rx.recv() => match next {
                            Some(item) => batch.push(item),
                            None => break,
                        },
                    }
                }

                trace!(items = batch.len(), "debounce window flushed");
                if sink.send(wrap(batch)).await.is_err() {
                    break;
                }
            }
        });

        Self { input, task }
    }

    pub fn push(&self, item: T) {
        // Closed only after the sink went away; nothing left to notify.
        let _ = self.input.send(item);
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}
