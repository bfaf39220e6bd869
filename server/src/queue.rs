//! Unbounded multi-producer, single-consumer event queue.
//!
//! `enqueue` never blocks and never drops; `dequeue` suspends the consuming
//! dispatcher until an item is available. Items from one producer arrive in
//! the order they were enqueued.

use tokio::sync::mpsc;

/// Create a connected sender/queue pair.
pub fn channel<T>() -> (EventSender<T>, EventQueue<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender { tx }, EventQueue { rx })
}

/// Cloneable producer side. Safe to use from any thread.
pub struct EventSender<T> {
    tx: mpsc::UnboundedSender<T>,
}

impl<T> Clone for EventSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> EventSender<T> {
    /// Push an item. Fails only once the consumer is gone, returning the item.
    pub fn enqueue(&self, item: T) -> Result<(), QueueClosed<T>> {
        self.tx.send(item).map_err(|e| QueueClosed(e.0))
    }
}

/// Consumer side, owned by exactly one dispatcher.
pub struct EventQueue<T> {
    rx: mpsc::UnboundedReceiver<T>,
}

impl<T> EventQueue<T> {
    /// Wait for the next item. `None` once every sender has been dropped.
    pub async fn dequeue(&mut self) -> Option<T> {
        self.rx.recv().await
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Event queue consumer has shut down")]
pub struct QueueClosed<T>(pub T);
