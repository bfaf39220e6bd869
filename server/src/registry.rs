//! Registry of live push-channel subscribers with fan-out publish.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

/// JSON message pushed to subscribers: `{type?, msg?, move?, pgn?, fen?}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PushMessage {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(rename = "move", skip_serializing_if = "Option::is_none")]
    pub mv: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pgn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fen: Option<String>,
}

impl PushMessage {
    /// Text-only notice, e.g. "Thinking..".
    pub fn notice(msg: impl Into<String>) -> Self {
        Self {
            msg: Some(msg.into()),
            ..Self::default()
        }
    }
}

/// Messages buffered per subscriber. A subscriber that falls this far behind
/// misses messages until it catches up.
pub const SUBSCRIBER_BUFFER: usize = 64;

type Outbox = mpsc::Sender<Arc<PushMessage>>;

/// Thread-safe set of subscribers. Connect and disconnect happen on
/// arbitrary connection tasks; publish comes from the display dispatcher.
#[derive(Default)]
pub struct BroadcastRegistry {
    subscribers: Mutex<HashMap<Uuid, Outbox>>,
}

impl BroadcastRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Outbox>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new subscriber. Dropping the returned handle unsubscribes it.
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        let count = {
            let mut subscribers = self.lock();
            subscribers.insert(id, tx);
            subscribers.len()
        };
        tracing::debug!(subscriber = %id, count, "Subscriber added");
        Subscription {
            id,
            rx,
            registry: Arc::clone(self),
        }
    }

    /// Remove a subscriber. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: Uuid) -> bool {
        let removed = self.lock().remove(&id).is_some();
        if removed {
            tracing::debug!(subscriber = %id, "Subscriber removed");
        }
        removed
    }

    /// Deliver `message` to every subscriber registered at the moment of the
    /// call. Never waits: a full or closed outbox is logged and skipped
    /// without affecting the others.
    /// Returns the number of subscribers that accepted the message.
    pub fn publish(&self, message: PushMessage) -> usize {
        let targets: Vec<(Uuid, Outbox)> = self
            .lock()
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect();

        let message = Arc::new(message);
        let mut delivered = 0;
        for (id, tx) in targets {
            match tx.try_send(Arc::clone(&message)) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(subscriber = %id, "Subscriber is lagging, message dropped");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::warn!(subscriber = %id, "Delivery failed, subscriber is disconnecting");
                }
            }
        }
        tracing::trace!(delivered, "Published message");
        delivered
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Handle for one connected subscriber.
pub struct Subscription {
    id: Uuid,
    rx: mpsc::Receiver<Arc<PushMessage>>,
    registry: Arc<BroadcastRegistry>,
}

impl Subscription {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Next message for this subscriber, in publish order.
    pub async fn recv(&mut self) -> Option<Arc<PushMessage>> {
        self.rx.recv().await
    }

    /// Non-blocking variant of [`Self::recv`].
    pub fn try_recv(&mut self) -> Option<Arc<PushMessage>> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.registry.unsubscribe(self.id);
    }
}
