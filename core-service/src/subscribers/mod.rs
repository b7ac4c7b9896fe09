//! Subscribers Module - Live fan-out
//!
//! Subscribers register independently of the pipeline. Delivery never blocks
//! the producer: a subscriber that cannot accept a message is removed after
//! the fan-out pass.

pub mod message;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;

pub use message::{InitKind, InitMessage, Snapshot, StreamMessage};

pub type SubscriberId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("subscriber queue full")]
    Full,
    #[error("subscriber disconnected")]
    Closed,
}

/// Opaque live-delivery sink. Must not block.
pub trait Subscriber: Send + Sync {
    fn deliver(&self, message: &Arc<StreamMessage>) -> Result<(), DeliveryError>;
}

/// Bounded channel sink; the receiving half is drained by the connection task
pub struct ChannelSubscriber {
    tx: mpsc::Sender<Arc<StreamMessage>>,
}

impl ChannelSubscriber {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Arc<StreamMessage>>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl Subscriber for ChannelSubscriber {
    fn deliver(&self, message: &Arc<StreamMessage>) -> Result<(), DeliveryError> {
        self.tx.try_send(Arc::clone(message)).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::Full,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

#[derive(Default)]
pub struct SubscriberRegistry {
    subscribers: RwLock<HashMap<SubscriberId, Arc<dyn Subscriber>>>,
    next_id: AtomicU64,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver the init message built by `init`, then start delivering
    /// broadcasts. Holding the write lock orders registration against
    /// `publish`, so no event is missed or seen twice.
    pub fn register<F>(&self, subscriber: Arc<dyn Subscriber>, init: F) -> Result<SubscriberId, DeliveryError>
    where
        F: FnOnce() -> StreamMessage,
    {
        let mut subscribers = self.subscribers.write();

        subscriber.deliver(&Arc::new(init()))?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        subscribers.insert(id, subscriber);
        log::debug!("Subscriber {} registered ({} active)", id, subscribers.len());
        Ok(id)
    }

    pub fn unregister(&self, id: SubscriberId) -> bool {
        let removed = self.subscribers.write().remove(&id).is_some();
        if removed {
            log::debug!("Subscriber {} unregistered", id);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.subscribers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.read().is_empty()
    }

    pub fn broadcast(&self, message: StreamMessage) -> usize {
        self.publish(|| ((), message)).1
    }

    /// Run `commit` and snapshot the subscriber list in one read section,
    /// then deliver its message to every subscriber in the snapshot.
    /// Returns the commit's value and the number of successful deliveries.
    pub fn publish<T, F>(&self, commit: F) -> (T, usize)
    where
        F: FnOnce() -> (T, StreamMessage),
    {
        let (value, message, targets) = {
            let subscribers = self.subscribers.read();
            let (value, message) = commit();
            let targets: Vec<(SubscriberId, Arc<dyn Subscriber>)> = subscribers.iter()
                .map(|(id, s)| (*id, Arc::clone(s)))
                .collect();
            (value, Arc::new(message), targets)
        };

        let mut failed = Vec::new();
        for (id, subscriber) in &targets {
            if let Err(e) = subscriber.deliver(&message) {
                log::warn!("Dropping subscriber {}: {}", id, e);
                failed.push(*id);
            }
        }

        if !failed.is_empty() {
            let mut subscribers = self.subscribers.write();
            for id in &failed {
                subscribers.remove(id);
            }
        }

        (value, targets.len() - failed.len())
    }
}
