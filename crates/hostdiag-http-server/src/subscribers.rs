//! Subscriber registry for the stream transport
//!
//! Each subscriber owns a bounded queue. Publishing offers the payload to every
//! queue without waiting: a full queue loses that one message, a closed queue is
//! removed. Membership lives behind a single mutex that is never held across
//! an await point.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;

pub type SubscriberId = u64;

/// Outcome of one publish call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Queued for delivery
    pub delivered: usize,
    /// Skipped because the subscriber's queue was full
    pub dropped: usize,
    /// Subscribers found closed and deregistered
    pub removed: usize,
}

struct Inner {
    next_id: AtomicU64,
    buffer_size: usize,
    subscribers: Mutex<HashMap<SubscriberId, mpsc::Sender<String>>>,
}

/// Shared set of live subscribers. Cloning is cheap and all clones see the
/// same membership.
#[derive(Clone)]
pub struct SubscriberRegistry {
    inner: Arc<Inner>,
}

impl SubscriberRegistry {
    /// Create a registry whose subscriber queues hold `buffer_size` messages
    pub fn new(buffer_size: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                next_id: AtomicU64::new(1),
                buffer_size: buffer_size.max(1),
                subscribers: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Register a new subscriber. It is deregistered when the returned
    /// [`Subscription`] is dropped.
    pub fn subscribe(&self) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.inner.buffer_size);
        let count = {
            let mut subscribers = self.inner.subscribers.lock();
            subscribers.insert(id, sender);
            subscribers.len()
        };
        debug!("Subscriber {} registered ({} active)", id, count);

        Subscription {
            id,
            receiver,
            registry: Arc::clone(&self.inner),
        }
    }

    /// Offer `payload` to every subscriber without blocking
    pub fn publish(&self, payload: &str) -> PublishReport {
        let mut report = PublishReport::default();
        let mut subscribers = self.inner.subscribers.lock();

        subscribers.retain(|id, sender| match sender.try_send(payload.to_owned()) {
            Ok(()) => {
                report.delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                debug!("Subscriber {} queue full, message dropped", id);
                report.dropped += 1;
                true
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Subscriber {} closed, removing", id);
                report.removed += 1;
                false
            }
        });

        report
    }

    pub fn len(&self) -> usize {
        self.inner.subscribers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("subscribers", &self.len())
            .field("buffer_size", &self.inner.buffer_size)
            .finish()
    }
}

/// Receiving end of one subscriber
pub struct Subscription {
    id: SubscriberId,
    receiver: mpsc::Receiver<String>,
    registry: Arc<Inner>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Next published payload
    pub async fn recv(&mut self) -> Option<String> {
        self.receiver.recv().await
    }

    /// Next payload if one is already queued
    pub fn try_recv(&mut self) -> Option<String> {
        self.receiver.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let count = {
            let mut subscribers = self.registry.subscribers.lock();
            subscribers.remove(&self.id);
            subscribers.len()
        };
        debug!("Subscriber {} deregistered ({} active)", self.id, count);
    }
}
