//! Notification hub.
//!
//! Fans messages out to every connected browser. Each connection owns a
//! bounded queue; the hub only keeps the sending half, keyed by listener id.
//! Delivery is best-effort: a listener whose queue is full or whose reader
//! is gone is dropped from the registry during the broadcast that noticed it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};

/// Message that tells browsers to reload the page.
pub const RELOAD_MESSAGE: &str = "reload";

/// Default number of undelivered messages per listener.
pub const DEFAULT_LISTENER_CAPACITY: usize = 16;

/// Identity of a registered listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Receiving side of a hub registration.
///
/// Yields messages in broadcast order. Once the hub drops the registration
/// (unsubscribe or eviction) the remaining messages are drained and then
/// [`Listener::recv`] returns `None`.
#[derive(Debug)]
pub struct Listener {
    id: ListenerId,
    rx: mpsc::Receiver<Arc<str>>,
}

impl Listener {
    /// Registry key of this listener.
    #[must_use]
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Wait for the next message. Returns `None` once the queue is closed.
    pub async fn recv(&mut self) -> Option<Arc<str>> {
        self.rx.recv().await
    }

    /// Take the next message without waiting.
    pub fn try_recv(&mut self) -> Result<Arc<str>, TryRecvError> {
        self.rx.try_recv()
    }
}

/// Registry of live listeners with non-blocking fan-out.
///
/// `subscribe`, `unsubscribe` and `broadcast` may be called from any thread;
/// they are serialized by a single mutex around the registry.
#[derive(Debug)]
pub struct NotificationHub {
    listeners: Mutex<HashMap<ListenerId, mpsc::Sender<Arc<str>>>>,
    next_id: AtomicU64,
    capacity: usize,
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new(DEFAULT_LISTENER_CAPACITY)
    }
}

impl NotificationHub {
    /// Create a hub whose listeners queue up to `capacity` messages.
    ///
    /// A capacity of zero is treated as one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            listeners: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            capacity: capacity.max(1),
        }
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<ListenerId, mpsc::Sender<Arc<str>>>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new listener.
    pub fn subscribe(&self) -> Listener {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(self.capacity);
        self.registry().insert(id, tx);
        tracing::debug!(listener = id.0, "Listener subscribed");
        Listener { id, rx }
    }

    /// Remove a listener and close its queue.
    ///
    /// Returns `false` if the listener was already gone.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let removed = self.registry().remove(&id).is_some();
        if removed {
            tracing::debug!(listener = id.0, "Listener unsubscribed");
        }
        removed
    }

    /// Offer `message` to every listener without waiting.
    ///
    /// Listeners that can't take the message right now are evicted. Returns
    /// the number of listeners that received it.
    pub fn broadcast(&self, message: &str) -> usize {
        let message: Arc<str> = Arc::from(message);
        let mut listeners = self.registry();

        listeners.retain(|id, tx| match tx.try_send(Arc::clone(&message)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::debug!(listener = id.0, "Listener queue full, evicting");
                false
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(listener = id.0, "Listener disconnected, evicting");
                false
            }
        });

        listeners.len()
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.registry().len()
    }
}

/// A listener that unsubscribes itself when dropped.
#[derive(Debug)]
pub struct Subscription {
    hub: Arc<NotificationHub>,
    listener: Listener,
}

impl Subscription {
    /// Subscribe to `hub` for the lifetime of the returned value.
    #[must_use]
    pub fn new(hub: Arc<NotificationHub>) -> Self {
        let listener = hub.subscribe();
        Self { hub, listener }
    }

    /// Registry key of the underlying listener.
    #[must_use]
    pub fn id(&self) -> ListenerId {
        self.listener.id()
    }

    /// Wait for the next message. Returns `None` once the queue is closed.
    pub async fn recv(&mut self) -> Option<Arc<str>> {
        self.listener.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.unsubscribe(self.listener.id());
    }
}
