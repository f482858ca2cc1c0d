//! Listener Registry
//!
//! Maps event kinds to registered callbacks and delivers emitted events.
//! Every emitted event is also published on a tokio broadcast channel for
//! async consumers.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};
use tokio::sync::broadcast;

use super::events::{Event, EventKind};

/// Unique identifier of one registration
pub type ListenerId = u64;

/// Callback invoked for each emitted event of the subscribed kind
pub type Listener = Arc<dyn Fn(&Event) + Send + Sync>;

const DEFAULT_STREAM_CAPACITY: usize = 256;

/// Typed publish/subscribe registry
///
/// Cloning yields another handle to the same registry.
#[derive(Clone)]
pub struct EventDispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// EventKind → registrations
    listeners: RwLock<HashMap<EventKind, Vec<(ListenerId, Listener)>>>,
    next_id: AtomicU64,
    stream_tx: broadcast::Sender<Event>,
}

impl DispatcherInner {
    fn remove(&self, kind: EventKind, id: ListenerId) -> bool {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let Some(registered) = listeners.get_mut(&kind) else {
            return false;
        };

        let before = registered.len();
        registered.retain(|(listener_id, _)| *listener_id != id);
        let removed = registered.len() < before;

        if registered.is_empty() {
            listeners.remove(&kind);
        }
        removed
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::with_stream_capacity(DEFAULT_STREAM_CAPACITY)
    }

    /// Create a dispatcher whose event stream buffers `capacity` events per receiver
    pub fn with_stream_capacity(capacity: usize) -> Self {
        let (stream_tx, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(DispatcherInner {
                listeners: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                stream_tx,
            }),
        }
    }

    /// Register `callback` for events of `kind`
    ///
    /// Every call creates a distinct registration, even for the same closure.
    /// The returned [`Subscription`] removes exactly this registration.
    pub fn on<F>(&self, kind: EventKind, callback: F) -> Subscription
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        self.inner
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(kind)
            .or_default()
            .push((id, Arc::new(callback)));

        tracing::trace!(event = %kind, listener_id = id, "Listener registered");

        Subscription {
            dispatcher: Arc::downgrade(&self.inner),
            kind,
            id,
        }
    }

    /// Deliver `event` to every listener registered for its kind
    ///
    /// Listeners run synchronously on the calling task. A panicking listener
    /// is logged and skipped; the remaining listeners still run.
    pub fn emit(&self, event: Event) {
        let kind = event.kind();

        // Snapshot so listeners may subscribe or unsubscribe while running
        let snapshot: Vec<(ListenerId, Listener)> = self
            .inner
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .cloned()
            .unwrap_or_default();

        for (id, listener) in &snapshot {
            let result = panic::catch_unwind(AssertUnwindSafe(|| listener(&event)));
            if let Err(cause) = result {
                tracing::error!(
                    event = %kind,
                    listener_id = id,
                    panic = %panic_message(&*cause),
                    "Listener panicked"
                );
            }
        }

        if !snapshot.is_empty() {
            tracing::trace!(event = %kind, listeners = snapshot.len(), "Event dispatched");
        }

        // No receivers is fine
        let _ = self.inner.stream_tx.send(event);
    }

    /// Receive every emitted event asynchronously
    ///
    /// Only events emitted after this call are observed. A receiver that falls
    /// behind by more than the stream capacity skips the oldest events.
    pub fn stream(&self) -> broadcast::Receiver<Event> {
        self.inner.stream_tx.subscribe()
    }

    /// Number of registrations for `kind`
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.inner
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// True when no listener is registered for any kind
    pub fn is_empty(&self) -> bool {
        self.inner
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

/// Handle to one listener registration
///
/// Dropping the handle leaves the listener registered; call
/// [`Subscription::unsubscribe`] to remove it.
#[derive(Debug)]
pub struct Subscription {
    dispatcher: Weak<DispatcherInner>,
    kind: EventKind,
    id: ListenerId,
}

impl Subscription {
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Remove the registration
    ///
    /// Returns false if it was already gone (or the dispatcher was dropped).
    pub fn unsubscribe(self) -> bool {
        let removed = self
            .dispatcher
            .upgrade()
            .map(|inner| inner.remove(self.kind, self.id))
            .unwrap_or(false);

        if removed {
            tracing::trace!(event = %self.kind, listener_id = self.id, "Listener removed");
        }
        removed
    }
}

fn panic_message(cause: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = cause.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = cause.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
