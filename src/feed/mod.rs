//! Notification Feed
//!
//! Consumer side of the dispatcher: turns pushed events into store mutations.
//!
//! | event | store mutation |
//! |---|---|
//! | `notification_created`, `notification` | add |
//! | `notification_updated` | merge partial fields |
//! | `notification_deleted` | remove |
//! | `unread_count` | set counter |
//!
//! The feed owns no transport state. It registers listeners on attach and
//! removes them on detach; the socket outlives any number of feeds.

mod store;

pub use store::{NotificationStore, StoreState};

use crate::connection::{ConnectionManager, ConnectionStatus};
use crate::dispatcher::{Event, EventKind, Subscription};

const FEED_EVENTS: [EventKind; 5] = [
    EventKind::NotificationCreated,
    EventKind::NotificationUpdated,
    EventKind::NotificationDeleted,
    EventKind::UnreadCount,
    EventKind::Notification,
];

/// Listener set binding a [`NotificationStore`] to a connection
pub struct NotificationFeed {
    connection: ConnectionManager,
    store: NotificationStore,
    subscriptions: Vec<Subscription>,
}

impl NotificationFeed {
    /// Register the store's listeners on the connection's dispatcher
    ///
    /// Attaching twice without detaching registers twice.
    pub fn attach(connection: &ConnectionManager, store: NotificationStore) -> Self {
        let subscriptions = FEED_EVENTS
            .iter()
            .map(|&kind| {
                let store = store.clone();
                connection.on(kind, move |event| apply(&store, event))
            })
            .collect();

        tracing::debug!(listeners = FEED_EVENTS.len(), "Notification feed attached");

        Self {
            connection: connection.clone(),
            store,
            subscriptions,
        }
    }

    pub fn store(&self) -> &NotificationStore {
        &self.store
    }

    pub async fn connect(&self) {
        self.connection.connect().await;
    }

    pub fn disconnect(&self) {
        self.connection.disconnect();
    }

    pub fn status(&self) -> ConnectionStatus {
        self.connection.status()
    }

    /// Remove every listener this feed registered. The socket stays open.
    pub fn detach(self) -> NotificationStore {
        for subscription in self.subscriptions {
            subscription.unsubscribe();
        }
        tracing::debug!("Notification feed detached");
        self.store
    }
}

fn apply(store: &NotificationStore, event: &Event) {
    match event {
        Event::NotificationCreated(notification) | Event::Notification(notification) => {
            store.add(notification.clone());
        }
        Event::NotificationUpdated(update) => match (update.id(), update.updates()) {
            (Some(id), Some(updates)) => {
                store.update(&id, updates);
            }
            (Some(id), None) => {
                tracing::debug!(id = %id, "Update without changed fields ignored");
            }
            (None, _) => tracing::warn!("Notification update without id ignored"),
        },
        Event::NotificationDeleted(deleted) => match deleted.id() {
            Some(id) => {
                store.remove(&id);
            }
            None => tracing::warn!("Notification delete without id ignored"),
        },
        Event::UnreadCount(count) => match count.value() {
            Some(value) => store.set_unread_count(value),
            None => tracing::warn!(payload = %count.as_value(), "Unread count is not a number"),
        },
        _ => {}
    }
}
