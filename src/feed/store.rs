//! Notification Store
//!
//! Local notification list and unread counter kept in sync by server pushes.

use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::protocol::{Notification, NotificationId};

/// Shared notification state
///
/// Cloning yields another handle to the same state.
#[derive(Debug, Clone, Default)]
pub struct NotificationStore {
    inner: Arc<RwLock<StoreState>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreState {
    /// Newest first
    pub notifications: Vec<Notification>,
    /// Last value pushed by the server. Not derived from `notifications`.
    pub unread_count: u64,
}

impl NotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert at the front, or replace in place if the id is already present
    ///
    /// A notification without a usable id is always inserted.
    pub fn add(&self, notification: Notification) {
        let mut state = self.write();
        let index = notification
            .id()
            .and_then(|id| state.notifications.iter().position(|n| n.has_id(&id)));
        match index {
            Some(index) => state.notifications[index] = notification,
            None => state.notifications.insert(0, notification),
        }
    }

    /// Merge partial fields into a stored notification
    ///
    /// Returns `false` for an unknown id.
    pub fn update(&self, id: &NotificationId, updates: &Map<String, Value>) -> bool {
        let mut state = self.write();
        match state.notifications.iter_mut().find(|n| n.has_id(id)) {
            Some(existing) => {
                existing.apply_updates(updates);
                true
            }
            None => {
                tracing::debug!(id = %id, "Update for unknown notification ignored");
                false
            }
        }
    }

    /// Returns the removed notification, if it was present
    pub fn remove(&self, id: &NotificationId) -> Option<Notification> {
        let mut state = self.write();
        let index = state.notifications.iter().position(|n| n.has_id(id))?;
        Some(state.notifications.remove(index))
    }

    pub fn set_unread_count(&self, count: u64) {
        self.write().unread_count = count;
    }

    pub fn unread_count(&self) -> u64 {
        self.read().unread_count
    }

    pub fn get(&self, id: &NotificationId) -> Option<Notification> {
        self.read().notifications.iter().find(|n| n.has_id(id)).cloned()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.read().notifications.clone()
    }

    pub fn len(&self) -> usize {
        self.read().notifications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().notifications.is_empty()
    }

    pub fn snapshot(&self) -> StoreState {
        self.read().clone()
    }

    pub fn clear(&self) {
        let mut state = self.write();
        state.notifications.clear();
        state.unread_count = 0;
    }
}
