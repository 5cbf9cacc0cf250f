use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use crossbeam_channel::Receiver;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::observable::ObservableState;

/// Unique identifier for a change subscription.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    /// Create a new random subscription id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What happened to the collection.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CollectionChange<T> {
    Added { index: usize, item: T },
    Removed { index: usize, item: T },
    /// The collection was cleared.
    Reset,
}

/// A change notification delivered to a [`ChangeStream`].
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeEvent<T> {
    /// Monotonic per-collection sequence number, starting at 1.
    pub sequence: u64,
    pub at: DateTime<Utc>,
    pub change: CollectionChange<T>,
}

impl<T> ChangeEvent<T> {
    /// The item added or removed, if any.
    pub fn item(&self) -> Option<&T> {
        match &self.change {
            CollectionChange::Added { item, .. } | CollectionChange::Removed { item, .. } => {
                Some(item)
            }
            CollectionChange::Reset => None,
        }
    }
}

/// A subscription to an observable collection's changes.
///
/// Events are sent inside the mutating call, so they are already queued when
/// that call returns. Dropping the stream unsubscribes.
pub struct ChangeStream<T> {
    subscription_id: SubscriptionId,
    rx: Receiver<ChangeEvent<T>>,
    state: Weak<RwLock<ObservableState<T>>>,
    unregistered: AtomicBool,
}

impl<T> ChangeStream<T> {
    pub(crate) fn new(
        subscription_id: SubscriptionId,
        rx: Receiver<ChangeEvent<T>>,
        state: Weak<RwLock<ObservableState<T>>>,
    ) -> Self {
        Self {
            subscription_id,
            rx,
            state,
            unregistered: AtomicBool::new(false),
        }
    }

    /// The subscription id backing this stream.
    #[must_use]
    pub const fn subscription_id(&self) -> SubscriptionId {
        self.subscription_id
    }

    /// Next queued event, without blocking.
    pub fn try_recv(&self) -> Option<ChangeEvent<T>> {
        self.rx.try_recv().ok()
    }

    /// Next event, waiting at most `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<ChangeEvent<T>> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// All queued events, oldest first.
    pub fn drain(&self) -> Vec<ChangeEvent<T>> {
        self.rx.try_iter().collect()
    }

    /// Number of queued events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Explicit unregistration. Idempotent; queued events stay readable.
    pub fn unsubscribe(&self) {
        if self.unregistered.swap(true, Ordering::AcqRel) {
            return;
        }

        let Some(state) = self.state.upgrade() else {
            return;
        };
        // A poisoned collection can no longer deliver events anyway.
        if let Ok(mut guard) = state.write() {
            guard.subscribers.remove(&self.subscription_id);
        };
    }
}

impl<T> fmt::Debug for ChangeStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeStream")
            .field("subscription_id", &self.subscription_id)
            .field("queued", &self.rx.len())
            .finish()
    }
}

impl<T> Drop for ChangeStream<T> {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

pub(crate) type Subscribers<T> = HashMap<SubscriptionId, crossbeam_channel::Sender<ChangeEvent<T>>>;
