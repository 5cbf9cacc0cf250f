//! Backing-store capability traits.
//!
//! A mock set never touches a concrete collection type. It depends on
//! [`BackingStore`], and only gets change notifications when the store also
//! exposes [`ObservableContainer`] through [`BackingStore::as_observable`].

use std::sync::Arc;

use crate::error::MockResult;

use super::stream::ChangeStream;

/// An ordered, mutable collection of entities shared by handle.
///
/// Implementations are cheap-to-clone handles over shared state, so a caller
/// that binds a store to a set keeps seeing every mutation the set makes.
pub trait BackingStore<T>: Send + Sync {
    /// Append an element.
    fn push(&self, item: T) -> MockResult<()>;

    /// Remove the first element equal to `item`. Returns false if absent.
    fn remove_first(&self, item: &T) -> MockResult<bool>;

    /// Copy of all elements in iteration order.
    fn to_vec(&self) -> MockResult<Vec<T>>;

    /// Number of elements.
    fn len(&self) -> MockResult<usize>;

    /// True when the store holds no elements.
    fn is_empty(&self) -> MockResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Visit elements in order and return a copy of the first one `visit`
    /// accepts. An error from `visit` stops the scan.
    fn scan(&self, visit: &mut dyn FnMut(&T) -> MockResult<bool>) -> MockResult<Option<T>>;

    /// Address of the state shared by every handle to this store. Handles
    /// returning the same address are the same store. `None` when the
    /// store cannot tell.
    fn shared_state_addr(&self) -> Option<usize> {
        None
    }

    /// The same store viewed as an observable container, if it is one.
    fn as_observable(self: Arc<Self>) -> Option<Arc<dyn ObservableContainer<T>>> {
        None
    }
}

/// A backing store that notifies subscribers synchronously on every change.
pub trait ObservableContainer<T>: BackingStore<T> {
    /// Open a new change stream. Events sent before subscribing are not replayed.
    fn subscribe(&self) -> MockResult<ChangeStream<T>>;

    /// Number of live subscriptions.
    fn subscriber_count(&self) -> MockResult<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time test: ensure traits are object-safe
    fn _assert_backing_store_object_safe(_: &dyn BackingStore<String>) {}
    fn _assert_observable_container_object_safe(_: &dyn ObservableContainer<String>) {}
}
