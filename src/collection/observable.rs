use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use chrono::Utc;
use crossbeam_channel::{bounded, unbounded, TrySendError};

use crate::error::{lock_err, MockResult};

use super::stream::{ChangeEvent, ChangeStream, CollectionChange, SubscriptionId, Subscribers};
use super::traits::{BackingStore, ObservableContainer};

pub(crate) struct ObservableState<T> {
    items: Vec<T>,
    sequence: u64,
    pub(crate) subscribers: Subscribers<T>,
}

impl<T: Clone> ObservableState<T> {
    /// Fan one change out to every subscriber. Disconnected streams are pruned;
    /// full bounded streams lose the event and bump `dropped`.
    fn notify(&mut self, change: CollectionChange<T>, dropped: &AtomicU64) {
        self.sequence += 1;
        if self.subscribers.is_empty() {
            return;
        }

        let event = ChangeEvent {
            sequence: self.sequence,
            at: Utc::now(),
            change,
        };

        let mut disconnected = Vec::new();
        for (id, tx) in &self.subscribers {
            match tx.try_send(event.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    dropped.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(subscription = %id, sequence = event.sequence, "change stream full, event dropped");
                }
                Err(TrySendError::Disconnected(_)) => disconnected.push(*id),
            }
        }
        for id in disconnected {
            self.subscribers.remove(&id);
        }
    }
}

/// A shared, ordered collection that reports every change to its subscribers.
///
/// Clones are handles to the same collection. This is the default backing
/// store of a mock set; bind one explicitly to observe changes made through a
/// set while also holding the collection yourself.
///
/// # Examples
///
/// ```
/// use mockset::{CollectionChange, ObservableCollection};
///
/// let names = ObservableCollection::new();
/// let stream = names.subscribe().unwrap();
/// names.push("a".to_string()).unwrap();
///
/// let event = stream.try_recv().unwrap();
/// assert!(matches!(event.change, CollectionChange::Added { index: 0, .. }));
/// ```
pub struct ObservableCollection<T> {
    state: Arc<RwLock<ObservableState<T>>>,
    stream_capacity: Option<usize>,
    dropped_events: Arc<AtomicU64>,
}

impl<T> Clone for ObservableCollection<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            stream_capacity: self.stream_capacity,
            dropped_events: Arc::clone(&self.dropped_events),
        }
    }
}

impl<T> Default for ObservableCollection<T> {
    fn default() -> Self {
        Self::with_stream_capacity(Vec::new(), None)
    }
}

impl<T> ObservableCollection<T> {
    /// Create an empty collection with unbounded change streams.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a collection holding `items`. `stream_capacity` bounds each
    /// subscriber's buffer; `None` means unbounded.
    #[must_use]
    pub fn with_stream_capacity(items: Vec<T>, stream_capacity: Option<usize>) -> Self {
        Self {
            state: Arc::new(RwLock::new(ObservableState {
                items,
                sequence: 0,
                subscribers: Subscribers::new(),
            })),
            stream_capacity,
            dropped_events: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Events lost because a bounded stream was full.
    #[must_use]
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    /// True if both handles refer to the same collection.
    #[must_use]
    pub fn same_collection(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    pub fn len(&self) -> MockResult<usize> {
        let state = self.state.read().map_err(|_| lock_err("observable.len"))?;
        Ok(state.items.len())
    }

    pub fn is_empty(&self) -> MockResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Open a change stream.
    pub fn subscribe(&self) -> MockResult<ChangeStream<T>> {
        let mut state = self.state.write().map_err(|_| lock_err("observable.subscribe"))?;
        let (tx, rx) = match self.stream_capacity {
            Some(cap) => bounded(cap.max(1)),
            None => unbounded(),
        };
        let id = SubscriptionId::new();
        state.subscribers.insert(id, tx);
        tracing::debug!(subscription = %id, "change stream opened");
        Ok(ChangeStream::new(id, rx, Arc::downgrade(&self.state)))
    }

    pub fn subscriber_count(&self) -> MockResult<usize> {
        let state = self.state.read().map_err(|_| lock_err("observable.subscriber_count"))?;
        Ok(state.subscribers.len())
    }
}

impl<T: Clone> ObservableCollection<T> {
    /// Create a collection holding `items`, with unbounded change streams.
    #[must_use]
    pub fn from_vec(items: Vec<T>) -> Self {
        Self::with_stream_capacity(items, None)
    }

    pub fn get(&self, index: usize) -> MockResult<Option<T>> {
        let state = self.state.read().map_err(|_| lock_err("observable.get"))?;
        Ok(state.items.get(index).cloned())
    }

    pub fn to_vec(&self) -> MockResult<Vec<T>> {
        let state = self.state.read().map_err(|_| lock_err("observable.to_vec"))?;
        Ok(state.items.clone())
    }

    pub fn push(&self, item: T) -> MockResult<()> {
        let mut state = self.state.write().map_err(|_| lock_err("observable.push"))?;
        let index = state.items.len();
        state.items.push(item.clone());
        state.notify(CollectionChange::Added { index, item }, &self.dropped_events);
        Ok(())
    }

    /// Insert at `index`, clamped to the current length.
    pub fn insert(&self, index: usize, item: T) -> MockResult<()> {
        let mut state = self.state.write().map_err(|_| lock_err("observable.insert"))?;
        let index = index.min(state.items.len());
        state.items.insert(index, item.clone());
        state.notify(CollectionChange::Added { index, item }, &self.dropped_events);
        Ok(())
    }

    /// Remove every element, emitting a single `Reset`.
    pub fn clear(&self) -> MockResult<()> {
        let mut state = self.state.write().map_err(|_| lock_err("observable.clear"))?;
        state.items.clear();
        state.notify(CollectionChange::Reset, &self.dropped_events);
        Ok(())
    }
}

impl<T: Clone + PartialEq> ObservableCollection<T> {
    /// Remove the first element equal to `item`. No event when absent.
    pub fn remove(&self, item: &T) -> MockResult<bool> {
        let mut state = self.state.write().map_err(|_| lock_err("observable.remove"))?;
        let Some(index) = state.items.iter().position(|x| x == item) else {
            return Ok(false);
        };
        let removed = state.items.remove(index);
        state.notify(
            CollectionChange::Removed {
                index,
                item: removed,
            },
            &self.dropped_events,
        );
        Ok(true)
    }
}

impl<T: Clone> FromIterator<T> for ObservableCollection<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl<T> fmt::Debug for ObservableCollection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableCollection")
            .field("len", &self.len().ok())
            .field("stream_capacity", &self.stream_capacity)
            .finish_non_exhaustive()
    }
}

impl<T> BackingStore<T> for ObservableCollection<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn push(&self, item: T) -> MockResult<()> {
        ObservableCollection::push(self, item)
    }

    fn remove_first(&self, item: &T) -> MockResult<bool> {
        self.remove(item)
    }

    fn to_vec(&self) -> MockResult<Vec<T>> {
        ObservableCollection::to_vec(self)
    }

    fn len(&self) -> MockResult<usize> {
        ObservableCollection::len(self)
    }

    fn shared_state_addr(&self) -> Option<usize> {
        Some(Arc::as_ptr(&self.state).cast::<()>() as usize)
    }

    fn scan(&self, visit: &mut dyn FnMut(&T) -> MockResult<bool>) -> MockResult<Option<T>> {
        let state = self.state.read().map_err(|_| lock_err("observable.scan"))?;
        for item in &state.items {
            if visit(item)? {
                return Ok(Some(item.clone()));
            }
        }
        Ok(None)
    }

    fn as_observable(self: Arc<Self>) -> Option<Arc<dyn ObservableContainer<T>>> {
        Some(self)
    }
}

impl<T> ObservableContainer<T> for ObservableCollection<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn subscribe(&self) -> MockResult<ChangeStream<T>> {
        ObservableCollection::subscribe(self)
    }

    fn subscriber_count(&self) -> MockResult<usize> {
        ObservableCollection::subscriber_count(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_remove_notify_in_order() {
        let coll = ObservableCollection::new();
        let stream = coll.subscribe().unwrap();

        coll.push(1).unwrap();
        coll.push(2).unwrap();
        assert!(coll.remove(&1).unwrap());
        assert!(!coll.remove(&42).unwrap());

        let events = stream.drain();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].change, CollectionChange::Added { index: 0, item: 1 });
        assert_eq!(events[1].change, CollectionChange::Added { index: 1, item: 2 });
        assert_eq!(events[2].change, CollectionChange::Removed { index: 0, item: 1 });
        assert!(events.windows(2).all(|w| w[0].sequence < w[1].sequence));
        assert_eq!(coll.to_vec().unwrap(), vec![2]);
    }

    #[test]
    fn clones_share_state_and_subscribers() {
        let a = ObservableCollection::new();
        let b = a.clone();
        let stream = a.subscribe().unwrap();

        b.push("x".to_string()).unwrap();
        assert!(a.same_collection(&b));
        assert_eq!(a.len().unwrap(), 1);
        assert_eq!(stream.try_recv().unwrap().item(), Some(&"x".to_string()));
    }

    #[test]
    fn clear_emits_reset() {
        let coll: ObservableCollection<i32> = vec![1, 2, 3].into_iter().collect();
        let stream = coll.subscribe().unwrap();
        coll.clear().unwrap();
        assert!(coll.is_empty().unwrap());
        assert_eq!(stream.try_recv().unwrap().change, CollectionChange::Reset);
    }

    #[test]
    fn insert_clamps_index() {
        let coll = ObservableCollection::from_vec(vec![1, 2]);
        coll.insert(99, 3).unwrap();
        coll.insert(0, 0).unwrap();
        assert_eq!(coll.to_vec().unwrap(), vec![0, 1, 2, 3]);
        assert_eq!(coll.get(3).unwrap(), Some(3));
    }

    #[test]
    fn dropped_stream_unsubscribes() {
        let coll = ObservableCollection::new();
        let stream = coll.subscribe().unwrap();
        let other = coll.subscribe().unwrap();
        assert_eq!(coll.subscriber_count().unwrap(), 2);

        drop(stream);
        assert_eq!(coll.subscriber_count().unwrap(), 1);

        other.unsubscribe();
        other.unsubscribe();
        assert_eq!(coll.subscriber_count().unwrap(), 0);
        coll.push(1).unwrap();
        assert!(other.is_empty());
    }

    #[test]
    fn bounded_stream_counts_dropped_events() {
        let coll = ObservableCollection::with_stream_capacity(Vec::new(), Some(1));
        let stream = coll.subscribe().unwrap();
        coll.push(1).unwrap();
        coll.push(2).unwrap();
        coll.push(3).unwrap();

        assert_eq!(stream.len(), 1);
        assert_eq!(coll.dropped_events(), 2);
    }

    #[test]
    fn exposes_itself_as_observable() {
        let coll = Arc::new(ObservableCollection::<i32>::new());
        let observable = Arc::clone(&coll).as_observable().unwrap();
        let stream = observable.subscribe().unwrap();
        coll.push(5).unwrap();
        assert_eq!(stream.try_recv().unwrap().item(), Some(&5));
    }
}
