//! The entity-set contract that data-access code is written against.

use std::sync::Arc;

use futures_util::future::Ready;

use crate::collection::ObservableContainer;
use crate::error::MockResult;
use crate::key::KeyPart;
use crate::query::Query;

/// Operations of a queryable entity set.
///
/// Code under test takes `&dyn EntitySet<T>` (or a generic `S: EntitySet<T>`);
/// tests hand it a [`MockSet`](crate::MockSet).
pub trait EntitySet<T>: Send + Sync {
    /// Append `entity` to the set. Duplicates are allowed.
    fn add(&self, entity: T) -> MockResult<T>;

    /// Add each entity in order. Stops at the first failure; entities already
    /// added stay added.
    fn add_range(&self, entities: Vec<T>) -> MockResult<Vec<T>>;

    /// Same as [`add`](Self::add): tracked-new and tracked-unchanged are not
    /// distinguished.
    fn attach(&self, entity: T) -> MockResult<T>;

    /// Remove the first equal entity. Removing an absent entity is a no-op.
    fn remove(&self, entity: T) -> MockResult<T>;

    /// Remove each entity in order.
    fn remove_range(&self, entities: Vec<T>) -> MockResult<Vec<T>>;

    /// A new, default-constructed entity. Not added to the set.
    fn create(&self) -> MockResult<T>;

    /// The first entity whose key equals `key_values`, or `None`.
    ///
    /// # Errors
    /// - `ConfigurationError` when no identity function is set and none can be
    ///   derived from the entity's fields
    /// - `InvalidOperationError` when `key_values.len()` differs from the key arity
    fn find(&self, key_values: &[KeyPart]) -> MockResult<Option<T>>;

    /// [`find`](Self::find) behind an already-resolved future.
    fn find_async(&self, key_values: &[KeyPart]) -> Ready<MockResult<Option<T>>>;

    /// Observable view of the set's data.
    fn local(&self) -> MockResult<Arc<dyn ObservableContainer<T>>>;

    /// A deferred query over the set's current backing store.
    fn query(&self) -> MockResult<Query<T>>;
}
