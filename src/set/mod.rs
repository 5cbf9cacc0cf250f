//! The mock entity set.
//!
//! A [`MockSet`] emulates a persisted entity set on top of an in-memory
//! [`BackingStore`]. Freshly built sets are immediately usable: they own an
//! implicit [`ObservableCollection`] and derive their key lazily on the first
//! `find`. Binding a caller-owned store swaps the store and its query snapshot
//! together; from then on every mutation lands in the caller's collection.

mod builder;
mod entity_set;

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use futures_util::future::{ready, Ready};
use serde::Serialize;

use crate::collection::{BackingStore, ObservableCollection, ObservableContainer};
use crate::config::MockSetConfig;
use crate::error::{
    lock_err, ConfigurationError, InstantiationError, InvalidOperationError, MockResult,
};
use crate::identity::{derive_identity, entity_name_of, IdentityFn, ToJson};
use crate::key::{KeyPart, KeyValue};
use crate::query::{Query, QuerySource};

pub use builder::MockSetBuilder;
pub use entity_set::EntitySet;

/// What a type needs to live in a mock set.
///
/// Equality drives `remove`. Use `Arc<U>` as the entity type when tests need
/// to check that materialized results are the very instances that were added.
pub trait Entity: Clone + PartialEq + Send + Sync + 'static {}

impl<T> Entity for T where T: Clone + PartialEq + Send + Sync + 'static {}

pub(crate) type Factory<T> = Arc<dyn Fn() -> T + Send + Sync>;

/// Whether the set still uses its implicit store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    /// Implicit observable store created with the set.
    Unbound,
    /// Caller-supplied store.
    Bound,
}

struct Binding<T> {
    store: Arc<dyn BackingStore<T>>,
    source: QuerySource<T>,
    state: BindingState,
}

/// An in-memory entity set.
///
/// # Examples
///
/// ```
/// use mockset::{EntitySet, MockSet, SharedList};
/// use serde::Serialize;
///
/// #[derive(Debug, Clone, Default, PartialEq, Serialize)]
/// struct Person {
///     id: i32,
///     name: String,
/// }
///
/// let people = MockSet::<Person>::new();
/// let list = SharedList::from_vec(vec![Person { id: 1, name: "a".into() }]);
/// people.bind(list.clone()).unwrap();
///
/// let found = people.find(&[1.into()]).unwrap().unwrap();
/// assert_eq!(found.name, "a");
///
/// people.add(Person { id: 2, name: "b".into() }).unwrap();
/// assert_eq!(list.len().unwrap(), 2);
/// ```
pub struct MockSet<T> {
    entity_name: String,
    config: MockSetConfig,
    binding: RwLock<Binding<T>>,
    identity: RwLock<Option<IdentityFn<T>>>,
    to_json: Option<ToJson<T>>,
    factory: Option<Factory<T>>,
    derived: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl<T: Entity + Default + Serialize> MockSet<T> {
    /// A set with an implicit observable store, `T::default()` as its factory
    /// and the key naming convention enabled.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().default_factory().key_convention().build()
    }
}

impl<T: Entity + Default + Serialize> Default for MockSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> MockSet<T> {
    /// Start configuring a set. Nothing is enabled by default.
    pub fn builder() -> MockSetBuilder<T> {
        MockSetBuilder::new()
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        entity_name: String,
        config: MockSetConfig,
        store: Arc<dyn BackingStore<T>>,
        state: BindingState,
        identity: Option<IdentityFn<T>>,
        to_json: Option<ToJson<T>>,
        factory: Option<Factory<T>>,
        derived: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
    ) -> Self {
        let source = QuerySource::new(Arc::clone(&store));
        Self {
            entity_name,
            config,
            binding: RwLock::new(Binding {
                store,
                source,
                state,
            }),
            identity: RwLock::new(identity),
            to_json,
            factory,
            derived,
        }
    }

    #[must_use]
    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    #[must_use]
    pub const fn config(&self) -> &MockSetConfig {
        &self.config
    }

    pub fn state(&self) -> MockResult<BindingState> {
        let binding = self.binding.read().map_err(|_| lock_err("set.state"))?;
        Ok(binding.state)
    }

    /// The active backing store.
    pub fn store(&self) -> MockResult<Arc<dyn BackingStore<T>>> {
        let binding = self.binding.read().map_err(|_| lock_err("set.store"))?;
        Ok(Arc::clone(&binding.store))
    }

    /// The query snapshot taken at the last bind.
    pub fn query_source(&self) -> MockResult<QuerySource<T>> {
        let binding = self.binding.read().map_err(|_| lock_err("set.query_source"))?;
        Ok(binding.source.clone())
    }

    /// Make `store` the backing store. The caller keeps its own handle and
    /// sees every later mutation made through the set.
    pub fn bind<S: BackingStore<T> + 'static>(&self, store: S) -> MockResult<&Self> {
        self.bind_shared(Arc::new(store))
    }

    /// [`bind`](Self::bind) for an already shared store. Rebinding the
    /// current store, or another handle to the same shared state, is a no-op.
    pub fn bind_shared(&self, store: Arc<dyn BackingStore<T>>) -> MockResult<&Self> {
        let mut binding = self.binding.write().map_err(|_| lock_err("set.bind"))?;
        if binding.state == BindingState::Bound && binding.source.is_backed_by(&store) {
            return Ok(self);
        }

        let previous = binding.state;
        binding.source = QuerySource::new(Arc::clone(&store));
        binding.store = store;
        binding.state = BindingState::Bound;
        tracing::debug!(entity = %self.entity_name, ?previous, "bound backing store");
        Ok(self)
    }

    /// Install an identity function, replacing any explicit or derived one.
    ///
    /// `find` calls it with no lock held, so it may call back into this set.
    pub fn set_identity_function<F, K>(&self, f: F) -> MockResult<&Self>
    where
        F: Fn(&T) -> K + Send + Sync + 'static,
        K: Into<KeyValue>,
    {
        let mut identity = self.identity.write().map_err(|_| lock_err("set.identity"))?;
        *identity = Some(IdentityFn::new(f));
        Ok(self)
    }

    /// The identity function in use, if one was set or already derived.
    pub fn identity_function(&self) -> MockResult<Option<IdentityFn<T>>> {
        let identity = self.identity.read().map_err(|_| lock_err("set.identity"))?;
        Ok(identity.clone())
    }

    /// A new instance of a related type registered on the builder.
    pub fn create_derived<U: Send + Sync + 'static>(&self) -> MockResult<U> {
        self.derived
            .get(&TypeId::of::<U>())
            .and_then(|factory| factory.downcast_ref::<Factory<U>>())
            .map(|factory| factory())
            .ok_or_else(|| {
                InstantiationError::NoFactory {
                    type_name: entity_name_of::<U>(),
                }
                .into()
            })
    }

    pub fn len(&self) -> MockResult<usize> {
        self.store()?.len()
    }

    pub fn is_empty(&self) -> MockResult<bool> {
        self.store()?.is_empty()
    }

    /// Every entity, in store order.
    pub fn to_list(&self) -> MockResult<Vec<T>> {
        self.query()?.to_list()
    }

    pub fn to_list_async(&self) -> Ready<MockResult<Vec<T>>> {
        ready(self.to_list())
    }

    pub fn count_async(&self) -> Ready<MockResult<usize>> {
        ready(self.len())
    }

    /// The identity function to use for a lookup in `store`.
    ///
    /// `Ok(None)` means a key cannot be derived yet because there is no
    /// instance to inspect, and the store is empty anyway.
    fn resolve_identity(&self, store: &dyn BackingStore<T>) -> MockResult<Option<IdentityFn<T>>> {
        if let Some(identity) = self.identity_function()? {
            return Ok(Some(identity));
        }

        let Some(to_json) = self.to_json else {
            return Err(ConfigurationError::KeyNotDerivable {
                entity: self.entity_name.clone(),
                tried: Vec::new(),
            }
            .into());
        };

        // Prefer a stored row: a factory default may omit optional keys.
        let probe = match store.scan(&mut |_| Ok(true))? {
            Some(row) => Some(row),
            None => self.factory.as_ref().map(|factory| factory()),
        };
        let Some(probe) = probe else {
            tracing::trace!(entity = %self.entity_name, "no instance to derive key from");
            return Ok(None);
        };

        let derived = derive_identity(
            &self.entity_name,
            &self.config.key_convention,
            to_json,
            &probe,
        )?;
        let mut identity = self.identity.write().map_err(|_| lock_err("set.identity"))?;
        Ok(Some(identity.get_or_insert(derived).clone()))
    }
}

impl<T: Entity> EntitySet<T> for MockSet<T> {
    fn add(&self, entity: T) -> MockResult<T> {
        self.store()?.push(entity.clone())?;
        tracing::debug!(entity = %self.entity_name, "added");
        Ok(entity)
    }

    fn add_range(&self, entities: Vec<T>) -> MockResult<Vec<T>> {
        let store = self.store()?;
        for entity in &entities {
            store.push(entity.clone())?;
        }
        tracing::debug!(entity = %self.entity_name, count = entities.len(), "added range");
        Ok(entities)
    }

    fn attach(&self, entity: T) -> MockResult<T> {
        self.add(entity)
    }

    fn remove(&self, entity: T) -> MockResult<T> {
        let removed = self.store()?.remove_first(&entity)?;
        tracing::debug!(entity = %self.entity_name, removed, "remove");
        Ok(entity)
    }

    fn remove_range(&self, entities: Vec<T>) -> MockResult<Vec<T>> {
        let store = self.store()?;
        let mut removed = 0_usize;
        for entity in &entities {
            if store.remove_first(entity)? {
                removed += 1;
            }
        }
        tracing::debug!(entity = %self.entity_name, requested = entities.len(), removed, "remove range");
        Ok(entities)
    }

    fn create(&self) -> MockResult<T> {
        let factory = self.factory.as_ref().ok_or_else(|| InstantiationError::NoFactory {
            type_name: self.entity_name.clone(),
        })?;
        Ok(factory())
    }

    fn find(&self, key_values: &[KeyPart]) -> MockResult<Option<T>> {
        let store = self.store()?;
        let Some(identity) = self.resolve_identity(store.as_ref())? else {
            return Ok(None);
        };

        // Keys are computed over a snapshot so the identity function runs
        // without any store lock held.
        for entity in store.to_vec()? {
            let key = identity.key_of(&entity)?;
            if key.arity() != key_values.len() {
                return Err(InvalidOperationError::KeyCountMismatch {
                    entity: self.entity_name.clone(),
                    expected: key.arity(),
                    actual: key_values.len(),
                }
                .into());
            }
            if key.matches(key_values) {
                return Ok(Some(entity));
            }
        }
        Ok(None)
    }

    fn find_async(&self, key_values: &[KeyPart]) -> Ready<MockResult<Option<T>>> {
        ready(self.find(key_values))
    }

    fn local(&self) -> MockResult<Arc<dyn ObservableContainer<T>>> {
        let store = self.store()?;
        if let Some(observable) = Arc::clone(&store).as_observable() {
            return Ok(observable);
        }
        let copy = ObservableCollection::with_stream_capacity(
            store.to_vec()?,
            self.config.change_stream_capacity,
        );
        Ok(Arc::new(copy))
    }

    fn query(&self) -> MockResult<Query<T>> {
        Ok(self.query_source()?.query())
    }
}

impl<T> fmt::Debug for MockSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.binding.read().map(|b| b.state).ok();
        f.debug_struct("MockSet")
            .field("entity_name", &self.entity_name)
            .field("state", &state)
            .field("has_factory", &self.factory.is_some())
            .field("key_convention", &self.to_json.is_some())
            .finish_non_exhaustive()
    }
}
