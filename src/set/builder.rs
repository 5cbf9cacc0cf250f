//! Builder for [`MockSet`].

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::collection::{BackingStore, ObservableCollection};
use crate::config::MockSetConfig;
use crate::identity::{entity_name_of, to_json, IdentityFn, ToJson};
use crate::key::KeyValue;

use super::{BindingState, Entity, Factory, MockSet};

/// Builder for mock sets.
///
/// # Example
/// ```rust,ignore
/// let plans = MockSet::<Plan>::builder()
///     .default_factory()
///     .identity_function(|p: &Plan| p.entity_id)
///     .bind(SharedList::from_vec(seed))
///     .build();
/// ```
pub struct MockSetBuilder<T> {
    config: MockSetConfig,
    entity_name: Option<String>,
    identity: Option<IdentityFn<T>>,
    to_json: Option<ToJson<T>>,
    factory: Option<Factory<T>>,
    derived: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
    store: Option<Arc<dyn BackingStore<T>>>,
}

impl<T> Default for MockSetBuilder<T> {
    fn default() -> Self {
        Self {
            config: MockSetConfig::default(),
            entity_name: None,
            identity: None,
            to_json: None,
            factory: None,
            derived: HashMap::new(),
            store: None,
        }
    }
}

impl<T: Entity> MockSetBuilder<T> {
    /// Creates a builder with no factory, no key convention and an implicit store.
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn config(mut self, config: MockSetConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the entity name used by the key convention and in errors.
    /// Default: the type name without its module path.
    #[must_use]
    pub fn entity_name(mut self, name: impl Into<String>) -> Self {
        self.entity_name = Some(name.into());
        self
    }

    /// Use `factory` for [`create`](crate::EntitySet::create).
    #[must_use]
    pub fn factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.factory = Some(Arc::new(factory));
        self
    }

    /// Use `T::default()` for [`create`](crate::EntitySet::create).
    #[must_use]
    pub fn default_factory(self) -> Self
    where
        T: Default,
    {
        self.factory(T::default)
    }

    /// Allow `create_derived::<U>()`, building `U::default()`.
    #[must_use]
    pub fn derived<U>(self) -> Self
    where
        U: Default + Send + Sync + 'static,
    {
        self.derived_with(U::default)
    }

    /// Allow `create_derived::<U>()`, building with `factory`.
    #[must_use]
    pub fn derived_with<U, F>(mut self, factory: F) -> Self
    where
        U: Send + Sync + 'static,
        F: Fn() -> U + Send + Sync + 'static,
    {
        let factory: Factory<U> = Arc::new(factory);
        self.derived.insert(TypeId::of::<U>(), Arc::new(factory));
        self
    }

    /// Install an identity function up front.
    #[must_use]
    pub fn identity_function<F, K>(mut self, f: F) -> Self
    where
        F: Fn(&T) -> K + Send + Sync + 'static,
        K: Into<KeyValue>,
    {
        self.identity = Some(IdentityFn::new(f));
        self
    }

    /// Let `find` derive the key from the entity's serialized fields when no
    /// identity function was installed.
    #[must_use]
    pub fn key_convention(mut self) -> Self
    where
        T: Serialize,
    {
        self.to_json = Some(to_json::<T>);
        self
    }

    /// Start bound to `store` instead of an implicit observable collection.
    #[must_use]
    pub fn bind<S: BackingStore<T> + 'static>(mut self, store: S) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    #[must_use]
    pub fn build(self) -> MockSet<T> {
        let (store, state): (Arc<dyn BackingStore<T>>, _) = match self.store {
            Some(store) => (store, BindingState::Bound),
            None => (
                Arc::new(ObservableCollection::with_stream_capacity(
                    Vec::new(),
                    self.config.change_stream_capacity,
                )),
                BindingState::Unbound,
            ),
        };

        MockSet::from_parts(
            self.entity_name.unwrap_or_else(entity_name_of::<T>),
            self.config,
            store,
            state,
            self.identity,
            self.to_json,
            self.factory,
            self.derived,
        )
    }
}
