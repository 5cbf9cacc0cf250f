//! Type-keyed registry of mock sets.
//!
//! Replaces runtime discovery of entity-set properties on a data context: a
//! test registers one set per entity type, then builds its context through
//! [`FromRegistry`], so every place asking for `T` gets the same instance.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use serde::Serialize;

use crate::error::{lock_err, ConfigurationError, MockResult};
use crate::identity::entity_name_of;
use crate::set::{Entity, MockSet};

struct RegisteredSet {
    entity_name: String,
    set: Arc<dyn Any + Send + Sync>,
}

/// A context type that receives its entity sets through construction.
///
/// # Example
/// ```rust,ignore
/// struct ShopContext {
///     people: Arc<MockSet<Person>>,
///     orders: Arc<dyn EntitySet<Order>>,
/// }
///
/// impl FromRegistry for ShopContext {
///     fn from_registry(registry: &SetRegistry) -> MockResult<Self> {
///         Ok(Self {
///             people: registry.get_or_register()?,
///             orders: registry.get_or_register::<Order>()?,
///         })
///     }
/// }
/// ```
pub trait FromRegistry: Sized {
    /// Build the context from sets found (or created) in `registry`.
    fn from_registry(registry: &SetRegistry) -> MockResult<Self>;
}

/// Registry mapping an entity type to its shared mock set.
#[derive(Default)]
pub struct SetRegistry {
    sets: RwLock<HashMap<TypeId, RegisteredSet>>,
}

impl SetRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `set` for `T`, replacing any previous set for that type.
    pub fn register<T: Entity>(&self, set: MockSet<T>) -> MockResult<Arc<MockSet<T>>> {
        let set = Arc::new(set);
        let mut sets = self.sets.write().map_err(|_| lock_err("registry.register"))?;
        let replaced = sets
            .insert(
                TypeId::of::<T>(),
                RegisteredSet {
                    entity_name: set.entity_name().to_string(),
                    set: Arc::clone(&set) as Arc<dyn Any + Send + Sync>,
                },
            )
            .is_some();
        tracing::debug!(entity = set.entity_name(), replaced, "registered mock set");
        Ok(set)
    }

    /// Register a fresh [`MockSet::new`] for `T`.
    pub fn register_default<T>(&self) -> MockResult<Arc<MockSet<T>>>
    where
        T: Entity + Default + Serialize,
    {
        self.register(MockSet::new())
    }

    /// The set registered for `T`.
    ///
    /// # Errors
    /// `ConfigurationError::UnregisteredSet` when nothing was registered for `T`.
    pub fn set<T: Entity>(&self) -> MockResult<Arc<MockSet<T>>> {
        self.lookup::<T>()?.ok_or_else(|| {
            ConfigurationError::UnregisteredSet {
                type_name: entity_name_of::<T>(),
            }
            .into()
        })
    }

    /// The set registered for `T`, registering [`MockSet::new`] first if needed.
    pub fn get_or_register<T>(&self) -> MockResult<Arc<MockSet<T>>>
    where
        T: Entity + Default + Serialize,
    {
        match self.lookup::<T>()? {
            Some(set) => Ok(set),
            None => self.register_default(),
        }
    }

    fn lookup<T: Entity>(&self) -> MockResult<Option<Arc<MockSet<T>>>> {
        let sets = self.sets.read().map_err(|_| lock_err("registry.lookup"))?;
        Ok(sets
            .get(&TypeId::of::<T>())
            .and_then(|entry| Arc::clone(&entry.set).downcast::<MockSet<T>>().ok()))
    }

    pub fn contains<T: 'static>(&self) -> MockResult<bool> {
        let sets = self.sets.read().map_err(|_| lock_err("registry.contains"))?;
        Ok(sets.contains_key(&TypeId::of::<T>()))
    }

    pub fn len(&self) -> MockResult<usize> {
        let sets = self.sets.read().map_err(|_| lock_err("registry.len"))?;
        Ok(sets.len())
    }

    pub fn is_empty(&self) -> MockResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Entity names of all registered sets, sorted.
    pub fn entity_names(&self) -> MockResult<Vec<String>> {
        let sets = self.sets.read().map_err(|_| lock_err("registry.entity_names"))?;
        let mut names: Vec<String> = sets.values().map(|s| s.entity_name.clone()).collect();
        names.sort();
        Ok(names)
    }

    /// Build a context of type `C` from this registry.
    pub fn prepare<C: FromRegistry>(&self) -> MockResult<C> {
        C::from_registry(self)
    }
}

impl fmt::Debug for SetRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetRegistry")
            .field("entity_names", &self.entity_names().ok())
            .finish()
    }
}
