//! # mockset - in-memory entity sets for testing data-access code
//!
//! mockset emulates a persisted, queryable entity set on top of a plain
//! in-process collection, so code written against a data-access context can
//! be exercised without a database.
//!
//! ## Core Concepts
//!
//! - **MockSet**: the entity set. Add, attach, remove, range operations,
//!   identity lookup with `find`, an observable local view
//! - **Backing store**: the collection a set reads and mutates; implicit
//!   (owned by the set) or bound (shared with the caller)
//! - **Identity function**: maps an entity to its key; explicit, or derived
//!   from an `Id` / `<Entity>Id` field
//! - **Query**: a lazily composed operator chain, materialized synchronously
//!   or through already-resolved futures
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mockset::{EntitySet, MockSet, SharedList};
//!
//! let stocks = MockSet::<Stock>::new();
//! let data = SharedList::from_vec(vec![Stock { stock_id: 1, ticker: "a".into() }]);
//! stocks.bind(data.clone())?;
//!
//! let found = stocks.find(&[1.into()])?;
//! let tickers = stocks.query()?.map(|s| s.ticker).to_list_async().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod collection;
pub mod config;
pub mod error;
pub mod identity;
pub mod key;
pub mod query;
pub mod registry;
pub mod set;

// Re-export primary types at crate root for convenience
pub use collection::{
    BackingStore, ChangeEvent, ChangeStream, CollectionChange, ObservableCollection,
    ObservableContainer, SharedList, SubscriptionId,
};
pub use config::{KeyConvention, MockSetConfig};
pub use error::{
    ConfigurationError, InstantiationError, InvalidOperationError, MockError, MockResult,
};
pub use identity::IdentityFn;
pub use key::{KeyPart, KeyValue};
pub use query::{Query, QuerySource, QueryStep};
pub use registry::{FromRegistry, SetRegistry};
pub use set::{BindingState, Entity, EntitySet, MockSet, MockSetBuilder};
