//! Backing stores for mock sets.
//!
//! A set mutates its data only through the [`BackingStore`] trait. Two stores
//! ship with the crate: [`ObservableCollection`], the default, which streams
//! every change to subscribers, and [`SharedList`], a plain shared list.

/// Observable collection implementation.
pub mod observable;
/// Plain shared list implementation.
pub mod shared;
/// Subscriber stream handle and change events.
pub mod stream;
mod traits;

pub use observable::ObservableCollection;
pub use shared::SharedList;
pub use stream::{ChangeEvent, ChangeStream, CollectionChange, SubscriptionId};
pub use traits::{BackingStore, ObservableContainer};
