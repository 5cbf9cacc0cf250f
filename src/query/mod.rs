//! Deferred queries over a set's backing store.
//!
//! A [`Query`] records operators without running them. Each materialization
//! (`to_list`, `count`, the `*_async` terminals, ...) reads the backing store
//! as it is at that moment and applies the whole chain once, left to right.
//! Nothing is cached between materializations.
//!
//! The async terminals return [`Ready`] futures: the data is already in
//! memory, so the result is computed before the future is handed back and
//! awaiting it never suspends. They accept no cancellation and have no
//! timeout.

mod expression;

use std::fmt;
use std::sync::Arc;

use futures_util::future::{ready, Ready};
use futures_util::stream::{self, Iter};

use crate::collection::BackingStore;
use crate::error::{InvalidOperationError, MockResult};

pub use expression::QueryStep;

type Provider<T> = Arc<dyn Fn() -> MockResult<Vec<T>> + Send + Sync>;

/// The queryable root of a set, captured when its backing store is bound.
///
/// A source keeps pointing at the store it was created from; queries built
/// before a rebind keep reading the old store.
pub struct QuerySource<T> {
    store: Arc<dyn BackingStore<T>>,
}

impl<T> Clone for QuerySource<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<T: Send + Sync + 'static> QuerySource<T> {
    pub(crate) fn new(store: Arc<dyn BackingStore<T>>) -> Self {
        Self { store }
    }

    /// Wrap any backing store as a query root.
    #[must_use]
    pub fn from_store(store: Arc<dyn BackingStore<T>>) -> Self {
        Self::new(store)
    }

    /// Type name of the elements.
    #[must_use]
    pub fn element_type(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    /// A query over every element, in store order.
    #[must_use]
    pub fn query(&self) -> Query<T> {
        let store = Arc::clone(&self.store);
        Query {
            provider: Arc::new(move || store.to_vec()),
            expression: vec![QueryStep::Source {
                element_type: self.element_type(),
            }],
        }
    }

    pub(crate) fn is_backed_by(&self, store: &Arc<dyn BackingStore<T>>) -> bool {
        if Arc::ptr_eq(&self.store, store) {
            return true;
        }
        matches!(
            (self.store.shared_state_addr(), store.shared_state_addr()),
            (Some(a), Some(b)) if a == b
        )
    }
}

impl<T> fmt::Debug for QuerySource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuerySource")
            .field("element_type", &std::any::type_name::<T>())
            .finish_non_exhaustive()
    }
}

/// A lazily evaluated operator chain.
///
/// # Examples
///
/// ```
/// use mockset::{BackingStore, QuerySource, SharedList};
/// use std::sync::Arc;
///
/// let list = SharedList::from_vec(vec![3, 1, 2]);
/// let store: Arc<dyn BackingStore<i32>> = Arc::new(list.clone());
/// let query = QuerySource::from_store(store).query().filter(|x| *x > 1).order_by(|x| *x);
///
/// list.push(5).unwrap();
/// assert_eq!(query.to_list().unwrap(), vec![2, 3, 5]);
/// ```
pub struct Query<T> {
    provider: Provider<T>,
    expression: Vec<QueryStep>,
}

impl<T> Clone for Query<T> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            expression: self.expression.clone(),
        }
    }
}

impl<T> fmt::Debug for Query<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("expression", &self.expression)
            .finish_non_exhaustive()
    }
}

impl<T: Send + Sync + 'static> Query<T> {
    fn chain<U, F>(self, step: QueryStep, apply: F) -> Query<U>
    where
        U: Send + Sync + 'static,
        F: Fn(Vec<T>) -> Vec<U> + Send + Sync + 'static,
    {
        let upstream = self.provider;
        let mut expression = self.expression;
        expression.push(step);
        Query {
            provider: Arc::new(move || upstream().map(&apply)),
            expression,
        }
    }

    /// Type name of the elements this query yields.
    #[must_use]
    pub fn element_type(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    /// The composed operator chain, root first.
    #[must_use]
    pub fn expression(&self) -> &[QueryStep] {
        &self.expression
    }

    /// Keep elements matching `predicate`.
    #[must_use]
    pub fn filter<P>(self, predicate: P) -> Self
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.chain(QueryStep::Filter, move |items| {
            items.into_iter().filter(|item| predicate(item)).collect()
        })
    }

    /// Project each element.
    #[must_use]
    pub fn map<U, F>(self, project: F) -> Query<U>
    where
        U: Send + Sync + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let step = QueryStep::Map {
            output_type: std::any::type_name::<U>(),
        };
        self.chain(step, move |items| items.into_iter().map(&project).collect())
    }

    /// Stable ascending sort by `key`.
    #[must_use]
    pub fn order_by<K, F>(self, key: F) -> Self
    where
        K: Ord,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        self.sorted(key, false)
    }

    /// Stable descending sort by `key`.
    #[must_use]
    pub fn order_by_descending<K, F>(self, key: F) -> Self
    where
        K: Ord,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        self.sorted(key, true)
    }

    fn sorted<K, F>(self, key: F, descending: bool) -> Self
    where
        K: Ord,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        let step = QueryStep::OrderBy {
            key_type: std::any::type_name::<K>(),
            descending,
        };
        self.chain(step, move |mut items| {
            items.sort_by(|a, b| {
                let ord = key(a).cmp(&key(b));
                if descending {
                    ord.reverse()
                } else {
                    ord
                }
            });
            items
        })
    }

    /// Drop the first `count` elements.
    #[must_use]
    pub fn skip(self, count: usize) -> Self {
        self.chain(QueryStep::Skip(count), move |items| {
            items.into_iter().skip(count).collect()
        })
    }

    /// Keep at most `count` elements.
    #[must_use]
    pub fn take(self, count: usize) -> Self {
        self.chain(QueryStep::Take(count), move |mut items| {
            items.truncate(count);
            items
        })
    }

    /// Run the chain against the current contents of the store.
    pub fn to_list(&self) -> MockResult<Vec<T>> {
        let items = (self.provider)()?;
        tracing::trace!(
            element = self.element_type(),
            steps = self.expression.len(),
            results = items.len(),
            "materialized query"
        );
        Ok(items)
    }

    pub fn count(&self) -> MockResult<usize> {
        Ok(self.to_list()?.len())
    }

    /// First element; an empty result is an error.
    pub fn first(&self) -> MockResult<T> {
        self.first_or_none()?.ok_or_else(|| {
            InvalidOperationError::EmptySequence {
                operation: "first",
                element: self.element_type(),
            }
            .into()
        })
    }

    pub fn first_or_none(&self) -> MockResult<Option<T>> {
        Ok(self.to_list()?.into_iter().next())
    }

    /// True if the query yields at least one element.
    pub fn any(&self) -> MockResult<bool> {
        Ok(!self.to_list()?.is_empty())
    }

    /// True if every element matches `predicate` (vacuously true when empty).
    pub fn all<P>(&self, predicate: P) -> MockResult<bool>
    where
        P: Fn(&T) -> bool,
    {
        Ok(self.to_list()?.iter().all(predicate))
    }

    pub fn to_list_async(&self) -> Ready<MockResult<Vec<T>>> {
        ready(self.to_list())
    }

    pub fn count_async(&self) -> Ready<MockResult<usize>> {
        ready(self.count())
    }

    pub fn first_async(&self) -> Ready<MockResult<T>> {
        ready(self.first())
    }

    pub fn first_or_none_async(&self) -> Ready<MockResult<Option<T>>> {
        ready(self.first_or_none())
    }

    pub fn any_async(&self) -> Ready<MockResult<bool>> {
        ready(self.any())
    }

    /// Materialize now and enumerate the results as a stream.
    pub fn into_stream(self) -> MockResult<Iter<std::vec::IntoIter<T>>> {
        Ok(stream::iter(self.to_list()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::collection::SharedList;
    use futures_util::StreamExt;

    fn source(items: Vec<i32>) -> (SharedList<i32>, QuerySource<i32>) {
        let list = SharedList::from_vec(items);
        let store: Arc<dyn BackingStore<i32>> = Arc::new(list.clone());
        (list, QuerySource::new(store))
    }

    #[test]
    fn operators_apply_in_chain_order() {
        let (_, src) = source(vec![5, 1, 4, 2, 3]);
        let q = src.query().order_by(|x| *x).skip(1).take(3).filter(|x| x % 2 == 0);
        assert_eq!(q.to_list().unwrap(), vec![2, 4]);

        // take before order yields a different result.
        let q = src.query().take(2).order_by(|x| *x);
        assert_eq!(q.to_list().unwrap(), vec![1, 5]);
    }

    #[test]
    fn expression_records_every_step() {
        let (_, src) = source(vec![]);
        let q = src
            .query()
            .filter(|_| true)
            .order_by_descending(|x| *x)
            .skip(1)
            .take(2)
            .map(|x| x.to_string());
        let names: Vec<_> = q.expression().iter().map(QueryStep::name).collect();
        assert_eq!(
            names,
            vec!["source", "filter", "order_by_descending", "skip", "take", "map"]
        );
        assert_eq!(q.element_type(), std::any::type_name::<String>());
    }

    #[test]
    fn composition_is_lazy_and_not_memoized() {
        let (list, src) = source(vec![1, 2]);
        let q = src.query().filter(|x| *x > 1);
        list.push(3).unwrap();

        let first = q.to_list().unwrap();
        list.push(4).unwrap();
        let second = q.to_list().unwrap();

        assert_eq!(first, vec![2, 3]);
        assert_eq!(second, vec![2, 3, 4]);
    }

    #[test]
    fn descending_sort_is_stable() {
        let words = SharedList::from_vec(vec!["bb", "a", "cc", "d"]);
        let store: Arc<dyn BackingStore<&'static str>> = Arc::new(words);
        let q = QuerySource::new(store).query().order_by_descending(|w| w.len());
        assert_eq!(q.to_list().unwrap(), vec!["bb", "cc", "a", "d"]);
    }

    #[test]
    fn first_on_empty_is_invalid_operation() {
        let (_, src) = source(vec![]);
        let err = src.query().first().unwrap_err();
        assert!(err.is_invalid_operation());
        assert!(src.query().first_or_none().unwrap().is_none());
        assert!(!src.query().any().unwrap());
        assert!(src.query().all(|_| false).unwrap());
    }

    #[tokio::test]
    async fn async_terminals_resolve_immediately() {
        let (_, src) = source(vec![1, 2, 3]);
        let q = src.query().filter(|x| *x != 2);
        assert_eq!(q.to_list_async().await.unwrap(), vec![1, 3]);
        assert_eq!(q.count_async().await.unwrap(), 2);
        assert_eq!(q.first_async().await.unwrap(), 1);
        assert_eq!(q.first_or_none_async().await.unwrap(), Some(1));
        assert!(q.any_async().await.unwrap());

        let streamed: Vec<i32> = q.into_stream().unwrap().collect().await;
        assert_eq!(streamed, vec![1, 3]);
    }
}
