use std::fmt;
use std::sync::{Arc, RwLock};

use crate::error::{lock_err, MockResult};

use super::traits::BackingStore;

/// A shared, ordered list without change notifications.
///
/// Clones are handles to the same list. Bind one to a set to keep direct
/// access to the data the set mutates.
///
/// # Examples
///
/// ```
/// use mockset::SharedList;
///
/// let list = SharedList::from_vec(vec![1, 2]);
/// let handle = list.clone();
/// handle.push(3).unwrap();
/// assert_eq!(list.to_vec().unwrap(), vec![1, 2, 3]);
/// ```
pub struct SharedList<T> {
    items: Arc<RwLock<Vec<T>>>,
}

impl<T> Clone for SharedList<T> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
        }
    }
}

impl<T> Default for SharedList<T> {
    fn default() -> Self {
        Self::from_vec(Vec::new())
    }
}

impl<T> SharedList<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_vec(items: Vec<T>) -> Self {
        Self {
            items: Arc::new(RwLock::new(items)),
        }
    }

    /// True if both handles refer to the same list.
    #[must_use]
    pub fn same_list(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.items, &other.items)
    }

    pub fn push(&self, item: T) -> MockResult<()> {
        let mut items = self.items.write().map_err(|_| lock_err("shared_list.push"))?;
        items.push(item);
        Ok(())
    }

    pub fn len(&self) -> MockResult<usize> {
        let items = self.items.read().map_err(|_| lock_err("shared_list.len"))?;
        Ok(items.len())
    }

    pub fn is_empty(&self) -> MockResult<bool> {
        Ok(self.len()? == 0)
    }

    pub fn clear(&self) -> MockResult<()> {
        let mut items = self.items.write().map_err(|_| lock_err("shared_list.clear"))?;
        items.clear();
        Ok(())
    }
}

impl<T: Clone> SharedList<T> {
    pub fn get(&self, index: usize) -> MockResult<Option<T>> {
        let items = self.items.read().map_err(|_| lock_err("shared_list.get"))?;
        Ok(items.get(index).cloned())
    }

    pub fn to_vec(&self) -> MockResult<Vec<T>> {
        let items = self.items.read().map_err(|_| lock_err("shared_list.to_vec"))?;
        Ok(items.clone())
    }
}

impl<T: PartialEq> SharedList<T> {
    /// Remove the first element equal to `item`. Returns false if absent.
    pub fn remove(&self, item: &T) -> MockResult<bool> {
        let mut items = self.items.write().map_err(|_| lock_err("shared_list.remove"))?;
        match items.iter().position(|x| x == item) {
            Some(index) => {
                items.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl<T> From<Vec<T>> for SharedList<T> {
    fn from(items: Vec<T>) -> Self {
        Self::from_vec(items)
    }
}

impl<T> FromIterator<T> for SharedList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl<T> fmt::Debug for SharedList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedList")
            .field("len", &self.len().ok())
            .finish()
    }
}

impl<T> BackingStore<T> for SharedList<T>
where
    T: Clone + PartialEq + Send + Sync,
{
    fn push(&self, item: T) -> MockResult<()> {
        SharedList::push(self, item)
    }

    fn remove_first(&self, item: &T) -> MockResult<bool> {
        self.remove(item)
    }

    fn to_vec(&self) -> MockResult<Vec<T>> {
        SharedList::to_vec(self)
    }

    fn len(&self) -> MockResult<usize> {
        SharedList::len(self)
    }

    fn shared_state_addr(&self) -> Option<usize> {
        Some(Arc::as_ptr(&self.items).cast::<()>() as usize)
    }

    fn scan(&self, visit: &mut dyn FnMut(&T) -> MockResult<bool>) -> MockResult<Option<T>> {
        let items = self.items.read().map_err(|_| lock_err("shared_list.scan"))?;
        for item in items.iter() {
            if visit(item)? {
                return Ok(Some(item.clone()));
            }
        }
        Ok(None)
    }
}
