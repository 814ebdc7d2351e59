use std::fmt;
use std::hash::Hash;
use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;

pub(crate) trait KeyType: Clone + fmt::Debug + Hash + Eq + Send + Sync {}
pub(crate) trait ValueType: Clone + fmt::Debug + Send + Sync {}

// Blanket implementation which satisfies the compiler
impl<K> KeyType for K
where
    K: Clone + fmt::Debug + Hash + Eq + Send + Sync,
{
    // Nothing to implement, since K already supports the other traits.
    // It has the functions it needs already
}

// Blanket implementation which satisfies the compiler
impl<V> ValueType for V
where
    V: Clone + fmt::Debug + Send + Sync,
{
    // Nothing to implement, since V already supports the other traits.
    // It has the functions it needs already
}

/// An in-memory LRU map, safe to share between request handlers.
///
/// The lock is only held for the duration of a single `get` or `insert`.
pub(crate) struct CacheStorage<K: KeyType, V: ValueType> {
    inner: Mutex<LruCache<K, V>>,
}

impl<K, V> CacheStorage<K, V>
where
    K: KeyType,
    V: ValueType,
{
    pub(crate) fn new(max_capacity: NonZeroUsize) -> Self {
        Self {
            inner: Mutex::new(LruCache::new(max_capacity)),
        }
    }

    pub(crate) fn get(&self, key: &K) -> Option<V> {
        self.inner.lock().get(key).cloned()
    }

    pub(crate) fn insert(&self, key: K, value: V) {
        self.inner.lock().put(key, value);
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub(crate) fn capacity(&self) -> NonZeroUsize {
        self.inner.lock().cap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_least_recently_used() {
        let storage: CacheStorage<&str, u32> = CacheStorage::new(NonZeroUsize::new(2).unwrap());
        storage.insert("a", 1);
        storage.insert("b", 2);
        // touch "a" so that "b" is the oldest entry
        assert_eq!(storage.get(&"a"), Some(1));
        storage.insert("c", 3);

        assert_eq!(storage.len(), 2);
        assert_eq!(storage.get(&"b"), None);
        assert_eq!(storage.get(&"a"), Some(1));
        assert_eq!(storage.get(&"c"), Some(3));
        assert_eq!(storage.capacity().get(), 2);
    }
}
