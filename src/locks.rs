/// Per-key mutual exclusion.
///
/// Hands out one mutex per key (doctor id, appointment id) so that a
/// read-modify-write against one record is serialized while work on other
/// keys runs in parallel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    // The guarded data is `()`, so a poisoned lock carries no broken state.
    fn registry(&self) -> MutexGuard<'_, HashMap<String, Arc<Mutex<()>>>> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn acquire(&self, key: &str) -> Arc<Mutex<()>> {
        Arc::clone(self.registry().entry(key.to_string()).or_default())
    }

    /// Drop the caller's handle and evict the entry once nobody else holds it.
    ///
    /// Handles are only cloned and dropped under the registry lock, so the
    /// last caller out always sees a count of one.
    fn release(&self, key: &str, handle: Arc<Mutex<()>>) {
        let mut locks = self.registry();
        drop(handle);
        if locks.get(key).is_some_and(|h| Arc::strong_count(h) == 1) {
            locks.remove(key);
        }
    }

    /// Run `f` while holding the lock for `key`.
    pub fn with_lock<R>(&self, key: &str, f: impl FnOnce() -> R) -> R {
        let handle = self.acquire(key);
        let result = {
            let _guard = handle.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };
        self.release(key, handle);
        result
    }

    /// Number of keys currently held or waited on.
    pub fn len(&self) -> usize {
        self.registry().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn same_key_is_serialized() {
        let locks = KeyedLocks::new();
        let inside = AtomicUsize::new(0);
        let max_inside = AtomicUsize::new(0);

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    locks.with_lock("doc-1", || {
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_inside.fetch_max(now, Ordering::SeqCst);
                        std::thread::yield_now();
                        inside.fetch_sub(1, Ordering::SeqCst);
                    });
                });
            }
        });

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert!(locks.is_empty());
    }

    #[test]
    fn keys_are_independent() {
        let locks = KeyedLocks::new();
        let value = locks.with_lock("a", || locks.with_lock("b", || locks.len()));
        assert_eq!(value, 2);
        assert!(locks.is_empty());
    }

    #[test]
    fn entries_are_evicted_after_use() {
        let locks = KeyedLocks::new();
        for i in 0..1000 {
            locks.with_lock(&format!("key-{i}"), || ());
        }
        assert_eq!(locks.len(), 0);
    }
}
