//! Integer handle side table.
//!
//! Values handed across the boundary are addressed by a non-zero `u64`
//! instead of a raw pointer. Zero is never issued, so it stays the
//! universal "no handle" sentinel, and a stale or forged handle simply
//! misses the table instead of dereferencing freed memory.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// Thread-safe map from issued handles to owned values.
///
/// Each value sits behind its own mutex so two calls on the same handle
/// serialize, while calls on different handles only contend on the
/// short table lookup.
pub struct HandleTable<T> {
    next: AtomicU64,
    entries: Mutex<HashMap<u64, Arc<Mutex<T>>>>,
}

impl<T> HandleTable<T> {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Take ownership of `value` and return its handle (never 0).
    pub fn insert(&self, value: T) -> u64 {
        let handle = self.next.fetch_add(1, Ordering::Relaxed);
        self.entries
            .lock()
            .insert(handle, Arc::new(Mutex::new(value)));
        handle
    }

    /// Look up a live entry. Returns `None` for 0 and for removed handles.
    pub fn get(&self, handle: u64) -> Option<Arc<Mutex<T>>> {
        if handle == 0 {
            return None;
        }
        self.entries.lock().get(&handle).cloned()
    }

    /// Run `f` against the value behind `handle` while holding its lock.
    pub fn with<R>(&self, handle: u64, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let entry = self.get(handle)?;
        let mut value = entry.lock();
        Some(f(&mut value))
    }

    /// Detach `handle` from the table.
    ///
    /// The returned entry may still be shared with a call that looked it up
    /// before removal; the value is dropped when the last reference goes.
    pub fn remove(&self, handle: u64) -> Option<Arc<Mutex<T>>> {
        if handle == 0 {
            return None;
        }
        self.entries.lock().remove(&handle)
    }

    pub fn contains(&self, handle: u64) -> bool {
        handle != 0 && self.entries.lock().contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for HandleTable<T> {
    fn default() -> Self {
        Self::new()
    }
}
