//! Synchronous observer registry shared by the stores.
//!
//! # Invariants
//! - Callbacks run in subscription order on the mutating caller's thread.
//! - The registry lock is never held while a callback runs, so callbacks may
//!   subscribe or unsubscribe re-entrantly.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

/// Ordered set of callbacks notified after each committed change.
pub(crate) struct Subscribers<T: ?Sized + 'static> {
    next_id: AtomicU64,
    callbacks: Mutex<BTreeMap<u64, Arc<dyn Fn(&T) + Send + Sync>>>,
}

impl<T: ?Sized + 'static> Subscribers<T> {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicU64::new(0),
            callbacks: Mutex::new(BTreeMap::new()),
        })
    }

    pub(crate) fn subscribe<F>(registry: &Arc<Self>, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = registry.next_id.fetch_add(1, Ordering::Relaxed);
        registry
            .callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::new(callback));

        let weak: Weak<dyn Unsubscribe> = Arc::downgrade(registry) as Weak<dyn Unsubscribe>;
        Subscription {
            id,
            registry: Some(weak),
        }
    }

    pub(crate) fn notify(&self, value: &T) {
        let snapshot: Vec<Arc<dyn Fn(&T) + Send + Sync>> = self
            .callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        for callback in snapshot {
            callback(value);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

trait Unsubscribe: Send + Sync {
    fn remove(&self, id: u64);
}

impl<T: ?Sized + 'static> Unsubscribe for Subscribers<T> {
    fn remove(&self, id: u64) {
        self.callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }
}

/// Handle returned by `subscribe`.
///
/// Dropping the handle unsubscribes. Call `detach` to keep the callback
/// registered for the lifetime of the store instead.
#[must_use = "dropping a Subscription immediately unsubscribes the callback"]
pub struct Subscription {
    id: u64,
    registry: Option<Weak<dyn Unsubscribe>>,
}

impl Subscription {
    /// Removes the callback. No-op when the store is already gone.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    /// Keeps the callback registered until the store is dropped.
    pub fn detach(mut self) {
        self.registry = None;
    }

    fn release(&mut self) {
        if let Some(registry) = self.registry.take().and_then(|weak| weak.upgrade()) {
            registry.remove(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.registry.is_some())
            .finish()
    }
}
