//! Identities and subscription handles for the observable model.
//!
//! A [`Subscription`] is the disposable handle returned by every
//! `subscribe` call. Disposing it (explicitly or by dropping it) removes the
//! listener from its source, so the number of live handles for a source is
//! always equal to its `subscription_count()`.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use smallvec::SmallVec;

/// Unique identifier for a tracked computation.
///
/// Each computation gets a unique ID when created. The ID labels its frame
/// on the tracking stack and shows up in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// Identity of an external source (observable or computed cell).
///
/// Clones of a source share its identity. The bridge hooks compare
/// identities to decide whether they must resubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(u64);

impl SourceId {
    /// Generate a new unique source ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for SourceId {
    fn default() -> Self {
        Self::new()
    }
}

/// Disposable handle for a listener registered on a source.
///
/// Dropping the handle disposes it. Disposing twice is a no-op.
#[must_use = "dropping a Subscription disposes it immediately"]
pub struct Subscription {
    teardown: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Create a handle that runs `teardown` exactly once when disposed.
    pub fn new<F>(teardown: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            teardown: Some(Box::new(teardown)),
        }
    }

    /// A handle with nothing to release.
    pub fn empty() -> Self {
        Self { teardown: None }
    }

    /// Whether the handle still owns a listener.
    pub fn is_active(&self) -> bool {
        self.teardown.is_some()
    }

    /// Release the listener now.
    pub fn dispose(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// A value listener as stored by a source.
pub(crate) type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Ordered set of listeners keyed by registration number.
pub(crate) struct ListenerSet<T> {
    next_key: u64,
    entries: IndexMap<u64, Listener<T>>,
}

impl<T> ListenerSet<T> {
    pub(crate) fn new() -> Self {
        Self {
            next_key: 0,
            entries: IndexMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, listener: Listener<T>) -> u64 {
        let key = self.next_key;
        self.next_key += 1;
        self.entries.insert(key, listener);
        key
    }

    /// Remove a listener. The caller drops the returned value after
    /// releasing the lock.
    pub(crate) fn remove(&mut self, key: u64) -> Option<Listener<T>> {
        self.entries.shift_remove(&key)
    }

    pub(crate) fn get(&self, key: u64) -> Option<Listener<T>> {
        self.entries.get(&key).cloned()
    }

    pub(crate) fn keys(&self) -> SmallVec<[u64; 8]> {
        self.entries.keys().copied().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Deliver `value` to every listener registered when delivery starts.
///
/// The lock is never held while a listener runs, so listeners may
/// subscribe or unsubscribe freely. A listener removed by an earlier one in
/// the same delivery is skipped.
pub(crate) fn notify_listeners<T>(listeners: &Mutex<ListenerSet<T>>, value: &T) {
    let keys = listeners.lock().keys();
    for key in keys {
        let listener = listeners.lock().get(key);
        if let Some(listener) = listener {
            listener(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn ids_are_unique() {
        assert_ne!(SubscriberId::new(), SubscriberId::new());
        assert_ne!(SourceId::new(), SourceId::new());
    }

    #[test]
    fn subscription_runs_teardown_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();

        let subscription = Subscription::new(move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert!(subscription.is_active());

        subscription.dispose();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropping_a_subscription_disposes_it() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();

        {
            let _subscription = Subscription::new(move || {
                count_clone.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn listener_removed_mid_delivery_is_skipped() {
        let listeners: Arc<Mutex<ListenerSet<i32>>> = Arc::new(Mutex::new(ListenerSet::new()));
        let second_calls = Arc::new(AtomicUsize::new(0));

        // The first listener removes the second before it is reached.
        let set = listeners.clone();
        listeners.lock().insert(Arc::new(move |_| {
            let removed = set.lock().remove(1);
            drop(removed);
        }));
        let calls = second_calls.clone();
        listeners.lock().insert(Arc::new(move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
        }));

        notify_listeners(&listeners, &7);
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
        assert_eq!(listeners.lock().len(), 1);
    }
}
