//! Observable Implementation
//!
//! An Observable is the mutable cell of the observable model. It holds a
//! value and a set of listeners.
//!
//! # How Observables Work
//!
//! 1. `get()` inside a tracked computation records the observable as a
//!    dependency of that computation; `peek()` never does.
//!
//! 2. `set()` replaces the value. If the new value differs from the old
//!    one, every listener is called with it.
//!
//! 3. `subscribe()` returns a [`Subscription`]; disposing it removes the
//!    listener, which `subscription_count()` reflects immediately.
//!
//! # Thread Safety
//!
//! The value is behind a `RwLock` and the listeners behind a `Mutex`.
//! Neither lock is held while a listener runs.

use std::fmt::Debug;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use super::context::{ChangeCallback, Dependency, ReactiveContext};
use super::source::{Readable, Subscribable, Writable};
use super::subscription::{notify_listeners, ListenerSet, SourceId, Subscription};

/// A mutable, observable value.
///
/// # Example
///
/// ```rust,ignore
/// let name = Observable::new("World".to_string());
/// let _sub = name.subscribe(|value| println!("Hello, {value}"));
///
/// name.set("Mark".to_string()); // prints "Hello, Mark"
/// ```
pub struct Observable<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    inner: Arc<CellInner<T>>,
}

struct CellInner<T> {
    /// Unique identifier for this cell.
    id: SourceId,

    /// The current value.
    value: RwLock<T>,

    /// Listeners called after each change.
    listeners: Mutex<ListenerSet<T>>,
}

impl<T> Observable<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Create a new observable with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(CellInner {
                id: SourceId::new(),
                value: RwLock::new(value),
                listeners: Mutex::new(ListenerSet::new()),
            }),
        }
    }

    /// Get the observable's identity.
    pub fn id(&self) -> SourceId {
        self.inner.id
    }

    /// Get the current value, recording a dependency if called from inside
    /// a tracked computation.
    pub fn get(&self) -> T {
        if ReactiveContext::is_active() {
            ReactiveContext::track(self.inner.clone());
        }
        self.peek()
    }

    /// Get the current value without recording a dependency.
    pub fn peek(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Set a new value and notify listeners if it changed.
    pub fn set(&self, value: T) {
        {
            let mut guard = self.inner.value.write();
            if *guard == value {
                return;
            }
            *guard = value.clone();
        }

        tracing::trace!(source = self.inner.id.raw(), "observable changed");
        notify_listeners(&self.inner.listeners, &value);
    }

    /// Update the value using a function of the current value.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let next = {
            let guard = self.inner.value.read();
            f(&guard)
        };
        self.set(next);
    }

    /// Notify listeners with the current value even though it was not
    /// replaced, e.g. after mutating shared interior state.
    pub fn notify(&self) {
        let value = self.peek();
        notify_listeners(&self.inner.listeners, &value);
    }

    /// Register a listener called with each new value.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.inner.subscribe(callback)
    }

    /// Get the number of live subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }
}

impl<T> CellInner<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn subscribe<F>(self: &Arc<Self>, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let key = self.listeners.lock().insert(Arc::new(callback));
        let weak: Weak<Self> = Arc::downgrade(self);

        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                let removed = inner.listeners.lock().remove(key);
                drop(removed);
            }
        })
    }
}

impl<T> Dependency for CellInner<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn source_id(&self) -> SourceId {
        self.id
    }

    fn subscribe_change(self: Arc<Self>, callback: ChangeCallback) -> Subscription {
        self.subscribe(move |_: &T| callback())
    }
}

impl<T> Readable<T> for Observable<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn peek(&self) -> T {
        Observable::peek(self)
    }

    fn get(&self) -> T {
        Observable::get(self)
    }
}

impl<T> Writable<T> for Observable<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn set(&self, value: T) {
        Observable::set(self, value)
    }
}

impl<T> Subscribable<T> for Observable<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn source_id(&self) -> SourceId {
        self.id()
    }

    fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        Observable::subscribe(self, callback)
    }

    fn subscription_count(&self) -> usize {
        Observable::subscription_count(self)
    }
}

impl<T> Clone for Observable<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Two handles are equal when they refer to the same cell.
impl<T> PartialEq for Observable<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Debug for Observable<T>
where
    T: Clone + PartialEq + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observable")
            .field("id", &self.inner.id.raw())
            .field("value", &self.peek())
            .field("subscription_count", &self.subscription_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[test]
    fn observable_get_and_set() {
        let observable = Observable::new(0);
        assert_eq!(observable.get(), 0);

        observable.set(42);
        assert_eq!(observable.get(), 42);
    }

    #[test]
    fn observable_update() {
        let observable = Observable::new(10);
        observable.update(|v| v + 5);
        assert_eq!(observable.peek(), 15);
    }

    #[test]
    fn observable_notifies_subscribers_with_new_value() {
        let observable = Observable::new(0);
        let seen = Arc::new(AtomicI32::new(-1));
        let seen_clone = seen.clone();

        let _sub = observable.subscribe(move |value| {
            seen_clone.store(*value, Ordering::SeqCst);
        });

        observable.set(7);
        assert_eq!(seen.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn setting_an_equal_value_does_not_notify() {
        let observable = Observable::new("same".to_string());
        let calls = Arc::new(AtomicI32::new(0));
        let calls_clone = calls.clone();

        let _sub = observable.subscribe(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        observable.set("same".to_string());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        observable.notify();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn disposing_removes_the_listener() {
        let observable = Observable::new(0);
        let calls = Arc::new(AtomicI32::new(0));
        let calls_clone = calls.clone();

        let sub = observable.subscribe(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(observable.subscription_count(), 1);

        observable.set(1);
        sub.dispose();
        assert_eq!(observable.subscription_count(), 0);

        observable.set(2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn get_records_a_dependency_but_peek_does_not() {
        let observable = Observable::new(1);

        let ctx = ReactiveContext::enter(crate::observable::SubscriberId::new());
        observable.peek();
        assert!(ReactiveContext::get_dependencies().is_empty());

        observable.get();
        assert_eq!(ReactiveContext::get_dependencies(), vec![observable.id()]);
        drop(ctx.finish());
    }

    #[test]
    fn clones_share_identity_and_state() {
        let a = Observable::new(0);
        let b = a.clone();

        a.set(42);
        assert_eq!(b.peek(), 42);
        assert_eq!(a.id(), b.id());
        assert_eq!(a, b);
        assert_ne!(a, Observable::new(42));
    }
}
