//! Computed Implementation
//!
//! A Computed is the read-only derived cell of the observable model. It has
//! the same read and subscribe interface as an observable but no `set`.
//!
//! # How Computeds Work
//!
//! A computed is *asleep* while nobody subscribes to it:
//!
//! - it holds no subscriptions on its own dependencies;
//! - every read runs the function again in an isolated frame.
//!
//! The first subscriber wakes it:
//!
//! - it evaluates through a [`TrackedComputation`], subscribing to what it
//!   read;
//! - when a dependency changes it re-evaluates immediately and notifies its
//!   listeners if the value changed;
//! - reads return the cached value.
//!
//! When the last subscription is disposed it goes back to sleep and
//! releases its dependencies, so an unobserved computed never keeps
//! anything subscribed.

use std::fmt::Debug;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::context::{ChangeCallback, Dependency, ReactiveContext};
use super::source::{Readable, Subscribable};
use super::subscription::{notify_listeners, ListenerSet, SourceId, Subscription};
use super::tracked::TrackedComputation;

/// A derived, read-only value.
///
/// # Example
///
/// ```rust,ignore
/// let count = Observable::new(2);
/// let doubled = Computed::new({
///     let count = count.clone();
///     move || count.get() * 2
/// });
/// assert_eq!(doubled.get(), 4);
/// ```
pub struct Computed<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    inner: Arc<ComputedInner<T>>,
}

struct ComputedInner<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Unique identifier for this cell.
    id: SourceId,

    /// Evaluation and dependency bookkeeping while awake.
    tracked: TrackedComputation<T>,

    /// Listeners called after the value changes.
    listeners: Mutex<ListenerSet<T>>,
}

impl<T> Computed<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Create a new computed cell from a function of other sources.
    pub fn new<F>(func: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let inner = Arc::new_cyclic(|weak: &Weak<ComputedInner<T>>| {
            let weak = weak.clone();
            ComputedInner {
                id: SourceId::new(),
                tracked: TrackedComputation::new(func, move || {
                    if let Some(inner) = weak.upgrade() {
                        inner.refresh();
                    }
                }),
                listeners: Mutex::new(ListenerSet::new()),
            }
        });
        Self { inner }
    }

    /// Get the computed's identity.
    pub fn id(&self) -> SourceId {
        self.inner.id
    }

    /// Read the value, recording this computed as a dependency of the
    /// running computation.
    pub fn get(&self) -> T {
        if ReactiveContext::is_active() {
            ReactiveContext::track(self.inner.clone());
        }
        self.peek()
    }

    /// Read the value without recording a dependency.
    pub fn peek(&self) -> T {
        if self.is_awake() {
            self.inner.tracked.get()
        } else {
            self.inner.tracked.evaluate_detached()
        }
    }

    /// Whether anyone is subscribed (and the value is therefore cached).
    pub fn is_awake(&self) -> bool {
        !self.inner.listeners.lock().is_empty()
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

    /// Get the number of sources this computed is subscribed to.
    pub fn dependency_count(&self) -> usize {
        self.inner.tracked.dependency_count()
    }
}

impl<T> ComputedInner<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn subscribe<F>(self: &Arc<Self>, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let (key, waking) = {
            let mut listeners = self.listeners.lock();
            let waking = listeners.is_empty();
            (listeners.insert(Arc::new(callback)), waking)
        };
        if waking {
            tracing::trace!(source = self.id.raw(), "computed woke up");
            self.tracked.evaluate();
        }

        let weak: Weak<Self> = Arc::downgrade(self);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.unsubscribe(key);
            }
        })
    }

    fn unsubscribe(&self, key: u64) {
        let (removed, sleeping) = {
            let mut listeners = self.listeners.lock();
            let removed = listeners.remove(key);
            (removed, listeners.is_empty())
        };
        drop(removed);
        if sleeping {
            tracing::trace!(source = self.id.raw(), "computed went to sleep");
            self.tracked.release();
        }
    }

    /// Re-evaluate after a dependency change and notify on a new value.
    fn refresh(&self) {
        if self.listeners.lock().is_empty() {
            return;
        }
        let previous = self.tracked.cached();
        let next = self.tracked.evaluate();
        if previous.as_ref() != Some(&next) {
            notify_listeners(&self.listeners, &next);
        }
    }
}

impl<T> Dependency for ComputedInner<T>
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

impl<T> Readable<T> for Computed<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn peek(&self) -> T {
        Computed::peek(self)
    }

    fn get(&self) -> T {
        Computed::get(self)
    }
}

impl<T> Subscribable<T> for Computed<T>
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
        Computed::subscribe(self, callback)
    }

    fn subscription_count(&self) -> usize {
        Computed::subscription_count(self)
    }
}

impl<T> Clone for Computed<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for Computed<T>
where
    T: Clone + PartialEq + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Computed")
            .field("id", &self.inner.id.raw())
            .field("awake", &self.is_awake())
            .field("subscription_count", &self.subscription_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
