//! Tracked Computation
//!
//! A TrackedComputation wraps a function that reads any number of sources
//! and keeps one subscription per source it read during its latest
//! evaluation.
//!
//! # How Tracked Computations Work
//!
//! 1. `evaluate()` runs the function inside a fresh tracking frame. The
//!    sources read during that run become the dependency set, replacing the
//!    previous one: sources no longer read are unsubscribed, newly read
//!    sources are subscribed, sources read both times keep their existing
//!    subscription.
//!
//! 2. When any dependency changes, the computation is marked dirty and its
//!    change callback is invoked. The callback decides what to do; the
//!    function itself is *not* re-run from inside the notification.
//!
//! 3. `get()` returns the cached value, re-evaluating first if the
//!    computation is dirty (or was never evaluated).
//!
//! 4. `dispose()` releases every subscription. A disposed computation can
//!    still be evaluated but never subscribes again.
//!
//! # Differences from Computed
//!
//! - A `Computed` is itself a source other computations can depend on; a
//!   tracked computation is a private consumer.
//! - A `Computed` with listeners re-evaluates eagerly on change; a tracked
//!   computation only reports the change and waits to be asked.

use std::fmt;
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;

use super::context::{ChangeCallback, Dependency, ReactiveContext};
use super::subscription::{SourceId, SubscriberId, Subscription};

/// A re-evaluatable function whose reads are recorded as dependencies.
///
/// # Example
///
/// ```rust,ignore
/// let first = Observable::new("Bob".to_string());
/// let last = Observable::new("Ross".to_string());
///
/// let full = TrackedComputation::new(
///     move || format!("{} {}", first.get(), last.get()),
///     || println!("full name is stale"),
/// );
/// assert_eq!(full.get(), "Bob Ross");
/// ```
pub struct TrackedComputation<T>
where
    T: Clone + Send + 'static,
{
    inner: Arc<TrackedInner<T>>,
}

struct TrackedInner<T> {
    /// Label for this computation's tracking frames.
    subscriber_id: SubscriberId,

    /// The function being tracked.
    func: Box<dyn Fn() -> T + Send + Sync>,

    /// Called after a dependency change marks the computation dirty.
    on_change: ChangeCallback,

    state: Mutex<TrackedState<T>>,
}

struct TrackedState<T> {
    /// Result of the latest evaluation.
    value: Option<T>,

    /// A dependency changed since the latest evaluation.
    dirty: bool,

    /// Set by `dispose`; no further subscriptions are made.
    disposed: bool,

    /// One subscription per dependency of the latest evaluation.
    subscriptions: IndexMap<SourceId, Subscription>,

    /// Number of times the function has run.
    evaluation_count: usize,
}

impl<T> TrackedComputation<T>
where
    T: Clone + Send + 'static,
{
    /// Create a computation. Nothing runs until `get` or `evaluate`.
    pub fn new<F, C>(func: F, on_change: C) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
        C: Fn() + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(TrackedInner {
                subscriber_id: SubscriberId::new(),
                func: Box::new(func),
                on_change: Arc::new(on_change),
                state: Mutex::new(TrackedState {
                    value: None,
                    dirty: true,
                    disposed: false,
                    subscriptions: IndexMap::new(),
                    evaluation_count: 0,
                }),
            }),
        }
    }

    /// Get the subscriber ID for this computation.
    pub fn subscriber_id(&self) -> SubscriberId {
        self.inner.subscriber_id
    }

    /// Return the cached value, evaluating first if it is stale.
    pub fn get(&self) -> T {
        {
            let state = self.inner.state.lock();
            if !state.dirty {
                if let Some(value) = &state.value {
                    return value.clone();
                }
            }
        }
        self.evaluate()
    }

    /// The latest value, without evaluating.
    pub fn cached(&self) -> Option<T> {
        self.inner.state.lock().value.clone()
    }

    /// Run the function now and rebuild the dependency set from its reads.
    pub fn evaluate(&self) -> T {
        let value = self.evaluate_with(|| (self.inner.func)());
        self.inner.state.lock().value = Some(value.clone());
        value
    }

    /// Run `f` in this computation's frame in place of its own function.
    /// What `f` reads becomes the dependency set, exactly as for
    /// `evaluate`; the cached value is left alone.
    pub fn evaluate_with<R>(&self, f: impl FnOnce() -> R) -> R {
        // Changes delivered while `f` runs must survive the evaluation.
        self.inner.state.lock().dirty = false;
        let ctx = ReactiveContext::enter(self.inner.subscriber_id);
        let result = f();
        let dependencies = ctx.finish();

        let disposed = self.inner.state.lock().disposed;
        if disposed {
            tracing::debug!(
                subscriber = self.inner.subscriber_id.raw(),
                "evaluated a disposed computation; not subscribing"
            );
        } else {
            self.rebuild_subscriptions(dependencies.into_iter());
        }

        self.inner.state.lock().evaluation_count += 1;
        result
    }

    /// Run the function in an isolated frame: no subscriptions change and
    /// none of its reads leak into an enclosing computation.
    pub fn evaluate_detached(&self) -> T {
        let ctx = ReactiveContext::enter(self.inner.subscriber_id);
        let value = (self.inner.func)();
        drop(ctx.finish());
        self.inner.state.lock().evaluation_count += 1;
        value
    }

    fn rebuild_subscriptions(&self, dependencies: impl Iterator<Item = Arc<dyn Dependency>>) {
        let mut previous = std::mem::take(&mut self.inner.state.lock().subscriptions);
        let mut next = IndexMap::with_capacity(previous.len());
        let mut added = 0usize;

        for dependency in dependencies {
            let id = dependency.source_id();
            let subscription = match previous.shift_remove(&id) {
                Some(existing) => existing,
                None => {
                    added += 1;
                    dependency.subscribe_change(self.change_callback())
                }
            };
            next.insert(id, subscription);
        }

        let removed = previous.len();
        // Stale subscriptions are released outside the state lock.
        drop(previous);

        tracing::trace!(
            subscriber = self.inner.subscriber_id.raw(),
            dependencies = next.len(),
            added,
            removed,
            "rebuilt dependency subscriptions"
        );
        self.inner.state.lock().subscriptions = next;
    }

    fn change_callback(&self) -> ChangeCallback {
        let weak: Weak<TrackedInner<T>> = Arc::downgrade(&self.inner);
        Arc::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.dependency_changed();
            }
        })
    }

    /// Drop every subscription and mark the computation stale, without
    /// disposing it. The next `evaluate` subscribes again.
    pub fn release(&self) {
        let subscriptions = {
            let mut state = self.inner.state.lock();
            state.dirty = true;
            std::mem::take(&mut state.subscriptions)
        };
        drop(subscriptions);
    }

    /// Release every subscription permanently.
    pub fn dispose(&self) {
        let subscriptions = {
            let mut state = self.inner.state.lock();
            state.disposed = true;
            std::mem::take(&mut state.subscriptions)
        };
        tracing::trace!(
            subscriber = self.inner.subscriber_id.raw(),
            released = subscriptions.len(),
            "disposed tracked computation"
        );
        drop(subscriptions);
    }

    /// Check if the computation has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.state.lock().disposed
    }

    /// Check if a dependency changed since the latest evaluation.
    pub fn is_dirty(&self) -> bool {
        self.inner.state.lock().dirty
    }

    /// Get the number of times the function has run.
    pub fn evaluation_count(&self) -> usize {
        self.inner.state.lock().evaluation_count
    }

    /// Get the number of current dependencies.
    pub fn dependency_count(&self) -> usize {
        self.inner.state.lock().subscriptions.len()
    }

    /// Identities of the current dependencies, in first-read order.
    pub fn dependency_ids(&self) -> Vec<SourceId> {
        self.inner.state.lock().subscriptions.keys().copied().collect()
    }
}

impl<T> TrackedInner<T> {
    fn dependency_changed(&self) {
        {
            let mut state = self.state.lock();
            if state.disposed {
                return;
            }
            state.dirty = true;
        }
        (self.on_change)();
    }
}

impl<T> Clone for TrackedComputation<T>
where
    T: Clone + Send + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for TrackedComputation<T>
where
    T: Clone + Send + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("TrackedComputation")
            .field("subscriber_id", &self.inner.subscriber_id.raw())
            .field("dirty", &state.dirty)
            .field("disposed", &state.disposed)
            .field("dependency_count", &state.subscriptions.len())
            .field("evaluation_count", &state.evaluation_count)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observable::Observable;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        (count, move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn evaluates_lazily_and_caches() {
        let source = Observable::new(2);
        let reader = source.clone();
        let computation = TrackedComputation::new(move || reader.get() * 10, || {});

        assert_eq!(computation.evaluation_count(), 0);
        assert_eq!(computation.get(), 20);
        assert_eq!(computation.get(), 20);
        assert_eq!(computation.evaluation_count(), 1);
        assert_eq!(source.subscription_count(), 1);
    }

    #[test]
    fn change_marks_dirty_without_re_evaluating() {
        let source = Observable::new(1);
        let reader = source.clone();
        let (changes, on_change) = counter();
        let computation = TrackedComputation::new(move || reader.get(), on_change);

        computation.get();
        source.set(2);
        source.set(3);

        assert!(computation.is_dirty());
        assert_eq!(changes.load(Ordering::SeqCst), 2);
        assert_eq!(computation.evaluation_count(), 1);

        assert_eq!(computation.get(), 3);
        assert_eq!(computation.evaluation_count(), 2);
        assert!(!computation.is_dirty());
    }

    #[test]
    fn change_during_evaluation_stays_dirty() {
        let source = Observable::new(1);
        let reader = source.clone();
        let computation = TrackedComputation::new(move || reader.get(), || {});
        assert_eq!(computation.get(), 1);

        computation.evaluate_with(|| {
            source.get();
            source.set(5);
        });

        assert!(computation.is_dirty());
        assert_eq!(computation.get(), 5);
    }

    #[test]
    fn dependency_set_follows_the_branch_taken() {
        let use_nickname = Observable::new(false);
        let nickname = Observable::new("The Senate".to_string());
        let real_name = Observable::new("Sheev".to_string());

        let (flag, nick, real) = (use_nickname.clone(), nickname.clone(), real_name.clone());
        let (changes, on_change) = counter();
        let computation = TrackedComputation::new(
            move || if flag.get() { nick.get() } else { real.get() },
            on_change,
        );

        assert_eq!(computation.get(), "Sheev");
        assert_eq!(computation.dependency_ids(), vec![use_nickname.id(), real_name.id()]);
        assert_eq!(nickname.subscription_count(), 0);

        // Not read in this branch: no notification.
        nickname.set("Vader".to_string());
        assert_eq!(changes.load(Ordering::SeqCst), 0);

        use_nickname.set(true);
        assert_eq!(computation.get(), "Vader");
        assert_eq!(nickname.subscription_count(), 1);
        assert_eq!(real_name.subscription_count(), 0);
        assert_eq!(use_nickname.subscription_count(), 1);
    }

    #[test]
    fn dispose_releases_every_subscription() {
        let a = Observable::new(1);
        let b = Observable::new(2);
        let (ra, rb) = (a.clone(), b.clone());
        let (changes, on_change) = counter();
        let computation = TrackedComputation::new(move || ra.get() + rb.get(), on_change);

        assert_eq!(computation.get(), 3);
        assert_eq!(computation.dependency_count(), 2);

        computation.dispose();
        assert!(computation.is_disposed());
        assert_eq!(a.subscription_count(), 0);
        assert_eq!(b.subscription_count(), 0);

        a.set(10);
        assert_eq!(changes.load(Ordering::SeqCst), 0);

        // Still evaluable, never resubscribes.
        assert_eq!(computation.evaluate(), 12);
        assert_eq!(a.subscription_count(), 0);
    }

    #[test]
    fn release_allows_resubscribing() {
        let a = Observable::new(1);
        let ra = a.clone();
        let computation = TrackedComputation::new(move || ra.get(), || {});

        computation.get();
        computation.release();
        assert_eq!(a.subscription_count(), 0);
        assert!(computation.is_dirty());

        computation.get();
        assert_eq!(a.subscription_count(), 1);
    }

    #[test]
    fn detached_evaluation_leaves_subscriptions_alone() {
        let a = Observable::new(5);
        let ra = a.clone();
        let computation = TrackedComputation::new(move || ra.get(), || {});

        assert_eq!(computation.evaluate_detached(), 5);
        assert_eq!(a.subscription_count(), 0);
        assert!(computation.cached().is_none());
    }

    #[test]
    fn evaluate_with_tracks_the_given_closure() {
        let a = Observable::new(1);
        let b = Observable::new(2);
        let (changes, on_change) = counter();
        let computation = TrackedComputation::new(|| 0, on_change);

        let sum = computation.evaluate_with(|| a.get() + b.get());
        assert_eq!(sum, 3);
        assert_eq!(computation.dependency_ids(), vec![a.id(), b.id()]);
        assert!(computation.cached().is_none());

        b.set(5);
        assert_eq!(changes.load(Ordering::SeqCst), 1);

        computation.evaluate_with(|| a.get());
        assert_eq!(b.subscription_count(), 0);
    }
}
