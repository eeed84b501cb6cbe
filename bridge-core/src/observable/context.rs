//! Reactive Context
//!
//! The reactive context records which sources are read while a tracked
//! computation runs. This is what lets a computation discover its
//! dependency set dynamically: whatever was read during the most recent
//! evaluation is exactly what it depends on.
//!
//! # Implementation
//!
//! We use a thread-local stack of frames. Entering a computation pushes a
//! frame; every tracked read (`Observable::get`, `Computed::get`) records
//! its source in the top frame; finishing the computation pops the frame
//! and hands back the recorded sources.
//!
//! Nested computations get their own frames, so a computed cell read from
//! inside another computation records *itself* in the outer frame while its
//! own reads go to its own frame.
//!
//! [`ignore_dependencies`] pushes a frame that records nothing. Reads made
//! inside it never subscribe the enclosing computation.

use std::cell::RefCell;
use std::sync::Arc;

use smallvec::SmallVec;

use super::subscription::{SourceId, SubscriberId, Subscription};

/// Callback invoked when a dependency reports a change.
pub type ChangeCallback = Arc<dyn Fn() + Send + Sync>;

/// A source as seen by the tracking machinery: something that can be
/// subscribed to for change notifications, regardless of its value type.
pub trait Dependency: Send + Sync {
    /// Identity of the source.
    fn source_id(&self) -> SourceId;

    /// Invoke `callback` whenever the source changes.
    fn subscribe_change(self: Arc<Self>, callback: ChangeCallback) -> Subscription;
}

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<ContextEntry>> = const { RefCell::new(Vec::new()) };
}

/// An entry in the reactive context stack.
struct ContextEntry {
    /// The computation running in this frame; `None` for ignoring frames.
    subscriber_id: Option<SubscriberId>,
    /// Sources read in this frame, deduplicated, in first-read order.
    dependencies: SmallVec<[Arc<dyn Dependency>; 4]>,
}

/// Guard for one frame on the tracking stack.
///
/// The frame is popped when the guard is finished or dropped, so the stack
/// stays balanced even if the computation panics.
pub struct ReactiveContext {
    subscriber_id: Option<SubscriberId>,
    finished: bool,
}

impl ReactiveContext {
    /// Enter a new tracking frame for the given computation.
    pub fn enter(subscriber_id: SubscriberId) -> Self {
        Self::push(Some(subscriber_id))
    }

    fn push(subscriber_id: Option<SubscriberId>) -> Self {
        CONTEXT_STACK.with(|stack| {
            stack.borrow_mut().push(ContextEntry {
                subscriber_id,
                dependencies: SmallVec::new(),
            });
        });

        Self {
            subscriber_id,
            finished: false,
        }
    }

    /// Whether a read right now would be recorded.
    pub fn is_active() -> bool {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .is_some_and(|entry| entry.subscriber_id.is_some())
        })
    }

    /// The computation whose frame is on top, if it records reads.
    pub fn current_subscriber() -> Option<SubscriberId> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().and_then(|entry| entry.subscriber_id))
    }

    /// Record a read of `dependency` in the current frame.
    pub fn track(dependency: Arc<dyn Dependency>) {
        CONTEXT_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            let Some(entry) = stack.last_mut() else {
                return;
            };
            if entry.subscriber_id.is_none() {
                return;
            }
            let id = dependency.source_id();
            if !entry.dependencies.iter().any(|d| d.source_id() == id) {
                entry.dependencies.push(dependency);
            }
        });
    }

    /// Source IDs recorded so far in the current frame.
    pub fn get_dependencies() -> Vec<SourceId> {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .map(|entry| entry.dependencies.iter().map(|d| d.source_id()).collect())
                .unwrap_or_default()
        })
    }

    /// Pop this frame and return the sources read in it.
    pub fn finish(mut self) -> SmallVec<[Arc<dyn Dependency>; 4]> {
        self.finished = true;
        self.pop()
            .map(|entry| entry.dependencies)
            .unwrap_or_default()
    }

    fn pop(&self) -> Option<ContextEntry> {
        CONTEXT_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();
            if let Some(entry) = &popped {
                debug_assert_eq!(
                    entry.subscriber_id, self.subscriber_id,
                    "ReactiveContext mismatch: expected {:?}, got {:?}",
                    self.subscriber_id, entry.subscriber_id
                );
            }
            popped
        })
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if std::thread::panicking() {
            tracing::error!(
                subscriber = ?self.subscriber_id,
                "tracked evaluation panicked; discarding its dependencies"
            );
        }
        drop(self.pop());
    }
}

/// Run `f` without recording any of its reads in the enclosing computation.
pub fn ignore_dependencies<R>(f: impl FnOnce() -> R) -> R {
    let frame = ReactiveContext::push(None);
    let result = f();
    drop(frame.finish());
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeSource(SourceId);

    impl Dependency for FakeSource {
        fn source_id(&self) -> SourceId {
            self.0
        }

        fn subscribe_change(self: Arc<Self>, _callback: ChangeCallback) -> Subscription {
            Subscription::empty()
        }
    }

    fn fake() -> Arc<dyn Dependency> {
        Arc::new(FakeSource(SourceId::new()))
    }

    #[test]
    fn context_tracks_subscriber() {
        let id = SubscriberId::new();

        assert!(!ReactiveContext::is_active());
        assert!(ReactiveContext::current_subscriber().is_none());

        {
            let _ctx = ReactiveContext::enter(id);
            assert!(ReactiveContext::is_active());
            assert_eq!(ReactiveContext::current_subscriber(), Some(id));
        }

        // Context should be cleaned up after drop
        assert!(!ReactiveContext::is_active());
    }

    #[test]
    fn repeated_reads_are_recorded_once() {
        let ctx = ReactiveContext::enter(SubscriberId::new());
        let a = fake();
        let b = fake();

        ReactiveContext::track(a.clone());
        ReactiveContext::track(b.clone());
        ReactiveContext::track(a.clone());

        assert_eq!(
            ReactiveContext::get_dependencies(),
            vec![a.source_id(), b.source_id()]
        );
        assert_eq!(ctx.finish().len(), 2);
    }

    #[test]
    fn nested_contexts_keep_their_own_reads() {
        let outer = ReactiveContext::enter(SubscriberId::new());
        let a = fake();
        ReactiveContext::track(a.clone());

        {
            let inner = ReactiveContext::enter(SubscriberId::new());
            ReactiveContext::track(fake());
            assert_eq!(inner.finish().len(), 1);
        }

        let deps = outer.finish();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].source_id(), a.source_id());
    }

    #[test]
    fn ignored_reads_are_not_recorded() {
        let ctx = ReactiveContext::enter(SubscriberId::new());

        ignore_dependencies(|| {
            assert!(!ReactiveContext::is_active());
            ReactiveContext::track(fake());
        });

        assert!(ReactiveContext::is_active());
        assert!(ctx.finish().is_empty());
    }

    #[test]
    fn stack_is_balanced_after_panic() {
        let result = std::panic::catch_unwind(|| {
            let _ctx = ReactiveContext::enter(SubscriberId::new());
            panic!("read failed");
        });

        assert!(result.is_err());
        assert!(ReactiveContext::current_subscriber().is_none());
    }
}
