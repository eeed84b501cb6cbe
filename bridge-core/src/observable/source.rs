//! Capability traits for external sources.
//!
//! The bridge hooks are written against these traits rather than against
//! concrete cells. A read-only source implements [`Readable`] and
//! [`Subscribable`]; only writable sources implement [`Writable`], so
//! writing to a read-only source does not compile.

use super::subscription::{SourceId, Subscription};

/// Synchronous reads.
pub trait Readable<T> {
    /// Read without recording a dependency.
    fn peek(&self) -> T;

    /// Read and record a dependency in the running computation, if any.
    fn get(&self) -> T;
}

/// Writes. Only mutable cells implement this.
pub trait Writable<T>: Readable<T> {
    /// Replace the value, notifying subscribers if it changed.
    fn set(&self, value: T);
}

/// Change subscriptions.
pub trait Subscribable<T>: Send + Sync {
    /// Identity shared by all clones of this source.
    fn source_id(&self) -> SourceId;

    /// Call `callback` with the new value after every change.
    fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static;

    /// Number of live subscriptions.
    fn subscription_count(&self) -> usize;
}
