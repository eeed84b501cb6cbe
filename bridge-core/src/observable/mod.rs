//! Observable Model
//!
//! This module implements the dependency-tracking side of the bridge:
//! observable cells, computed cells, tracked computations and
//! subscriptions. The component hooks in [`crate::hooks`] consume it only
//! through the capability traits in [`source`] and the [`Dependency`]
//! trait.
//!
//! # Concepts
//!
//! ## Observables
//!
//! An [`Observable`] is a mutable cell. `peek()` reads it untracked, `get()`
//! reads it and records a dependency in the running computation, `set()`
//! writes it and notifies subscribers.
//!
//! ## Computeds
//!
//! A [`Computed`] is a read-only cell derived from other sources. It has no
//! `set`, so read-only and writable sources are distinct types.
//!
//! ## Tracked computations
//!
//! A [`TrackedComputation`] runs a function, records what it read, and
//! subscribes to exactly those sources until the next evaluation.
//!
//! # Implementation Notes
//!
//! Reads are recorded on a thread-local stack of frames (see
//! [`ReactiveContext`]). Everything runs on one UI thread; the locks only
//! make the handles `Send + Sync` so they can be captured by host
//! callbacks, and they are never held while user code runs.

mod cell;
mod computed;
mod context;
pub mod source;
mod subscription;
mod tracked;

pub use cell::Observable;
pub use computed::Computed;
pub use context::{ignore_dependencies, ChangeCallback, Dependency, ReactiveContext};
pub use source::{Readable, Subscribable, Writable};
pub use subscription::{SourceId, SubscriberId, Subscription};
pub use tracked::TrackedComputation;
