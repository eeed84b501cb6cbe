//! Computed-Bridge Hook
//!
//! Renders a component with the result of a function of any number of
//! sources, re-rendering it when one of those sources changes.
//!
//! # How It Works
//!
//! 1. The first render creates a [`TrackedComputation`] for the function and
//!    evaluates it. Every source read by that evaluation is subscribed.
//!
//! 2. A change to any dependency only marks the computation dirty and asks
//!    for one more render. Several changes before the next flush still give
//!    one render.
//!
//! 3. On that render the computation is evaluated once, which replaces its
//!    dependency set with what this evaluation read. Renders for any other
//!    reason reuse the cached value.
//!
//! 4. When `deps` changes the computation is disposed and replaced by one
//!    built from the closure of the current render. Passing `()` means the
//!    closure is never replaced.
//!
//! 5. Unmount disposes the computation and with it every subscription.

use std::fmt::Display;

use crate::component::RenderContext;
use crate::observable::TrackedComputation;

use super::force_update::use_force_update;
use super::memo::use_memo_with_disposer;

fn use_tracked<T, D, F>(cx: &mut RenderContext<'_>, f: F, deps: D) -> TrackedComputation<T>
where
    T: Clone + Send + 'static,
    D: PartialEq + Send + 'static,
    F: Fn() -> T + Send + Sync + 'static,
{
    let force = use_force_update(cx);
    use_memo_with_disposer(
        cx,
        move || TrackedComputation::new(f, move || force.call()),
        |computation: TrackedComputation<T>| computation.dispose(),
        deps,
    )
}

/// Result of `f`, kept up to date with every source it reads.
///
/// # Example
///
/// ```rust,ignore
/// fn full_name(cx: &mut RenderContext<'_>, person: &Person) -> Node {
///     let person = person.clone();
///     let name = use_computed(cx, move || {
///         format!("{} {}", person.first.get(), person.last.get())
///     }, ());
///     Node::text(name)
/// }
/// ```
pub fn use_computed<T, D, F>(cx: &mut RenderContext<'_>, f: F, deps: D) -> T
where
    T: Clone + Send + 'static,
    D: PartialEq + Send + 'static,
    F: Fn() -> T + Send + Sync + 'static,
{
    use_tracked(cx, f, deps).get()
}

/// Like [`use_computed`] for fallible reads. An error is logged once, when
/// it is computed, and returned as is on every render; the dependencies
/// read before it failed stay subscribed.
pub fn try_use_computed<T, E, D, F>(cx: &mut RenderContext<'_>, f: F, deps: D) -> Result<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Display + Send + 'static,
    D: PartialEq + Send + 'static,
    F: Fn() -> Result<T, E> + Send + Sync + 'static,
{
    let instance = cx.instance_id();
    let computation = use_tracked(cx, f, deps);
    let evaluations = computation.evaluation_count();
    let result = computation.get();
    // A cached error was logged when it was produced.
    if computation.evaluation_count() != evaluations {
        if let Err(error) = &result {
            tracing::error!(instance = instance.raw(), %error, "computed read failed");
        }
    }
    result
}
